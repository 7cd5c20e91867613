//! # Movement Configuration
//!
//! Tunables for reconciliation, anti-cheat and the locomotion backends.
//! Loaded once at startup from TOML; every field has a default so partial
//! files are valid.
//!
//! ```toml
//! snap_threshold = 4.0
//! excess_time_tolerance = 0.15
//!
//! [dash]
//! speed = 25.0
//! deceleration = 40.0
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CORRECTION_EPSILON, DEFAULT_EXCESS_TIME_TOLERANCE, DEFAULT_GRAVITY,
    DEFAULT_MAILBOX_CAPACITY, DEFAULT_REMOTE_SMOOTHING_RATE, DEFAULT_SMOOTHING,
    DEFAULT_SNAP_THRESHOLD, MIN_MOVEABLE_DISTANCE,
};

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML could not be parsed.
    #[error("failed to parse movement config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid movement config: {0}")]
    Invalid(String),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Dash force parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Initial dash speed.
    pub speed: f32,
    /// Speed lost per second.
    pub deceleration: f32,
    /// Hard cap on dash lifetime in seconds (0 = decay only).
    pub duration: f32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            deceleration: 40.0,
            duration: 0.0,
        }
    }
}

/// Capsule dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Capsule radius.
    pub radius: f32,
    /// Capsule height.
    pub height: f32,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
        }
    }
}

/// Navigation agent parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavAgentConfig {
    /// Agent radius.
    pub radius: f32,
    /// Agent height.
    pub height: f32,
    /// Search radius when snapping a point onto the mesh.
    pub sample_distance: f32,
}

impl Default for NavAgentConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
            sample_distance: 2.0,
        }
    }
}

/// 2D body parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Body2DConfig {
    /// Width and height of the body.
    pub size: [f32; 2],
}

impl Default for Body2DConfig {
    fn default() -> Self {
        Self { size: [1.0, 1.0] }
    }
}

/// Movement tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Error above which a receiver hard-sets its position.
    pub snap_threshold: f32,
    /// Owner-client blend factor for small corrections.
    pub smoothing: f32,
    /// Observer smoothing rate (per second).
    pub remote_smoothing_rate: f32,
    /// Errors below this are not corrected.
    pub correction_epsilon: f32,
    /// Tolerated overshoot, in seconds of travel.
    pub excess_time_tolerance: f32,
    /// Floor for the permitted per-message distance.
    pub min_moveable_distance: f32,
    /// Position change that marks an input dirty.
    pub input_position_epsilon: f32,
    /// Facing change in degrees that marks an input dirty.
    pub input_angle_epsilon: f32,
    /// Path following stops this close to the destination.
    pub stopping_distance: f32,
    /// Degrees per second (0 = instant).
    pub turn_speed: f32,
    /// Gravity for the capsule backend.
    pub gravity: f32,
    /// Jump apex height.
    pub jump_height: f32,
    /// Maximum probe distance for grounded-position queries.
    pub ground_check_distance: f32,
    /// Inbound messages buffered per entity.
    pub mailbox_capacity: usize,
    /// Dash force.
    pub dash: DashConfig,
    /// Capsule backend.
    pub capsule: CapsuleConfig,
    /// Nav agent backend.
    pub nav_agent: NavAgentConfig,
    /// 2D body backend.
    pub body_2d: Body2DConfig,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            smoothing: DEFAULT_SMOOTHING,
            remote_smoothing_rate: DEFAULT_REMOTE_SMOOTHING_RATE,
            correction_epsilon: DEFAULT_CORRECTION_EPSILON,
            excess_time_tolerance: DEFAULT_EXCESS_TIME_TOLERANCE,
            min_moveable_distance: MIN_MOVEABLE_DISTANCE,
            input_position_epsilon: 0.01,
            input_angle_epsilon: 0.5,
            stopping_distance: 0.1,
            turn_speed: 0.0,
            gravity: DEFAULT_GRAVITY,
            jump_height: 1.2,
            ground_check_distance: 10.0,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            dash: DashConfig::default(),
            capsule: CapsuleConfig::default(),
            nav_agent: NavAgentConfig::default(),
            body_2d: Body2DConfig::default(),
        }
    }
}

impl MovementConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        fn non_negative(name: &str, value: f32) -> ConfigResult<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be a finite value >= 0, got {value}")))
            }
        }

        non_negative("snap_threshold", self.snap_threshold)?;
        non_negative("remote_smoothing_rate", self.remote_smoothing_rate)?;
        non_negative("correction_epsilon", self.correction_epsilon)?;
        non_negative("excess_time_tolerance", self.excess_time_tolerance)?;
        non_negative("input_position_epsilon", self.input_position_epsilon)?;
        non_negative("input_angle_epsilon", self.input_angle_epsilon)?;
        non_negative("stopping_distance", self.stopping_distance)?;
        non_negative("turn_speed", self.turn_speed)?;
        non_negative("gravity", self.gravity)?;
        non_negative("jump_height", self.jump_height)?;
        non_negative("ground_check_distance", self.ground_check_distance)?;
        non_negative("dash.speed", self.dash.speed)?;
        non_negative("dash.deceleration", self.dash.deceleration)?;
        non_negative("dash.duration", self.dash.duration)?;

        if !(self.min_moveable_distance.is_finite() && self.min_moveable_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_moveable_distance must be > 0, got {}",
                self.min_moveable_distance
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ConfigError::Invalid(format!(
                "smoothing must be within 0..=1, got {}",
                self.smoothing
            )));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid("mailbox_capacity must be > 0".to_string()));
        }
        if self.dash.speed > 0.0 && self.dash.deceleration <= 0.0 && self.dash.duration <= 0.0 {
            return Err(ConfigError::Invalid(
                "dash needs a deceleration or a duration to end".to_string(),
            ));
        }
        Ok(())
    }
}
