//! # LOCOMOTE Shared
//!
//! Common types used by both client and server movement code.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - an async runtime
//! - a transport or socket crate
//! - anything backend-specific (physics, navigation)
//!
//! If you need those, put them in `locomote_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod math;
pub mod movement;

pub use config::{
    Body2DConfig, CapsuleConfig, ConfigError, ConfigResult, DashConfig, MovementConfig,
    NavAgentConfig,
};
pub use constants::{
    ANGLE_COMPRESSION_SCALE, MAX_MESSAGE_SIZE, MAX_STATE_FORCES, MIN_MOVEABLE_DISTANCE,
};
pub use math::{delta_angle, normalize_angle, Bounds, Spatial, Vec2, Vec3};
pub use movement::{
    validate_extra_movement_state, EntityRole, ExtraMovementState, MovementCapabilities,
    MovementSecure, MovementState,
};
