//! Single velocity impulse with deceleration and an optional lifetime cap.

use locomote_shared::Vec3;

/// How a force combines with regular movement.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ForceApplyMode {
    /// Added on top of regular movement.
    #[default]
    Default = 0,
    /// Overrides regular movement while active.
    ReplaceMovement = 1,
    /// Dash; overrides regular movement while active.
    Dash = 2,
}

impl ForceApplyMode {
    /// True for modes that take over directional movement.
    #[inline]
    #[must_use]
    pub const fn is_replace_movement(self) -> bool {
        matches!(self, Self::ReplaceMovement | Self::Dash)
    }

    /// Decodes a wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Default),
            1 => Some(Self::ReplaceMovement),
            2 => Some(Self::Dash),
            _ => None,
        }
    }
}

/// What kind of gameplay object produced a force.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ForceSourceType {
    /// No provenance (movement system itself, e.g. dash).
    #[default]
    None = 0,
    /// A skill.
    Skill = 1,
    /// A buff or debuff.
    Buff = 2,
    /// An item.
    Item = 3,
}

impl ForceSourceType {
    /// Decodes a wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Skill),
            2 => Some(Self::Buff),
            3 => Some(Self::Item),
            _ => None,
        }
    }
}

/// Provenance of a force.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ForceSource {
    /// Source kind.
    pub source_type: ForceSourceType,
    /// Data id of the skill/buff/item.
    pub data_id: u32,
    /// Level of the skill/buff/item.
    pub level: u32,
}

impl ForceSource {
    /// No provenance.
    pub const NONE: Self = Self {
        source_type: ForceSourceType::None,
        data_id: 0,
        level: 0,
    };

    /// Creates a source.
    #[must_use]
    pub const fn new(source_type: ForceSourceType, data_id: u32, level: u32) -> Self {
        Self {
            source_type,
            data_id,
            level,
        }
    }
}

/// A decaying velocity impulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceApplier {
    /// Combination mode.
    pub mode: ForceApplyMode,
    /// Unit direction.
    pub direction: Vec3,
    /// Provenance.
    pub source: ForceSource,
    /// Current speed (units per second).
    pub current_speed: f32,
    /// Speed lost per second.
    pub deceleration: f32,
    /// Lifetime cap in seconds; `<= 0` means decay only.
    pub duration: f32,
    /// Seconds elapsed; never exceeds `duration` when `duration > 0`.
    pub elapsed: f32,
}

impl ForceApplier {
    /// Creates a fresh force. `direction` is normalized.
    #[must_use]
    pub fn new(
        mode: ForceApplyMode,
        direction: Vec3,
        source: ForceSource,
        speed: f32,
        deceleration: f32,
        duration: f32,
    ) -> Self {
        Self {
            mode,
            direction: direction.normalize_or_zero(),
            source,
            current_speed: speed.max(0.0),
            deceleration,
            duration,
            elapsed: 0.0,
        }
    }

    /// Advances the force by `delta_time`. Returns `false` once it has ended.
    pub fn update(&mut self, delta_time: f32) -> bool {
        if self.duration > 0.0 {
            self.elapsed = (self.elapsed + delta_time).min(self.duration);
            if self.elapsed >= self.duration {
                self.current_speed = 0.0;
                return false;
            }
        }

        self.current_speed -= self.deceleration * delta_time;
        if self.current_speed <= 0.0 {
            self.current_speed = 0.0;
            return false;
        }
        true
    }

    /// Current velocity.
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.direction * self.current_speed
    }

    /// True while the force still moves the entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current_speed > 0.0 && (self.duration <= 0.0 || self.elapsed < self.duration)
    }

    /// True if the force can end on its own.
    #[inline]
    #[must_use]
    pub fn decays(&self) -> bool {
        self.deceleration > 0.0 || self.duration > 0.0
    }

    /// Remaining travel distance in closed form.
    ///
    /// `v²/(2d)` for a decay-only force; infinite for a force that never ends.
    #[must_use]
    pub fn calculate_distance(&self) -> f32 {
        let speed = self.current_speed.max(0.0);
        let remaining = (self.duration > 0.0).then(|| (self.duration - self.elapsed).max(0.0));

        if self.deceleration > 0.0 {
            let stop_time = speed / self.deceleration;
            let t = remaining.map_or(stop_time, |r| r.min(stop_time));
            speed * t - 0.5 * self.deceleration * t * t
        } else if let Some(remaining) = remaining {
            speed * remaining
        } else if speed > 0.0 {
            f32::INFINITY
        } else {
            0.0
        }
    }
}
