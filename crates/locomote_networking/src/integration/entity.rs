//! Stat-driven [`MovementEntity`] for servers without a richer entity model,
//! simulations and tests.

use locomote_shared::{EntityRole, ExtraMovementState, MovementCapabilities, MovementState};

use super::traits::MovementEntity;

/// Speed multipliers per extra movement state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedProfile {
    /// Regular gait speed.
    pub base: f32,
    /// Sprint multiplier.
    pub sprint: f32,
    /// Walk multiplier.
    pub walk: f32,
    /// Crouch multiplier.
    pub crouch: f32,
    /// Crawl multiplier.
    pub crawl: f32,
    /// Multiplier while under water.
    pub swim: f32,
    /// Multiplier while moving backward.
    pub backward: f32,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            base: 5.0,
            sprint: 1.6,
            walk: 0.5,
            crouch: 0.4,
            crawl: 0.25,
            swim: 0.6,
            backward: 0.75,
        }
    }
}

/// Entity whose role, capabilities and speeds are plain values.
#[derive(Clone, Debug, PartialEq)]
pub struct StatEntity {
    /// Role of this peer.
    pub role: EntityRole,
    /// Capabilities (mutate to simulate buffs/debuffs).
    pub capabilities: MovementCapabilities,
    /// Speeds.
    pub speed: SpeedProfile,
}

impl StatEntity {
    /// Creates an entity with default speeds and full capabilities.
    #[must_use]
    pub fn new(role: EntityRole) -> Self {
        Self {
            role,
            capabilities: MovementCapabilities::ALL,
            speed: SpeedProfile::default(),
        }
    }

    /// Overrides the base speed.
    #[must_use]
    pub fn with_base_speed(mut self, base: f32) -> Self {
        self.speed.base = base;
        self
    }
}

impl MovementEntity for StatEntity {
    fn role(&self) -> EntityRole {
        self.role
    }

    fn capabilities(&self) -> MovementCapabilities {
        self.capabilities
    }

    fn move_speed(&self, movement_state: MovementState, extra: ExtraMovementState) -> f32 {
        if !self.capabilities.can_move {
            return 0.0;
        }
        let gait = match extra {
            ExtraMovementState::None => 1.0,
            ExtraMovementState::IsSprinting => self.speed.sprint,
            ExtraMovementState::IsWalking => self.speed.walk,
            ExtraMovementState::IsCrouching => self.speed.crouch,
            ExtraMovementState::IsCrawling => self.speed.crawl,
        };
        let mut speed = self.speed.base * gait;
        if movement_state.contains(MovementState::IS_UNDER_WATER) {
            speed *= self.speed.swim;
        }
        if movement_state.contains(MovementState::BACKWARD) {
            speed *= self.speed.backward;
        }
        speed
    }
}
