//! # Capsule Backend
//!
//! Character-controller locomotion: a vertical capsule moved through a
//! [`CharacterPhysics`] world with gravity, jumping and water.
//!
//! ```text
//! TickPlan ─► jump? vy = √(2gh) ─► gravity ─► move_capsule(motion) ─► StepOutcome
//!                                               │
//!                                      grounded / under water / climbing
//! ```

use locomote_shared::{Bounds, CapsuleConfig, MovementConfig, MovementSecure, Vec3};

use super::sync::{MovementSync, StepOutcome, TickPlan};
use super::MovementBackend;
use crate::integration::MovementEntity;

/// Contact tolerance for ground checks.
const GROUND_SKIN: f32 = 0.01;

/// Result of a capsule sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleMove {
    /// Final capsule base position.
    pub position: Vec3,
    /// The capsule ended on ground.
    pub grounded: bool,
}

/// Collision world for capsule characters.
pub trait CharacterPhysics {
    /// Sweeps the capsule by `motion`, resolving collisions.
    fn move_capsule(&mut self, from: Vec3, motion: Vec3, capsule: &CapsuleConfig) -> CapsuleMove;

    /// Ground height within `max_distance` below `position`.
    fn ground_height(&self, position: Vec3, max_distance: f32) -> Option<f32>;

    /// True if `position` is submerged.
    fn is_under_water(&self, position: Vec3) -> bool;

    /// True if `position` touches a climbable surface.
    fn is_climbing(&self, position: Vec3) -> bool {
        let _ = position;
        false
    }
}

/// Infinite horizontal plane with optional water surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatGround {
    /// Ground height.
    pub height: f32,
    /// Water surface height; below it the capsule swims.
    pub water_level: Option<f32>,
}

impl FlatGround {
    /// Dry ground at `height`.
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self {
            height,
            water_level: None,
        }
    }

    /// Adds a water surface.
    #[must_use]
    pub const fn with_water(mut self, level: f32) -> Self {
        self.water_level = Some(level);
        self
    }
}

impl CharacterPhysics for FlatGround {
    fn move_capsule(&mut self, from: Vec3, motion: Vec3, _capsule: &CapsuleConfig) -> CapsuleMove {
        let mut position = from + motion;
        let grounded = position.y <= self.height + GROUND_SKIN;
        if grounded {
            position.y = self.height;
        }
        CapsuleMove { position, grounded }
    }

    fn ground_height(&self, position: Vec3, max_distance: f32) -> Option<f32> {
        (position.y - self.height <= max_distance).then_some(self.height)
    }

    fn is_under_water(&self, position: Vec3) -> bool {
        self.water_level.is_some_and(|level| position.y < level)
    }
}

/// Capsule character movement.
pub struct CapsuleMovement<E: MovementEntity, P: CharacterPhysics = FlatGround> {
    sync: MovementSync<Vec3, E>,
    physics: P,
    vertical_velocity: f32,
    grounded: bool,
    under_water: bool,
    climbing: bool,
}

impl<E: MovementEntity, P: CharacterPhysics> CapsuleMovement<E, P> {
    /// Creates a capsule at `position`.
    #[must_use]
    pub fn new(entity: E, secure: MovementSecure, config: MovementConfig, physics: P, position: Vec3) -> Self {
        let grounded = physics.ground_height(position, GROUND_SKIN).is_some();
        let under_water = physics.is_under_water(position);
        Self {
            sync: MovementSync::new(entity, secure, config, position),
            physics,
            vertical_velocity: 0.0,
            grounded,
            under_water,
            climbing: false,
        }
    }

    /// The collision world.
    #[must_use]
    pub const fn physics(&self) -> &P {
        &self.physics
    }

    /// The collision world, mutably.
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// Current vertical speed (positive is up).
    #[must_use]
    pub const fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    /// Ended the last tick on ground.
    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.grounded
    }
}

impl<E: MovementEntity, P: CharacterPhysics> MovementBackend for CapsuleMovement<E, P> {
    type Position = Vec3;
    type Entity = E;

    fn sync(&self) -> &MovementSync<Vec3, E> {
        &self.sync
    }

    fn sync_mut(&mut self) -> &mut MovementSync<Vec3, E> {
        &mut self.sync
    }

    fn locomote(&mut self, plan: &TickPlan<Vec3>) -> StepOutcome<Vec3> {
        let config = self.sync.config();
        let gravity = config.gravity;
        let jump_height = config.jump_height;
        let capsule = config.capsule;
        let delta_time = plan.delta_time;

        let jumped = plan.jump && self.grounded;
        if jumped {
            self.vertical_velocity = (2.0 * gravity * jump_height).sqrt();
        }

        if self.under_water && !jumped {
            // buoyancy cancels gravity
            self.vertical_velocity = 0.0;
        } else if self.grounded && !jumped {
            self.vertical_velocity = 0.0;
        } else {
            self.vertical_velocity -= gravity * delta_time;
        }

        let mut motion = plan.total_velocity() * delta_time;
        if plan.replace_movement.is_none() {
            motion.y += self.vertical_velocity * delta_time;
        }

        let result = self.physics.move_capsule(self.sync.position(), motion, &capsule);
        if result.grounded && self.vertical_velocity < 0.0 {
            self.vertical_velocity = 0.0;
        }
        self.grounded = result.grounded;
        self.under_water = self.physics.is_under_water(result.position);
        self.climbing = self.physics.is_climbing(result.position);

        StepOutcome {
            position: result.position,
            grounded: self.grounded,
            under_water: self.under_water,
            climbing: self.climbing,
            jumped,
        }
    }

    fn find_grounded_position(&self, from: Vec3) -> Vec3 {
        self.physics
            .ground_height(from, self.sync.config().ground_check_distance)
            .map_or(from, |height| from.with_y(height))
    }

    fn movement_bounds(&self) -> Bounds<Vec3> {
        let capsule = self.sync.config().capsule;
        let half_height = capsule.height * 0.5;
        Bounds::from_center(
            self.sync.position() + Vec3::Y * half_height,
            Vec3::new(capsule.radius, half_height, capsule.radius),
        )
    }

    fn allow_to_jump(&self) -> bool {
        self.grounded && !self.under_water && !self.climbing
    }

    fn allow_to_dash(&self) -> bool {
        true
    }

    fn allow_to_crouch(&self) -> bool {
        self.grounded && !self.under_water
    }

    fn allow_to_crawl(&self) -> bool {
        self.grounded && !self.under_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::StatEntity;
    use locomote_shared::{EntityRole, ExtraMovementState, MovementState};

    fn server_capsule(ground: FlatGround) -> CapsuleMovement<StatEntity> {
        CapsuleMovement::new(
            StatEntity::new(EntityRole::SERVER_OWNED),
            MovementSecure::ServerAuthoritative,
            MovementConfig::default(),
            ground,
            Vec3::ZERO,
        )
    }

    #[test]
    fn test_key_movement_moves_forward() {
        let mut capsule = server_capsule(FlatGround::new(0.0));
        assert!(capsule.key_movement(Vec3::Z, MovementState::FORWARD));
        for _ in 0..10 {
            capsule.tick(0.1);
        }
        let position = capsule.position();
        assert!((position.z - 5.0).abs() < 1e-3, "z = {}", position.z);
        assert!(position.y.abs() < 1e-5);
        assert!(capsule.movement_state().contains(MovementState::FORWARD | MovementState::IS_GROUNDED));
    }

    #[test]
    fn test_jump_leaves_ground_and_lands() {
        let mut capsule = server_capsule(FlatGround::new(0.0));
        capsule.key_movement(Vec3::ZERO, MovementState::IS_JUMP);
        capsule.tick(0.1);
        assert!(capsule.position().y > 0.0);
        assert!(!capsule.is_grounded());

        for _ in 0..30 {
            capsule.tick(0.1);
        }
        assert!(capsule.is_grounded());
        assert!(capsule.position().y.abs() < 1e-5);
    }

    #[test]
    fn test_find_grounded_position() {
        let capsule = server_capsule(FlatGround::new(2.0));
        let grounded = capsule.find_grounded_position(Vec3::new(1.0, 10.0, 3.0));
        assert_eq!(grounded, Vec3::new(1.0, 2.0, 3.0));

        // out of probe range
        let far = Vec3::new(0.0, 50.0, 0.0);
        assert_eq!(capsule.find_grounded_position(far), far);
    }

    #[test]
    fn test_under_water_blocks_jump_and_crouch() {
        let mut capsule = server_capsule(FlatGround::new(0.0).with_water(5.0));
        capsule.set_extra_movement_state(ExtraMovementState::IsCrouching);
        capsule.tick(0.1);
        assert!(capsule.movement_state().contains(MovementState::IS_UNDER_WATER));
        assert!(!capsule.allow_to_jump());
        assert_eq!(capsule.extra_movement_state(), ExtraMovementState::None);
    }

    #[test]
    fn test_bounds_centered_on_capsule() {
        let capsule = server_capsule(FlatGround::new(0.0));
        let bounds = capsule.movement_bounds();
        assert_eq!(bounds.center(), Vec3::new(0.0, 1.0, 0.0));
        assert!((bounds.max.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_observer_cannot_key_move() {
        let mut capsule = CapsuleMovement::new(
            StatEntity::new(EntityRole::OBSERVER_CLIENT),
            MovementSecure::ServerAuthoritative,
            MovementConfig::default(),
            FlatGround::new(0.0),
            Vec3::ZERO,
        );
        assert!(!capsule.key_movement(Vec3::Z, MovementState::FORWARD));
        capsule.tick(0.1);
        assert_eq!(capsule.position(), Vec3::ZERO);
    }
}
