//! # 2D Rigid Body Backend
//!
//! Kinematic top-down body on the XY plane. No gravity, no vertical
//! states; the body is always considered grounded.

use locomote_shared::{Bounds, MovementConfig, MovementSecure, Vec2};

use super::sync::{MovementSync, StepOutcome, TickPlan};
use super::MovementBackend;
use crate::integration::MovementEntity;

/// 2D rigid body movement.
pub struct RigidBody2DMovement<E: MovementEntity> {
    sync: MovementSync<Vec2, E>,
    velocity: Vec2,
}

impl<E: MovementEntity> RigidBody2DMovement<E> {
    /// Creates a body at `position`.
    #[must_use]
    pub fn new(entity: E, secure: MovementSecure, config: MovementConfig, position: Vec2) -> Self {
        Self {
            sync: MovementSync::new(entity, secure, config, position),
            velocity: Vec2::ZERO,
        }
    }

    /// Velocity applied in the last tick.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

impl<E: MovementEntity> MovementBackend for RigidBody2DMovement<E> {
    type Position = Vec2;
    type Entity = E;

    fn sync(&self) -> &MovementSync<Vec2, E> {
        &self.sync
    }

    fn sync_mut(&mut self) -> &mut MovementSync<Vec2, E> {
        &mut self.sync
    }

    fn locomote(&mut self, plan: &TickPlan<Vec2>) -> StepOutcome<Vec2> {
        self.velocity = plan.total_velocity();
        StepOutcome::grounded_at(self.sync.position() + self.velocity * plan.delta_time)
    }

    fn find_grounded_position(&self, from: Vec2) -> Vec2 {
        from
    }

    fn movement_bounds(&self) -> Bounds<Vec2> {
        let [width, height] = self.sync.config().body_2d.size;
        Bounds::from_center(self.sync.position(), Vec2::new(width * 0.5, height * 0.5))
    }

    fn allow_to_jump(&self) -> bool {
        false
    }

    fn allow_to_dash(&self) -> bool {
        true
    }

    fn allow_to_crouch(&self) -> bool {
        false
    }

    fn allow_to_crawl(&self) -> bool {
        false
    }
}
