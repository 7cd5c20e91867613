//! # Movement Backends
//!
//! One contract, three locomotion implementations.
//!
//! ```text
//!                 ┌───────────────────────────┐
//!                 │ trait MovementBackend     │  commands, tick, read/write
//!                 │   └─ MovementSync         │  shared state + protocol
//!                 └─────────────┬─────────────┘
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!  CapsuleMovement      NavAgentMovement     RigidBody2DMovement
//!  (CharacterPhysics)   (NavigationMesh)     (kinematic 2D body)
//! ```
//!
//! A backend owns a [`MovementSync`] and supplies only locomotion and the
//! capability queries; every other operation is provided by the trait.

pub mod capsule;
pub mod nav;
pub mod rigidbody2d;
pub mod sync;

pub use capsule::{CapsuleMove, CapsuleMovement, CharacterPhysics, FlatGround};
pub use nav::{NavAgentMovement, NavPath, NavPathStatus, NavigationMesh, OpenNavMesh};
pub use rigidbody2d::RigidBody2DMovement;
pub use sync::{MoveIntent, MovementSync, ReadOutcome, RemoteCommand, StepOutcome, TickPlan};

use locomote_security::DriftReport;
use locomote_shared::{Bounds, ExtraMovementState, MovementState, Spatial};

use crate::force::{ForceApplierSet, ForceApplyMode, ForceSource, ForceUpdateListener};
use crate::integration::MovementEntity;
use crate::protocol::{CodecResult, OutboundMessage, WireSpatial};
use crate::teleport::TeleportConfirmWaiter;

/// Networked movement of one entity.
pub trait MovementBackend {
    /// Position type (3D or 2D).
    type Position: WireSpatial;
    /// The moved entity.
    type Entity: MovementEntity;

    /// Shared sync state.
    fn sync(&self) -> &MovementSync<Self::Position, Self::Entity>;

    /// Shared sync state, mutably.
    fn sync_mut(&mut self) -> &mut MovementSync<Self::Position, Self::Entity>;

    /// Moves the body according to `plan` and reports the result.
    fn locomote(&mut self, plan: &TickPlan<Self::Position>) -> StepOutcome<Self::Position>;

    /// Nearest valid resting position below or around `from`.
    fn find_grounded_position(&self, from: Self::Position) -> Self::Position;

    /// Current collision bounds.
    fn movement_bounds(&self) -> Bounds<Self::Position>;

    /// Backend-level jump gate.
    fn allow_to_jump(&self) -> bool;

    /// Backend-level dash gate.
    fn allow_to_dash(&self) -> bool;

    /// Backend-level crouch gate.
    fn allow_to_crouch(&self) -> bool;

    /// Backend-level crawl gate.
    fn allow_to_crawl(&self) -> bool;

    /// Runs at the start of every tick.
    fn before_tick(&mut self) {}

    /// Runs after a teleport was applied on this peer.
    fn on_teleported(&mut self) {}

    /// Advances the entity by `delta_time` seconds.
    fn tick(&mut self, delta_time: f32) {
        self.before_tick();
        if !self.sync().can_predict_movement() {
            self.sync_mut().advance_passive(delta_time);
            return;
        }

        let allow_dash = self.allow_to_dash();
        let mut plan = self.sync_mut().begin_tick(delta_time, allow_dash);
        plan.jump &= self.allow_to_jump();
        let outcome = self.locomote(&plan);
        let (allow_crouch, allow_crawl) = (self.allow_to_crouch(), self.allow_to_crawl());
        self.sync_mut().finish_tick(outcome, allow_crouch, allow_crawl);
    }

    /// Directional input.
    fn key_movement(&mut self, direction: Self::Position, movement_state: MovementState) -> bool {
        self.sync_mut().request_key_movement(direction, movement_state)
    }

    /// Moves toward `target`. Backends without pathfinding go straight there.
    fn point_click_movement(&mut self, target: Self::Position) -> bool {
        let sync = self.sync_mut();
        if !sync.can_predict_movement() || !sync.entity().capabilities().can_move {
            return false;
        }
        sync.set_path(target, [target]);
        true
    }

    /// Stages an extra movement state.
    fn set_extra_movement_state(&mut self, requested: ExtraMovementState) {
        self.sync_mut().set_extra_movement_state(requested);
    }

    /// Pins the facing.
    fn set_look_rotation(&mut self, facing: <Self::Position as Spatial>::Facing) {
        self.sync_mut().set_look_rotation(facing);
    }

    /// Clears movement intent.
    fn stop_move(&mut self) {
        self.sync_mut().stop_move();
    }

    /// Server-only: adds a force.
    #[allow(clippy::too_many_arguments)]
    fn apply_force(
        &mut self,
        mode: ForceApplyMode,
        direction: Self::Position,
        source: ForceSource,
        speed: f32,
        deceleration: f32,
        duration: f32,
    ) -> bool {
        self.sync_mut()
            .apply_force(mode, direction, source, speed, deceleration, duration)
    }

    /// Server-only: removes every force.
    fn clear_all_forces(&mut self) -> bool {
        self.sync_mut().clear_all_forces()
    }

    /// Server-only: grounds `position`, warps there and raises the teleport
    /// handshake.
    fn teleport(
        &mut self,
        position: Self::Position,
        facing: <Self::Position as Spatial>::Facing,
        still_move_after_teleport: bool,
    ) -> bool {
        let grounded = self.find_grounded_position(position);
        if !self.sync_mut().teleport(grounded, facing, still_move_after_teleport) {
            return false;
        }
        self.on_teleported();
        true
    }

    /// Owner client: outbound message for this tick, if any.
    fn write_client_state(&mut self, timestamp: u32) -> Option<OutboundMessage> {
        self.sync_mut().write_client_state(timestamp)
    }

    /// Server: outbound state message.
    fn write_server_state(&mut self, timestamp: u32) -> Option<OutboundMessage> {
        self.sync_mut().write_server_state(timestamp)
    }

    /// Server: applies a message from the entity's owner client.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::protocol::CodecError`] for malformed payloads.
    fn read_client_state_at_server(&mut self, timestamp: u32, payload: &[u8]) -> CodecResult<ReadOutcome> {
        let (outcome, command) = self.sync_mut().read_client_state(timestamp, payload)?;
        match command {
            Some(RemoteCommand::PointClick(target)) => {
                self.point_click_movement(target);
            }
            Some(RemoteCommand::Correct { position, facing }) => {
                self.teleport(position, facing, false);
            }
            None => {}
        }
        Ok(outcome)
    }

    /// Client: applies a server state message.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::protocol::CodecError`] for malformed payloads.
    fn read_server_state_at_client(&mut self, timestamp: u32, payload: &[u8]) -> CodecResult<ReadOutcome> {
        let outcome = self.sync_mut().read_server_state(timestamp, payload)?;
        if outcome == ReadOutcome::Teleported {
            self.on_teleported();
        }
        Ok(outcome)
    }

    /// Whether this peer simulates the entity from input.
    fn can_predict_movement(&self) -> bool {
        self.sync().can_predict_movement()
    }

    /// Current position.
    fn position(&self) -> Self::Position {
        self.sync().position()
    }

    /// Current facing.
    fn facing(&self) -> <Self::Position as Spatial>::Facing {
        self.sync().facing()
    }

    /// Movement flags.
    fn movement_state(&self) -> MovementState {
        self.sync().movement_state()
    }

    /// Validated extra state.
    fn extra_movement_state(&self) -> ExtraMovementState {
        self.sync().extra_movement_state()
    }

    /// Active forces.
    fn forces(&self) -> &ForceApplierSet {
        self.sync().forces()
    }

    /// Drift telemetry.
    fn drift_report(&self) -> DriftReport {
        self.sync().drift_report()
    }

    /// Awaitable handle on the server's teleport wait.
    fn teleport_confirm_waiter(&self) -> TeleportConfirmWaiter {
        self.sync().teleport_confirm_waiter()
    }

    /// Registers a force listener.
    fn add_force_listener(&mut self, listener: Box<dyn ForceUpdateListener>) {
        self.sync_mut().add_force_listener(listener);
    }

    /// Ends the entity's lifetime.
    fn mark_destroyed(&mut self) {
        self.sync_mut().mark_destroyed();
    }
}
