//! # Integration Traits
//!
//! Traits the entity framework implements to plug into movement sync.
//!
//! ## Architecture
//!
//! The movement core does not know about the surrounding entity/component
//! framework. It defines the collaborator interface here and the framework
//! implements it.
//!
//! ```text
//! locomote defines:          entity framework implements:
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │ trait MovementEntity │ ← │ impl MovementEntity  │
//! └──────────────────────┘   └──────────────────────┘
//! ```

use locomote_shared::{EntityRole, ExtraMovementState, MovementCapabilities, MovementState};

/// The entity a movement backend moves.
///
/// Read every tick: capabilities and speed may change with buffs, terrain
/// or equipment.
pub trait MovementEntity {
    /// This peer's relation to the entity.
    fn role(&self) -> EntityRole;

    /// Current capability snapshot.
    fn capabilities(&self) -> MovementCapabilities;

    /// Move speed (units per second) for the given state.
    fn move_speed(&self, movement_state: MovementState, extra: ExtraMovementState) -> f32;
}

impl<T: MovementEntity + ?Sized> MovementEntity for Box<T> {
    fn role(&self) -> EntityRole {
        (**self).role()
    }

    fn capabilities(&self) -> MovementCapabilities {
        (**self).capabilities()
    }

    fn move_speed(&self, movement_state: MovementState, extra: ExtraMovementState) -> f32 {
        (**self).move_speed(movement_state, extra)
    }
}
