//! # Movement Input
//!
//! Client intent for server-authoritative entities.
//!
//! The owner client builds one [`EntityMovementInput`] per tick (the pending
//! input) and diffs it against the last input it actually sent. The diff is
//! the differential mask that leads the input message; fields that did not
//! change are left out of the wire payload.
//!
//! ```text
//! pending ──┐
//!           ├── diff ──► Some(mask) ──► input message ──► last_sent = pending
//! last_sent ┘        └─► None (nothing worth sending)
//! ```

use bitflags::bitflags;
use locomote_shared::{delta_angle, ExtraMovementState, MovementState, Spatial};

bitflags! {
    /// Differential mask leading every input message.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EntityMovementInputState: u8 {
        /// Position (direction or destination) is present.
        const POSITION_CHANGED = 1 << 0;
        /// Facing is present.
        const ROTATION_CHANGED = 1 << 1;
        /// Entity stopped; extra movement state is omitted.
        const IS_STOPPED = 1 << 2;
        /// Position carries a move direction rather than a destination.
        const IS_KEY_MOVEMENT = 1 << 3;
    }
}

/// One tick of client intent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityMovementInput<S: Spatial> {
    /// Movement flags, including one-shot jump/dash/teleport flags.
    pub movement_state: MovementState,
    /// Requested extra state.
    pub extra_movement_state: ExtraMovementState,
    /// Move direction when `is_key_movement`, otherwise the destination.
    pub position: S,
    /// Facing.
    pub facing: S::Facing,
    /// Position is a direction.
    pub is_key_movement: bool,
    /// Movement was stopped.
    pub is_stopped: bool,
}

impl<S: Spatial> EntityMovementInput<S> {
    /// Idle input at the given facing.
    #[must_use]
    pub fn idle(facing: S::Facing) -> Self {
        Self {
            movement_state: MovementState::empty(),
            extra_movement_state: ExtraMovementState::None,
            position: S::ZERO,
            facing,
            is_key_movement: false,
            is_stopped: false,
        }
    }

    /// Mask of what differs from `last`, or `None` if nothing is worth sending.
    ///
    /// With no previous input everything is considered changed.
    #[must_use]
    pub fn diff(
        &self,
        last: Option<&Self>,
        position_epsilon: f32,
        angle_epsilon: f32,
    ) -> Option<EntityMovementInputState> {
        let mut mask = EntityMovementInputState::empty();
        if self.is_key_movement {
            mask |= EntityMovementInputState::IS_KEY_MOVEMENT;
        }
        if self.is_stopped {
            mask |= EntityMovementInputState::IS_STOPPED;
        }

        let Some(last) = last else {
            return Some(
                mask | EntityMovementInputState::POSITION_CHANGED
                    | EntityMovementInputState::ROTATION_CHANGED,
            );
        };

        if self.is_key_movement != last.is_key_movement
            || (self.position - last.position).length() > position_epsilon
        {
            mask |= EntityMovementInputState::POSITION_CHANGED;
        }
        let turned = delta_angle(S::facing_angle(last.facing), S::facing_angle(self.facing));
        if turned.abs() > angle_epsilon {
            mask |= EntityMovementInputState::ROTATION_CHANGED;
        }

        let changed = mask.intersects(
            EntityMovementInputState::POSITION_CHANGED | EntityMovementInputState::ROTATION_CHANGED,
        ) || self.movement_state != last.movement_state
            || (!self.is_stopped && self.extra_movement_state != last.extra_movement_state)
            || (self.is_stopped && !last.is_stopped);

        changed.then_some(mask)
    }
}
