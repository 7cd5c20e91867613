//! # Movement State Model
//!
//! Flags and enums that describe what an entity is doing, who is allowed to
//! simulate it, and which extra movement state it may currently hold.
//!
//! ```text
//! MovementState (u32 bit set)          ExtraMovementState (exclusive u8)
//! ┌─────────────────────────────┐      ┌──────────────┐
//! │ FORWARD BACKWARD LEFT RIGHT │      │ None         │
//! │ UP DOWN                     │      │ IsSprinting  │
//! │ IS_GROUNDED IS_UNDER_WATER  │ ───► │ IsWalking    │  validated every tick
//! │ IS_CLIMBING                 │      │ IsCrouching  │
//! │ IS_JUMP IS_DASH IS_TELEPORT │      │ IsCrawling   │
//! └─────────────────────────────┘      └──────────────┘
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// What an entity is doing this tick.
    ///
    /// Directional flags combine for diagonal movement. `IS_JUMP`, `IS_DASH`
    /// and `IS_TELEPORT` are one-shot: they ride exactly one outbound message.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MovementState: u32 {
        /// Moving forward.
        const FORWARD = 1 << 0;
        /// Moving backward.
        const BACKWARD = 1 << 1;
        /// Strafing left.
        const LEFT = 1 << 2;
        /// Strafing right.
        const RIGHT = 1 << 3;
        /// Moving up (climbing, swimming).
        const UP = 1 << 4;
        /// Moving down (climbing, swimming).
        const DOWN = 1 << 5;
        /// Standing on ground.
        const IS_GROUNDED = 1 << 6;
        /// Submerged.
        const IS_UNDER_WATER = 1 << 7;
        /// Jumped this tick.
        const IS_JUMP = 1 << 8;
        /// Dash started this tick.
        const IS_DASH = 1 << 9;
        /// Position was warped.
        const IS_TELEPORT = 1 << 10;
        /// Attached to a climbable surface.
        const IS_CLIMBING = 1 << 11;

        /// Every directional flag.
        const DIRECTIONS = Self::FORWARD.bits()
            | Self::BACKWARD.bits()
            | Self::LEFT.bits()
            | Self::RIGHT.bits()
            | Self::UP.bits()
            | Self::DOWN.bits();
        /// Flags cleared after a single outbound message.
        const TRANSIENT = Self::IS_JUMP.bits() | Self::IS_DASH.bits() | Self::IS_TELEPORT.bits();
    }
}

impl MovementState {
    /// True if any directional flag is set.
    #[inline]
    #[must_use]
    pub const fn has_direction_movement(self) -> bool {
        self.intersects(Self::DIRECTIONS)
    }

    /// Directional flags only.
    #[inline]
    #[must_use]
    pub const fn directions(self) -> Self {
        self.intersection(Self::DIRECTIONS)
    }
}

/// Exclusive posture/gait modifier.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraMovementState {
    /// Regular gait.
    #[default]
    None = 0,
    /// Sprinting.
    IsSprinting = 1,
    /// Walking (slower than the regular gait).
    IsWalking = 2,
    /// Crouching.
    IsCrouching = 3,
    /// Crawling.
    IsCrawling = 4,
}

impl ExtraMovementState {
    /// Decodes a wire value. Unknown values map to `None`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::IsSprinting,
            2 => Self::IsWalking,
            3 => Self::IsCrouching,
            4 => Self::IsCrawling,
            _ => Self::None,
        }
    }

    /// Wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Which peer is authoritative for an entity's position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementSecure {
    /// Owner client simulates; the server validates and relays.
    NotSecure,
    /// Client sends input only; the server simulates.
    #[default]
    ServerAuthoritative,
}

/// This peer's relation to an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityRole {
    /// This peer runs the server.
    pub is_server: bool,
    /// This peer runs a client.
    pub is_client: bool,
    /// This peer is the client that owns the entity.
    pub is_owner_client: bool,
    /// The entity has no client owner (NPC or host-local player).
    pub is_owned_by_server: bool,
}

impl EntityRole {
    /// Server view of an entity owned by a remote client.
    pub const SERVER_REMOTE_OWNER: Self = Self {
        is_server: true,
        is_client: false,
        is_owner_client: false,
        is_owned_by_server: false,
    };

    /// Server view of a server-owned entity.
    pub const SERVER_OWNED: Self = Self {
        is_server: true,
        is_client: false,
        is_owner_client: false,
        is_owned_by_server: true,
    };

    /// The owning client's view.
    pub const OWNER_CLIENT: Self = Self {
        is_server: false,
        is_client: true,
        is_owner_client: true,
        is_owned_by_server: false,
    };

    /// Any other client's view.
    pub const OBSERVER_CLIENT: Self = Self {
        is_server: false,
        is_client: true,
        is_owner_client: false,
        is_owned_by_server: false,
    };

    /// Owner client, or the server for a server-owned entity.
    #[inline]
    #[must_use]
    pub const fn is_owner_client_or_owned_by_server(self) -> bool {
        self.is_owner_client || (self.is_server && self.is_owned_by_server)
    }

    /// Server holding an entity whose owner is a different peer.
    #[inline]
    #[must_use]
    pub const fn has_remote_owner(self) -> bool {
        self.is_server && !self.is_owner_client && !self.is_owned_by_server
    }
}

/// Capability snapshot read from the entity every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MovementCapabilities {
    /// Entity may move at all.
    pub can_move: bool,
    /// Entity may sprint.
    pub can_sprint: bool,
    /// Sprinting while strafing.
    pub can_side_sprint: bool,
    /// Sprinting while moving backward.
    pub can_backward_sprint: bool,
    /// Entity may walk.
    pub can_walk: bool,
    /// Entity may crouch.
    pub can_crouch: bool,
    /// Entity may crawl.
    pub can_crawl: bool,
    /// Entity may jump.
    pub can_jump: bool,
    /// Entity may dash.
    pub can_dash: bool,
    /// Entity may change facing.
    pub can_turn: bool,
}

impl MovementCapabilities {
    /// Everything allowed.
    pub const ALL: Self = Self {
        can_move: true,
        can_sprint: true,
        can_side_sprint: true,
        can_backward_sprint: true,
        can_walk: true,
        can_crouch: true,
        can_crawl: true,
        can_jump: true,
        can_dash: true,
        can_turn: true,
    };

    /// Nothing allowed (stunned, rooted).
    pub const NONE: Self = Self {
        can_move: false,
        can_sprint: false,
        can_side_sprint: false,
        can_backward_sprint: false,
        can_walk: false,
        can_crouch: false,
        can_crawl: false,
        can_jump: false,
        can_dash: false,
        can_turn: false,
    };
}

impl Default for MovementCapabilities {
    fn default() -> Self {
        Self::ALL
    }
}

/// Collapses a requested extra state to what the entity may hold this tick.
///
/// Never fails: a denied request downgrades to [`ExtraMovementState::None`].
#[must_use]
pub fn validate_extra_movement_state(
    capabilities: &MovementCapabilities,
    movement_state: MovementState,
    requested: ExtraMovementState,
) -> ExtraMovementState {
    if movement_state.intersects(MovementState::IS_UNDER_WATER | MovementState::IS_CLIMBING) {
        return ExtraMovementState::None;
    }

    let moving = movement_state.has_direction_movement();
    let allowed = match requested {
        ExtraMovementState::None => false,
        ExtraMovementState::IsSprinting => {
            let strafing = movement_state.intersects(MovementState::LEFT | MovementState::RIGHT);
            let backward = movement_state.contains(MovementState::BACKWARD);
            moving
                && capabilities.can_move
                && capabilities.can_sprint
                && (!strafing || capabilities.can_side_sprint)
                && (!backward || capabilities.can_backward_sprint)
        }
        ExtraMovementState::IsWalking => moving && capabilities.can_walk,
        ExtraMovementState::IsCrouching => capabilities.can_crouch,
        ExtraMovementState::IsCrawling => capabilities.can_crawl,
    };

    if allowed {
        requested
    } else {
        ExtraMovementState::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_EXTRA: [ExtraMovementState; 5] = [
        ExtraMovementState::None,
        ExtraMovementState::IsSprinting,
        ExtraMovementState::IsWalking,
        ExtraMovementState::IsCrouching,
        ExtraMovementState::IsCrawling,
    ];

    #[test]
    fn test_under_water_collapses_everything() {
        let state = MovementState::FORWARD | MovementState::IS_UNDER_WATER;
        for requested in ALL_EXTRA {
            assert_eq!(
                validate_extra_movement_state(&MovementCapabilities::ALL, state, requested),
                ExtraMovementState::None
            );
        }
    }

    #[test]
    fn test_climbing_collapses_everything() {
        let state = MovementState::UP | MovementState::IS_CLIMBING;
        for requested in ALL_EXTRA {
            assert_eq!(
                validate_extra_movement_state(&MovementCapabilities::ALL, state, requested),
                ExtraMovementState::None
            );
        }
    }

    #[test]
    fn test_sprint_requires_direction() {
        let caps = MovementCapabilities::ALL;
        assert_eq!(
            validate_extra_movement_state(&caps, MovementState::IS_GROUNDED, ExtraMovementState::IsSprinting),
            ExtraMovementState::None
        );
        assert_eq!(
            validate_extra_movement_state(&caps, MovementState::FORWARD, ExtraMovementState::IsSprinting),
            ExtraMovementState::IsSprinting
        );
    }

    #[test]
    fn test_side_and_backward_sprint_capabilities() {
        let caps = MovementCapabilities {
            can_side_sprint: false,
            can_backward_sprint: false,
            ..MovementCapabilities::ALL
        };
        let strafe = MovementState::FORWARD | MovementState::LEFT;
        assert_eq!(
            validate_extra_movement_state(&caps, strafe, ExtraMovementState::IsSprinting),
            ExtraMovementState::None
        );
        assert_eq!(
            validate_extra_movement_state(&caps, MovementState::BACKWARD, ExtraMovementState::IsSprinting),
            ExtraMovementState::None
        );
    }

    #[test]
    fn test_rooted_entity_cannot_sprint() {
        let caps = MovementCapabilities {
            can_move: false,
            ..MovementCapabilities::ALL
        };
        assert_eq!(
            validate_extra_movement_state(&caps, MovementState::FORWARD, ExtraMovementState::IsSprinting),
            ExtraMovementState::None
        );
    }

    #[test]
    fn test_crouch_does_not_need_direction() {
        let caps = MovementCapabilities::ALL;
        assert_eq!(
            validate_extra_movement_state(&caps, MovementState::empty(), ExtraMovementState::IsCrouching),
            ExtraMovementState::IsCrouching
        );
        let no_crawl = MovementCapabilities {
            can_crawl: false,
            ..caps
        };
        assert_eq!(
            validate_extra_movement_state(&no_crawl, MovementState::empty(), ExtraMovementState::IsCrawling),
            ExtraMovementState::None
        );
    }

    #[test]
    fn test_unknown_wire_value_is_none() {
        assert_eq!(ExtraMovementState::from_u8(200), ExtraMovementState::None);
        assert_eq!(ExtraMovementState::from_u8(3), ExtraMovementState::IsCrouching);
    }

    #[test]
    fn test_role_predicates() {
        assert!(EntityRole::SERVER_REMOTE_OWNER.has_remote_owner());
        assert!(!EntityRole::SERVER_OWNED.has_remote_owner());
        assert!(EntityRole::SERVER_OWNED.is_owner_client_or_owned_by_server());
        assert!(EntityRole::OWNER_CLIENT.is_owner_client_or_owned_by_server());
        assert!(!EntityRole::OBSERVER_CLIENT.is_owner_client_or_owned_by_server());
    }
}
