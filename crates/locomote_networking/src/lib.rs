//! # LOCOMOTE Networking - Movement Synchronization
//!
//! Keeps a moving entity consistent between an authoritative server, the
//! client that owns it, and every client that observes it.
//!
//! ## Architecture
//!
//! - **Backends**: capsule, nav agent and 2D rigid body locomotion over one
//!   shared sync engine
//! - **Forces**: decaying velocity impulses, replicated with server state
//! - **Protocol**: differential input messages and full state messages,
//!   3D and 2D, under 1200 bytes
//! - **Reconciliation**: owner blending, observer smoothing, snapping
//! - **Teleport**: two-way handshake with an awaitable confirmation
//! - **Mailbox**: lock-free inbound queue per entity
//!
//! ## Authority Model
//!
//! ```text
//! ServerAuthoritative                     NotSecure
//! OWNER            SERVER                 OWNER            SERVER
//!   |--- input ------>| simulates           | simulates      |
//!   |<-- state -------|                     |--- state ------>| drift check
//!   | reconciles      |                     |<-- teleport ----| (on overshoot)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use locomote_networking::{CapsuleMovement, FlatGround, MovementBackend, StatEntity};
//! use locomote_shared::{EntityRole, MovementConfig, MovementSecure, MovementState, Vec3};
//!
//! let mut server = CapsuleMovement::new(
//!     StatEntity::new(EntityRole::SERVER_OWNED),
//!     MovementSecure::ServerAuthoritative,
//!     MovementConfig::default(),
//!     FlatGround::new(0.0),
//!     Vec3::ZERO,
//! );
//! server.key_movement(Vec3::Z, MovementState::FORWARD);
//! server.tick(1.0 / 30.0);
//! let message = server.write_server_state(33);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod force;
pub mod input;
pub mod integration;
pub mod mailbox;
pub mod protocol;
pub mod reconciliation;
pub mod simulation;
pub mod teleport;

// Re-exports for convenience
pub use backend::{
    CapsuleMovement, CharacterPhysics, FlatGround, MoveIntent, MovementBackend, MovementSync,
    NavAgentMovement, NavigationMesh, OpenNavMesh, ReadOutcome, RigidBody2DMovement, StepOutcome,
    TickPlan,
};
pub use force::{ForceApplier, ForceApplierSet, ForceApplyMode, ForceSource, ForceSourceType};
pub use input::{EntityMovementInput, EntityMovementInputState};
pub use integration::{MovementEntity, StatEntity};
pub use mailbox::{InboundMessage, MailboxError, MailboxSender, MovementMailbox};
pub use protocol::{CodecError, InputMessage, MessageKind, OutboundMessage, StateMessage};
pub use reconciliation::{ReconciliationResult, Reconciler};
pub use simulation::{MovementSoak, NetworkConditions, SoakConfig};
pub use teleport::{TeleportConfirmWaiter, TeleportHandshake};

/// Default state-message rate (messages per second).
///
/// At 30Hz, each tick is ~33.3ms.
pub const DEFAULT_SEND_RATE: u32 = 30;

/// Maximum message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = locomote_shared::MAX_MESSAGE_SIZE;
