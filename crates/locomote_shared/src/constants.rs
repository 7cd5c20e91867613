//! # Movement Protocol Constants
//!
//! Defaults for the tunables in [`crate::config::MovementConfig`] and the
//! fixed parameters of the wire format.
//!
//! **CRITICAL:** The wire constants are shared by client and server builds.
//! Changing them breaks compatibility with deployed peers.

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Maximum message size (MTU-safe)
pub const MAX_MESSAGE_SIZE: usize = 1200;

/// Forces carried by one server state message.
///
/// A force entry is at most 32 bytes, so 32 entries plus the state header
/// stay under [`MAX_MESSAGE_SIZE`].
pub const MAX_STATE_FORCES: usize = 32;

/// Angles travel as `round(degrees * ANGLE_COMPRESSION_SCALE)`.
pub const ANGLE_COMPRESSION_SCALE: f32 = 1000.0;

/// Peer timestamps are milliseconds.
pub const TIMESTAMP_TO_SECONDS: f32 = 0.001;

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Position error above which the receiver hard-sets its position.
pub const DEFAULT_SNAP_THRESHOLD: f32 = 5.0;

/// Blend factor applied per correction on the owner client.
pub const DEFAULT_SMOOTHING: f32 = 0.1;

/// Fraction of the remaining distance an observer covers per second.
pub const DEFAULT_REMOTE_SMOOTHING_RATE: f32 = 10.0;

/// Position errors below this are ignored.
pub const DEFAULT_CORRECTION_EPSILON: f32 = 0.01;

// =============================================================================
// ANTI-CHEAT
// =============================================================================

/// Excess movement, measured in seconds of travel, tolerated before correction.
pub const DEFAULT_EXCESS_TIME_TOLERANCE: f32 = 0.1;

/// Floor for the distance a client may move in one message.
pub const MIN_MOVEABLE_DISTANCE: f32 = 0.001;

// =============================================================================
// LOCOMOTION
// =============================================================================

/// Standard gravity (units per second squared).
pub const DEFAULT_GRAVITY: f32 = 9.81;

/// Mailbox capacity per entity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;
