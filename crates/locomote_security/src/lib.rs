//! # LOCOMOTE Security - Drift Validation
//!
//! Server-side checks on movement claimed by clients that simulate their own
//! entities.
//!
//! ## Components
//!
//! - **Anti-Cheat**: allowed-distance budget per message, accumulated drift
//!   telemetry, corrective positions
//!
//! ## Security Model
//!
//! ```text
//! OWNER CLIENT                      SERVER
//!   |                                 |
//!   |--- State: "I am at P" --------->|
//!   |                                 | <- DriftTracker::validate
//!   |<-- Teleport: "You are at P'" ---|    (only when overshooting)
//!   |                                 |
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod anti_cheat;

pub use anti_cheat::{DriftPolicy, DriftReport, DriftTracker, PositionVerdict};
