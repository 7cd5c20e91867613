//! # Forces
//!
//! Transient velocity impulses (knockback, dash, pulls) applied on top of or
//! instead of regular movement.
//!
//! ```text
//!  speed
//!    │╲
//!    │ ╲  current_speed -= deceleration * dt
//!    │  ╲
//!    │   ╲____ removed at 0 (or when elapsed reaches duration)
//!    └────────────────── t
//! ```
//!
//! Additive forces are summed into `force_motion`. Replace-movement forces
//! (including dash) take over directional movement; only one may be active.

pub mod applier;
pub mod set;

pub use applier::{ForceApplier, ForceApplyMode, ForceSource, ForceSourceType};
pub use set::{ForceApplierSet, ForceUpdate, ForceUpdateListener};
