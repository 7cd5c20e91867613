//! # Integration
//!
//! Connection points to the surrounding entity framework.

pub mod entity;
pub mod traits;

pub use entity::{SpeedProfile, StatEntity};
pub use traits::MovementEntity;
