//! # Reconciliation
//!
//! Pull a locally simulated position back toward the authoritative one.
//!
//! ## How It Works
//!
//! 1. The authoritative peer sends its position in a state message
//! 2. The receiver measures the error against its own position
//! 3. Small errors are blended away, large errors snap
//!
//! ```text
//! error:  0 ──── epsilon ─────────── snap_threshold ──────────►
//!         │ NoCorrection │ SmallCorrection (blend) │ Snap (hard set)
//! ```
//!
//! The owner client blends once per message by `smoothing`. Observers keep
//! the authoritative position as a target and close in on it every tick.

use locomote_shared::{MovementConfig, Spatial};

/// Result of reconciliation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReconciliationResult {
    /// No correction needed - prediction was accurate.
    NoCorrection,
    /// Small correction applied via smoothing.
    SmallCorrection {
        /// Error magnitude.
        error: f32,
    },
    /// Large correction - snapped to the authoritative position.
    Snap {
        /// Error magnitude.
        error: f32,
    },
}

/// Error classification and smoothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reconciler {
    /// Errors below this are ignored.
    epsilon: f32,
    /// Error threshold for snapping.
    snap_threshold: f32,
    /// Owner-client blend factor (0-1).
    smoothing: f32,
    /// Observer convergence rate (per second).
    remote_rate: f32,
}

impl Reconciler {
    /// Creates a reconciler from configuration.
    #[must_use]
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            epsilon: config.correction_epsilon,
            snap_threshold: config.snap_threshold,
            smoothing: config.smoothing.clamp(0.0, 1.0),
            remote_rate: config.remote_smoothing_rate.max(0.0),
        }
    }

    /// Classifies an error magnitude.
    #[must_use]
    pub fn classify(&self, error: f32) -> ReconciliationResult {
        if error < self.epsilon {
            ReconciliationResult::NoCorrection
        } else if error > self.snap_threshold {
            ReconciliationResult::Snap { error }
        } else {
            ReconciliationResult::SmallCorrection { error }
        }
    }

    /// Owner-client correction: returns the new local position.
    #[must_use]
    pub fn reconcile<S: Spatial>(&self, predicted: S, authoritative: S) -> (S, ReconciliationResult) {
        let result = self.classify((authoritative - predicted).length());
        let position = match result {
            ReconciliationResult::NoCorrection => predicted,
            ReconciliationResult::SmallCorrection { .. } => {
                predicted.lerp(authoritative, self.smoothing)
            }
            ReconciliationResult::Snap { .. } => authoritative,
        };
        (position, result)
    }

    /// Observer smoothing: one tick toward `target`.
    #[must_use]
    pub fn smooth_towards<S: Spatial>(&self, current: S, target: S, delta_time: f32) -> S {
        if (target - current).length() < self.epsilon {
            return target;
        }
        let t = (self.remote_rate * delta_time).clamp(0.0, 1.0);
        current.lerp(target, t)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(&MovementConfig::default())
    }
}
