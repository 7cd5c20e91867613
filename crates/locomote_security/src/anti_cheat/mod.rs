//! # Drift Detection
//!
//! Server-side validation of positions claimed by an owner client that
//! simulates its own movement.
//!
//! ## Detection Method
//!
//! ```text
//!   old ●────────────── moveable ──────────────●─ ─ ─ ─ excess ─ ─ ─ ─● claimed
//!        speed * dt (floored)                  ▲
//!                                               └ corrected position
//! ```
//!
//! - Every overshoot is accumulated as telemetry ([`DriftReport`]).
//! - An overshoot worth more than `excess_time_tolerance` seconds of travel
//!   is clamped back onto the claimed direction at the permitted distance.
//!
//! This module never bans; it measures and clamps. What to do with the
//! accumulated drift is up to a higher-level policy.

use locomote_shared::constants::{
    DEFAULT_EXCESS_TIME_TOLERANCE, MIN_MOVEABLE_DISTANCE, TIMESTAMP_TO_SECONDS,
};
use locomote_shared::{MovementConfig, Spatial};

/// Configuration for drift validation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftPolicy {
    /// Overshoot tolerated before correction, in seconds of travel.
    pub excess_time_tolerance: f32,
    /// Floor for the distance permitted per message.
    pub min_moveable_distance: f32,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            excess_time_tolerance: DEFAULT_EXCESS_TIME_TOLERANCE,
            min_moveable_distance: MIN_MOVEABLE_DISTANCE,
        }
    }
}

impl From<&MovementConfig> for DriftPolicy {
    fn from(config: &MovementConfig) -> Self {
        Self {
            excess_time_tolerance: config.excess_time_tolerance,
            min_moveable_distance: config.min_moveable_distance,
        }
    }
}

/// Outcome of validating one claimed position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PositionVerdict<P> {
    /// Claimed position is within budget (or within tolerance).
    Accepted,
    /// Claimed position overshoots; the server should warp the client here.
    Corrected {
        /// Clamped position along the claimed direction.
        position: P,
        /// Overshoot expressed in seconds of travel.
        excess_time: f32,
    },
}

impl<P> PositionVerdict<P> {
    /// True if the claimed position was accepted as-is.
    #[inline]
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Accumulated drift telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriftReport {
    /// Sum of all overshoot distances.
    pub accumulated_excess_distance: f32,
    /// Sum of the delta times of overshooting messages.
    pub accumulated_delta_time: f32,
    /// Messages validated.
    pub samples: u32,
    /// Messages that produced a correction.
    pub corrections: u32,
}

impl DriftReport {
    /// Average overshoot speed across all overshooting messages.
    #[must_use]
    pub fn excess_speed(&self) -> f32 {
        if self.accumulated_delta_time <= 0.0 {
            0.0
        } else {
            self.accumulated_excess_distance / self.accumulated_delta_time
        }
    }
}

/// Per-entity drift validator.
#[derive(Clone, Debug, Default)]
pub struct DriftTracker {
    /// Configuration.
    policy: DriftPolicy,
    /// Telemetry.
    report: DriftReport,
}

impl DriftTracker {
    /// Creates a new tracker.
    #[must_use]
    pub const fn new(policy: DriftPolicy) -> Self {
        Self {
            policy,
            report: DriftReport {
                accumulated_excess_distance: 0.0,
                accumulated_delta_time: 0.0,
                samples: 0,
                corrections: 0,
            },
        }
    }

    /// Seconds between two millisecond peer timestamps.
    #[inline]
    #[must_use]
    pub fn delta_time(peer_timestamp: u32, accepted_timestamp: u32) -> f32 {
        peer_timestamp.saturating_sub(accepted_timestamp) as f32 * TIMESTAMP_TO_SECONDS
    }

    /// Validates a claimed move from `old` to `claimed` over `delta_time`.
    pub fn validate<P: Spatial>(
        &mut self,
        old: P,
        claimed: P,
        delta_time: f32,
        move_speed: f32,
    ) -> PositionVerdict<P> {
        self.report.samples = self.report.samples.saturating_add(1);

        let moveable = (move_speed * delta_time).max(self.policy.min_moveable_distance);
        let client_distance = old.planar_distance(claimed);
        if client_distance <= moveable {
            return PositionVerdict::Accepted;
        }

        let excess = client_distance - moveable;
        self.report.accumulated_excess_distance += excess;
        self.report.accumulated_delta_time += delta_time.max(0.0);

        let excess_time = if move_speed > 0.0 {
            excess / move_speed
        } else {
            f32::INFINITY
        };
        if excess_time <= self.policy.excess_time_tolerance {
            return PositionVerdict::Accepted;
        }

        self.report.corrections = self.report.corrections.saturating_add(1);
        tracing::debug!(
            client_distance,
            moveable,
            excess_time,
            "claimed movement exceeds budget"
        );
        PositionVerdict::Corrected {
            position: old.lerp(claimed, moveable / client_distance),
            excess_time,
        }
    }

    /// Telemetry so far.
    #[must_use]
    pub const fn report(&self) -> DriftReport {
        self.report
    }

    /// Current policy.
    #[must_use]
    pub const fn policy(&self) -> DriftPolicy {
        self.policy
    }

    /// Clears telemetry (e.g. after a policy acted on it).
    pub fn reset(&mut self) {
        self.report = DriftReport::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locomote_shared::{Vec2, Vec3};

    #[test]
    fn test_normal_movement_accepted() {
        let mut tracker = DriftTracker::default();
        let verdict = tracker.validate(Vec3::ZERO, Vec3::new(0.9, 0.0, 0.0), 0.1, 10.0);
        assert!(verdict.is_accepted());
        assert_eq!(tracker.report().samples, 1);
        assert!(tracker.report().accumulated_excess_distance.abs() < f32::EPSILON);
    }

    #[test]
    fn test_overshoot_corrected_to_permitted_distance() {
        let mut tracker = DriftTracker::default();
        let verdict = tracker.validate(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.1, 10.0);
        match verdict {
            PositionVerdict::Corrected { position, excess_time } => {
                assert!((position.x - 1.0).abs() < 1e-4);
                assert!((excess_time - 0.4).abs() < 1e-4);
            }
            PositionVerdict::Accepted => panic!("expected correction"),
        }
        let report = tracker.report();
        assert!((report.accumulated_excess_distance - 4.0).abs() < 1e-4);
        assert!((report.accumulated_delta_time - 0.1).abs() < 1e-6);
        assert_eq!(report.corrections, 1);
    }

    #[test]
    fn test_small_overshoot_tolerated_but_recorded() {
        let mut tracker = DriftTracker::default();
        // 0.5 over at speed 10 is 0.05s of travel
        let verdict = tracker.validate(Vec3::ZERO, Vec3::new(1.5, 0.0, 0.0), 0.1, 10.0);
        assert!(verdict.is_accepted());
        assert!((tracker.report().accumulated_excess_distance - 0.5).abs() < 1e-4);
        assert_eq!(tracker.report().corrections, 0);
    }

    #[test]
    fn test_vertical_movement_ignored() {
        let mut tracker = DriftTracker::default();
        let verdict = tracker.validate(Vec3::ZERO, Vec3::new(0.0, 50.0, 0.0), 0.1, 10.0);
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_zero_speed_any_move_corrected() {
        let mut tracker = DriftTracker::default();
        let verdict = tracker.validate(Vec2::ZERO, Vec2::new(0.5, 0.0), 0.1, 0.0);
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn test_delta_time_from_timestamps() {
        assert!((DriftTracker::delta_time(1100, 1000) - 0.1).abs() < 1e-6);
        assert!(DriftTracker::delta_time(900, 1000).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reset_clears_report() {
        let mut tracker = DriftTracker::default();
        let _ = tracker.validate(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.1, 10.0);
        tracker.reset();
        assert_eq!(tracker.report(), DriftReport::default());
    }
}
