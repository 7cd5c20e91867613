//! # Nav Agent Backend
//!
//! Path-following locomotion on a navigation mesh. Point-click requests are
//! routed through [`NavigationMesh::calculate_path`]; every step is sampled
//! back onto the mesh so the agent never leaves it.
//!
//! ```text
//! point_click ─► calculate_path ─┬─ Complete/Partial ─► follow corners
//!                                ├─ Pending ──────────► retry next tick
//!                                └─ Invalid ──────────► idle
//! ```

use locomote_shared::{Bounds, MovementConfig, MovementSecure, Spatial, Vec3};

use super::sync::{MoveIntent, MovementSync, StepOutcome, TickPlan};
use super::MovementBackend;
use crate::integration::MovementEntity;

/// Outcome of a path query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavPathStatus {
    /// Reaches the destination.
    Complete,
    /// Ends at the reachable point closest to the destination.
    Partial,
    /// Still being computed; ask again next tick.
    Pending,
    /// No path exists.
    Invalid,
}

/// A path as a list of corners, nearest first, ending at the goal.
#[derive(Clone, Debug, PartialEq)]
pub struct NavPath {
    /// Query status.
    pub status: NavPathStatus,
    /// Corner points.
    pub corners: Vec<Vec3>,
}

impl NavPath {
    /// A path that is still being computed.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            status: NavPathStatus::Pending,
            corners: Vec::new(),
        }
    }

    /// No path.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            status: NavPathStatus::Invalid,
            corners: Vec::new(),
        }
    }
}

/// Navigation mesh queries.
pub trait NavigationMesh {
    /// Computes a path between two points.
    fn calculate_path(&mut self, from: Vec3, to: Vec3) -> NavPath;

    /// Closest mesh point within `max_distance` of `position`.
    fn sample_position(&self, position: Vec3, max_distance: f32) -> Option<Vec3>;
}

/// Flat, obstacle-free square mesh (unbounded when `half_extent` is `None`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OpenNavMesh {
    /// Mesh height.
    pub height: f32,
    /// Half side length of the square around the origin.
    pub half_extent: Option<f32>,
    /// Queries answered with `Pending` before paths resolve.
    pub pending_requests: u32,
}

impl OpenNavMesh {
    /// Unbounded mesh at `height`.
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self {
            height,
            half_extent: None,
            pending_requests: 0,
        }
    }

    /// Limits the mesh to a square of side `2 * half_extent`.
    #[must_use]
    pub const fn with_half_extent(mut self, half_extent: f32) -> Self {
        self.half_extent = Some(half_extent);
        self
    }

    /// Answers the next `count` queries with `Pending`.
    #[must_use]
    pub const fn with_pending_requests(mut self, count: u32) -> Self {
        self.pending_requests = count;
        self
    }

    fn clamp(&self, position: Vec3) -> Vec3 {
        let (x, z) = match self.half_extent {
            Some(extent) => (position.x.clamp(-extent, extent), position.z.clamp(-extent, extent)),
            None => (position.x, position.z),
        };
        Vec3::new(x, self.height, z)
    }

    fn contains(&self, position: Vec3) -> bool {
        self.clamp(position).planar_distance(position) <= f32::EPSILON
    }
}

impl NavigationMesh for OpenNavMesh {
    fn calculate_path(&mut self, from: Vec3, to: Vec3) -> NavPath {
        if self.pending_requests > 0 {
            self.pending_requests -= 1;
            return NavPath::pending();
        }
        if !self.contains(from) {
            return NavPath::invalid();
        }
        let goal = self.clamp(to);
        let status = if self.contains(to) {
            NavPathStatus::Complete
        } else {
            NavPathStatus::Partial
        };
        NavPath {
            status,
            corners: vec![goal],
        }
    }

    fn sample_position(&self, position: Vec3, max_distance: f32) -> Option<Vec3> {
        let on_mesh = self.clamp(position);
        (on_mesh.distance(position) <= max_distance).then_some(on_mesh)
    }
}

/// Navigation agent movement.
pub struct NavAgentMovement<E: MovementEntity, N: NavigationMesh = OpenNavMesh> {
    sync: MovementSync<Vec3, E>,
    mesh: N,
    pending_destination: Option<Vec3>,
}

impl<E: MovementEntity, N: NavigationMesh> NavAgentMovement<E, N> {
    /// Creates an agent at `position`.
    #[must_use]
    pub fn new(entity: E, secure: MovementSecure, config: MovementConfig, mesh: N, position: Vec3) -> Self {
        Self {
            sync: MovementSync::new(entity, secure, config, position),
            mesh,
            pending_destination: None,
        }
    }

    /// The navigation mesh.
    #[must_use]
    pub const fn mesh(&self) -> &N {
        &self.mesh
    }

    /// The navigation mesh, mutably.
    pub fn mesh_mut(&mut self) -> &mut N {
        &mut self.mesh
    }

    /// Destination whose path is still being computed.
    #[must_use]
    pub const fn pending_destination(&self) -> Option<Vec3> {
        self.pending_destination
    }

    /// Distance left along the current path.
    #[must_use]
    pub fn remaining_distance(&self) -> f32 {
        let MoveIntent::Path { waypoints, .. } = self.sync.intent() else {
            return 0.0;
        };
        let mut from = self.sync.position();
        let mut total = 0.0;
        for corner in waypoints {
            total += from.planar_distance(*corner);
            from = *corner;
        }
        total
    }

    fn request_path(&mut self, destination: Vec3) {
        let path = self.mesh.calculate_path(self.sync.position(), destination);
        match path.status {
            NavPathStatus::Pending => {
                self.pending_destination = Some(destination);
            }
            NavPathStatus::Complete | NavPathStatus::Partial => {
                self.pending_destination = None;
                self.sync.set_path(destination, path.corners);
            }
            NavPathStatus::Invalid => {
                self.pending_destination = None;
                tracing::debug!(?destination, "no navigation path");
                self.sync.clear_intent();
            }
        }
    }
}

impl<E: MovementEntity, N: NavigationMesh> MovementBackend for NavAgentMovement<E, N> {
    type Position = Vec3;
    type Entity = E;

    fn sync(&self) -> &MovementSync<Vec3, E> {
        &self.sync
    }

    fn sync_mut(&mut self) -> &mut MovementSync<Vec3, E> {
        &mut self.sync
    }

    fn before_tick(&mut self) {
        if let Some(destination) = self.pending_destination.take() {
            self.request_path(destination);
        }
    }

    fn on_teleported(&mut self) {
        if let MoveIntent::Path { destination, .. } = self.sync.intent() {
            let destination = *destination;
            self.request_path(destination);
        }
    }

    fn point_click_movement(&mut self, target: Vec3) -> bool {
        if !self.sync.can_predict_movement() || !self.sync.entity().capabilities().can_move {
            return false;
        }
        self.request_path(target);
        true
    }

    fn locomote(&mut self, plan: &TickPlan<Vec3>) -> StepOutcome<Vec3> {
        let current = self.sync.position();
        let target = current + plan.total_velocity() * plan.delta_time;
        let position = self
            .mesh
            .sample_position(target, self.sync.config().nav_agent.sample_distance)
            .unwrap_or(current);
        StepOutcome::grounded_at(position)
    }

    fn find_grounded_position(&self, from: Vec3) -> Vec3 {
        self.mesh
            .sample_position(from, self.sync.config().ground_check_distance)
            .unwrap_or(from)
    }

    fn movement_bounds(&self) -> Bounds<Vec3> {
        let agent = self.sync.config().nav_agent;
        let half_height = agent.height * 0.5;
        Bounds::from_center(
            self.sync.position() + Vec3::Y * half_height,
            Vec3::new(agent.radius, half_height, agent.radius),
        )
    }

    fn allow_to_jump(&self) -> bool {
        false
    }

    fn allow_to_dash(&self) -> bool {
        true
    }

    fn allow_to_crouch(&self) -> bool {
        true
    }

    fn allow_to_crawl(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::StatEntity;
    use locomote_shared::{EntityRole, MovementState};

    fn agent(mesh: OpenNavMesh, position: Vec3) -> NavAgentMovement<StatEntity> {
        NavAgentMovement::new(
            StatEntity::new(EntityRole::SERVER_OWNED),
            MovementSecure::ServerAuthoritative,
            MovementConfig::default(),
            mesh,
            position,
        )
    }

    #[test]
    fn test_point_click_reaches_destination() {
        let mut agent = agent(OpenNavMesh::new(0.0), Vec3::ZERO);
        let target = Vec3::new(3.0, 0.0, 4.0);
        assert!(agent.point_click_movement(target));
        assert!((agent.remaining_distance() - 5.0).abs() < 1e-4);

        for _ in 0..15 {
            agent.tick(0.1);
        }
        assert!(agent.position().distance(target) <= 0.1 + 1e-3);
        assert_eq!(agent.sync().intent(), &MoveIntent::Idle);
        assert!(!agent.movement_state().has_direction_movement());
    }

    #[test]
    fn test_pending_path_retried_next_tick() {
        let mut agent = agent(OpenNavMesh::new(0.0).with_pending_requests(1), Vec3::ZERO);
        assert!(agent.point_click_movement(Vec3::new(0.0, 0.0, 10.0)));
        assert_eq!(agent.pending_destination(), Some(Vec3::new(0.0, 0.0, 10.0)));

        agent.tick(0.1);
        assert_eq!(agent.pending_destination(), None);
        assert!(agent.position().z > 0.0);
    }

    #[test]
    fn test_invalid_path_goes_idle() {
        let mesh = OpenNavMesh::new(0.0).with_half_extent(10.0);
        let mut agent = agent(mesh, Vec3::new(50.0, 0.0, 0.0));
        agent.point_click_movement(Vec3::ZERO);
        assert_eq!(agent.sync().intent(), &MoveIntent::Idle);
        assert!(agent.remaining_distance().abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_path_stays_on_mesh() {
        let mesh = OpenNavMesh::new(0.0).with_half_extent(10.0);
        let mut agent = agent(mesh, Vec3::ZERO);
        agent.point_click_movement(Vec3::new(20.0, 0.0, 0.0));
        for _ in 0..40 {
            agent.tick(0.1);
        }
        let position = agent.position();
        assert!(position.x <= 10.0 + 1e-4);
        assert!(position.x > 9.8);
    }

    #[test]
    fn test_agent_never_jumps() {
        let mut agent = agent(OpenNavMesh::new(0.0), Vec3::ZERO);
        agent.key_movement(Vec3::ZERO, MovementState::IS_JUMP);
        agent.tick(0.1);
        assert!(agent.position().y.abs() < f32::EPSILON);
        let message = agent.write_server_state(1).unwrap();
        assert!(!message.reliable);
    }
}
