//! # Sync Engine
//!
//! Backend-independent half of every movement backend: intent, forces,
//! state flags, message writing and reading, drift validation and the
//! teleport handshake.
//!
//! ## Tick
//!
//! ```text
//! begin_tick ─┬─ (1) refresh move speed
//!             ├─ (2) install requested dash
//!             ├─ (3) listeners: pre
//!             ├─ (4) advance forces ──► force_motion + replace force
//!             ├─ (5) listeners: post
//!             └─ (6) velocity/facing from replace force or intent ──► TickPlan
//! backend     ── locomotion (physics, nav mesh, 2D body) ──────────► StepOutcome
//! finish_tick ─┬─ (7) MovementState + validated ExtraMovementState
//!              └─ (8) stage pending input
//! ```

use std::collections::VecDeque;

use locomote_security::{DriftPolicy, DriftReport, DriftTracker, PositionVerdict};
use locomote_shared::{
    validate_extra_movement_state, EntityRole, ExtraMovementState, MovementCapabilities,
    MovementConfig, MovementSecure, MovementState, Spatial, MAX_STATE_FORCES,
};

use crate::force::{
    ForceApplier, ForceApplierSet, ForceApplyMode, ForceSource, ForceUpdateListener,
};
use crate::input::EntityMovementInput;
use crate::integration::MovementEntity;
use crate::protocol::{
    CodecResult, InputMessage, MessageKind, MessageReader, MessageWriter, OutboundMessage,
    StateMessage, WireSpatial,
};
use crate::reconciliation::{ReconciliationResult, Reconciler};
use crate::teleport::{TeleportConfirmWaiter, TeleportHandshake};

/// What the entity is trying to do.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveIntent<S> {
    /// Standing still.
    Idle,
    /// Directional input.
    Key {
        /// Move direction.
        direction: S,
        /// Directional flags supplied with the input.
        directions: MovementState,
        /// Survives the tick (server-applied input). Local client input is
        /// re-supplied every tick.
        persistent: bool,
    },
    /// Following waypoints toward a destination.
    Path {
        /// Final destination.
        destination: S,
        /// Remaining waypoints, nearest first.
        waypoints: VecDeque<S>,
    },
}

/// Output of [`MovementSync::begin_tick`] handed to the locomotion step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickPlan<S> {
    /// Tick length in seconds.
    pub delta_time: f32,
    /// Movement velocity from intent, or from the replace-movement force.
    pub velocity: S,
    /// Summed additive force velocity.
    pub force_motion: S,
    /// Active replace-movement force.
    pub replace_movement: Option<ForceApplier>,
    /// A jump was requested and the entity may jump.
    pub jump: bool,
}

impl<S: Spatial> TickPlan<S> {
    /// Velocity including forces.
    #[must_use]
    pub fn total_velocity(&self) -> S {
        self.velocity + self.force_motion
    }
}

/// Result of a backend's locomotion step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StepOutcome<S> {
    /// New position.
    pub position: S,
    /// Standing on ground.
    pub grounded: bool,
    /// Submerged.
    pub under_water: bool,
    /// Attached to a climbable surface.
    pub climbing: bool,
    /// A jump started this tick.
    pub jumped: bool,
}

impl<S> StepOutcome<S> {
    /// Grounded outcome at `position` with no other flags.
    #[must_use]
    pub const fn grounded_at(position: S) -> Self {
        Self {
            position,
            grounded: true,
            under_water: false,
            climbing: false,
            jumped: false,
        }
    }
}

/// What happened to an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadOutcome {
    /// Applied.
    Applied,
    /// Applied with a corrective teleport back to the client.
    Corrected,
    /// A teleport was applied.
    Teleported,
    /// Older than the last accepted message; dropped.
    Stale,
    /// Dropped while waiting for the client's teleport echo.
    AwaitingTeleportConfirm,
    /// This peer does not read this kind of message for this entity.
    Ignored,
}

impl ReadOutcome {
    /// True if the message changed state.
    #[must_use]
    pub const fn was_applied(self) -> bool {
        matches!(self, Self::Applied | Self::Corrected | Self::Teleported)
    }
}

/// Follow-up a backend must run after reading a client message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RemoteCommand<S: Spatial> {
    /// Path toward a destination (backend computes the path).
    PointClick(S),
    /// Warp the client back to a validated position.
    Correct {
        /// Clamped position.
        position: S,
        /// Facing to keep.
        facing: S::Facing,
    },
}

enum ClientMessage<S: Spatial> {
    State(StateMessage<S>),
    Input(InputMessage<S>),
}

impl<S: Spatial> ClientMessage<S> {
    fn movement_state(&self) -> MovementState {
        match self {
            Self::State(message) => message.movement_state,
            Self::Input(message) => message.movement_state,
        }
    }
}

/// Shared movement state and protocol logic for one entity.
pub struct MovementSync<S: WireSpatial, E: MovementEntity> {
    entity: E,
    secure: MovementSecure,
    config: MovementConfig,

    position: S,
    facing: S::Facing,
    movement_state: MovementState,
    extra_movement_state: ExtraMovementState,
    requested_extra: ExtraMovementState,
    capabilities: MovementCapabilities,
    move_speed: f32,

    intent: MoveIntent<S>,
    look_override: Option<S::Facing>,
    jump_requested: bool,
    dash_requested: bool,
    replace_active: bool,
    /// One-shot flags waiting for the next outbound message.
    transient: MovementState,

    forces: ForceApplierSet,
    listeners: Vec<Box<dyn ForceUpdateListener>>,

    accepted_timestamp: Option<u32>,
    last_teleport_timestamp: Option<u32>,
    drift: DriftTracker,
    reconciler: Reconciler,
    remote_target: Option<(S, S::Facing)>,
    teleport: TeleportHandshake,

    pending_input: EntityMovementInput<S>,
    last_sent_input: Option<EntityMovementInput<S>>,
    last_received_input: EntityMovementInput<S>,
    pending_stop: bool,

    writer: MessageWriter,
}

impl<S: WireSpatial, E: MovementEntity> MovementSync<S, E> {
    /// Creates the sync state for an entity spawned at `position`.
    #[must_use]
    pub fn new(entity: E, secure: MovementSecure, config: MovementConfig, position: S) -> Self {
        let facing = S::default_facing();
        let capabilities = entity.capabilities();
        Self {
            drift: DriftTracker::new(DriftPolicy::from(&config)),
            reconciler: Reconciler::new(&config),
            entity,
            secure,
            config,
            position,
            facing,
            movement_state: MovementState::empty(),
            extra_movement_state: ExtraMovementState::None,
            requested_extra: ExtraMovementState::None,
            capabilities,
            move_speed: 0.0,
            intent: MoveIntent::Idle,
            look_override: None,
            jump_requested: false,
            dash_requested: false,
            replace_active: false,
            transient: MovementState::empty(),
            forces: ForceApplierSet::new(),
            listeners: Vec::new(),
            accepted_timestamp: None,
            last_teleport_timestamp: None,
            remote_target: None,
            teleport: TeleportHandshake::new(),
            pending_input: EntityMovementInput::idle(facing),
            last_sent_input: None,
            last_received_input: EntityMovementInput::idle(facing),
            pending_stop: false,
            writer: MessageWriter::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The moved entity.
    #[must_use]
    pub const fn entity(&self) -> &E {
        &self.entity
    }

    /// The moved entity, mutably.
    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    /// Authority mode.
    #[must_use]
    pub const fn secure(&self) -> MovementSecure {
        self.secure
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> S {
        self.position
    }

    /// Current facing.
    #[must_use]
    pub const fn facing(&self) -> S::Facing {
        self.facing
    }

    /// Movement flags from the last tick or snapshot.
    #[must_use]
    pub const fn movement_state(&self) -> MovementState {
        self.movement_state
    }

    /// Validated extra state.
    #[must_use]
    pub const fn extra_movement_state(&self) -> ExtraMovementState {
        self.extra_movement_state
    }

    /// Move speed sampled at the start of the last tick.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Current intent.
    #[must_use]
    pub const fn intent(&self) -> &MoveIntent<S> {
        &self.intent
    }

    /// Active forces.
    #[must_use]
    pub const fn forces(&self) -> &ForceApplierSet {
        &self.forces
    }

    /// Timestamp of the last accepted inbound message.
    #[must_use]
    pub const fn accepted_timestamp(&self) -> Option<u32> {
        self.accepted_timestamp
    }

    /// Input staged by the last tick.
    #[must_use]
    pub const fn pending_input(&self) -> &EntityMovementInput<S> {
        &self.pending_input
    }

    /// Drift telemetry.
    #[must_use]
    pub const fn drift_report(&self) -> DriftReport {
        self.drift.report()
    }

    /// Clears drift telemetry.
    pub fn reset_drift(&mut self) {
        self.drift.reset();
    }

    /// True while the server drops the owner client's messages.
    #[must_use]
    pub fn is_waiting_teleport_confirm(&self) -> bool {
        self.teleport.is_waiting_client_confirm()
    }

    /// True until the client has echoed a received teleport.
    #[must_use]
    pub const fn is_client_confirming_teleport(&self) -> bool {
        self.teleport.is_client_confirming()
    }

    /// Awaitable handle on the server's teleport wait.
    #[must_use]
    pub fn teleport_confirm_waiter(&self) -> TeleportConfirmWaiter {
        self.teleport.waiter()
    }

    /// Ends the entity's lifetime; teleport waiters complete.
    pub fn mark_destroyed(&mut self) {
        self.teleport.mark_destroyed();
    }

    /// Registers a force listener; listeners run in registration order.
    pub fn add_force_listener(&mut self, listener: Box<dyn ForceUpdateListener>) {
        self.listeners.push(listener);
    }

    /// Whether this peer simulates the entity from input.
    #[must_use]
    pub fn can_predict_movement(&self) -> bool {
        let role = self.entity.role();
        role.is_owner_client
            || (role.is_owner_client_or_owned_by_server() && self.secure == MovementSecure::NotSecure)
            || (role.is_server && self.secure == MovementSecure::ServerAuthoritative)
    }

    fn role(&self) -> EntityRole {
        self.entity.role()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Directional input. Returns `false` if this peer may not move the entity.
    pub fn request_key_movement(&mut self, direction: S, movement_state: MovementState) -> bool {
        if !self.can_predict_movement() {
            tracing::debug!("key movement ignored: peer cannot predict this entity");
            return false;
        }
        if !self.entity.capabilities().can_move {
            return false;
        }

        if movement_state.contains(MovementState::IS_JUMP) {
            self.jump_requested = true;
        }
        if movement_state.contains(MovementState::IS_DASH) {
            self.dash_requested = true;
        }

        if direction.planar().length() <= f32::EPSILON {
            self.intent = MoveIntent::Idle;
            return true;
        }
        let mut directions = movement_state.directions();
        if directions.is_empty() {
            directions = MovementState::FORWARD;
        }
        self.intent = MoveIntent::Key {
            direction,
            directions,
            persistent: self.role().is_server,
        };
        true
    }

    /// Starts following `waypoints` toward `destination`.
    pub fn set_path<I>(&mut self, destination: S, waypoints: I)
    where
        I: IntoIterator<Item = S>,
    {
        self.intent = MoveIntent::Path {
            destination,
            waypoints: waypoints.into_iter().collect(),
        };
    }

    /// Drops the current intent without marking a stop.
    pub fn clear_intent(&mut self) {
        self.intent = MoveIntent::Idle;
    }

    /// Stages an extra state; validated every tick.
    pub fn set_extra_movement_state(&mut self, requested: ExtraMovementState) {
        self.requested_extra = requested;
    }

    /// Pins the facing until cleared.
    pub fn set_look_rotation(&mut self, facing: S::Facing) {
        self.look_override = Some(facing);
    }

    /// Lets movement drive the facing again.
    pub fn clear_look_rotation(&mut self) {
        self.look_override = None;
    }

    /// Clears intent and, for server-authoritative entities, marks the stop
    /// in the next input message.
    pub fn stop_move(&mut self) {
        self.intent = MoveIntent::Idle;
        if self.secure == MovementSecure::ServerAuthoritative {
            self.pending_stop = true;
            self.pending_input.is_stopped = true;
            self.pending_input.movement_state.remove(MovementState::DIRECTIONS);
        }
    }

    /// Server-only: adds a force. Returns `false` if the request was ignored.
    pub fn apply_force(
        &mut self,
        mode: ForceApplyMode,
        direction: S,
        source: ForceSource,
        speed: f32,
        deceleration: f32,
        duration: f32,
    ) -> bool {
        if !self.role().is_server {
            tracing::warn!("apply_force ignored: server-only operation");
            return false;
        }
        let force = ForceApplier::new(mode, direction.to_vec3(), source, speed, deceleration, duration);
        if !force.decays() {
            tracing::warn!(speed, "apply_force ignored: force would never decay");
            return false;
        }
        self.forces.apply(force);
        true
    }

    /// Server-only: removes every force.
    pub fn clear_all_forces(&mut self) -> bool {
        if !self.role().is_server {
            tracing::warn!("clear_all_forces ignored: server-only operation");
            return false;
        }
        self.forces.clear();
        true
    }

    /// Server-only: warps the entity and raises the teleport handshake.
    pub fn teleport(&mut self, position: S, facing: S::Facing, still_move_after_teleport: bool) -> bool {
        let role = self.role();
        if !role.is_server {
            tracing::warn!("teleport ignored: server-only operation");
            return false;
        }
        self.position = position;
        self.facing = facing;
        self.remote_target = None;
        if !still_move_after_teleport {
            self.intent = MoveIntent::Idle;
            self.jump_requested = false;
            self.dash_requested = false;
        }
        self.teleport
            .begin_server_teleport(still_move_after_teleport, role.has_remote_owner());
        true
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Steps (1)-(6): speed, dash, forces, velocity and facing.
    pub fn begin_tick(&mut self, delta_time: f32, allow_dash: bool) -> TickPlan<S> {
        let capabilities = self.entity.capabilities();
        self.capabilities = capabilities;

        // (1)
        self.move_speed = self
            .entity
            .move_speed(self.movement_state, self.extra_movement_state)
            .max(0.0);

        // (2)
        if std::mem::take(&mut self.dash_requested) {
            if allow_dash && capabilities.can_move && capabilities.can_dash {
                self.install_dash(self.dash_direction());
            } else {
                tracing::debug!("dash request denied");
            }
        }

        // (3) - (5)
        for listener in &mut self.listeners {
            listener.on_pre_update_forces(&self.forces);
        }
        let update = self.forces.update(delta_time);
        tracing::trace!(forces = self.forces.len(), "forces advanced");
        for listener in &mut self.listeners {
            listener.on_post_update_forces(&self.forces, &update);
        }

        // (6)
        self.replace_active = update.replace_movement.is_some();
        let velocity = if let Some(force) = update.replace_movement {
            if let Some(forced) = S::facing_from_direction(S::from_vec3(force.direction)) {
                self.facing = forced;
            }
            S::from_vec3(force.velocity())
        } else {
            let velocity = if capabilities.can_move {
                self.intent_velocity(delta_time)
            } else {
                S::ZERO
            };
            if capabilities.can_turn {
                let target = self
                    .look_override
                    .or_else(|| S::facing_from_direction(velocity));
                if let Some(target) = target {
                    self.facing = S::rotate_facing_towards(self.facing, target, self.max_turn(delta_time));
                }
            }
            velocity
        };

        let jump = std::mem::take(&mut self.jump_requested) && capabilities.can_jump && capabilities.can_move;

        TickPlan {
            delta_time,
            velocity,
            force_motion: S::from_vec3(update.force_motion),
            replace_movement: update.replace_movement,
            jump,
        }
    }

    /// Steps (7)-(8): state flags, extra state, pending input.
    pub fn finish_tick(&mut self, outcome: StepOutcome<S>, allow_crouch: bool, allow_crawl: bool) {
        self.position = outcome.position;

        let mut state = MovementState::empty();
        if self.replace_active {
            state |= MovementState::FORWARD;
        } else if self.capabilities.can_move {
            match &self.intent {
                MoveIntent::Key { directions, .. } => state |= *directions,
                MoveIntent::Path { .. } => state |= MovementState::FORWARD,
                MoveIntent::Idle => {}
            }
        }
        state.set(MovementState::IS_GROUNDED, outcome.grounded);
        state.set(MovementState::IS_UNDER_WATER, outcome.under_water);
        state.set(MovementState::IS_CLIMBING, outcome.climbing);
        if outcome.jumped {
            self.transient |= MovementState::IS_JUMP;
        }
        self.movement_state = state;

        let mut capabilities = self.capabilities;
        capabilities.can_crouch &= allow_crouch;
        capabilities.can_crawl &= allow_crawl;
        self.extra_movement_state =
            validate_extra_movement_state(&capabilities, state, self.requested_extra);

        self.stage_pending_input();

        if matches!(self.intent, MoveIntent::Key { persistent: false, .. }) {
            self.intent = MoveIntent::Idle;
        }
    }

    /// Tick for peers that do not simulate: forces decay, position smooths
    /// toward the last authoritative snapshot.
    pub fn advance_passive(&mut self, delta_time: f32) {
        for listener in &mut self.listeners {
            listener.on_pre_update_forces(&self.forces);
        }
        let update = self.forces.update(delta_time);
        for listener in &mut self.listeners {
            listener.on_post_update_forces(&self.forces, &update);
        }

        if let Some((target, facing)) = self.remote_target {
            self.position = self.reconciler.smooth_towards(self.position, target, delta_time);
            self.facing = facing;
            if self.position == target {
                self.remote_target = None;
            }
        }
    }

    fn max_turn(&self, delta_time: f32) -> f32 {
        if self.config.turn_speed <= 0.0 {
            f32::INFINITY
        } else {
            self.config.turn_speed * delta_time
        }
    }

    fn intent_velocity(&mut self, delta_time: f32) -> S {
        let position = self.position;
        let speed = self.move_speed;
        let stopping = self.config.stopping_distance;

        let (velocity, arrived) = match &mut self.intent {
            MoveIntent::Idle => (S::ZERO, false),
            MoveIntent::Key { direction, .. } => (direction.planar().normalize_or_zero() * speed, false),
            MoveIntent::Path { waypoints, .. } => {
                while waypoints
                    .front()
                    .is_some_and(|next| position.planar_distance(*next) <= stopping)
                {
                    waypoints.pop_front();
                }
                match waypoints.front() {
                    Some(next) => {
                        let offset = (*next - position).planar();
                        let distance = offset.length();
                        // do not overshoot the waypoint
                        let step_speed = if delta_time > 0.0 {
                            speed.min(distance / delta_time)
                        } else {
                            speed
                        };
                        (offset.normalize_or_zero() * step_speed, false)
                    }
                    None => (S::ZERO, true),
                }
            }
        };

        if arrived {
            self.intent = MoveIntent::Idle;
        }
        velocity
    }

    fn dash_direction(&self) -> S {
        let direction = match &self.intent {
            MoveIntent::Key { direction, .. } => direction.planar().normalize_or_zero(),
            _ => S::ZERO,
        };
        if direction == S::ZERO {
            S::facing_direction(self.facing)
        } else {
            direction
        }
    }

    fn install_dash(&mut self, direction: S) {
        let dash = self.config.dash;
        self.forces.apply(ForceApplier::new(
            ForceApplyMode::Dash,
            direction.to_vec3(),
            ForceSource::NONE,
            dash.speed,
            dash.deceleration,
            dash.duration,
        ));
        self.transient |= MovementState::IS_DASH;
    }

    fn stage_pending_input(&mut self) {
        let (position, is_key_movement) = match &self.intent {
            MoveIntent::Key { direction, .. } => (*direction, true),
            MoveIntent::Path { destination, .. } => (*destination, false),
            MoveIntent::Idle => (self.pending_input.position, self.pending_input.is_key_movement),
        };
        self.pending_input = EntityMovementInput {
            movement_state: self.movement_state | self.transient,
            extra_movement_state: self.requested_extra,
            position,
            facing: self.facing,
            is_key_movement,
            is_stopped: self.pending_stop,
        };
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Owner client (not the server): state or input message for this tick.
    pub fn write_client_state(&mut self, timestamp: u32) -> Option<OutboundMessage> {
        let role = self.role();
        if !role.is_owner_client || role.is_server {
            return None;
        }

        let confirming = self.teleport.take_client_confirm();
        self.writer.reset();

        let kind = match self.secure {
            MovementSecure::NotSecure => {
                let mut movement_state = self.movement_state | self.transient;
                if confirming {
                    movement_state |= MovementState::IS_TELEPORT;
                }
                let message = StateMessage {
                    movement_state,
                    extra_movement_state: self.extra_movement_state,
                    position: self.position,
                    facing: self.facing,
                    forces: Vec::new(),
                };
                if let Err(error) = message.encode(&mut self.writer, false) {
                    tracing::warn!(%error, "failed to encode client state");
                    return None;
                }
                MessageKind::ClientState
            }
            MovementSecure::ServerAuthoritative => {
                let mut pending = self.pending_input;
                if confirming {
                    pending.movement_state |= MovementState::IS_TELEPORT;
                }
                let mask = pending
                    .diff(
                        self.last_sent_input.as_ref(),
                        self.config.input_position_epsilon,
                        self.config.input_angle_epsilon,
                    )
                    .or_else(|| {
                        confirming
                            .then(|| pending.diff(None, 0.0, 0.0))
                            .flatten()
                    })?;
                if let Err(error) = InputMessage::from_input(&pending, mask).encode(&mut self.writer) {
                    tracing::warn!(%error, "failed to encode client input");
                    return None;
                }
                self.last_sent_input = Some(pending);
                self.pending_stop = false;
                MessageKind::ClientInput
            }
        };

        self.transient = MovementState::empty();
        Some(OutboundMessage {
            kind,
            timestamp,
            payload: self.writer.to_vec(),
            reliable: confirming,
        })
    }

    /// Server: full state message including the force list.
    pub fn write_server_state(&mut self, timestamp: u32) -> Option<OutboundMessage> {
        if !self.role().is_server {
            return None;
        }

        let mut movement_state = self.movement_state | self.transient;
        let teleport = self.teleport.pending_server_teleport();
        if let Some(still_move) = teleport {
            movement_state = if still_move {
                movement_state | MovementState::IS_TELEPORT
            } else {
                MovementState::IS_TELEPORT
            };
        }
        let reliable = movement_state.intersects(MovementState::IS_DASH | MovementState::IS_TELEPORT);

        let message = StateMessage {
            movement_state,
            extra_movement_state: self.extra_movement_state,
            position: self.position,
            facing: self.facing,
            forces: self.forces.wire_forces(MAX_STATE_FORCES),
        };
        if self.forces.len() > MAX_STATE_FORCES {
            tracing::debug!(forces = self.forces.len(), "server state carries only the newest forces");
        }
        self.writer.reset();
        if let Err(error) = message.encode(&mut self.writer, true) {
            // one-shot flags stay queued for the next write
            tracing::warn!(%error, forces = self.forces.len(), "failed to encode server state");
            return None;
        }
        self.transient = MovementState::empty();
        if teleport.is_some() {
            self.teleport.take_server_teleport();
        }
        Some(OutboundMessage {
            kind: MessageKind::ServerState,
            timestamp,
            payload: self.writer.to_vec(),
            reliable,
        })
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Server: applies a message from the entity's remote owner.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::protocol::CodecError`] for malformed payloads; no
    /// state is changed in that case.
    pub fn read_client_state(
        &mut self,
        timestamp: u32,
        payload: &[u8],
    ) -> CodecResult<(ReadOutcome, Option<RemoteCommand<S>>)> {
        if !self.role().has_remote_owner() {
            tracing::debug!("client state ignored: entity has no remote owner here");
            return Ok((ReadOutcome::Ignored, None));
        }

        let mut reader = MessageReader::new(payload);
        let message = match self.secure {
            MovementSecure::NotSecure => ClientMessage::State(StateMessage::decode(&mut reader, false)?),
            MovementSecure::ServerAuthoritative => ClientMessage::Input(InputMessage::decode(&mut reader)?),
        };

        let confirms_teleport = if self.teleport.is_waiting_client_confirm() {
            if !message.movement_state().contains(MovementState::IS_TELEPORT) {
                tracing::debug!(timestamp, "client message dropped: awaiting teleport confirm");
                return Ok((ReadOutcome::AwaitingTeleportConfirm, None));
            }
            self.teleport.confirm_from_client();
            true
        } else {
            false
        };

        if !confirms_teleport {
            if let Some(accepted) = self.accepted_timestamp {
                if timestamp < accepted {
                    tracing::debug!(timestamp, accepted, "stale client message dropped");
                    return Ok((ReadOutcome::Stale, None));
                }
            }
        }
        let previous = self.accepted_timestamp;
        self.accepted_timestamp = Some(previous.map_or(timestamp, |p| p.max(timestamp)));

        Ok(match message {
            // the echo was sent from the new position; it becomes the baseline
            ClientMessage::State(state) => {
                self.apply_client_state(state, previous.filter(|_| !confirms_teleport), timestamp)
            }
            ClientMessage::Input(input) => self.apply_client_input(&input),
        })
    }

    fn apply_client_state(
        &mut self,
        message: StateMessage<S>,
        previous_timestamp: Option<u32>,
        timestamp: u32,
    ) -> (ReadOutcome, Option<RemoteCommand<S>>) {
        self.transient |= message.movement_state & MovementState::IS_JUMP;
        let state = message.movement_state - MovementState::TRANSIENT;
        let capabilities = self.entity.capabilities();
        // the owner dashed along its reported facing; budget for it before validating
        if message.movement_state.contains(MovementState::IS_DASH) {
            if capabilities.can_move && capabilities.can_dash {
                self.install_dash(S::facing_direction(message.facing));
            } else {
                tracing::debug!("client dash ignored: entity may not dash");
            }
        }
        let extra = validate_extra_movement_state(&capabilities, state, message.extra_movement_state);

        let verdict = match previous_timestamp {
            Some(previous) => {
                let delta_time = DriftTracker::delta_time(timestamp, previous);
                let force_speed: f32 = self.forces.iter().map(|f| f.current_speed).sum();
                let speed = self.entity.move_speed(state, extra) + force_speed;
                self.drift.validate(self.position, message.position, delta_time, speed)
            }
            None => PositionVerdict::Accepted,
        };

        self.movement_state = state;
        self.extra_movement_state = extra;
        self.facing = message.facing;

        match verdict {
            PositionVerdict::Accepted => {
                self.position = message.position;
                (ReadOutcome::Applied, None)
            }
            PositionVerdict::Corrected { position, excess_time } => {
                tracing::info!(excess_time, "claimed position exceeds movement budget, correcting client");
                (
                    ReadOutcome::Corrected,
                    Some(RemoteCommand::Correct {
                        position,
                        facing: message.facing,
                    }),
                )
            }
        }
    }

    fn apply_client_input(&mut self, message: &InputMessage<S>) -> (ReadOutcome, Option<RemoteCommand<S>>) {
        let input = message.merge_into(&self.last_received_input);
        self.last_received_input = input;

        self.requested_extra = input.extra_movement_state;
        if message.facing.is_some() {
            self.look_override = Some(input.facing);
        }
        if input.movement_state.contains(MovementState::IS_JUMP) {
            self.jump_requested = true;
        }
        if input.movement_state.contains(MovementState::IS_DASH) {
            self.dash_requested = true;
        }

        let mut command = None;
        if input.is_stopped {
            self.intent = MoveIntent::Idle;
        } else if input.is_key_movement {
            let directions = input.movement_state.directions();
            self.intent = if directions.is_empty() || !self.entity.capabilities().can_move {
                MoveIntent::Idle
            } else {
                MoveIntent::Key {
                    direction: input.position,
                    directions,
                    persistent: true,
                }
            };
        } else if message.position.is_some() && input.movement_state.has_direction_movement() {
            // an idle owner still reports its last destination
            command = Some(RemoteCommand::PointClick(input.position));
        }
        (ReadOutcome::Applied, command)
    }

    /// Non-server peers: applies a server state message.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::protocol::CodecError`] for malformed payloads; no
    /// state is changed in that case.
    pub fn read_server_state(&mut self, timestamp: u32, payload: &[u8]) -> CodecResult<ReadOutcome> {
        let role = self.role();
        if role.is_server {
            tracing::debug!("server state ignored on the server");
            return Ok(ReadOutcome::Ignored);
        }

        let message = StateMessage::<S>::decode(&mut MessageReader::new(payload), true)?;

        let is_teleport = message.movement_state.contains(MovementState::IS_TELEPORT);
        let replayed_teleport =
            is_teleport && self.last_teleport_timestamp.is_some_and(|last| timestamp <= last);
        if let Some(accepted) = self.accepted_timestamp {
            // the owner still has to echo a teleport that later states overtook
            let overtaken_teleport = is_teleport && role.is_owner_client && !replayed_teleport;
            if replayed_teleport || (timestamp < accepted && !overtaken_teleport) {
                tracing::debug!(timestamp, accepted, "stale server state dropped");
                return Ok(ReadOutcome::Stale);
            }
        }
        self.accepted_timestamp = Some(self.accepted_timestamp.map_or(timestamp, |a| a.max(timestamp)));

        if is_teleport {
            let still_move = message.movement_state != MovementState::IS_TELEPORT;
            self.last_teleport_timestamp = Some(timestamp);
            self.position = message.position;
            self.facing = message.facing;
            self.remote_target = None;
            self.forces.replace_with(message.forces);
            if !still_move {
                self.intent = MoveIntent::Idle;
                self.movement_state = MovementState::empty();
            }
            if role.is_owner_client {
                self.teleport.begin_client_confirm();
            } else {
                self.movement_state = message.movement_state - MovementState::IS_TELEPORT;
                self.extra_movement_state = message.extra_movement_state;
            }
            tracing::debug!(timestamp, still_move, "teleport received");
            return Ok(ReadOutcome::Teleported);
        }

        if role.is_owner_client && self.secure == MovementSecure::NotSecure {
            self.adopt_server_forces_as_owner(message.forces);
        } else {
            self.forces.replace_with(message.forces);
        }

        if role.is_owner_client {
            if self.secure == MovementSecure::ServerAuthoritative {
                let (position, result) = self.reconciler.reconcile(self.position, message.position);
                if let ReconciliationResult::Snap { error } = result {
                    tracing::debug!(error, "snapping to server position");
                }
                self.position = position;
            }
            return Ok(ReadOutcome::Applied);
        }

        self.movement_state = message.movement_state;
        self.extra_movement_state = message.extra_movement_state;
        match self.reconciler.classify((message.position - self.position).length()) {
            ReconciliationResult::Snap { .. } => {
                self.position = message.position;
                self.facing = message.facing;
                self.remote_target = None;
            }
            ReconciliationResult::NoCorrection | ReconciliationResult::SmallCorrection { .. } => {
                self.remote_target = Some((message.position, message.facing));
            }
        }
        Ok(ReadOutcome::Applied)
    }

    /// Client-authoritative owners simulate their own dashes: the server's
    /// echoed dash is skipped and the local replace-movement force survives.
    fn adopt_server_forces_as_owner(&mut self, forces: Vec<ForceApplier>) {
        let local_replace = self.forces.replace_movement();
        self.forces
            .replace_with(forces.into_iter().filter(|f| f.mode != ForceApplyMode::Dash));
        if let Some(force) = local_replace {
            self.forces.apply(force);
        }
    }
}
