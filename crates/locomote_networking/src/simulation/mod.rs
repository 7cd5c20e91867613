//! # Network Simulation
//!
//! Drives owner, server and observer replicas of many entities through
//! simulated links to soak-test the movement protocol.
//!
//! ## Features
//!
//! - Packet loss (unreliable messages only)
//! - Latency with jitter, which also reorders messages
//! - Duplicated packets
//! - Random server teleports and knockback forces
//!
//! ```text
//! owner ──up link──► server mailbox ──► server ──down links──► owner mailbox
//!                                                        └───► observer mailbox
//! ```

use std::time::Duration;

use locomote_shared::{EntityRole, MovementConfig, MovementSecure, MovementState, Vec3};

use crate::backend::{CapsuleMovement, FlatGround, MovementBackend};
use crate::force::{ForceApplyMode, ForceSource};
use crate::integration::StatEntity;
use crate::mailbox::{DrainStats, InboundMessage, MovementMailbox};
use crate::protocol::OutboundMessage;

/// Network conditions for simulation.
#[derive(Clone, Debug)]
pub struct NetworkConditions {
    /// Base latency in milliseconds.
    pub base_latency_ms: u32,
    /// Jitter (variance) in milliseconds.
    pub jitter_ms: u32,
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        base_latency_ms: 1,
        jitter_ms: 0,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Good network conditions (fiber).
    pub const GOOD: Self = Self {
        base_latency_ms: 20,
        jitter_ms: 5,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        base_latency_ms: 50,
        jitter_ms: 20,
        packet_loss_percent: 1,
        duplicate_percent: 1,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        base_latency_ms: 100,
        jitter_ms: 50,
        packet_loss_percent: 5,
        duplicate_percent: 2,
    };

    /// Generates a latency value with jitter.
    #[must_use]
    pub fn generate_latency(&self, rng_value: u32) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            (rng_value % (self.jitter_ms * 2)) as i32 - self.jitter_ms as i32
        } else {
            0
        };
        let latency = (self.base_latency_ms as i32 + jitter).max(0) as u64;
        Duration::from_millis(latency)
    }

    /// Returns true if packet should be dropped.
    #[must_use]
    pub fn should_drop(&self, rng_value: u32) -> bool {
        (rng_value % 100) < u32::from(self.packet_loss_percent)
    }

    /// Returns true if packet should be duplicated.
    #[must_use]
    pub fn should_duplicate(&self, rng_value: u32) -> bool {
        (rng_value % 100) < u32::from(self.duplicate_percent)
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// Simple Linear Congruential Generator for deterministic randomness.
#[derive(Clone, Debug)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Seeds the generator (zero is remapped, MINSTD would stick at it).
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    /// Next value in `[1, 2^31 - 1)`.
    pub fn next(&mut self) -> u32 {
        // LCG parameters (same as MINSTD)
        self.state = self.state.wrapping_mul(48271).wrapping_rem(2147483647);
        self.state as u32
    }

    /// Next value in `(0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.next() as f32 / 2147483647.0
    }
}

/// One direction of a simulated connection.
#[derive(Clone, Debug)]
pub struct SimulatedLink {
    conditions: NetworkConditions,
    in_flight: Vec<(u64, InboundMessage)>,
    sent: u64,
    dropped: u64,
}

impl SimulatedLink {
    /// Creates an empty link.
    #[must_use]
    pub const fn new(conditions: NetworkConditions) -> Self {
        Self {
            conditions,
            in_flight: Vec::new(),
            sent: 0,
            dropped: 0,
        }
    }

    /// Puts a message on the wire. Reliable messages are never lost.
    pub fn send(&mut self, now_ms: u64, message: OutboundMessage, rng: &mut SimpleRng) {
        self.sent += 1;
        if !message.reliable && self.conditions.should_drop(rng.next()) {
            self.dropped += 1;
            return;
        }
        let copies = if self.conditions.should_duplicate(rng.next()) { 2 } else { 1 };
        let message = InboundMessage::from(message);
        for _ in 0..copies {
            let latency = self.conditions.generate_latency(rng.next()).as_millis() as u64;
            self.in_flight.push((now_ms + latency, message.clone()));
        }
    }

    /// Posts every message due at `now_ms` into `mailbox`, earliest first.
    /// Returns how many were posted.
    pub fn deliver(&mut self, now_ms: u64, mailbox: &MovementMailbox) -> usize {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.in_flight.drain(..).partition(|(at, _)| *at <= now_ms);
        self.in_flight = pending;
        due.sort_by_key(|(at, _)| *at);

        let mut posted = 0;
        for (_, message) in due {
            if mailbox.post(message).is_ok() {
                posted += 1;
            } else {
                self.dropped += 1;
            }
        }
        posted
    }

    /// Messages handed to the link.
    #[must_use]
    pub const fn sent(&self) -> u64 {
        self.sent
    }

    /// Messages lost on the link or at a full mailbox.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Messages still travelling.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Configuration for a soak run.
#[derive(Clone, Debug)]
pub struct SoakConfig {
    /// Number of simulated entities.
    pub entity_count: usize,
    /// Tick rate.
    pub tick_rate: u32,
    /// Duration to run simulation.
    pub duration_secs: u32,
    /// Network conditions.
    pub network: NetworkConditions,
    /// Authority mode of every entity.
    pub secure: MovementSecure,
    /// Arena size (square).
    pub arena_size: f32,
    /// Mean ticks between server teleports per entity (0 = never).
    pub teleport_interval_ticks: u32,
    /// Mean ticks between knockback forces per entity (0 = never).
    pub knockback_interval_ticks: u32,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            entity_count: 200,
            tick_rate: 30,
            duration_secs: 60,
            network: NetworkConditions::AVERAGE,
            secure: MovementSecure::ServerAuthoritative,
            arena_size: 100.0,
            teleport_interval_ticks: 900,
            knockback_interval_ticks: 300,
            seed: 12345,
        }
    }
}

/// Soak statistics.
#[derive(Clone, Debug, Default)]
pub struct SoakStats {
    /// Total ticks simulated.
    pub total_ticks: u64,
    /// Messages handed to links.
    pub messages_sent: u64,
    /// Messages lost in transit.
    pub messages_lost: u64,
    /// Messages applied by a backend.
    pub messages_applied: u64,
    /// Valid messages not applied (stale, awaiting teleport confirm).
    pub messages_discarded: u64,
    /// Malformed messages.
    pub messages_rejected: u64,
    /// Server teleports issued.
    pub teleports: u64,
    /// Knockback forces applied.
    pub knockbacks: u64,
    /// Drift corrections issued by servers.
    pub drift_corrections: u64,
    /// Average observer-to-server position error.
    pub avg_observer_error: f32,
    /// Maximum observer-to-server position error.
    pub max_observer_error: f32,
    /// Average owner-to-server position error.
    pub avg_owner_error: f32,
}

type SoakBody = CapsuleMovement<StatEntity, FlatGround>;

struct SoakEntity {
    owner: SoakBody,
    server: SoakBody,
    observer: SoakBody,
    up: SimulatedLink,
    down_owner: SimulatedLink,
    down_observer: SimulatedLink,
    server_mailbox: MovementMailbox,
    owner_mailbox: MovementMailbox,
    observer_mailbox: MovementMailbox,
    target: Vec3,
}

impl SoakEntity {
    fn new(config: &SoakConfig, spawn: Vec3) -> Self {
        let movement = MovementConfig::default();
        let body = |role| {
            CapsuleMovement::new(
                StatEntity::new(role),
                config.secure,
                movement.clone(),
                FlatGround::new(0.0),
                spawn,
            )
        };
        Self {
            owner: body(EntityRole::OWNER_CLIENT),
            server: body(EntityRole::SERVER_REMOTE_OWNER),
            observer: body(EntityRole::OBSERVER_CLIENT),
            up: SimulatedLink::new(config.network.clone()),
            down_owner: SimulatedLink::new(config.network.clone()),
            down_observer: SimulatedLink::new(config.network.clone()),
            server_mailbox: MovementMailbox::from_config(&movement),
            owner_mailbox: MovementMailbox::from_config(&movement),
            observer_mailbox: MovementMailbox::from_config(&movement),
            target: spawn,
        }
    }

    fn links(&self) -> [&SimulatedLink; 3] {
        [&self.up, &self.down_owner, &self.down_observer]
    }
}

/// Many-entity soak test over simulated links.
pub struct MovementSoak {
    config: SoakConfig,
    entities: Vec<SoakEntity>,
    rng: SimpleRng,
    now_ms: u64,
    current_tick: u64,
    stats: SoakStats,
    observer_error_sum: f64,
    owner_error_sum: f64,
    error_samples: u64,
}

impl MovementSoak {
    /// Creates the simulation with every entity at a random spawn.
    #[must_use]
    pub fn new(config: SoakConfig) -> Self {
        let mut rng = SimpleRng::new(config.seed);
        let entities = (0..config.entity_count)
            .map(|_| {
                let spawn = random_point(&mut rng, config.arena_size);
                SoakEntity::new(&config, spawn)
            })
            .collect();
        Self {
            config,
            entities,
            rng,
            now_ms: 0,
            current_tick: 0,
            stats: SoakStats::default(),
            observer_error_sum: 0.0,
            owner_error_sum: 0.0,
            error_samples: 0,
        }
    }

    /// Runs one tick. Returns `false` once the configured duration elapsed.
    pub fn tick(&mut self) -> bool {
        let total_ticks = u64::from(self.config.duration_secs) * u64::from(self.config.tick_rate);
        if self.current_tick >= total_ticks {
            return false;
        }

        let tick_rate = self.config.tick_rate.max(1);
        let delta_time = 1.0 / tick_rate as f32;
        self.now_ms += 1000 / u64::from(tick_rate);
        let timestamp = self.now_ms as u32;

        for entity in &mut self.entities {
            step_entity(&self.config, &mut self.rng, &mut self.stats, entity, self.now_ms, timestamp, delta_time);

            let observer_error = entity.observer.position().distance(entity.server.position());
            let owner_error = entity.owner.position().distance(entity.server.position());
            self.observer_error_sum += f64::from(observer_error);
            self.owner_error_sum += f64::from(owner_error);
            self.error_samples += 1;
            self.stats.max_observer_error = self.stats.max_observer_error.max(observer_error);
        }

        self.current_tick += 1;
        self.stats.total_ticks = self.current_tick;
        self.refresh_stats();
        true
    }

    /// Runs to completion.
    pub fn run(&mut self) -> &SoakStats {
        while self.tick() {}
        &self.stats
    }

    /// Statistics so far.
    #[must_use]
    pub const fn stats(&self) -> &SoakStats {
        &self.stats
    }

    /// Ticks simulated.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &SoakConfig {
        &self.config
    }

    fn refresh_stats(&mut self) {
        let samples = self.error_samples.max(1) as f64;
        self.stats.avg_observer_error = (self.observer_error_sum / samples) as f32;
        self.stats.avg_owner_error = (self.owner_error_sum / samples) as f32;

        let mut sent = 0;
        let mut lost = 0;
        let mut corrections = 0;
        for entity in &self.entities {
            for link in entity.links() {
                sent += link.sent();
                lost += link.dropped();
            }
            corrections += u64::from(entity.server.drift_report().corrections);
        }
        self.stats.messages_sent = sent;
        self.stats.messages_lost = lost;
        self.stats.drift_corrections = corrections;
    }
}

fn random_point(rng: &mut SimpleRng, arena_size: f32) -> Vec3 {
    let half = arena_size * 0.5;
    Vec3::new(rng.next_f32() * arena_size - half, 0.0, rng.next_f32() * arena_size - half)
}

fn record(stats: &mut SoakStats, drained: DrainStats) {
    stats.messages_applied += u64::from(drained.applied);
    stats.messages_discarded += u64::from(drained.dropped);
    stats.messages_rejected += u64::from(drained.rejected);
}

fn chance(rng: &mut SimpleRng, interval: u32) -> bool {
    interval > 0 && rng.next() % interval == 0
}

fn step_entity(
    config: &SoakConfig,
    rng: &mut SimpleRng,
    stats: &mut SoakStats,
    entity: &mut SoakEntity,
    now_ms: u64,
    timestamp: u32,
    delta_time: f32,
) {
    // owner: steer toward a wandering target
    let to_target = (entity.target - entity.owner.position()).with_y(0.0);
    if to_target.length() < 1.0 {
        entity.target = random_point(rng, config.arena_size);
    } else {
        let mut state = MovementState::FORWARD;
        if rng.next() % 120 == 0 {
            state |= MovementState::IS_JUMP;
        }
        entity.owner.key_movement(to_target, state);
    }
    entity.owner.tick(delta_time);
    if let Some(message) = entity.owner.write_client_state(timestamp) {
        entity.up.send(now_ms, message, rng);
    }

    // server
    entity.up.deliver(now_ms, &entity.server_mailbox);
    record(stats, entity.server_mailbox.drain_into(&mut entity.server));

    if chance(rng, config.teleport_interval_ticks) {
        let destination = random_point(rng, config.arena_size);
        let facing = entity.server.facing();
        if entity.server.teleport(destination, facing, false) {
            stats.teleports += 1;
        }
    }
    if chance(rng, config.knockback_interval_ticks) {
        let angle = rng.next_f32() * std::f32::consts::TAU;
        let direction = Vec3::new(angle.sin(), 0.0, angle.cos());
        if entity
            .server
            .apply_force(ForceApplyMode::Default, direction, ForceSource::NONE, 8.0, 16.0, 0.0)
        {
            stats.knockbacks += 1;
        }
    }
    entity.server.tick(delta_time);
    if let Some(message) = entity.server.write_server_state(timestamp) {
        entity.down_owner.send(now_ms, message.clone(), rng);
        entity.down_observer.send(now_ms, message, rng);
    }

    // clients
    entity.down_owner.deliver(now_ms, &entity.owner_mailbox);
    record(stats, entity.owner_mailbox.drain_into(&mut entity.owner));
    entity.down_observer.deliver(now_ms, &entity.observer_mailbox);
    record(stats, entity.observer_mailbox.drain_into(&mut entity.observer));
    entity.observer.tick(delta_time);
}
