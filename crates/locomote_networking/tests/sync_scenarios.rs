//! # Movement Sync Scenarios
//!
//! End-to-end exchanges between owner, server and observer replicas:
//!
//! 1. **Server-authoritative input**: key, point-click and stop flows
//! 2. **Client-authoritative state**: drift correction, dashes, stale messages
//! 3. **Teleport handshake**: reliable marks, echo, awaitable confirmation
//! 4. **Forces**: server-only application, replication, dash
//!
//! Run with: cargo test --package locomote_networking --test sync_scenarios

use locomote_networking::backend::{CapsuleMovement, FlatGround, MovementBackend, ReadOutcome, RigidBody2DMovement};
use locomote_networking::force::{ForceApplyMode, ForceSource, ForceSourceType};
use locomote_networking::protocol::{MessageKind, MessageWriter, OutboundMessage, StateMessage};
use locomote_networking::{StatEntity, MAX_MESSAGE_SIZE};
use locomote_shared::{
    EntityRole, ExtraMovementState, MovementConfig, MovementSecure, MovementState, Vec2, Vec3,
    MAX_STATE_FORCES,
};

const DT: f32 = 0.1;

fn capsule(role: EntityRole, secure: MovementSecure) -> CapsuleMovement<StatEntity> {
    CapsuleMovement::new(
        StatEntity::new(role),
        secure,
        MovementConfig::default(),
        FlatGround::new(0.0),
        Vec3::ZERO,
    )
}

fn body(role: EntityRole) -> RigidBody2DMovement<StatEntity> {
    RigidBody2DMovement::new(
        StatEntity::new(role),
        MovementSecure::ServerAuthoritative,
        MovementConfig::default(),
        Vec2::ZERO,
    )
}

fn deliver<B: MovementBackend>(to: &mut B, message: &OutboundMessage) -> ReadOutcome {
    match message.kind {
        MessageKind::ServerState => to
            .read_server_state_at_client(message.timestamp, &message.payload)
            .unwrap(),
        MessageKind::ClientInput | MessageKind::ClientState => to
            .read_client_state_at_server(message.timestamp, &message.payload)
            .unwrap(),
    }
}

fn client_state(position: Vec3, movement_state: MovementState) -> Vec<u8> {
    let message = StateMessage {
        movement_state,
        extra_movement_state: ExtraMovementState::None,
        position,
        facing: 0.0,
        forces: Vec::new(),
    };
    let mut writer = MessageWriter::new();
    message.encode(&mut writer, false).unwrap();
    writer.to_vec()
}

// ============================================================================
// SERVER-AUTHORITATIVE INPUT
// ============================================================================

#[test]
fn key_movement_replicates_to_server_and_observer() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::ServerAuthoritative);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::ServerAuthoritative);
    let mut observer = capsule(EntityRole::OBSERVER_CLIENT, MovementSecure::ServerAuthoritative);

    let mut inputs_sent = 0;
    for tick in 1..=10u32 {
        let timestamp = tick * 100;
        owner.key_movement(Vec3::Z, MovementState::FORWARD);
        owner.tick(DT);
        if let Some(input) = owner.write_client_state(timestamp) {
            assert_eq!(input.kind, MessageKind::ClientInput);
            assert_eq!(deliver(&mut server, &input), ReadOutcome::Applied);
            inputs_sent += 1;
        }

        server.tick(DT);
        let state = server.write_server_state(timestamp).unwrap();
        assert_eq!(deliver(&mut owner, &state), ReadOutcome::Applied);
        assert_eq!(deliver(&mut observer, &state), ReadOutcome::Applied);
        observer.tick(DT);
    }

    // unchanged input is not resent
    assert_eq!(inputs_sent, 1);
    assert!((server.position().z - 5.0).abs() < 1e-3);
    assert!((owner.position().z - 5.0).abs() < 1e-3);
    assert!((observer.position().z - 5.0).abs() < 1e-3);
    assert!(observer.movement_state().contains(MovementState::FORWARD));
}

#[test]
fn point_click_input_paths_on_server() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::ServerAuthoritative);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::ServerAuthoritative);
    let target = Vec3::new(0.0, 0.0, 3.0);

    assert!(owner.point_click_movement(target));
    owner.tick(DT);
    let input = owner.write_client_state(100).unwrap();
    assert_eq!(deliver(&mut server, &input), ReadOutcome::Applied);

    for _ in 0..12 {
        server.tick(DT);
    }
    assert!(server.position().distance(target) <= 0.1 + 1e-3);
    assert!(!server.movement_state().has_direction_movement());
}

#[test]
fn stop_move_is_sent_and_halts_server() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::ServerAuthoritative);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::ServerAuthoritative);

    owner.key_movement(Vec3::Z, MovementState::FORWARD);
    owner.tick(DT);
    deliver(&mut server, &owner.write_client_state(100).unwrap());
    server.tick(DT);
    server.tick(DT);
    assert!(server.position().z > 0.9);

    owner.stop_move();
    owner.tick(DT);
    let stop = owner.write_client_state(200).unwrap();
    assert_eq!(deliver(&mut server, &stop), ReadOutcome::Applied);

    let halted = server.position();
    server.tick(DT);
    assert_eq!(server.position(), halted);
}

#[test]
fn rigid_body_input_replicates_in_2d() {
    let mut owner = body(EntityRole::OWNER_CLIENT);
    let mut server = body(EntityRole::SERVER_REMOTE_OWNER);

    owner.key_movement(Vec2::new(1.0, 0.0), MovementState::RIGHT);
    owner.tick(0.25);
    deliver(&mut server, &owner.write_client_state(250).unwrap());

    for _ in 0..4 {
        server.tick(0.25);
    }
    assert!((server.position().x - 5.0).abs() < 1e-3);
    assert!((server.facing().x - 1.0).abs() < 1e-4);
}

#[test]
fn sprint_state_validated_on_server() {
    let mut server = capsule(EntityRole::SERVER_OWNED, MovementSecure::ServerAuthoritative);
    server.set_extra_movement_state(ExtraMovementState::IsSprinting);

    server.tick(DT);
    assert_eq!(server.extra_movement_state(), ExtraMovementState::None);

    server.key_movement(Vec3::Z, MovementState::FORWARD);
    server.tick(DT);
    assert_eq!(server.extra_movement_state(), ExtraMovementState::IsSprinting);
}

// ============================================================================
// CLIENT-AUTHORITATIVE STATE
// ============================================================================

#[test]
fn overshooting_client_is_corrected_through_teleport() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::NotSecure);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);

    owner.tick(DT);
    let baseline = owner.write_client_state(100).unwrap();
    assert_eq!(baseline.kind, MessageKind::ClientState);
    assert_eq!(deliver(&mut server, &baseline), ReadOutcome::Applied);

    // 5 units in 100ms at 5 units/s
    let cheat = client_state(Vec3::new(5.0, 0.0, 0.0), MovementState::FORWARD | MovementState::IS_GROUNDED);
    assert_eq!(server.read_client_state_at_server(200, &cheat).unwrap(), ReadOutcome::Corrected);
    assert!((server.position().x - 0.5).abs() < 1e-4);
    assert_eq!(server.drift_report().corrections, 1);

    // pre-teleport traffic is dropped until the echo
    let late = client_state(Vec3::new(5.1, 0.0, 0.0), MovementState::FORWARD);
    assert_eq!(
        server.read_client_state_at_server(300, &late).unwrap(),
        ReadOutcome::AwaitingTeleportConfirm
    );

    let teleport = server.write_server_state(300).unwrap();
    assert!(teleport.reliable);
    assert_eq!(deliver(&mut owner, &teleport), ReadOutcome::Teleported);
    assert!((owner.position().x - 0.5).abs() < 1e-4);

    let echo = owner.write_client_state(400).unwrap();
    assert!(echo.reliable);
    assert_eq!(deliver(&mut server, &echo), ReadOutcome::Applied);
    assert!(!server.sync().is_waiting_teleport_confirm());
}

#[test]
fn honest_client_state_is_accepted() {
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);
    let moving = MovementState::FORWARD | MovementState::IS_GROUNDED;

    for (i, timestamp) in (100..=500).step_by(100).enumerate() {
        let position = Vec3::new(0.0, 0.0, 0.5 * i as f32);
        let payload = client_state(position, moving);
        assert_eq!(server.read_client_state_at_server(timestamp, &payload).unwrap(), ReadOutcome::Applied);
    }
    assert!((server.position().z - 2.0).abs() < 1e-5);
    assert_eq!(server.drift_report().corrections, 0);
}

#[test]
fn stale_client_state_is_dropped() {
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);
    let newer = client_state(Vec3::new(0.1, 0.0, 0.0), MovementState::IS_GROUNDED);
    let older = client_state(Vec3::new(0.2, 0.0, 0.0), MovementState::IS_GROUNDED);

    assert_eq!(server.read_client_state_at_server(500, &newer).unwrap(), ReadOutcome::Applied);
    assert_eq!(server.read_client_state_at_server(400, &older).unwrap(), ReadOutcome::Stale);
    assert!((server.position().x - 0.1).abs() < 1e-6);
    assert_eq!(server.sync().accepted_timestamp(), Some(500));
}

#[test]
fn client_dash_is_budgeted_by_drift_validation() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::NotSecure);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);

    owner.key_movement(Vec3::Z, MovementState::FORWARD);
    owner.tick(DT);
    assert_eq!(deliver(&mut server, &owner.write_client_state(100).unwrap()), ReadOutcome::Applied);

    owner.key_movement(Vec3::Z, MovementState::FORWARD | MovementState::IS_DASH);
    owner.tick(DT);
    // 0.5 walked, then 1.6 dashed
    assert!((owner.position().z - 2.1).abs() < 1e-4);

    let dash = owner.write_client_state(200).unwrap();
    assert_eq!(deliver(&mut server, &dash), ReadOutcome::Applied);
    assert_eq!(server.drift_report().corrections, 0);
    assert!((server.position().z - 2.1).abs() < 1e-4);
    assert!(server.forces().has_replace_movement());

    let relay = server.write_server_state(200).unwrap();
    assert!(relay.reliable);
}

#[test]
fn owner_keeps_local_dash_over_server_forces() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::NotSecure);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);

    owner.key_movement(Vec3::Z, MovementState::FORWARD | MovementState::IS_DASH);
    owner.tick(DT);
    assert_eq!(owner.forces().len(), 1);

    // server still knows nothing about the dash
    let state = server.write_server_state(100).unwrap();
    assert_eq!(deliver(&mut owner, &state), ReadOutcome::Applied);
    assert_eq!(owner.forces().len(), 1);
    assert!(owner.forces().has_replace_movement());

    let before = owner.position().z;
    owner.key_movement(Vec3::Z, MovementState::FORWARD);
    owner.tick(DT);
    // dash speed 16 -> 12, well above walking
    assert!((owner.position().z - before - 1.2).abs() < 1e-4);
}

#[test]
fn stale_server_states_do_not_rewind_clients() {
    let mut server = capsule(EntityRole::SERVER_OWNED, MovementSecure::ServerAuthoritative);
    let mut observer = capsule(EntityRole::OBSERVER_CLIENT, MovementSecure::ServerAuthoritative);

    server.teleport(Vec3::new(10.0, 0.0, 0.0), 0.0, false);
    let old_teleport = server.write_server_state(100).unwrap();
    server.teleport(Vec3::new(50.0, 0.0, 0.0), 0.0, false);
    let new_teleport = server.write_server_state(200).unwrap();

    assert_eq!(deliver(&mut observer, &new_teleport), ReadOutcome::Teleported);
    assert_eq!(deliver(&mut observer, &old_teleport), ReadOutcome::Stale);
    assert!((observer.position().x - 50.0).abs() < 1e-4);

    server.key_movement(Vec3::Z, MovementState::FORWARD);
    server.tick(DT);
    let current = server.write_server_state(300).unwrap();
    let reordered = server.write_server_state(250).unwrap();
    assert_eq!(deliver(&mut observer, &current), ReadOutcome::Applied);
    let position = observer.position();
    assert_eq!(deliver(&mut observer, &reordered), ReadOutcome::Stale);
    assert_eq!(observer.position(), position);
    assert_eq!(observer.sync().accepted_timestamp(), Some(300));
}

#[test]
fn owner_echoes_teleport_overtaken_by_later_state() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::NotSecure);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);

    server.teleport(Vec3::new(8.0, 0.0, 0.0), 0.0, false);
    let teleport = server.write_server_state(100).unwrap();
    let later = server.write_server_state(133).unwrap();

    assert_eq!(deliver(&mut owner, &later), ReadOutcome::Applied);
    assert_eq!(deliver(&mut owner, &teleport), ReadOutcome::Teleported);
    assert!((owner.position().x - 8.0).abs() < 1e-4);
    // a redelivered copy is not applied twice
    assert_eq!(deliver(&mut owner, &teleport), ReadOutcome::Stale);

    let echo = owner.write_client_state(200).unwrap();
    assert!(echo.reliable);
    assert_eq!(deliver(&mut server, &echo), ReadOutcome::Applied);
    assert!(!server.sync().is_waiting_teleport_confirm());
}

#[test]
fn teleport_survives_a_crowded_force_list() {
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::ServerAuthoritative);
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::ServerAuthoritative);

    for level in 0..60 {
        let source = ForceSource::new(ForceSourceType::Buff, u32::MAX, level);
        assert!(server.apply_force(ForceApplyMode::Default, Vec3::X, source, 5.0, 1.0, 0.0));
    }
    server.teleport(Vec3::new(3.0, 0.0, 0.0), 0.0, false);

    let state = server.write_server_state(100).unwrap();
    assert!(state.reliable);
    assert!(state.payload.len() <= MAX_MESSAGE_SIZE);
    assert_eq!(deliver(&mut owner, &state), ReadOutcome::Teleported);
    assert_eq!(owner.forces().len(), MAX_STATE_FORCES);
    assert!((owner.position().x - 3.0).abs() < 1e-4);

    let echo = owner.write_client_state(200).unwrap();
    assert_eq!(deliver(&mut server, &echo), ReadOutcome::Applied);
    assert!(!server.sync().is_waiting_teleport_confirm());
}

#[test]
fn late_teleport_echo_keeps_accepted_timestamp() {
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);

    let baseline = client_state(Vec3::ZERO, MovementState::IS_GROUNDED);
    assert_eq!(server.read_client_state_at_server(300, &baseline).unwrap(), ReadOutcome::Applied);
    server.teleport(Vec3::X, 0.0, false);
    server.write_server_state(300).unwrap();

    // echo stamped before the last accepted message
    let echo = client_state(Vec3::X, MovementState::IS_TELEPORT | MovementState::IS_GROUNDED);
    assert_eq!(server.read_client_state_at_server(250, &echo).unwrap(), ReadOutcome::Applied);
    assert!(!server.sync().is_waiting_teleport_confirm());
    assert_eq!(server.sync().accepted_timestamp(), Some(300));
}

#[test]
fn malformed_payload_leaves_state_untouched() {
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::NotSecure);
    let mut payload = client_state(Vec3::new(1.0, 0.0, 0.0), MovementState::IS_GROUNDED);
    payload.truncate(4);

    assert!(server.read_client_state_at_server(100, &payload).is_err());
    assert_eq!(server.position(), Vec3::ZERO);
    assert_eq!(server.sync().accepted_timestamp(), None);
}

#[test]
fn observer_snaps_on_large_error() {
    let mut server = capsule(EntityRole::SERVER_OWNED, MovementSecure::ServerAuthoritative);
    let mut observer = capsule(EntityRole::OBSERVER_CLIENT, MovementSecure::ServerAuthoritative);

    server.key_movement(Vec3::Z, MovementState::FORWARD);
    for _ in 0..12 {
        server.tick(DT);
    }
    let state = server.write_server_state(1200).unwrap();
    assert_eq!(deliver(&mut observer, &state), ReadOutcome::Applied);
    assert_eq!(observer.position(), server.position());
}

// ============================================================================
// TELEPORT HANDSHAKE
// ============================================================================

#[tokio::test]
async fn teleport_waiter_completes_after_client_echo() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::ServerAuthoritative);
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::ServerAuthoritative);

    assert!(server.teleport(Vec3::new(10.0, 4.0, 10.0), 90.0, false));
    // grounded on arrival
    assert_eq!(server.position(), Vec3::new(10.0, 0.0, 10.0));

    let waiter = tokio::spawn(server.teleport_confirm_waiter().wait());
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    let state = server.write_server_state(100).unwrap();
    assert!(state.reliable);
    assert_eq!(deliver(&mut owner, &state), ReadOutcome::Teleported);
    assert_eq!(owner.position(), Vec3::new(10.0, 0.0, 10.0));
    assert!((owner.facing() - 90.0).abs() < 1e-3);

    owner.tick(DT);
    let echo = owner.write_client_state(200).unwrap();
    assert!(echo.reliable);
    assert_eq!(deliver(&mut server, &echo), ReadOutcome::Applied);

    waiter.await.unwrap();
    // an idle echo does not move the server
    server.tick(DT);
    assert_eq!(server.position(), Vec3::new(10.0, 0.0, 10.0));
}

#[tokio::test]
async fn teleport_waiter_completes_when_entity_destroyed() {
    let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER, MovementSecure::ServerAuthoritative);
    assert!(server.teleport(Vec3::X, 0.0, true));

    let waiter = tokio::spawn(server.teleport_confirm_waiter().wait());
    server.mark_destroyed();
    waiter.await.unwrap();
}

#[test]
fn still_move_teleport_keeps_direction_flags() {
    let mut server = capsule(EntityRole::SERVER_OWNED, MovementSecure::ServerAuthoritative);
    let mut observer = capsule(EntityRole::OBSERVER_CLIENT, MovementSecure::ServerAuthoritative);

    server.key_movement(Vec3::Z, MovementState::FORWARD);
    server.tick(DT);
    assert!(server.teleport(Vec3::new(30.0, 0.0, 0.0), 0.0, true));
    // server-owned: nobody to wait for
    assert!(!server.sync().is_waiting_teleport_confirm());

    let state = server.write_server_state(100).unwrap();
    assert_eq!(deliver(&mut observer, &state), ReadOutcome::Teleported);
    assert_eq!(observer.position(), Vec3::new(30.0, 0.0, 0.0));
    assert!(observer.movement_state().contains(MovementState::FORWARD));

    // the key intent survived on the server
    server.tick(DT);
    assert!(server.position().z > 0.0);
}

#[test]
fn teleport_is_server_only() {
    let mut owner = capsule(EntityRole::OWNER_CLIENT, MovementSecure::ServerAuthoritative);
    assert!(!owner.teleport(Vec3::new(5.0, 0.0, 5.0), 0.0, false));
    assert_eq!(owner.position(), Vec3::ZERO);
}

// ============================================================================
// FORCES
// ============================================================================

#[test]
fn forces_are_server_only_and_replicated() {
    let mut server = capsule(EntityRole::SERVER_OWNED, MovementSecure::ServerAuthoritative);
    let mut observer = capsule(EntityRole::OBSERVER_CLIENT, MovementSecure::ServerAuthoritative);
    let source = ForceSource::new(ForceSourceType::Skill, 7, 2);

    assert!(!observer.apply_force(ForceApplyMode::Default, Vec3::X, source, 8.0, 4.0, 0.0));
    assert!(!observer.clear_all_forces());
    // never decays
    assert!(!server.apply_force(ForceApplyMode::Default, Vec3::X, source, 8.0, 0.0, 0.0));
    assert!(server.apply_force(ForceApplyMode::Default, Vec3::X, source, 8.0, 4.0, 0.0));

    server.tick(DT);
    assert!((server.position().x - 0.76).abs() < 1e-4);

    let state = server.write_server_state(100).unwrap();
    assert_eq!(deliver(&mut observer, &state), ReadOutcome::Applied);
    let forces = observer.forces().as_slice();
    assert_eq!(forces.len(), 1);
    assert_eq!(forces[0].source, source);
    assert!((forces[0].current_speed - 7.6).abs() < 1e-2);

    assert!(server.clear_all_forces());
    assert!(server.forces().is_empty());
}

#[test]
fn dash_replaces_movement_and_is_sent_reliably() {
    let mut server = capsule(EntityRole::SERVER_OWNED, MovementSecure::ServerAuthoritative);
    let mut observer = capsule(EntityRole::OBSERVER_CLIENT, MovementSecure::ServerAuthoritative);

    server.key_movement(Vec3::Z, MovementState::FORWARD | MovementState::IS_DASH);
    server.tick(DT);
    // dash speed 20 after one tick of 40/s deceleration
    assert!((server.position().z - 1.6).abs() < 1e-4);
    assert!(server.forces().has_replace_movement());

    let state = server.write_server_state(100).unwrap();
    assert!(state.reliable);
    deliver(&mut observer, &state);
    assert!(observer.movement_state().contains(MovementState::IS_DASH));

    // transient flag is sent once
    server.tick(DT);
    let next = server.write_server_state(200).unwrap();
    assert!(!next.reliable);
}
