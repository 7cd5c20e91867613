//! # Movement Codec Benchmark
//!
//! Encode/decode cost of state and input messages, and the cost of one
//! backend tick with active forces.
//!
//! Run with: `cargo bench --package locomote_networking`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use locomote_networking::input::EntityMovementInput;
use locomote_networking::protocol::{MessageReader, MessageWriter};
use locomote_networking::{
    CapsuleMovement, FlatGround, ForceApplier, ForceApplyMode, ForceSource, InputMessage,
    MovementBackend, StatEntity, StateMessage,
};
use locomote_shared::{
    EntityRole, ExtraMovementState, MovementConfig, MovementSecure, MovementState, Vec2, Vec3,
};

fn state_message(force_count: usize) -> StateMessage<Vec3> {
    let forces = (0..force_count)
        .map(|i| {
            let f = i as f32;
            ForceApplier::new(
                ForceApplyMode::Default,
                Vec3::new(f.sin(), 0.0, f.cos()),
                ForceSource::NONE,
                10.0 + f,
                5.0,
                0.0,
            )
        })
        .collect();
    StateMessage {
        movement_state: MovementState::FORWARD | MovementState::IS_GROUNDED,
        extra_movement_state: ExtraMovementState::IsSprinting,
        position: Vec3::new(12.5, 0.0, -40.25),
        facing: 123.4,
        forces,
    }
}

/// Benchmark: state message encode + decode with a growing force list.
fn bench_state_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_message");

    for force_count in [0, 4, 16] {
        let message = state_message(force_count);
        group.bench_with_input(BenchmarkId::new("encode", force_count), &message, |b, message| {
            let mut writer = MessageWriter::new();
            b.iter(|| {
                writer.reset();
                message.encode(&mut writer, true).unwrap();
                black_box(writer.len())
            });
        });

        let mut writer = MessageWriter::new();
        message.encode(&mut writer, true).unwrap();
        let bytes = writer.to_vec();
        group.bench_with_input(BenchmarkId::new("decode", force_count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut reader = MessageReader::new(black_box(bytes));
                black_box(StateMessage::<Vec3>::decode(&mut reader, true).unwrap())
            });
        });
    }

    group.finish();
}

/// Benchmark: full 2D input message encode + decode.
fn bench_input_message(c: &mut Criterion) {
    let input = EntityMovementInput::<Vec2> {
        movement_state: MovementState::FORWARD | MovementState::RIGHT,
        extra_movement_state: ExtraMovementState::None,
        position: Vec2::new(0.7, 0.7),
        facing: Vec2::new(0.0, 1.0),
        is_key_movement: true,
        is_stopped: false,
    };
    let mask = input.diff(None, 0.01, 0.5).unwrap();
    let message = InputMessage::from_input(&input, mask);

    c.bench_function("input_message_roundtrip_2d", |b| {
        let mut writer = MessageWriter::new();
        b.iter(|| {
            writer.reset();
            message.encode(&mut writer).unwrap();
            let mut reader = MessageReader::new(writer.as_slice());
            black_box(InputMessage::<Vec2>::decode(&mut reader).unwrap())
        });
    });
}

/// Benchmark: one server tick plus state write for a capsule with forces.
fn bench_capsule_tick(c: &mut Criterion) {
    let mut capsule = CapsuleMovement::new(
        StatEntity::new(EntityRole::SERVER_OWNED),
        MovementSecure::ServerAuthoritative,
        MovementConfig::default(),
        FlatGround::new(0.0),
        Vec3::ZERO,
    );
    let mut timestamp = 0u32;

    c.bench_function("capsule_tick_and_write", |b| {
        b.iter(|| {
            if capsule.forces().len() < 4 {
                capsule.apply_force(ForceApplyMode::Default, Vec3::X, ForceSource::NONE, 6.0, 3.0, 0.0);
            }
            capsule.key_movement(Vec3::Z, MovementState::FORWARD);
            capsule.tick(1.0 / 30.0);
            timestamp = timestamp.wrapping_add(33);
            black_box(capsule.write_server_state(timestamp))
        });
    });
}

criterion_group!(benches, bench_state_message, bench_input_message, bench_capsule_tick);
criterion_main!(benches);
