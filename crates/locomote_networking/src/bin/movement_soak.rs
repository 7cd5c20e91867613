//! # Movement Soak
//!
//! Runs owner, server and observer replicas of many entities through
//! lossy, jittery links and reports how well they stay in sync.
//!
//! Run with: `cargo run --release --bin movement_soak -- [poor|average|good|perfect] [not-secure]`

use std::time::Instant;

use locomote_networking::simulation::{MovementSoak, NetworkConditions, SoakConfig};
use locomote_networking::DEFAULT_SEND_RATE;
use locomote_shared::{MovementConfig, MovementSecure};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let network = match args.first().map(String::as_str) {
        Some("perfect") => NetworkConditions::PERFECT,
        Some("good") => NetworkConditions::GOOD,
        Some("average") => NetworkConditions::AVERAGE,
        _ => NetworkConditions::POOR,
    };
    let secure = if args.iter().any(|arg| arg == "not-secure") {
        MovementSecure::NotSecure
    } else {
        MovementSecure::ServerAuthoritative
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         LOCOMOTE - MOVEMENT SOAK                                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let config = SoakConfig {
        entity_count: 200,
        tick_rate: DEFAULT_SEND_RATE,
        duration_secs: 60,
        network,
        secure,
        ..SoakConfig::default()
    };

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Entities:           {}", config.entity_count);
    println!("│ Tick Rate:          {} Hz", config.tick_rate);
    println!("│ Duration:           {} seconds", config.duration_secs);
    println!("│ Authority:          {:?}", config.secure);
    println!("│ Base Latency:       {} ms", config.network.base_latency_ms);
    println!("│ Jitter:             {} ms", config.network.jitter_ms);
    println!("│ Packet Loss:        {}%", config.network.packet_loss_percent);
    println!("│ Duplicates:         {}%", config.network.duplicate_percent);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("Starting soak...");
    let start = Instant::now();
    let total_ticks = u64::from(config.duration_secs) * u64::from(config.tick_rate);
    let mut soak = MovementSoak::new(config.clone());

    let mut last_progress = 0;
    while soak.tick() {
        let progress = (soak.current_tick() * 100 / total_ticks) as usize;
        if progress > last_progress && progress % 10 == 0 {
            print!("\r[");
            for i in 0..10 {
                if i < progress / 10 {
                    print!("█");
                } else {
                    print!("░");
                }
            }
            print!("] {}% - Tick {}/{}", progress, soak.current_tick(), total_ticks);
            last_progress = progress;
        }
    }
    println!();
    println!();

    let elapsed = start.elapsed();
    let stats = soak.stats();

    println!("┌─ TIMING ────────────────────────────────────────────────────────┐");
    println!("│ Real Time:          {:.2} seconds", elapsed.as_secs_f64());
    println!(
        "│ Realtime Factor:    {:.2}x",
        f64::from(config.duration_secs) / elapsed.as_secs_f64()
    );
    println!("│ Total Ticks:        {}", stats.total_ticks);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ MESSAGES ──────────────────────────────────────────────────────┐");
    println!("│ Sent:               {}", stats.messages_sent);
    println!("│ Lost:               {}", stats.messages_lost);
    println!("│ Applied:            {}", stats.messages_applied);
    println!("│ Discarded:          {}", stats.messages_discarded);
    println!("│ Rejected:           {}", stats.messages_rejected);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ EVENTS ────────────────────────────────────────────────────────┐");
    println!("│ Teleports:          {}", stats.teleports);
    println!("│ Knockbacks:         {}", stats.knockbacks);
    println!("│ Drift Corrections:  {}", stats.drift_corrections);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ SYNC ERROR ────────────────────────────────────────────────────┐");
    println!("│ Avg Observer Error: {:.4} units", stats.avg_observer_error);
    println!("│ Max Observer Error: {:.4} units", stats.max_observer_error);
    println!("│ Avg Owner Error:    {:.4} units", stats.avg_owner_error);

    let snap_threshold = MovementConfig::default().snap_threshold;
    let in_sync = stats.messages_rejected == 0 && stats.avg_observer_error < snap_threshold;
    if in_sync {
        println!("│ Status:             ✓ IN SYNC");
    } else {
        println!("│ Status:             ✗ DRIFTING");
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
}
