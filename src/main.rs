//! Puzzle node bench-run entry point.
//!
//! Runs one simulated prop node against the in-process bus: a three-step
//! sequence puzzle whose room controller is a timed script. The run shows
//! the whole protocol surface in the log: connect backoff (the first two
//! attempts are scripted to fail), the retained status announcements,
//! liveness pings, per-step pattern outputs, an unknown command, and the
//! REBOOT teardown.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  BenchContacts   BenchOutputs   HostProbe   SystemClock  │
//! │  MemoryBus       LogEventSink                            │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────────   │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │   Node = PuzzleStateMachine + CoordinationLink     │  │
//! │  │   MatchEngine · scanners · hooks · backoff         │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from the `PUZZLENODE_CONFIG` environment variable
//! as JSON; missing fields take their defaults. A REBOOT command ends the
//! process so a supervisor (systemd, runit) can restart it.

#![deny(unused_must_use)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use puzzlenode::adapters::bench::{BenchContacts, BenchOutputs};
use puzzlenode::adapters::clock::SystemClock;
use puzzlenode::adapters::host_probe::HostProbe;
use puzzlenode::adapters::log_sink::LogEventSink;
use puzzlenode::adapters::memory_bus::MemoryBus;
use puzzlenode::app::node::Node;
use puzzlenode::app::ports::{ContactId, OutputId, SharedClock};
use puzzlenode::config::NodeConfig;
use puzzlenode::link::protocol;
use puzzlenode::match_engine::MatchEngine;
use puzzlenode::puzzle::PuzzleStateMachine;

const CONFIG_ENV: &str = "PUZZLENODE_CONFIG";

// ── Bench script ──────────────────────────────────────────────

enum BenchStep {
    /// Room-controller frame on the COMMANDS topic.
    Inject(&'static str),
    Press(u16),
    Release(u16),
}

/// Timed room-controller script, offsets in monotonic milliseconds. The
/// first six seconds are left to the connect backoff (two scripted
/// failures at 2s and 4s spacing).
fn bench_script() -> Vec<(u64, BenchStep)> {
    vec![
        (7_000, BenchStep::Inject("ACTIVATE")),
        (7_600, BenchStep::Press(1)),
        (7_900, BenchStep::Release(1)),
        (8_200, BenchStep::Press(2)),
        (8_500, BenchStep::Release(2)),
        (8_800, BenchStep::Press(3)),
        (9_400, BenchStep::Release(3)),
        (10_500, BenchStep::Inject("RESET")),
        (11_200, BenchStep::Inject("DANCE")),
        (12_000, BenchStep::Inject("REBOOT")),
    ]
}

fn run_step(step: &BenchStep, bus: &MemoryBus, contacts: &BenchContacts, commands_topic: &str) {
    match step {
        BenchStep::Inject(payload) => {
            info!("bench: controller sends {payload}");
            if !bus.inject(commands_topic, payload) {
                warn!("bench: {payload} dropped, node offline");
            }
        }
        BenchStep::Press(id) => {
            info!("bench: press contact#{id}");
            contacts.press(ContactId(*id));
        }
        BenchStep::Release(id) => {
            contacts.release(ContactId(*id));
        }
    }
}

// ── Entry point ───────────────────────────────────────────────

fn load_config() -> Result<NodeConfig> {
    let config = match std::env::var(CONFIG_ENV) {
        Ok(raw) => NodeConfig::from_json(&raw).context("parse PUZZLENODE_CONFIG")?,
        Err(std::env::VarError::NotPresent) => NodeConfig {
            node_id: "bench-node".into(),
            ..NodeConfig::default()
        },
        Err(err) => return Err(err).context("read PUZZLENODE_CONFIG"),
    };
    config.validate().context("validate node config")?;
    Ok(config)
}

fn install_ctrl_c() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let handle = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handle.store(false, Ordering::SeqCst);
    })
    .context("install ctrl-c handler")?;
    Ok(running)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    info!(
        "puzzlenode v{} starting as '{}' ({})",
        env!("CARGO_PKG_VERSION"),
        config.node_id,
        config.role
    );
    run_bench(&config)
}

fn run_bench(config: &NodeConfig) -> Result<()> {
    let running = install_ctrl_c()?;

    let clock: SharedClock = Arc::new(SystemClock::new());
    let bus = MemoryBus::new();
    bus.fail_next_connects(2);

    let contacts = BenchContacts::new();
    let outputs = BenchOutputs::new();

    let engine = MatchEngine::sequence(
        &[ContactId(1), ContactId(2), ContactId(3)],
        Some(ContactId(9)),
    )?;
    let mut puzzle = PuzzleStateMachine::new(engine, config.always_active, Arc::clone(&clock));
    puzzle.attach_contacts(Box::new(contacts.clone()));
    puzzle.attach_outputs(Box::new(outputs.clone()));
    for id in [10, 11, 12] {
        puzzle.add_pattern_output(OutputId(id));
    }
    puzzle.add_active_output(OutputId(20));
    puzzle.add_solved_output(OutputId(21));
    puzzle.add_failed_output(OutputId(22));

    let mut node = Node::new(
        config,
        puzzle,
        bus.clone(),
        Box::new(HostProbe::new()),
        Arc::clone(&clock),
    );

    let commands_topic = protocol::commands_topic(&config.node_id);
    let state_topic = protocol::state_topic(&config.node_id);
    let script = bench_script();
    let mut next_step = 0usize;
    let mut sink = LogEventSink::new();
    let poll = Duration::from_millis(u64::from(config.poll_interval_ms));

    info!("bench: sequence puzzle on contacts 1-2-3, fail contact 9");
    while running.load(Ordering::SeqCst) {
        node.process_events(&mut sink);

        let now_ms = clock.monotonic_ms();
        while next_step < script.len() && script[next_step].0 <= now_ms {
            run_step(&script[next_step].1, &bus, &contacts, &commands_topic);
            next_step += 1;
        }

        if node.reboot_requested() {
            info!("bench: reboot ordered; exiting for the supervisor");
            break;
        }
        thread::sleep(poll);
    }

    node.shutdown();
    info!(
        "bench: states announced on {state_topic}: {:?}",
        bus.published_on(&state_topic)
    );
    info!("bench: outputs lit at exit: {:?}", outputs.lit());
    Ok(())
}
