//! Node composition root: one puzzle, one coordination link, one poll loop.
//!
//! ```text
//!                    ┌────────────── Node ──────────────┐
//!   room controller ─┤ CoordinationLink   PuzzleStateMachine ├─ sensors/outputs
//!                    │      │ callbacks ──────▶ │            │
//!                    │      │ ◀── StatusOutbox ─┘ (hooks)    │
//!                    └──────┴──────────────────┴─────────────┘
//! ```
//!
//! Wiring rule: link callbacks drive the puzzle directly; puzzle hooks
//! answer only through the [`StatusOutbox`](crate::link::channels::StatusOutbox),
//! never by touching the link. That keeps a command that lands mid-dispatch
//! from re-entering the link through its own callback.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use crate::app::events::NodeEvent;
use crate::app::ports::{EventSink, SharedClock, SystemProbePort};
use crate::config::NodeConfig;
use crate::link::bus::BusPort;
use crate::link::channels::StatusOutbox;
use crate::link::protocol::Status;
use crate::link::CoordinationLink;
use crate::puzzle::hooks::{HookError, HookResult};
use crate::puzzle::{PuzzleState, PuzzleStateMachine};

/// A complete prop node. Construction wires the callback tables in both
/// directions; afterwards the only things to do are poll and shut down.
pub struct Node<B: BusPort> {
    puzzle: Rc<RefCell<PuzzleStateMachine>>,
    link: CoordinationLink<B>,
    last_state: PuzzleState,
    started: bool,
}

impl<B: BusPort> Node<B> {
    /// Assemble a node. Claims the puzzle's hook slots for status
    /// announcements and the link's command slots for puzzle control;
    /// anything registered on those before this call is replaced.
    pub fn new(
        config: &NodeConfig,
        puzzle: PuzzleStateMachine,
        bus: B,
        probe: Box<dyn SystemProbePort>,
        clock: SharedClock,
    ) -> Self {
        let mut link = CoordinationLink::new(config, bus, probe, clock);
        let puzzle = Rc::new(RefCell::new(puzzle));

        // Puzzle -> link: lifecycle hooks queue the matching status.
        let outbox = link.outbox();
        {
            let mut p = puzzle.borrow_mut();
            let hooks = p.hooks_mut();
            let o = outbox.clone();
            hooks.on_activated(move || queue_status(&o, Status::Active));
            let o = outbox.clone();
            hooks.on_solved(move || queue_status(&o, Status::Solved));
            let o = outbox.clone();
            hooks.on_failed(move || queue_status(&o, Status::Failed));
            let o = outbox;
            hooks.on_reset(move || queue_status(&o, Status::Reset));
        }

        // Link -> puzzle: room-controller commands land as lifecycle calls.
        let p = Rc::clone(&puzzle);
        link.callbacks_mut().on_reset(move || {
            p.borrow_mut().reset();
            Ok(())
        });
        let p = Rc::clone(&puzzle);
        link.callbacks_mut().on_activate(move || {
            p.borrow_mut().activate();
            Ok(())
        });
        let p = Rc::clone(&puzzle);
        link.callbacks_mut().on_solve(move || {
            p.borrow_mut().solve();
            Ok(())
        });
        let p = Rc::clone(&puzzle);
        link.callbacks_mut().on_reboot(move || {
            p.borrow_mut().mark_rebooting();
            Ok(())
        });

        let initial = {
            let mut p = puzzle.borrow_mut();
            if p.always_active() {
                p.activate();
            }
            p.state()
        };
        info!(
            "node '{}': {} match, starting {}",
            link.node_id(),
            puzzle.borrow().strategy_name(),
            initial
        );

        Self {
            puzzle,
            link,
            last_state: initial,
            started: false,
        }
    }

    /// One cooperative poll step: puzzle first (sensor edges, ending
    /// conditions), then the link (reconnect, ping, command dispatch,
    /// queued announcements). Call this at the configured cadence.
    pub fn process_events(&mut self, sink: &mut dyn EventSink) {
        if !self.started {
            self.started = true;
            sink.emit(&NodeEvent::Started(self.last_state));
        }
        self.puzzle.borrow_mut().process_events();
        self.emit_state_change(sink);
        self.link.process_events(sink);
        self.emit_state_change(sink);
    }

    /// True once a REBOOT command has fully drained: the puzzle is parked
    /// and the link is halted. The host process decides what "reboot"
    /// means (exit code, systemd restart, supervisor).
    pub fn reboot_requested(&self) -> bool {
        self.link.is_halted() && self.puzzle.borrow().state() == PuzzleState::Rebooting
    }

    /// Orderly exit: outputs released, broker session closed without
    /// firing the will.
    pub fn shutdown(&mut self) {
        info!("node '{}': shutting down", self.link.node_id());
        self.puzzle.borrow_mut().release_outputs();
        self.link.shutdown();
    }

    /// Shared handle for bench drivers and tests.
    pub fn puzzle(&self) -> Rc<RefCell<PuzzleStateMachine>> {
        Rc::clone(&self.puzzle)
    }

    pub fn link(&self) -> &CoordinationLink<B> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut CoordinationLink<B> {
        &mut self.link
    }

    fn emit_state_change(&mut self, sink: &mut dyn EventSink) {
        let state = self.puzzle.borrow().state();
        if state != self.last_state {
            sink.emit(&NodeEvent::StateChanged {
                from: self.last_state,
                to: state,
            });
            self.last_state = state;
        }
    }
}

/// A full outbox means the link has not drained for several lifecycle
/// turns; report it through the hook fault path instead of dropping silently.
fn queue_status(outbox: &StatusOutbox, status: Status) -> HookResult {
    if outbox.send(status) {
        Ok(())
    } else {
        Err(HookError::new("status outbox full"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use crate::app::ports::{ClockPort, ContactId};
    use crate::link::bus::NullBus;
    use crate::match_engine::MatchEngine;

    struct TestClock {
        ms: AtomicU64,
    }

    impl ClockPort for TestClock {
        fn epoch_secs(&self) -> f64 {
            self.ms.load(Ordering::Relaxed) as f64 / 1000.0
        }

        fn monotonic_ms(&self) -> u64 {
            self.ms.fetch_add(10, Ordering::Relaxed)
        }
    }

    struct TestProbe;

    impl SystemProbePort for TestProbe {
        fn hardware_id(&mut self) -> String {
            "hw".into()
        }

        fn ip_address(&mut self) -> Option<String> {
            None
        }

        fn uptime_secs(&mut self) -> f64 {
            1.0
        }

        fn temperature_c(&mut self) -> Option<f32> {
            None
        }

        fn platform(&mut self) -> String {
            "test".into()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<NodeEvent>,
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, event: &NodeEvent) {
            self.events.push(event.clone());
        }
    }

    fn test_node(always_active: bool) -> Node<NullBus> {
        let clock: SharedClock = Arc::new(TestClock {
            ms: AtomicU64::new(0),
        });
        let engine = MatchEngine::conjunction(&[ContactId(1)]).unwrap();
        let puzzle = PuzzleStateMachine::new(engine, always_active, Arc::clone(&clock));
        let config = NodeConfig {
            node_id: "bench".into(),
            always_active,
            ..NodeConfig::default()
        };
        Node::new(&config, puzzle, NullBus::new(), Box::new(TestProbe), clock)
    }

    #[test]
    fn first_poll_emits_started_then_link_up() {
        let mut node = test_node(false);
        let mut sink = RecordingSink::default();
        node.process_events(&mut sink);

        assert!(matches!(
            sink.events[0],
            NodeEvent::Started(PuzzleState::Idle)
        ));
        assert!(sink.events.iter().any(|e| matches!(e, NodeEvent::LinkUp)));
        assert!(node.link().is_connected());
    }

    #[test]
    fn always_active_node_starts_armed_and_announces_active() {
        let mut node = test_node(true);
        let mut sink = RecordingSink::default();
        node.process_events(&mut sink);

        assert!(matches!(
            sink.events[0],
            NodeEvent::Started(PuzzleState::Active)
        ));
        // The activation hook queued ACTIVE before the link first drained.
        assert_eq!(node.link().status(), Status::Active);
    }

    #[test]
    fn lifecycle_calls_surface_as_state_change_events() {
        let mut node = test_node(false);
        let mut sink = RecordingSink::default();
        node.process_events(&mut sink);

        node.puzzle().borrow_mut().activate();
        node.process_events(&mut sink);

        assert!(sink.events.iter().any(|e| matches!(
            e,
            NodeEvent::StateChanged {
                from: PuzzleState::Idle,
                to: PuzzleState::Active,
            }
        )));
        assert_eq!(node.link().status(), Status::Active);
    }

    #[test]
    fn shutdown_halts_the_link_without_reboot() {
        let mut node = test_node(false);
        let mut sink = RecordingSink::default();
        node.process_events(&mut sink);

        node.shutdown();
        assert!(node.link().is_halted());
        assert!(!node.reboot_requested(), "clean exit is not a reboot");
    }
}
