//! Puzzle lifecycle state machine.
//!
//! ```text
//!            Activate              Complete
//!   Idle ──────────────▶ Active ──────────────▶ Solved
//!    ▲                     │                       │
//!    │                     │ Mismatch              │
//!    │                     ▼                       │
//!    │                   Failed                    │
//!    │                     │                       │
//!    └──────── Reset ──────┴───────────────────────┘
//!          (straight back to Active when always-active)
//! ```
//!
//! The machine owns one [`MatchEngine`] and the injected sensor/actuator
//! ports. Each `process_events()` poll reads at most one debounced input
//! event, feeds it to the engine, and applies at most one transition.
//! Side effects (output drives) are applied before the named-event hook
//! fires, always in the same order, so a hook can rely on the physical
//! state already being correct. Rebooting is an administrative parking
//! state: the room controller asked for a reboot and event processing is
//! over for this process.

pub mod hooks;
pub mod scan;

use log::{debug, info, warn};

use crate::app::ports::{
    ContactSensorPort, OutputActuatorPort, OutputId, SharedClock, TagReaderPort,
};
use crate::match_engine::{MatchEngine, MatchOutcome, MatchProgress};
use hooks::{PuzzleHook, PuzzleHooks};
use scan::{ContactScanner, TagScanner};

// ---------------------------------------------------------------------------
// Lifecycle states
// ---------------------------------------------------------------------------

/// Puzzle lifecycle. Solved and Failed are terminal until Reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PuzzleState {
    Idle,
    Active,
    Solved,
    Failed,
    Rebooting,
}

impl PuzzleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Active => "Active",
            Self::Solved => "Solved",
            Self::Failed => "Failed",
            Self::Rebooting => "Rebooting",
        }
    }
}

impl core::fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Output bank
// ---------------------------------------------------------------------------

/// Outputs registered by category. Pattern outputs are indexed: step N of a
/// sequence lights `pattern[N]`.
#[derive(Debug, Default)]
struct OutputBank {
    pattern: Vec<OutputId>,
    active: Vec<OutputId>,
    solved: Vec<OutputId>,
    failed: Vec<OutputId>,
}

impl OutputBank {
    fn drive(ids: &[OutputId], port: &mut dyn OutputActuatorPort, level: bool) {
        for &id in ids {
            if let Err(e) = port.drive_output(id, level) {
                warn!("{id} drive fault: {e}");
            }
        }
    }

    fn all_off(&self, port: &mut dyn OutputActuatorPort) {
        Self::drive(&self.pattern, port, false);
        Self::drive(&self.active, port, false);
        Self::drive(&self.solved, port, false);
        Self::drive(&self.failed, port, false);
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub struct PuzzleStateMachine {
    engine: MatchEngine,
    state: PuzzleState,
    always_active: bool,
    clock: SharedClock,

    contact_port: Option<Box<dyn ContactSensorPort>>,
    contact_scanner: ContactScanner,
    tag_port: Option<Box<dyn TagReaderPort>>,
    tag_scanner: TagScanner,

    output_port: Option<Box<dyn OutputActuatorPort>>,
    bank: OutputBank,
    hooks: PuzzleHooks,
}

impl PuzzleStateMachine {
    /// A machine starts Idle with no ports attached; an unconfigured
    /// machine is inert, not broken.
    pub fn new(engine: MatchEngine, always_active: bool, clock: SharedClock) -> Self {
        let watched = engine.watched_contacts();
        Self {
            engine,
            state: PuzzleState::Idle,
            always_active,
            clock,
            contact_port: None,
            contact_scanner: ContactScanner::new(watched),
            tag_port: None,
            tag_scanner: TagScanner::new(),
            output_port: None,
            bank: OutputBank::default(),
            hooks: PuzzleHooks::new(),
        }
    }

    // --- composition-time wiring -------------------------------------------

    pub fn attach_contacts(&mut self, port: Box<dyn ContactSensorPort>) {
        self.contact_port = Some(port);
    }

    pub fn attach_tag_reader(&mut self, port: Box<dyn TagReaderPort>) {
        self.tag_port = Some(port);
    }

    pub fn attach_outputs(&mut self, port: Box<dyn OutputActuatorPort>) {
        self.output_port = Some(port);
    }

    pub fn add_pattern_output(&mut self, id: OutputId) {
        self.bank.pattern.push(id);
    }

    pub fn add_active_output(&mut self, id: OutputId) {
        self.bank.active.push(id);
    }

    pub fn add_solved_output(&mut self, id: OutputId) {
        self.bank.solved.push(id);
    }

    pub fn add_failed_output(&mut self, id: OutputId) {
        self.bank.failed.push(id);
    }

    pub fn hooks_mut(&mut self) -> &mut PuzzleHooks {
        &mut self.hooks
    }

    // --- accessors ---------------------------------------------------------

    pub fn state(&self) -> PuzzleState {
        self.state
    }

    pub fn progress(&self) -> MatchProgress {
        self.engine.progress()
    }

    pub fn always_active(&self) -> bool {
        self.always_active
    }

    pub fn strategy_name(&self) -> &'static str {
        self.engine.strategy_name()
    }

    // --- lifecycle operations ----------------------------------------------

    /// Arm the puzzle. Idempotent when already Active; a no-op from the
    /// terminal states (only Reset leaves those).
    pub fn activate(&mut self) {
        match self.state {
            PuzzleState::Active => {}
            PuzzleState::Idle => {
                let snapshot = self.contact_scanner.snapshot();
                self.engine.prime(&snapshot);
                self.drive_active(true);
                self.set_state(PuzzleState::Active);
                self.hooks.fire(PuzzleHook::Activated);
            }
            _ => debug!("activate ignored in {}", self.state),
        }
    }

    /// Administrative completion, same side effects as an engine Complete.
    pub fn solve(&mut self) {
        match self.state {
            PuzzleState::Idle | PuzzleState::Active => self.apply_solved(),
            _ => debug!("solve ignored in {}", self.state),
        }
    }

    /// Administrative failure, same side effects as an engine Mismatch.
    pub fn fail(&mut self) {
        match self.state {
            PuzzleState::Idle | PuzzleState::Active => self.apply_failed(),
            _ => debug!("fail ignored in {}", self.state),
        }
    }

    /// Return to Idle from any state: every output category off, progress
    /// cleared, queued edges dropped. Unconditional and idempotent; when
    /// the node is configured always-active it re-arms immediately.
    pub fn reset(&mut self) {
        if let Some(port) = self.output_port.as_mut() {
            self.bank.all_off(port.as_mut());
        }
        self.engine.clear();
        self.contact_scanner.clear_pending();
        self.set_state(PuzzleState::Idle);
        self.hooks.fire(PuzzleHook::Reset);

        if self.always_active {
            self.activate();
        }
    }

    /// Park the machine: the room controller ordered a reboot and no
    /// further events will be processed by this process.
    pub fn mark_rebooting(&mut self) {
        if self.state != PuzzleState::Rebooting {
            self.set_state(PuzzleState::Rebooting);
        }
    }

    /// Drive every registered output off without firing hooks. Shutdown
    /// path: physical outputs must be safe on every exit.
    pub fn release_outputs(&mut self) {
        if let Some(port) = self.output_port.as_mut() {
            self.bank.all_off(port.as_mut());
        }
    }

    // --- poll --------------------------------------------------------------

    /// One non-blocking poll: scan for at most one debounced input event,
    /// feed it to the engine, apply at most one transition. Scanning runs
    /// in every state so level tracking stays live, but events are only
    /// accepted while Active.
    pub fn process_events(&mut self) {
        let now_ms = self.clock.monotonic_ms();
        let event = self.scan_once(now_ms);

        if self.state != PuzzleState::Active {
            return;
        }
        let Some(event) = event else {
            return;
        };

        let cursor_before = self.cursor();
        let outcome = self.engine.accept(&event);
        self.light_pattern_step(cursor_before);

        match outcome {
            MatchOutcome::Continue => {}
            MatchOutcome::Mismatch => self.apply_failed(),
            MatchOutcome::Complete => self.apply_solved(),
        }
    }

    // --- internal ----------------------------------------------------------

    fn scan_once(&mut self, now_ms: u64) -> Option<crate::match_engine::InputEvent> {
        if let Some(port) = self.contact_port.as_mut() {
            if let Some(ev) = self.contact_scanner.poll(port.as_mut(), now_ms) {
                return Some(ev);
            }
        }
        if let Some(port) = self.tag_port.as_mut() {
            return self.tag_scanner.poll(port.as_mut(), now_ms);
        }
        None
    }

    fn cursor(&self) -> Option<usize> {
        match self.engine.progress() {
            MatchProgress::Cursor { position, .. } => Some(position),
            _ => None,
        }
    }

    /// Light the per-step pattern output when the sequence cursor advanced.
    fn light_pattern_step(&mut self, cursor_before: Option<usize>) {
        let (Some(before), Some(after)) = (cursor_before, self.cursor()) else {
            return;
        };
        if after > before {
            if let Some(&id) = self.bank.pattern.get(after - 1) {
                if let Some(port) = self.output_port.as_mut() {
                    OutputBank::drive(&[id], port.as_mut(), true);
                }
            }
        }
    }

    fn apply_solved(&mut self) {
        self.drive_active(false);
        if let Some(port) = self.output_port.as_mut() {
            OutputBank::drive(&self.bank.solved, port.as_mut(), true);
        }
        self.set_state(PuzzleState::Solved);
        self.hooks.fire(PuzzleHook::Solved);
    }

    fn apply_failed(&mut self) {
        if let Some(port) = self.output_port.as_mut() {
            OutputBank::drive(&self.bank.pattern, port.as_mut(), false);
            OutputBank::drive(&self.bank.active, port.as_mut(), false);
            OutputBank::drive(&self.bank.failed, port.as_mut(), true);
        }
        self.set_state(PuzzleState::Failed);
        self.hooks.fire(PuzzleHook::Failed);
    }

    fn drive_active(&mut self, level: bool) {
        if let Some(port) = self.output_port.as_mut() {
            OutputBank::drive(&self.bank.active, port.as_mut(), level);
        }
    }

    fn set_state(&mut self, next: PuzzleState) {
        if self.state != next {
            info!("puzzle transition: {} -> {}", self.state, next);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{ContactId, TagText};
    use crate::error::SensorFault;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    // Minimal fixed clock; link tests use the full adapter.
    struct TestClock(AtomicU64);

    impl crate::app::ports::ClockPort for TestClock {
        fn epoch_secs(&self) -> f64 {
            0.0
        }
        fn monotonic_ms(&self) -> u64 {
            self.0.fetch_add(10, Ordering::Relaxed)
        }
    }

    fn clock() -> SharedClock {
        Arc::new(TestClock(AtomicU64::new(0)))
    }

    /// Contact port backed by a shared level table the test flips.
    #[derive(Clone)]
    struct SharedContacts(Rc<RefCell<Vec<(ContactId, bool)>>>);

    impl SharedContacts {
        fn new(ids: &[u16]) -> Self {
            Self(Rc::new(RefCell::new(
                ids.iter().map(|&n| (ContactId(n), false)).collect(),
            )))
        }

        fn set(&self, id: u16, level: bool) {
            for slot in self.0.borrow_mut().iter_mut() {
                if slot.0 == ContactId(id) {
                    slot.1 = level;
                }
            }
        }
    }

    impl ContactSensorPort for SharedContacts {
        fn read_contact(&mut self, id: ContactId) -> Result<bool, SensorFault> {
            self.0
                .borrow()
                .iter()
                .find(|(slot, _)| *slot == id)
                .map_or(Err(SensorFault::ContactReadFailed), |&(_, l)| Ok(l))
        }
    }

    /// Output port recording every drive call.
    #[derive(Clone, Default)]
    struct RecordingOutputs(Rc<RefCell<Vec<(OutputId, bool)>>>);

    impl RecordingOutputs {
        fn calls(&self) -> Vec<(OutputId, bool)> {
            self.0.borrow().clone()
        }

        fn last_level(&self, id: u16) -> Option<bool> {
            self.0
                .borrow()
                .iter()
                .rev()
                .find(|(o, _)| *o == OutputId(id))
                .map(|&(_, l)| l)
        }
    }

    impl OutputActuatorPort for RecordingOutputs {
        fn drive_output(&mut self, id: OutputId, level: bool) -> Result<(), SensorFault> {
            self.0.borrow_mut().push((id, level));
            Ok(())
        }
    }

    fn sequence_machine(ids: &[u16], fail: Option<u16>) -> (PuzzleStateMachine, SharedContacts, RecordingOutputs) {
        let steps: Vec<ContactId> = ids.iter().map(|&n| ContactId(n)).collect();
        let engine = MatchEngine::sequence(&steps, fail.map(ContactId)).unwrap();
        let mut watched: Vec<u16> = ids.to_vec();
        if let Some(f) = fail {
            watched.push(f);
        }
        let contacts = SharedContacts::new(&watched);
        let outputs = RecordingOutputs::default();
        let mut sm = PuzzleStateMachine::new(engine, false, clock());
        sm.attach_contacts(Box::new(contacts.clone()));
        sm.attach_outputs(Box::new(outputs.clone()));
        sm.add_active_output(OutputId(100));
        sm.add_solved_output(OutputId(101));
        sm.add_failed_output(OutputId(102));
        (sm, contacts, outputs)
    }

    /// Poll often enough for a scan pass plus queued edges to surface.
    fn settle(sm: &mut PuzzleStateMachine) {
        for _ in 0..4 {
            sm.process_events();
        }
    }

    #[test]
    fn starts_idle_and_inert() {
        let engine = MatchEngine::sequence(&[ContactId(1)], None).unwrap();
        let mut sm = PuzzleStateMachine::new(engine, false, clock());
        sm.process_events(); // unconfigured: no ports, nothing to do
        assert_eq!(sm.state(), PuzzleState::Idle);
    }

    #[test]
    fn activate_drives_active_outputs_and_is_idempotent() {
        let (mut sm, _c, outputs) = sequence_machine(&[1], None);
        sm.activate();
        assert_eq!(sm.state(), PuzzleState::Active);
        assert_eq!(outputs.last_level(100), Some(true));
        let count = outputs.calls().len();
        sm.activate();
        assert_eq!(outputs.calls().len(), count, "second activate is a no-op");
    }

    #[test]
    fn events_ignored_until_active() {
        let (mut sm, contacts, _o) = sequence_machine(&[1], None);
        settle(&mut sm); // baseline scan while Idle
        contacts.set(1, true);
        settle(&mut sm);
        assert_eq!(sm.state(), PuzzleState::Idle);
    }

    #[test]
    fn ordered_presses_solve_the_puzzle() {
        let (mut sm, contacts, outputs) = sequence_machine(&[1, 2], None);
        settle(&mut sm);
        sm.activate();

        contacts.set(1, true);
        settle(&mut sm);
        contacts.set(2, true);
        settle(&mut sm);

        assert_eq!(sm.state(), PuzzleState::Solved);
        assert_eq!(outputs.last_level(100), Some(false), "active off on solve");
        assert_eq!(outputs.last_level(101), Some(true), "solved on");
    }

    #[test]
    fn fail_source_press_fails_the_puzzle() {
        let (mut sm, contacts, outputs) = sequence_machine(&[1, 2], Some(9));
        settle(&mut sm);
        sm.activate();

        contacts.set(1, true);
        settle(&mut sm);
        contacts.set(9, true);
        settle(&mut sm);

        assert_eq!(sm.state(), PuzzleState::Failed);
        assert_eq!(outputs.last_level(102), Some(true));
        // Terminal until Reset: further presses change nothing.
        contacts.set(2, true);
        settle(&mut sm);
        assert_eq!(sm.state(), PuzzleState::Failed);
    }

    #[test]
    fn reset_is_idempotent_and_clears_everything() {
        let (mut sm, contacts, outputs) = sequence_machine(&[1, 2], None);
        settle(&mut sm);
        sm.activate();
        contacts.set(1, true);
        settle(&mut sm);

        sm.reset();
        sm.reset();
        assert_eq!(sm.state(), PuzzleState::Idle);
        assert_eq!(outputs.last_level(100), Some(false));
        assert!(matches!(
            sm.progress(),
            MatchProgress::Cursor { position: 0, .. }
        ));
    }

    #[test]
    fn always_active_reset_rearms() {
        let engine = MatchEngine::sequence(&[ContactId(1)], None).unwrap();
        let mut sm = PuzzleStateMachine::new(engine, true, clock());
        sm.reset();
        assert_eq!(sm.state(), PuzzleState::Active);
    }

    #[test]
    fn pattern_step_output_lights_on_each_advance() {
        let (mut sm, contacts, outputs) = sequence_machine(&[1, 2], None);
        sm.add_pattern_output(OutputId(200));
        sm.add_pattern_output(OutputId(201));
        settle(&mut sm);
        sm.activate();

        contacts.set(1, true);
        settle(&mut sm);
        assert_eq!(outputs.last_level(200), Some(true));
        assert_eq!(outputs.last_level(201), None, "step two not yet lit");

        contacts.set(2, true);
        settle(&mut sm);
        assert_eq!(outputs.last_level(201), Some(true));
        // Solve keeps pattern lamps lit (only active goes off).
        assert_eq!(outputs.last_level(200), Some(true));
    }

    #[test]
    fn side_effects_apply_before_hooks() {
        let (mut sm, contacts, outputs) = sequence_machine(&[1], None);
        let seen = Rc::new(RefCell::new(None));
        let seen_in_hook = Rc::clone(&seen);
        let probe = outputs.clone();
        sm.hooks_mut().on_solved(move || {
            *seen_in_hook.borrow_mut() = probe.last_level(101);
            Ok(())
        });
        settle(&mut sm);
        sm.activate();
        contacts.set(1, true);
        settle(&mut sm);
        assert_eq!(*seen.borrow(), Some(true), "hook saw solved output already on");
    }

    #[test]
    fn solved_guard_makes_completion_idempotent() {
        let reference = ["x", "y"];
        let engine = MatchEngine::window(&reference).unwrap();
        let mut sm = PuzzleStateMachine::new(engine, false, clock());

        struct Feeder(Rc<RefCell<Vec<Option<&'static str>>>>);
        impl TagReaderPort for Feeder {
            fn sense_tag(&mut self) -> Result<Option<TagText>, SensorFault> {
                let mut feed = self.0.borrow_mut();
                let next = if feed.is_empty() { None } else { feed.remove(0) };
                Ok(next.map(|s| TagText::try_from(s).unwrap()))
            }
        }

        let feed = Rc::new(RefCell::new(vec![
            Some("x"),
            None,
            Some("y"),
            None,
            // Replay after solve: must not matter.
            Some("x"),
            None,
            Some("y"),
        ]));
        let solves = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&solves);
        sm.attach_tag_reader(Box::new(Feeder(Rc::clone(&feed))));
        sm.hooks_mut().on_solved(move || {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        sm.activate();
        for _ in 0..10 {
            sm.process_events();
        }
        assert_eq!(sm.state(), PuzzleState::Solved);
        assert_eq!(*solves.borrow(), 1);
    }

    #[test]
    fn rebooting_parks_event_processing() {
        let (mut sm, contacts, _o) = sequence_machine(&[1], None);
        settle(&mut sm);
        sm.activate();
        sm.mark_rebooting();
        contacts.set(1, true);
        settle(&mut sm);
        assert_eq!(sm.state(), PuzzleState::Rebooting);
    }

    #[test]
    fn administrative_solve_and_fail_respect_terminals() {
        let (mut sm, _c, _o) = sequence_machine(&[1], None);
        sm.solve();
        assert_eq!(sm.state(), PuzzleState::Solved);
        sm.fail();
        assert_eq!(sm.state(), PuzzleState::Solved, "fail ignored once solved");
        sm.reset();
        sm.fail();
        assert_eq!(sm.state(), PuzzleState::Failed);
    }
}
