//! Bench adapters: hand-driven stand-ins for the physical prop hardware.
//!
//! Each adapter is a cheap `Clone`; one clone goes into the puzzle as its
//! port, the other stays with the bench driver (or test) to script inputs
//! and inspect outputs. State is `Rc`-shared, so these stay on the poll
//! thread, which is where all ports live anyway.
//!
//! Every adapter can be switched into a failing mode to exercise the
//! fault paths: reads and writes then return the matching
//! [`SensorFault`] until switched back.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::app::ports::{
    ContactId, ContactSensorPort, OutputActuatorPort, OutputId, TagReaderPort, TagText,
};
use crate::error::SensorFault;

// ───────────────────────────── contacts ─────────────────────────────

#[derive(Default)]
struct ContactBank {
    levels: BTreeMap<u16, bool>,
    failing: bool,
}

/// Pressable contact bank. Unset contacts read released.
#[derive(Clone, Default)]
pub struct BenchContacts {
    shared: Rc<RefCell<ContactBank>>,
}

impl BenchContacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, id: ContactId) {
        self.shared.borrow_mut().levels.insert(id.0, true);
    }

    pub fn release(&self, id: ContactId) {
        self.shared.borrow_mut().levels.insert(id.0, false);
    }

    pub fn set_failing(&self, failing: bool) {
        self.shared.borrow_mut().failing = failing;
    }
}

impl ContactSensorPort for BenchContacts {
    fn read_contact(&mut self, id: ContactId) -> Result<bool, SensorFault> {
        let bank = self.shared.borrow();
        if bank.failing {
            return Err(SensorFault::ContactReadFailed);
        }
        Ok(bank.levels.get(&id.0).copied().unwrap_or(false))
    }
}

// ───────────────────────────── outputs ──────────────────────────────

#[derive(Default)]
struct OutputBankState {
    levels: BTreeMap<u16, bool>,
    history: Vec<(OutputId, bool)>,
    failing: bool,
}

/// Recording output bank: remembers the latest level per output and the
/// full drive history, in order.
#[derive(Clone, Default)]
pub struct BenchOutputs {
    shared: Rc<RefCell<OutputBankState>>,
}

impl BenchOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, id: OutputId) -> bool {
        self.shared.borrow().levels.get(&id.0).copied().unwrap_or(false)
    }

    /// Outputs currently driven high, in id order.
    pub fn lit(&self) -> Vec<OutputId> {
        self.shared
            .borrow()
            .levels
            .iter()
            .filter(|(_, level)| **level)
            .map(|(id, _)| OutputId(*id))
            .collect()
    }

    pub fn history(&self) -> Vec<(OutputId, bool)> {
        self.shared.borrow().history.clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.shared.borrow_mut().failing = failing;
    }
}

impl OutputActuatorPort for BenchOutputs {
    fn drive_output(&mut self, id: OutputId, level: bool) -> Result<(), SensorFault> {
        let mut bank = self.shared.borrow_mut();
        if bank.failing {
            return Err(SensorFault::OutputWriteFailed);
        }
        bank.levels.insert(id.0, level);
        bank.history.push((id, level));
        Ok(())
    }
}

// ───────────────────────────── tag feed ─────────────────────────────

#[derive(Default)]
struct TagFeed {
    current: Option<TagText>,
    failing: bool,
}

/// Scripted tag reader: `place` a tag on the antenna, `remove` it. The
/// reader reports whatever is present on every poll; edge detection is
/// the scanner's job.
#[derive(Clone, Default)]
pub struct BenchTagReader {
    shared: Rc<RefCell<TagFeed>>,
}

impl BenchTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `text` does not fit the tag text bound.
    pub fn place(&self, text: &str) -> bool {
        match TagText::try_from(text) {
            Ok(tag) => {
                self.shared.borrow_mut().current = Some(tag);
                true
            }
            Err(()) => false,
        }
    }

    pub fn remove(&self) {
        self.shared.borrow_mut().current = None;
    }

    pub fn set_failing(&self, failing: bool) {
        self.shared.borrow_mut().failing = failing;
    }
}

impl TagReaderPort for BenchTagReader {
    fn sense_tag(&mut self) -> Result<Option<TagText>, SensorFault> {
        let feed = self.shared.borrow();
        if feed.failing {
            return Err(SensorFault::TagReadFailed);
        }
        Ok(feed.current.clone())
    }
}
