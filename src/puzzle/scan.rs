//! Input scanners: turn raw port reads into debounced input events.
//!
//! Called from the poll loop at control-tick rate, time passed in. The
//! contact scanner edge-detects every watched contact and queues
//! simultaneous edges so the state machine sees at most one event per
//! poll; the tag scanner converts the reader's presence signal into one
//! event per physical tap (absent→present transition, never elapsed time).
//!
//! Read faults are "no reading this cycle": the last known level/presence
//! is kept, nothing is emitted, nothing escalates.

use log::{debug, warn};

use crate::app::ports::{ContactId, ContactSensorPort, TagReaderPort};
use crate::match_engine::{ContactEvent, InputEvent, TagEvent};

/// Edges that can pile up in one scan pass before the loop drains them.
const PENDING_EDGES: usize = 16;

// ---------------------------------------------------------------------------
// Contact scanner
// ---------------------------------------------------------------------------

pub struct ContactScanner {
    watched: Vec<ContactId>,
    /// Last known level per watched contact; `None` until first good read.
    levels: Vec<Option<bool>>,
    pending: heapless::Deque<ContactEvent, PENDING_EDGES>,
}

impl ContactScanner {
    pub fn new(watched: Vec<ContactId>) -> Self {
        let levels = vec![None; watched.len()];
        Self {
            watched,
            levels,
            pending: heapless::Deque::new(),
        }
    }

    /// Scan every watched contact once, queue any edges, surface one event.
    ///
    /// The first good read of a contact establishes its baseline without
    /// producing an edge, matching interrupt-driven edge detection.
    pub fn poll(&mut self, port: &mut dyn ContactSensorPort, now_ms: u64) -> Option<InputEvent> {
        if let Some(ev) = self.pending.pop_front() {
            return Some(InputEvent::Contact(ev));
        }

        for i in 0..self.watched.len() {
            let id = self.watched[i];
            match port.read_contact(id) {
                Ok(level) => {
                    let prev = self.levels[i];
                    self.levels[i] = Some(level);
                    if prev.is_some_and(|p| p != level) {
                        let ev = ContactEvent {
                            source: id,
                            value: level,
                            timestamp_ms: now_ms,
                        };
                        if self.pending.push_back(ev).is_err() {
                            warn!("contact edge queue full, dropping edge on {id}");
                        }
                    }
                }
                Err(e) => debug!("{id} read fault ({e}), keeping last level"),
            }
        }

        self.pending.pop_front().map(InputEvent::Contact)
    }

    /// Last known level of every watched contact (unknowns omitted).
    pub fn snapshot(&self) -> Vec<(ContactId, bool)> {
        self.watched
            .iter()
            .zip(&self.levels)
            .filter_map(|(&id, &level)| level.map(|l| (id, l)))
            .collect()
    }

    /// Drop queued edges (Reset path: pre-reset edges must not replay).
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// Tag scanner
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TagScanner {
    present: bool,
}

impl TagScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll the reader once; emit only on an absent→present transition.
    ///
    /// A swap between two tags with no empty-field read in between emits
    /// nothing, same as the hardware readers upstream of this code.
    pub fn poll(&mut self, port: &mut dyn TagReaderPort, now_ms: u64) -> Option<InputEvent> {
        match port.sense_tag() {
            Ok(Some(text)) => {
                if self.present {
                    return None;
                }
                self.present = true;
                Some(InputEvent::Tag(TagEvent {
                    text,
                    timestamp_ms: now_ms,
                }))
            }
            Ok(None) => {
                self.present = false;
                None
            }
            Err(e) => {
                // Presence unknown this cycle; a fault must not look like
                // a removal or the next good read double-counts the tap.
                debug!("tag read fault ({e}), presence unchanged");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::TagText;
    use crate::error::SensorFault;

    struct ScriptedContacts {
        /// Per-call responses per contact id; missing = Err.
        reads: Vec<(ContactId, Result<bool, SensorFault>)>,
    }

    impl ScriptedContacts {
        fn all(level: bool, ids: &[u16]) -> Self {
            Self {
                reads: ids
                    .iter()
                    .map(|&n| (ContactId(n), Ok(level)))
                    .collect(),
            }
        }

        fn set(&mut self, id: u16, r: Result<bool, SensorFault>) {
            for slot in &mut self.reads {
                if slot.0 == ContactId(id) {
                    slot.1 = r;
                    return;
                }
            }
            self.reads.push((ContactId(id), r));
        }
    }

    impl ContactSensorPort for ScriptedContacts {
        fn read_contact(&mut self, id: ContactId) -> Result<bool, SensorFault> {
            self.reads
                .iter()
                .find(|(slot, _)| *slot == id)
                .map_or(Err(SensorFault::ContactReadFailed), |(_, r)| *r)
        }
    }

    fn scanner(ids: &[u16]) -> ContactScanner {
        ContactScanner::new(ids.iter().map(|&n| ContactId(n)).collect())
    }

    #[test]
    fn first_read_sets_baseline_without_event() {
        let mut port = ScriptedContacts::all(true, &[1, 2]);
        let mut s = scanner(&[1, 2]);
        assert_eq!(s.poll(&mut port, 0), None);
        assert_eq!(s.snapshot(), vec![(ContactId(1), true), (ContactId(2), true)]);
    }

    #[test]
    fn edge_produces_one_event_per_poll() {
        let mut port = ScriptedContacts::all(false, &[1, 2]);
        let mut s = scanner(&[1, 2]);
        s.poll(&mut port, 0);

        port.set(1, Ok(true));
        port.set(2, Ok(true));
        let first = s.poll(&mut port, 10).unwrap();
        let second = s.poll(&mut port, 20).unwrap();
        let InputEvent::Contact(first) = first else { panic!() };
        let InputEvent::Contact(second) = second else { panic!() };
        assert_eq!(first.source, ContactId(1));
        assert!(first.value);
        assert_eq!(second.source, ContactId(2));
        // Edge timestamps carry the poll that observed them.
        assert_eq!(first.timestamp_ms, 10);
        assert_eq!(second.timestamp_ms, 10);
    }

    #[test]
    fn fault_keeps_last_level() {
        let mut port = ScriptedContacts::all(true, &[1]);
        let mut s = scanner(&[1]);
        s.poll(&mut port, 0);

        port.set(1, Err(SensorFault::ContactReadFailed));
        assert_eq!(s.poll(&mut port, 10), None);
        assert_eq!(s.snapshot(), vec![(ContactId(1), true)]);

        // Recovery at the same level: still no edge.
        port.set(1, Ok(true));
        assert_eq!(s.poll(&mut port, 20), None);
    }

    #[test]
    fn clear_pending_drops_queued_edges() {
        let mut port = ScriptedContacts::all(false, &[1, 2]);
        let mut s = scanner(&[1, 2]);
        s.poll(&mut port, 0);
        port.set(1, Ok(true));
        port.set(2, Ok(true));
        s.poll(&mut port, 10); // surfaces contact 1, queues contact 2
        s.clear_pending();
        assert_eq!(s.poll(&mut port, 20), None);
    }

    struct ScriptedTags {
        reads: std::collections::VecDeque<Result<Option<&'static str>, SensorFault>>,
    }

    impl TagReaderPort for ScriptedTags {
        fn sense_tag(&mut self) -> Result<Option<TagText>, SensorFault> {
            match self.reads.pop_front().unwrap_or(Ok(None)) {
                Ok(Some(s)) => Ok(Some(TagText::try_from(s).unwrap())),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        }
    }

    fn tags(script: &[Result<Option<&'static str>, SensorFault>]) -> ScriptedTags {
        ScriptedTags {
            reads: script.iter().cloned().collect(),
        }
    }

    #[test]
    fn held_tag_emits_once() {
        let mut port = tags(&[Ok(Some("altar.bible")), Ok(Some("altar.bible")), Ok(None)]);
        let mut s = TagScanner::new();
        assert!(s.poll(&mut port, 0).is_some());
        assert!(s.poll(&mut port, 10).is_none());
        assert!(s.poll(&mut port, 20).is_none());
    }

    #[test]
    fn represent_after_absence_emits_again() {
        let mut port = tags(&[Ok(Some("coin")), Ok(None), Ok(Some("coin"))]);
        let mut s = TagScanner::new();
        assert!(s.poll(&mut port, 0).is_some());
        assert!(s.poll(&mut port, 10).is_none());
        assert!(s.poll(&mut port, 20).is_some());
    }

    #[test]
    fn fault_mid_hold_does_not_double_count() {
        let mut port = tags(&[
            Ok(Some("coin")),
            Err(SensorFault::TagReadFailed),
            Ok(Some("coin")),
        ]);
        let mut s = TagScanner::new();
        assert!(s.poll(&mut port, 0).is_some());
        assert!(s.poll(&mut port, 10).is_none()); // fault, presence kept
        assert!(s.poll(&mut port, 20).is_none()); // same hold, no re-emit
    }
}
