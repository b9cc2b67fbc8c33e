//! AND-match: every registered contact active in the same pass.
//!
//! Used for puzzles where several circuits must be closed together: all
//! statues on their pedestals, all plugs in their sockets. The engine
//! tracks the current level of each registered contact from the event
//! stream and re-evaluates on every edge. There is no time-tolerance
//! window: a contact released before the last one closes simply removes
//! eligibility until it is closed again.

use super::{InputEvent, MatchOutcome, MatchProgress};
use crate::app::ports::ContactId;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct ConjunctionMatch {
    /// Registered contacts with their last known level.
    levels: Vec<(ContactId, bool)>,
}

impl ConjunctionMatch {
    pub fn new(contacts: &[ContactId]) -> Result<Self, ConfigError> {
        if contacts.is_empty() {
            return Err(ConfigError::InvalidPattern("conjunction needs at least one contact"));
        }
        let mut levels: Vec<(ContactId, bool)> = Vec::with_capacity(contacts.len());
        for &id in contacts {
            if levels.iter().any(|&(seen, _)| seen == id) {
                return Err(ConfigError::InvalidPattern("duplicate contact registration"));
            }
            levels.push((id, false));
        }
        Ok(Self { levels })
    }

    pub fn accept(&mut self, event: &InputEvent) -> MatchOutcome {
        let InputEvent::Contact(ev) = event else {
            return MatchOutcome::Continue;
        };
        let Some(slot) = self.levels.iter_mut().find(|(id, _)| *id == ev.source) else {
            return MatchOutcome::Continue; // unregistered contact, neutral
        };
        slot.1 = ev.value;

        if self.levels.iter().all(|&(_, level)| level) {
            MatchOutcome::Complete
        } else {
            MatchOutcome::Continue
        }
    }

    /// Overwrite tracked levels from a scanner snapshot without evaluating.
    /// Contacts absent from the snapshot keep their tracked level.
    pub fn prime(&mut self, snapshot: &[(ContactId, bool)]) {
        for &(id, level) in snapshot {
            if let Some(slot) = self.levels.iter_mut().find(|(slot_id, _)| *slot_id == id) {
                slot.1 = level;
            }
        }
    }

    pub fn progress(&self) -> MatchProgress {
        MatchProgress::Contacts {
            active: self.levels.iter().filter(|&&(_, level)| level).count(),
            registered: self.levels.len(),
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.levels {
            slot.1 = false;
        }
    }

    pub fn contacts(&self) -> Vec<ContactId> {
        self.levels.iter().map(|&(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{press, release};
    use super::*;
    use crate::match_engine::MatchOutcome::{Complete, Continue};

    fn engine(ids: &[u16]) -> ConjunctionMatch {
        let ids: Vec<ContactId> = ids.iter().map(|&n| ContactId(n)).collect();
        ConjunctionMatch::new(&ids).unwrap()
    }

    #[test]
    fn completes_when_all_contacts_active() {
        let mut m = engine(&[1, 2, 3]);
        assert_eq!(m.accept(&press(1)), Continue);
        assert_eq!(m.accept(&press(2)), Continue);
        assert_eq!(m.accept(&press(3)), Complete);
    }

    #[test]
    fn single_contact_completes_on_first_press() {
        let mut m = engine(&[7]);
        assert_eq!(m.accept(&press(7)), Complete);
    }

    #[test]
    fn release_removes_eligibility() {
        let mut m = engine(&[1, 2]);
        assert_eq!(m.accept(&press(1)), Continue);
        assert_eq!(m.accept(&release(1)), Continue);
        assert_eq!(m.accept(&press(2)), Continue);
        assert_eq!(m.accept(&press(1)), Complete);
    }

    #[test]
    fn unregistered_contact_is_neutral() {
        let mut m = engine(&[1, 2]);
        assert_eq!(m.accept(&press(1)), Continue);
        assert_eq!(m.accept(&press(99)), Continue);
        assert_eq!(m.progress(), MatchProgress::Contacts { active: 1, registered: 2 });
    }

    #[test]
    fn prime_seeds_levels_without_evaluating() {
        let mut m = engine(&[1, 2]);
        m.prime(&[(ContactId(1), true), (ContactId(2), true)]);
        // Primed complete-looking levels still need an event to fire.
        assert_eq!(m.progress(), MatchProgress::Contacts { active: 2, registered: 2 });
        assert_eq!(m.accept(&release(2)), Continue);
        assert_eq!(m.accept(&press(2)), Complete);
    }

    #[test]
    fn clear_drops_all_levels() {
        let mut m = engine(&[1, 2]);
        m.prime(&[(ContactId(1), true)]);
        m.clear();
        assert_eq!(m.progress(), MatchProgress::Contacts { active: 0, registered: 2 });
    }

    #[test]
    fn rejects_empty_and_duplicate_registration() {
        assert!(ConjunctionMatch::new(&[]).is_err());
        assert!(ConjunctionMatch::new(&[ContactId(1), ContactId(1)]).is_err());
    }
}
