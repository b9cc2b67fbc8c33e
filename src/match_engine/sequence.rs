//! Sequential-pattern match: N presses in exact configured order.
//!
//! The classic keypad/button-run puzzle. A cursor walks the expected list;
//! each press either advances it or, when it comes from the dedicated fail
//! contact or from any registered contact that is not the one currently
//! expected, clears progress and reports a mismatch. Pressing the
//! just-accepted contact again counts as a wrong press: the cursor has
//! already moved on. Releases and unregistered contacts are neutral.

use super::{InputEvent, MatchOutcome, MatchProgress};
use crate::app::ports::ContactId;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct SequenceMatch {
    expected: Vec<ContactId>,
    fail_source: Option<ContactId>,
    cursor: usize,
}

impl SequenceMatch {
    pub fn new(expected: &[ContactId], fail_source: Option<ContactId>) -> Result<Self, ConfigError> {
        if expected.is_empty() {
            return Err(ConfigError::InvalidPattern("sequence needs at least one step"));
        }
        if let Some(fail) = fail_source {
            if expected.contains(&fail) {
                return Err(ConfigError::InvalidPattern("fail source is also an expected step"));
            }
        }
        Ok(Self {
            expected: expected.to_vec(),
            fail_source,
            cursor: 0,
        })
    }

    pub fn accept(&mut self, event: &InputEvent) -> MatchOutcome {
        let InputEvent::Contact(ev) = event else {
            return MatchOutcome::Continue;
        };
        if !ev.value {
            return MatchOutcome::Continue; // releases are neutral
        }
        if self.cursor >= self.expected.len() {
            return MatchOutcome::Complete; // latched until clear()
        }

        if Some(ev.source) == self.fail_source {
            self.cursor = 0;
            return MatchOutcome::Mismatch;
        }
        if ev.source == self.expected[self.cursor] {
            self.cursor += 1;
            if self.cursor == self.expected.len() {
                return MatchOutcome::Complete;
            }
            return MatchOutcome::Continue;
        }
        if self.expected.contains(&ev.source) {
            // Registered but wrong for this step.
            self.cursor = 0;
            return MatchOutcome::Mismatch;
        }
        MatchOutcome::Continue
    }

    pub fn progress(&self) -> MatchProgress {
        MatchProgress::Cursor {
            position: self.cursor,
            expected: self.expected.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Everything the scanner must watch: the steps plus the fail contact.
    pub fn watched(&self) -> Vec<ContactId> {
        let mut ids = self.expected.clone();
        if let Some(fail) = self.fail_source {
            ids.push(fail);
        }
        ids
    }

    /// Cursor position, for per-step feedback outputs.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
