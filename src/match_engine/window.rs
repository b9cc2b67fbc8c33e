//! Sliding-window tag match: the last K reads equal a reference sequence.
//!
//! NFC-driven puzzles present tokens one at a time in some order; the
//! engine keeps a FIFO of the most recent K reads and compares it to the
//! reference after every read. Wrong reads are not failures; they shift
//! through the window and the player keeps going, so this variant never
//! reports a mismatch. Debouncing (one event per physical tap) is the tag
//! scanner's job; the engine trusts its input stream.

use super::{InputEvent, MatchOutcome, MatchProgress};
use crate::app::ports::TagText;
use crate::error::ConfigError;

/// Upper bound on the reference length; field patterns are 3–6 tags.
pub const WINDOW_CAP: usize = 16;

#[derive(Debug, Clone)]
pub struct WindowMatch {
    reference: heapless::Vec<TagText, WINDOW_CAP>,
    window: heapless::Deque<TagText, WINDOW_CAP>,
}

impl WindowMatch {
    pub fn new(reference: &[&str]) -> Result<Self, ConfigError> {
        if reference.is_empty() {
            return Err(ConfigError::InvalidPattern("window reference must not be empty"));
        }
        if reference.len() > WINDOW_CAP {
            return Err(ConfigError::InvalidPattern("window reference exceeds capacity"));
        }
        let mut texts: heapless::Vec<TagText, WINDOW_CAP> = heapless::Vec::new();
        for &raw in reference {
            let text = TagText::try_from(raw)
                .map_err(|()| ConfigError::InvalidPattern("reference tag text too long"))?;
            let _ = texts.push(text);
        }
        Ok(Self {
            reference: texts,
            window: heapless::Deque::new(),
        })
    }

    pub fn accept(&mut self, event: &InputEvent) -> MatchOutcome {
        let InputEvent::Tag(ev) = event else {
            return MatchOutcome::Continue;
        };
        if self.window.len() == self.reference.len() {
            self.window.pop_front();
        }
        let _ = self.window.push_back(ev.text.clone());

        if self.window.len() == self.reference.len()
            && self.window.iter().eq(self.reference.iter())
        {
            MatchOutcome::Complete
        } else {
            MatchOutcome::Continue
        }
    }

    pub fn progress(&self) -> MatchProgress {
        MatchProgress::Window {
            filled: self.window.len(),
            length: self.reference.len(),
        }
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
