//! Pattern-matching strategy family.
//!
//! One engine decides, from a stream of debounced input events, whether the
//! physical puzzle in front of it has been solved:
//!
//! ```text
//! ┌───────────────┬────────────────────────────┬──────────────────────┐
//! │ Variant       │ Completes when              │ Can mismatch?        │
//! ├───────────────┼────────────────────────────┼──────────────────────┤
//! │ Conjunction   │ every contact active at once│ no                   │
//! │ Sequence      │ N presses in exact order    │ yes (wrong press)    │
//! │ Window        │ last K tag reads == reference│ no                  │
//! └───────────────┴────────────────────────────┴──────────────────────┘
//! ```
//!
//! The state machine stays strategy-agnostic: it feeds events to
//! [`MatchEngine::accept`] and reacts to the returned [`MatchOutcome`].
//! Engines hold no hardware handles and no time; they are pure fold
//! functions over the event stream, which is what makes them trivially
//! testable.

pub mod conjunction;
pub mod sequence;
pub mod window;

pub use conjunction::ConjunctionMatch;
pub use sequence::SequenceMatch;
pub use window::WindowMatch;

use crate::app::ports::{ContactId, TagText};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Input events
// ---------------------------------------------------------------------------

/// One contact edge, as produced by the contact scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub source: ContactId,
    /// New level: `true` = press/closure, `false` = release.
    pub value: bool,
    pub timestamp_ms: u64,
}

/// One debounced tag read (absent→present transition already applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    pub text: TagText,
    pub timestamp_ms: u64,
}

/// The event stream each engine folds over. Events of the wrong kind for a
/// given strategy are neutral: the engine returns `Continue` untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Contact(ContactEvent),
    Tag(TagEvent),
}

// ---------------------------------------------------------------------------
// Outcome and progress
// ---------------------------------------------------------------------------

/// Verdict for one accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Nothing decisive; keep feeding events.
    Continue,
    /// The pattern was violated; progress is cleared. Only the sequence
    /// variant produces this.
    Mismatch,
    /// The pattern is satisfied.
    Complete,
}

/// Strategy-specific progress snapshot. The variant always matches the
/// engine's strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchProgress {
    /// Sequence: how many correct presses so far, out of how many.
    Cursor { position: usize, expected: usize },
    /// Conjunction: how many registered contacts currently read active.
    Contacts { active: usize, registered: usize },
    /// Window: how many reads the window holds, out of the reference length.
    Window { filled: usize, length: usize },
}

// ---------------------------------------------------------------------------
// Tagged-variant engine
// ---------------------------------------------------------------------------

/// The pluggable matching strategy, one tagged variant per physical puzzle
/// style.
#[derive(Debug, Clone)]
pub enum MatchEngine {
    Conjunction(ConjunctionMatch),
    Sequence(SequenceMatch),
    Window(WindowMatch),
}

impl MatchEngine {
    /// AND-match over a set of contacts.
    pub fn conjunction(contacts: &[ContactId]) -> Result<Self, ConfigError> {
        Ok(Self::Conjunction(ConjunctionMatch::new(contacts)?))
    }

    /// Ordered-press match with an optional dedicated fail contact.
    pub fn sequence(
        expected: &[ContactId],
        fail_source: Option<ContactId>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::Sequence(SequenceMatch::new(expected, fail_source)?))
    }

    /// Sliding-window tag match against a fixed reference sequence.
    pub fn window(reference: &[&str]) -> Result<Self, ConfigError> {
        Ok(Self::Window(WindowMatch::new(reference)?))
    }

    /// Fold one event into the engine.
    pub fn accept(&mut self, event: &InputEvent) -> MatchOutcome {
        match self {
            Self::Conjunction(m) => m.accept(event),
            Self::Sequence(m) => m.accept(event),
            Self::Window(m) => m.accept(event),
        }
    }

    /// Current progress; the variant mirrors the strategy.
    pub fn progress(&self) -> MatchProgress {
        match self {
            Self::Conjunction(m) => m.progress(),
            Self::Sequence(m) => m.progress(),
            Self::Window(m) => m.progress(),
        }
    }

    /// Drop all accumulated progress (Reset path).
    pub fn clear(&mut self) {
        match self {
            Self::Conjunction(m) => m.clear(),
            Self::Sequence(m) => m.clear(),
            Self::Window(m) => m.clear(),
        }
    }

    /// Seed current contact readings without evaluating. Called on
    /// activation so a level change that happened while the puzzle was not
    /// Active is not lost; only the conjunction variant has levels to seed.
    pub fn prime(&mut self, levels: &[(ContactId, bool)]) {
        if let Self::Conjunction(m) = self {
            m.prime(levels);
        }
    }

    /// The contacts the scanner must watch for this strategy.
    pub fn watched_contacts(&self) -> Vec<ContactId> {
        match self {
            Self::Conjunction(m) => m.contacts(),
            Self::Sequence(m) => m.watched(),
            Self::Window(_) => Vec::new(),
        }
    }

    /// Short name for logs.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Conjunction(_) => "conjunction",
            Self::Sequence(_) => "sequence",
            Self::Window(_) => "window",
        }
    }
}
