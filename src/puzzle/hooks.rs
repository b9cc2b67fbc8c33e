//! Named-event callback table for the puzzle state machine.
//!
//! One optional slot per named event kind. A missing registration is a
//! silent no-op; a handler that returns an error is logged and never
//! unwinds into the state machine, so side effects already applied stay
//! applied.

use core::fmt;

use log::warn;

/// Error a hook may return. Carries the handler's own description of what
/// went wrong; dispatch reports it and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    reason: String,
}

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

pub type HookResult = Result<(), HookError>;

/// Boxed handler. `FnMut` because handlers typically push into a channel or
/// toggle adapter state.
pub type Hook = Box<dyn FnMut() -> HookResult>;

/// The named events a puzzle can announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleHook {
    Activated,
    Solved,
    Failed,
    Reset,
}

impl PuzzleHook {
    pub fn name(self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Solved => "solved",
            Self::Failed => "failed",
            Self::Reset => "reset",
        }
    }
}

/// Per-event handler slots.
#[derive(Default)]
pub struct PuzzleHooks {
    activated: Option<Hook>,
    solved: Option<Hook>,
    failed: Option<Hook>,
    reset: Option<Hook>,
}

impl PuzzleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_activated(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.activated = Some(Box::new(hook));
    }

    pub fn on_solved(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.solved = Some(Box::new(hook));
    }

    pub fn on_failed(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.failed = Some(Box::new(hook));
    }

    pub fn on_reset(&mut self, hook: impl FnMut() -> HookResult + 'static) {
        self.reset = Some(Box::new(hook));
    }

    /// Invoke the slot for `which`, if registered. Returns whether a
    /// registered handler faulted (already logged here).
    pub(crate) fn fire(&mut self, which: PuzzleHook) -> bool {
        let slot = match which {
            PuzzleHook::Activated => &mut self.activated,
            PuzzleHook::Solved => &mut self.solved,
            PuzzleHook::Failed => &mut self.failed,
            PuzzleHook::Reset => &mut self.reset,
        };
        let Some(hook) = slot else {
            return false;
        };
        if let Err(e) = hook() {
            warn!("puzzle '{}' hook fault: {e}", which.name());
            return true;
        }
        false
    }
}
