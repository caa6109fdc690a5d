//! Types for the selection layer.

use std::io;

use crate::scorer::ScoredCandidate;

/// Result of running selection over a candidate list.
#[derive(Debug, Clone)]
pub enum SelectionOutcome {
    /// The user (or auto-selection) picked this candidate.
    Selected(ScoredCandidate),
    /// The candidate list was empty; nothing to pick.
    NoMatch,
    /// The user declined to pick anything. Not an error.
    Cancelled,
}

/// Answer to a yes/no confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    /// Input ended (EOF) before an answer was given.
    Cancelled,
}

/// Interaction seam for prompting. The production implementation talks to
/// the terminal; tests script responses.
pub trait Prompt {
    /// Show text to the user. No trailing newline is added.
    fn display(&mut self, text: &str);

    /// Read one line of input. `Ok(None)` means end of input (EOF).
    fn read_line(&mut self) -> io::Result<Option<String>>;
}
