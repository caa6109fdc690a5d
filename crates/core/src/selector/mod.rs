//! Candidate selection.
//!
//! Takes the ranked candidate list and resolves it to a single choice,
//! either automatically (non-interactive callers always take the top
//! result) or by prompting through a `Prompt` implementation.

mod controller;
mod types;

pub use controller::SelectionController;
pub use types::*;
