//! Selection state machine.

use std::io;

use tracing::debug;

use crate::scorer::ScoredCandidate;

use super::types::{Confirmation, Prompt, SelectionOutcome};

/// States of the interactive selection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptState {
    /// Waiting to show the prompt and read a line.
    Prompting,
    /// A line was read and needs to be checked against the candidate list.
    Validating,
    /// A valid index was chosen.
    Selected(usize),
    /// The user backed out, input ended, or too many invalid answers.
    Cancelled,
}

/// Resolves a ranked candidate list to a single selection.
pub struct SelectionController {
    interactive: bool,
    max_invalid_attempts: u32,
}

impl SelectionController {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            max_invalid_attempts: 3,
        }
    }

    /// Pick a candidate.
    ///
    /// Non-interactive mode always takes the top-ranked candidate without
    /// touching the prompt. Interactive mode renders the list and loops
    /// until a valid index, a cancellation, or too many invalid answers.
    pub fn select(
        &self,
        candidates: &[ScoredCandidate],
        prompt: &mut dyn Prompt,
    ) -> io::Result<SelectionOutcome> {
        if candidates.is_empty() {
            return Ok(SelectionOutcome::NoMatch);
        }

        if !self.interactive {
            let top = &candidates[0];
            debug!(
                identifier = %top.record.identifier(),
                score = top.score as f64,
                "Auto-selected top candidate"
            );
            return Ok(SelectionOutcome::Selected(top.clone()));
        }

        prompt.display(&render_candidates(candidates));

        let mut invalid_attempts = 0u32;
        let mut state = PromptState::Prompting;
        let mut line = String::new();

        loop {
            match state {
                PromptState::Prompting => {
                    prompt.display(&format!(
                        "Select an extension [1-{}], or q to cancel: ",
                        candidates.len()
                    ));
                    match prompt.read_line()? {
                        Some(input) => {
                            line = input;
                            state = PromptState::Validating;
                        }
                        None => state = PromptState::Cancelled,
                    }
                }
                PromptState::Validating => {
                    let answer = line.trim();
                    if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
                        state = PromptState::Cancelled;
                        continue;
                    }
                    match answer.parse::<usize>() {
                        Ok(n) if (1..=candidates.len()).contains(&n) => {
                            state = PromptState::Selected(n - 1);
                        }
                        _ => {
                            invalid_attempts += 1;
                            if invalid_attempts >= self.max_invalid_attempts {
                                prompt.display("Too many invalid selections, giving up.\n");
                                state = PromptState::Cancelled;
                            } else {
                                prompt.display(&format!(
                                    "Invalid selection, enter a number between 1 and {}.\n",
                                    candidates.len()
                                ));
                                state = PromptState::Prompting;
                            }
                        }
                    }
                }
                PromptState::Selected(index) => {
                    return Ok(SelectionOutcome::Selected(candidates[index].clone()));
                }
                PromptState::Cancelled => {
                    return Ok(SelectionOutcome::Cancelled);
                }
            }
        }
    }

    /// Ask a yes/no question. Defaults to No on anything but an explicit
    /// yes; EOF counts as cancellation. Non-interactive mode answers yes,
    /// matching auto-selection.
    pub fn confirm(&self, question: &str, prompt: &mut dyn Prompt) -> io::Result<Confirmation> {
        if !self.interactive {
            return Ok(Confirmation::Yes);
        }

        prompt.display(&format!("{} [y/N]: ", question));
        match prompt.read_line()? {
            None => Ok(Confirmation::Cancelled),
            Some(line) => {
                let answer = line.trim().to_lowercase();
                if answer == "y" || answer == "yes" {
                    Ok(Confirmation::Yes)
                } else {
                    Ok(Confirmation::No)
                }
            }
        }
    }
}

/// Render the candidate list for display, one numbered block per entry.
fn render_candidates(candidates: &[ScoredCandidate]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Found {} extension(s):\n\n", candidates.len()));
    for (i, candidate) in candidates.iter().enumerate() {
        let record = &candidate.record;
        out.push_str(&format!(
            "  {}. {} ({})\n",
            i + 1,
            record.display_name,
            record.identifier()
        ));
        if let Some(version) = record.latest_version() {
            out.push_str(&format!("     version {}", version));
        } else {
            out.push_str("     version unknown");
        }
        out.push_str(&format!(
            " | {} installs | {:.1}/5 ({} ratings) | score {:.1}\n",
            format_count(record.install_count),
            record.average_rating,
            record.rating_count,
            candidate.score
        ));
        if !record.description.is_empty() {
            out.push_str(&format!("     {}\n", truncate(&record.description, 100)));
        }
    }
    out.push('\n');
    out
}

/// Compact human count: 20_000_000 renders as "20.0M".
fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
