//! Scripted prompt for exercising the selection loop in tests.

use std::collections::VecDeque;
use std::io;

use crate::selector::Prompt;

/// Replays a fixed sequence of input lines and captures displayed text.
/// Reads past the end of the script behave as EOF.
pub struct ScriptedPrompt {
    inputs: VecDeque<String>,
    output: String,
}

impl ScriptedPrompt {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: String::new(),
        }
    }

    /// Everything displayed so far.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Prompt for ScriptedPrompt {
    fn display(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front())
    }
}
