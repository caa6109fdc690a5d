//! Terminal-backed prompt.

use std::io::{self, Write};

use vsixget_core::Prompt;

/// Prompts on stdout, reads answers from stdin.
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn display(&mut self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let read = io::stdin().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}
