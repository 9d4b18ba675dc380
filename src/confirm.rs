//! Operator confirmation before any remote write.
//!
//! Only a single `Y` or `y` (surrounding whitespace ignored) counts as
//! consent. An empty line, `yes`, EOF, or anything else declines.

use std::io::{self, BufRead, Write};

/// Asks the operator a yes/no question.
pub trait Confirm {
    /// Shows `prompt` and returns whether the answer was affirmative.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Returns `true` only for `Y` or `y`.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "Y" | "y")
}

/// Line-oriented prompt over any reader/writer pair.
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    /// Reads answers from `input` and writes prompts to `output`.
    pub fn new(input: R, output: W) -> Self {
        LineConfirm { input, output }
    }
}

impl LineConfirm<io::StdinLock<'static>, io::Stderr> {
    /// Prompts on stderr and reads from stdin, keeping stdout for the report.
    pub fn stdio() -> Self {
        LineConfirm::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        write!(self.output, "{prompt} [y/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        Ok(is_affirmative(&answer))
    }
}

/// Non-interactive consent, used when the operator passed `--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        tracing::info!(prompt, "confirmation supplied on the command line");
        Ok(true)
    }
}
