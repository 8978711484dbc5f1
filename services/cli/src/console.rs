//! Line-oriented learner input.

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tutor_core::{NavigationCommand, OptionLabel, SkillLevel};

/// Reads one answer per line. `None` means the input was closed.
pub struct Console<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Prints `prompt` and reads a trimmed line.
    pub async fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        println!("{}", prompt);
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from stdin")?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Asks until `parse` accepts the input, repeating `retry` after each miss.
    async fn ask_until<T>(
        &mut self,
        prompt: &str,
        retry: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> anyhow::Result<Option<T>> {
        let mut current = prompt;
        loop {
            let Some(input) = self.ask(current).await? else {
                return Ok(None);
            };
            if let Some(value) = parse(&input) {
                return Ok(Some(value));
            }
            current = retry;
        }
    }

    pub async fn ask_skill_level(&mut self) -> anyhow::Result<Option<SkillLevel>> {
        self.ask_until(
            "Select your skill level:\n  a) Beginner\n  b) Intermediate\n  c) Advanced",
            "Invalid choice. Please enter a, b or c.",
            |input| input.parse().ok(),
        )
        .await
    }

    pub async fn ask_option(&mut self) -> anyhow::Result<Option<OptionLabel>> {
        self.ask_until(
            "Your answer (a/b/c/d):",
            "Invalid input. Please enter a, b, c or d.",
            OptionLabel::parse_input,
        )
        .await
    }

    pub async fn ask_navigation(&mut self) -> anyhow::Result<Option<NavigationCommand>> {
        self.ask_until(
            "Next topic, repeat this lesson, or quit? (n/r/q)",
            "Invalid input. Please enter n, r or q.",
            NavigationCommand::parse,
        )
        .await
    }
}
