use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// Everything the tool needs to ask the person running it.
pub trait Operator {
    /// Ask for a value. A blank answer yields `default` when one is given.
    fn prompt(&self, label: &str, default: Option<&str>) -> Result<String>;
    /// Ask for a value without echoing it.
    fn prompt_secret(&self, label: &str) -> Result<String>;
    /// Yes/no question; anything other than an answer starting with `y` is no.
    fn confirm(&self, question: &str) -> Result<bool>;
}

pub struct TerminalOperator;

impl TerminalOperator {
    fn read_line(&self, text: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{text}")?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim().to_string())
    }
}

impl Operator for TerminalOperator {
    fn prompt(&self, label: &str, default: Option<&str>) -> Result<String> {
        let text = match default {
            Some(d) => format!("{label} [{d}]: "),
            None => format!("{label}: "),
        };
        let answer = self.read_line(&text)?;
        Ok(resolve_answer(answer, default))
    }

    fn prompt_secret(&self, label: &str) -> Result<String> {
        rpassword::prompt_password(format!("{label}: ")).context("Failed to read password")
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{question} (N/y): "))?;
        Ok(is_yes(&answer))
    }
}

fn resolve_answer(answer: String, default: Option<&str>) -> String {
    match default {
        Some(d) if answer.is_empty() => d.to_string(),
        _ => answer,
    }
}

fn is_yes(answer: &str) -> bool {
    answer
        .trim()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}
