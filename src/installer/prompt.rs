//! Interactive input for the installer.

use std::{
    collections::VecDeque,
    io::{self, Write},
};

use anyhow::Result;

use crate::error::InstallError;

pub trait Prompter {
    /// Show `question` and return the trimmed answer; end of input is "".
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Yes/no question; an empty answer takes `default`.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let answer = self.ask(question)?.to_ascii_lowercase();
        Ok(match answer.as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }
}

pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> Result<String> {
        print!("{}", question);
        io::stdout().flush().ok();
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

/// Replays fixed answers in order, recording the questions asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), asked: Vec::new() }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default().trim().to_string())
    }
}

/// Parse a menu choice in `min..=max`. Anything else is fatal.
pub fn parse_selection(input: &str, min: usize, max: usize) -> Result<usize, InstallError> {
    let invalid = || InstallError::InvalidSelection { input: input.to_string(), min, max };
    let n: usize = input.trim().parse().map_err(|_| invalid())?;
    if n < min || n > max {
        return Err(invalid());
    }
    Ok(n)
}
