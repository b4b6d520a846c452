//! Line-oriented prompts over any reader/writer pair.

use anyhow::Result;
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::error::SelectionError;
use crate::orchestrator::{BatchReport, FailureReason};
use crate::range::{self, RangeSelection};

const RULE_WIDTH: usize = 80;

/// Answers accepted as "yes" when confirming.
const YES_ANSWERS: &[&str] = &["y", "yes", "s", "si", "sí"];

/// How the chapters of a book are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    All,
    Range,
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line.
    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn rule(&mut self) -> Result<()> {
        self.say("=".repeat(RULE_WIDTH))
    }

    /// Print `question` and read one trimmed line; `None` at end of input.
    pub fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.say("")?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Let the user pick one of `files` by its 1-based number.
    pub fn choose_file(&mut self, files: &[PathBuf]) -> Result<Option<usize>> {
        for (i, file) in files.iter().enumerate() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.say(format!("  [{}] {}", i + 1, name))?;
        }
        self.say("")?;

        let question = format!("Select the number of the file to split (1-{}): ", files.len());
        loop {
            let Some(answer) = self.ask(&question)? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=files.len()).contains(&n) => return Ok(Some(n - 1)),
                Ok(_) => self.say("Invalid option. Try again.")?,
                Err(_) => self.say("Please enter a valid number.")?,
            }
        }
    }

    pub fn show_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        self.say("")?;
        self.rule()?;
        self.say("AVAILABLE CHAPTERS:")?;
        self.rule()?;
        for chapter in catalog.iter() {
            self.say(format!("  [{:04}] {}", chapter.index, chapter.title))?;
        }
        self.rule()?;
        self.say("")
    }

    pub fn choose_mode(&mut self) -> Result<Option<SelectionMode>> {
        self.say("SPLIT OPTIONS:")?;
        self.say("  [1] Split ALL chapters")?;
        self.say("  [2] Split a SELECTION (range of chapters)")?;
        self.say("")?;

        loop {
            let Some(answer) = self.ask("Choose an option (1 or 2): ")? else {
                return Ok(None);
            };
            match answer.as_str() {
                "1" => return Ok(Some(SelectionMode::All)),
                "2" => return Ok(Some(SelectionMode::Range)),
                _ => self.say("Invalid option. Enter 1 or 2.")?,
            }
        }
    }

    /// Read range expressions until one selects at least one of `len` chapters.
    pub fn choose_range(&mut self, len: usize) -> Result<Option<RangeSelection>> {
        self.say("")?;
        self.say("Examples:")?;
        self.say("  '5'         -> only chapter 5")?;
        self.say("  '1-5'       -> chapters 1 to 5")?;
        self.say("  '1,3,5'     -> chapters 1, 3 and 5")?;
        self.say("  '1-3,5,7-9' -> chapters 1-3, 5 and 7-9")?;
        self.say("")?;

        loop {
            let Some(answer) = self.ask("Enter the chapter range: ")? else {
                return Ok(None);
            };
            match range::select(&answer, len) {
                Ok(selection) => {
                    self.say(format!(
                        "{} chapter(s) will be split: [{}]",
                        selection.len(),
                        selection
                    ))?;
                    return Ok(Some(selection));
                }
                Err(SelectionError::EmptySelection) => {
                    self.say("No valid chapters selected. Try again.")?
                }
                Err(SelectionError::MalformedRangeExpression(_)) => {
                    self.say("Invalid format. Try again.")?
                }
            }
        }
    }

    /// Ask a yes/no question; anything but an explicit yes declines.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(question)?.unwrap_or_default().to_lowercase();
        Ok(YES_ANSWERS.contains(&answer.as_str()))
    }

    pub fn show_report(&mut self, report: &BatchReport) -> Result<()> {
        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(path) => self.say(format!("  Created: {}", path.display()))?,
                Err(reason @ FailureReason::IndexOutOfRange { .. }) => {
                    self.say(format!("  Skipped chapter {}: {}", outcome.index, reason))?
                }
                Err(reason @ FailureReason::Io(_)) => {
                    self.say(format!("  Failed chapter {}: {}", outcome.index, reason))?
                }
            }
        }
        self.say("")?;
        self.say(report.summary())
    }
}
