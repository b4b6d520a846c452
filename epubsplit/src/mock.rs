//! In-memory splitter for testing code that drives a [`ContainerSplitter`].

use std::collections::HashSet;
use std::io;

use crate::error::{EpubSplitError, Result};
use crate::splitter::{ContainerSplitter, SplitLine};

/// A splitter backed by a fixed list of lines, with configurable failures.
#[derive(Debug, Default)]
pub struct MockSplitter {
    lines: Vec<SplitLine>,
    failing: HashSet<usize>,
    unreadable: bool,
    enumerate_calls: usize,
    extract_calls: Vec<(Vec<usize>, String)>,
}

impl MockSplitter {
    /// Create a splitter from each chapter's table-of-contents labels.
    pub fn with_toc(chapters: &[&[&str]]) -> Self {
        let lines = chapters
            .iter()
            .enumerate()
            .map(|(i, toc)| {
                SplitLine::new(
                    format!("Text/part{:04}.xhtml", i),
                    toc.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        Self::with_lines(lines)
    }

    pub fn with_lines(lines: Vec<SplitLine>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    /// A source that cannot be read at all.
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Default::default()
        }
    }

    /// Make extraction fail whenever `index` is requested.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn enumerate_calls(&self) -> usize {
        self.enumerate_calls
    }

    /// Index lists and labels passed to `extract_chapter`, in call order.
    pub fn extract_calls(&self) -> &[(Vec<usize>, String)] {
        &self.extract_calls
    }
}

impl ContainerSplitter for MockSplitter {
    fn enumerate_chapters(&mut self) -> Result<Vec<SplitLine>> {
        self.enumerate_calls += 1;
        if self.unreadable {
            return Err(EpubSplitError::InvalidStructure(
                "mock source is unreadable".to_string(),
            ));
        }
        Ok(self.lines.clone())
    }

    fn extract_chapter(&mut self, indices: &[usize], label: &str) -> Result<Vec<u8>> {
        self.extract_calls.push((indices.to_vec(), label.to_string()));
        if indices.is_empty() {
            return Err(EpubSplitError::EmptySelection);
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= self.lines.len()) {
            return Err(EpubSplitError::LineOutOfRange {
                index,
                count: self.lines.len(),
            });
        }
        if let Some(index) = indices.iter().find(|&&i| self.failing.contains(&i)) {
            return Err(EpubSplitError::Io(io::Error::other(format!(
                "mock read failure at line {}",
                index
            ))));
        }
        Ok(format!("{}:{:?}", label, indices).into_bytes())
    }

    fn extension(&self) -> &'static str {
        "epub"
    }
}
