//! The ordered, zero-based chapter list of one source document.

use epubsplit::{ContainerSplitter, SplitLine};

use crate::error::CatalogError;

/// Display title for chapters without a table-of-contents entry.
pub const NO_TOC_TITLE: &str = "(no TOC)";

const TITLE_SEPARATOR: &str = " > ";

/// Where a chapter lives inside the container. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub href: String,
    pub anchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDescriptor {
    pub index: usize,
    /// Table-of-contents labels leading to this chapter; empty if it has none
    pub toc: Vec<String>,
    /// `toc` joined for display, or [`NO_TOC_TITLE`]
    pub title: String,
    pub locator: Locator,
}

impl ChapterDescriptor {
    /// Label for the chapter's own artifact: the first TOC label, or
    /// `part-NNNN` for chapters without one.
    pub fn label(&self) -> String {
        match self.toc.first() {
            Some(first) => first.clone(),
            None => format!("part-{:04}", self.index),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    chapters: Vec<ChapterDescriptor>,
}

impl Catalog {
    /// Enumerate the splitter's chapters. The splitter is consulted exactly once.
    pub fn build(splitter: &mut dyn ContainerSplitter) -> Result<Self, CatalogError> {
        let lines = splitter.enumerate_chapters()?;
        log::debug!("Catalog built with {} chapter(s)", lines.len());
        Ok(Self::from_lines(lines))
    }

    pub fn from_lines(lines: Vec<SplitLine>) -> Self {
        let chapters = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let title = if line.toc.is_empty() {
                    NO_TOC_TITLE.to_string()
                } else {
                    line.toc.join(TITLE_SEPARATOR)
                };
                ChapterDescriptor {
                    index,
                    toc: line.toc,
                    title,
                    locator: Locator {
                        href: line.href,
                        anchor: line.anchor,
                    },
                }
            })
            .collect();
        Self { chapters }
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChapterDescriptor> {
        self.chapters.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterDescriptor> {
        self.chapters.iter()
    }

    /// Highest valid index, `None` for an empty catalog.
    pub fn max_index(&self) -> Option<usize> {
        self.chapters.len().checked_sub(1)
    }
}
