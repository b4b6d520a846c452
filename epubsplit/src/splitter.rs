use crate::error::Result;

/// One splittable unit of a container, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLine {
    /// Archive path of the content document
    pub href: String,
    /// Anchor of the first table-of-contents entry targeting this document
    pub anchor: Option<String>,
    /// Table-of-contents labels targeting this document, in TOC order
    pub toc: Vec<String>,
}

impl SplitLine {
    pub fn new(href: impl Into<String>, toc: Vec<String>) -> Self {
        Self {
            href: href.into(),
            anchor: None,
            toc,
        }
    }
}

/// A container format that can list its chapters and re-package a subset of them.
///
/// Methods take `&mut self`: implementations read from a single open source
/// handle, so enumeration and extraction are never interleaved.
pub trait ContainerSplitter {
    /// List the split lines of the source in reading order.
    fn enumerate_chapters(&mut self) -> Result<Vec<SplitLine>>;

    /// Build a new, self-contained container holding the given lines.
    ///
    /// `label` becomes the title of the new container.
    fn extract_chapter(&mut self, indices: &[usize], label: &str) -> Result<Vec<u8>>;

    /// File extension for containers produced by `extract_chapter`.
    fn extension(&self) -> &'static str;
}
