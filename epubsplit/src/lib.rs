//! EPUB container splitting.
//!
//! Lists the chapters ("split lines") of an EPUB in reading order and writes
//! any subset of them out as a new, standalone EPUB:
//! - [`SplitEpub`]: the EPUB implementation (EPUB 2 NCX or EPUB 3 nav TOC)
//! - [`MockSplitter`]: in-memory implementation for tests
//! - [`SampleEpub`]: builder for small valid EPUB files

pub mod error;
pub mod mock;
mod package;
mod path;
pub mod sample;
pub mod split_epub;
pub mod splitter;
mod toc;

pub use error::{EpubSplitError, Result};
pub use mock::MockSplitter;
pub use sample::{SampleEpub, TocStyle};
pub use split_epub::SplitEpub;
pub use splitter::{ContainerSplitter, SplitLine};
