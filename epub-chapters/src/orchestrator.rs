//! Turns a chapter selection into one output file per chapter.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use epubsplit::ContainerSplitter;

use crate::catalog::Catalog;
use crate::range::RangeSelection;
use crate::slug::slug;

/// Where a batch writes its artifacts.
#[derive(Debug, Clone)]
pub struct SplitTarget {
    pub output_dir: PathBuf,
    /// Name of the source document, for log messages
    pub base_name: String,
}

impl SplitTarget {
    /// Target directory `output_root/slug(stem)` for the source at `source`.
    pub fn for_source(output_root: &Path, source: &Path) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base_name = source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| stem.clone());
        Self {
            output_dir: output_root.join(slug(&stem)),
            base_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The index is not in the catalog; nothing was touched on disk
    IndexOutOfRange { max_index: Option<usize> },
    /// Creating the directory, extracting, or writing the artifact failed
    Io(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::IndexOutOfRange { max_index: Some(max) } => {
                write!(f, "index does not exist (max: {})", max)
            }
            FailureReason::IndexOutOfRange { max_index: None } => {
                write!(f, "index does not exist (no chapters)")
            }
            FailureReason::Io(message) => write!(f, "{}", message),
        }
    }
}

/// Result for one requested index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub index: usize,
    pub result: Result<PathBuf, FailureReason>,
}

impl SplitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.result.as_ref().err()
    }
}

/// All outcomes of one batch, in ascending index order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SplitOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &SplitOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn out_of_range(&self) -> impl Iterator<Item = &SplitOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.failure(), Some(FailureReason::IndexOutOfRange { .. })))
    }

    pub fn failed(&self) -> impl Iterator<Item = &SplitOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.failure(), Some(FailureReason::Io(_))))
    }

    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|o| !o.is_success())
    }

    /// One-line summary that never hides partial failure.
    pub fn summary(&self) -> String {
        let status = if self.has_errors() {
            "Completed with errors"
        } else {
            "Completed"
        };
        format!(
            "{}. Created: {}, Skipped (out of range): {}, Failed: {}",
            status,
            self.succeeded().count(),
            self.out_of_range().count(),
            self.failed().count()
        )
    }
}

/// Artifact filename: `NNNN-slug.ext`. The index prefix keeps names unique
/// when chapters share a title.
pub fn artifact_name(index: usize, label: &str, extension: &str) -> String {
    format!("{:04}-{}.{}", index, slug(label), extension)
}

/// Write one artifact per selected index, continuing past per-item failures.
pub fn split_chapters(
    splitter: &mut dyn ContainerSplitter,
    catalog: &Catalog,
    selection: &RangeSelection,
    target: &SplitTarget,
) -> BatchReport {
    log::info!(
        "Splitting {} chapter(s) of {} into {}",
        selection.len(),
        target.base_name,
        target.output_dir.display()
    );

    let outcomes = selection
        .iter()
        .map(|index| {
            let result = split_one(splitter, catalog, index, target);
            match &result {
                Ok(path) => log::debug!("Chapter {} written to {}", index, path.display()),
                Err(reason) => log::warn!("Chapter {} of {}: {}", index, target.base_name, reason),
            }
            SplitOutcome { index, result }
        })
        .collect();

    BatchReport { outcomes }
}

fn split_one(
    splitter: &mut dyn ContainerSplitter,
    catalog: &Catalog,
    index: usize,
    target: &SplitTarget,
) -> Result<PathBuf, FailureReason> {
    let chapter = catalog.get(index).ok_or(FailureReason::IndexOutOfRange {
        max_index: catalog.max_index(),
    })?;
    let label = chapter.label();
    log::debug!(
        "Extracting chapter {} from {}{}",
        index,
        chapter.locator.href,
        chapter
            .locator
            .anchor
            .as_deref()
            .map(|a| format!("#{}", a))
            .unwrap_or_default()
    );

    fs::create_dir_all(&target.output_dir).map_err(|e| {
        FailureReason::Io(format!(
            "cannot create {}: {}",
            target.output_dir.display(),
            e
        ))
    })?;

    let path = target
        .output_dir
        .join(artifact_name(index, &label, splitter.extension()));

    let bytes = splitter
        .extract_chapter(&[index], &label)
        .map_err(|e| FailureReason::Io(format!("cannot extract chapter: {}", e)))?;

    fs::write(&path, bytes)
        .map_err(|e| FailureReason::Io(format!("cannot write {}: {}", path.display(), e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use epubsplit::{MockSplitter, SampleEpub, SplitEpub};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn ten_chapters() -> MockSplitter {
        MockSplitter::with_toc(&[
            &["Intro"],
            &["Chapter One"],
            &["Chapter Two"],
            &[],
            &["Same Title"],
            &["Same Title"],
            &["Chapter Six", "Scene"],
            &["Chapter Seven"],
            &["Chapter Eight"],
            &["Outro"],
        ])
    }

    fn target(dir: &TempDir) -> SplitTarget {
        SplitTarget {
            output_dir: dir.path().join("book"),
            base_name: "book.epub".to_string(),
        }
    }

    #[test]
    fn test_artifact_name() {
        assert_eq!(
            artifact_name(3, "Chapter One: The Beginning!", "epub"),
            "0003-chapter-one-the-beginning.epub"
        );
        assert_eq!(artifact_name(12, "part-0012", "epub"), "0012-part-0012.epub");
        assert_eq!(artifact_name(0, "!!!", "epub"), "0000-chapter.epub");
    }

    #[test]
    fn test_target_for_source() {
        let target =
            SplitTarget::for_source(Path::new("output"), Path::new("input/My Book (2nd Ed).epub"));
        assert_eq!(target.output_dir, PathBuf::from("output/my-book-2nd-ed"));
        assert_eq!(target.base_name, "My Book (2nd Ed).epub");
    }

    #[test]
    fn test_full_selection_produces_one_unique_artifact_each() {
        let dir = TempDir::new().unwrap();
        let mut mock = ten_chapters();
        let catalog = Catalog::build(&mut mock).unwrap();
        let selection = RangeSelection::all(catalog.len());

        let report = split_chapters(&mut mock, &catalog, &selection, &target(&dir));

        assert_eq!(report.outcomes.len(), 10);
        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
        assert!(!report.has_errors());

        let paths: HashSet<&Path> = report
            .outcomes
            .iter()
            .filter_map(|o| o.output_path())
            .collect();
        assert_eq!(paths.len(), 10);
        assert!(paths.iter().all(|p| p.exists()));
        assert!(paths.contains(dir.path().join("book/0004-same-title.epub").as_path()));
        assert!(paths.contains(dir.path().join("book/0005-same-title.epub").as_path()));
        assert!(paths.contains(dir.path().join("book/0003-part-0003.epub").as_path()));
        assert!(paths.contains(dir.path().join("book/0006-chapter-six.epub").as_path()));
    }

    #[test]
    fn test_one_chapter_per_extract_call() {
        let dir = TempDir::new().unwrap();
        let mut mock = ten_chapters();
        let catalog = Catalog::build(&mut mock).unwrap();
        let selection: RangeSelection = [6, 3].into_iter().collect();

        split_chapters(&mut mock, &catalog, &selection, &target(&dir));

        assert_eq!(
            mock.extract_calls(),
            &[
                (vec![3], "part-0003".to_string()),
                (vec![6], "Chapter Six".to_string()),
            ]
        );
        assert_eq!(mock.enumerate_calls(), 1);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        let mut mock = ten_chapters().failing_on(7);
        let catalog = Catalog::build(&mut mock).unwrap();
        let selection = RangeSelection::all(10);

        let report = split_chapters(&mut mock, &catalog, &selection, &target(&dir));

        for outcome in &report.outcomes {
            if outcome.index == 7 {
                assert!(matches!(outcome.failure(), Some(FailureReason::Io(_))));
            } else {
                assert!(outcome.is_success(), "index {} should succeed", outcome.index);
                assert!(outcome.output_path().unwrap().exists());
            }
        }
        assert!(report.has_errors());
        assert_eq!(report.failed().count(), 1);
        assert!(!dir.path().join("book/0007-chapter-seven.epub").exists());
        assert!(report.summary().starts_with("Completed with errors"));
    }

    #[test]
    fn test_write_failure_is_per_item() {
        let dir = TempDir::new().unwrap();
        let mut mock = ten_chapters();
        let catalog = Catalog::build(&mut mock).unwrap();
        // A directory squatting on the artifact path makes the write fail.
        fs::create_dir_all(dir.path().join("book/0002-chapter-two.epub")).unwrap();
        let selection: RangeSelection = [1, 2, 3].into_iter().collect();

        let report = split_chapters(&mut mock, &catalog, &selection, &target(&dir));

        assert!(report.outcomes[0].is_success());
        assert!(matches!(report.outcomes[1].failure(), Some(FailureReason::Io(_))));
        assert!(report.outcomes[2].is_success());
    }

    #[test]
    fn test_directory_creation_failure_is_per_item() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "plain file").unwrap();
        let target = SplitTarget {
            output_dir: blocker.join("book"),
            base_name: "book.epub".to_string(),
        };
        let mut mock = ten_chapters();
        let catalog = Catalog::build(&mut mock).unwrap();
        let selection: RangeSelection = [0, 4, 12].into_iter().collect();

        let report = split_chapters(&mut mock, &catalog, &selection, &target);

        assert_eq!(report.outcomes.len(), 3);
        for outcome in &report.outcomes[..2] {
            match outcome.failure() {
                Some(FailureReason::Io(message)) => assert!(message.starts_with("cannot create")),
                other => panic!("index {} should fail with Io, got {:?}", outcome.index, other),
            }
        }
        assert!(matches!(
            report.outcomes[2].failure(),
            Some(FailureReason::IndexOutOfRange { .. })
        ));
        assert!(mock.extract_calls().is_empty());
        assert_eq!(
            report.summary(),
            "Completed with errors. Created: 0, Skipped (out of range): 1, Failed: 2"
        );
    }

    #[test]
    fn test_stale_selection_reports_out_of_range() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockSplitter::with_toc(&[&["A"], &["B"]]);
        let catalog = Catalog::build(&mut mock).unwrap();
        let selection: RangeSelection = [1, 5, 9].into_iter().collect();

        let report = split_chapters(&mut mock, &catalog, &selection, &target(&dir));

        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.out_of_range().count(), 2);
        assert_eq!(
            report.outcomes[1].failure(),
            Some(&FailureReason::IndexOutOfRange { max_index: Some(1) })
        );
        assert_eq!(mock.extract_calls().len(), 1);
        assert_eq!(
            report.summary(),
            "Completed with errors. Created: 1, Skipped (out of range): 2, Failed: 0"
        );
    }

    #[test]
    fn test_out_of_range_only_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockSplitter::with_toc(&[&["A"]]);
        let catalog = Catalog::build(&mut mock).unwrap();
        let selection: RangeSelection = [4].into_iter().collect();

        split_chapters(&mut mock, &catalog, &selection, &target(&dir));

        assert!(!dir.path().join("book").exists());
    }

    #[test]
    fn test_split_real_epub() {
        let dir = TempDir::new().unwrap();
        let bytes = SampleEpub::new("Real Book")
            .chapter("Opening", "First.")
            .untitled_chapter("Second.")
            .chapter("Closing", "Third.")
            .build()
            .unwrap();
        let mut epub = SplitEpub::new(std::io::Cursor::new(bytes)).unwrap();
        let catalog = Catalog::build(&mut epub).unwrap();
        let selection = RangeSelection::all(catalog.len());

        let report = split_chapters(&mut epub, &catalog, &selection, &target(&dir));

        assert!(!report.has_errors());
        let names: Vec<String> = report
            .succeeded()
            .filter_map(|o| o.output_path())
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["0000-opening.epub", "0001-part-0001.epub", "0002-closing.epub"]
        );

        let written = fs::read(dir.path().join("book/0001-part-0001.epub")).unwrap();
        let split = SplitEpub::new(std::io::Cursor::new(written)).unwrap();
        assert_eq!(split.title(), Some("part-0001"));
        assert_eq!(split.split_lines().len(), 1);
    }
}
