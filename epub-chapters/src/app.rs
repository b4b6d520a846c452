//! One split session: pick a book, pick chapters, confirm, split.

use anyhow::{Context, Result, bail};
use epubsplit::SplitEpub;
use std::ffi::OsStr;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::orchestrator::{self, BatchReport, SplitTarget};
use crate::prompt::{Prompter, SelectionMode};
use crate::range::{self, RangeSelection};

/// Chapter selection decided up front instead of prompted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetSelection {
    All,
    Range(String),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// File name inside `input_dir`; prompted for when absent
    pub file: Option<String>,
    pub selection: Option<PresetSelection>,
    pub confirm: bool,
    /// Print the chapter list and stop
    pub list_only: bool,
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    Completed(BatchReport),
    Listed,
    Cancelled,
    NoInputFiles,
    NoChapters,
    /// The source could not be opened or enumerated; nothing was written
    SourceUnreadable(CatalogError),
}

pub fn run<R: BufRead, W: Write>(
    options: &SessionOptions,
    prompter: &mut Prompter<R, W>,
) -> Result<SessionEnd> {
    let source = match &options.file {
        Some(name) => {
            let path = options.input_dir.join(name);
            if !path.is_file() {
                bail!("EPUB file not found: {}", path.display());
            }
            path
        }
        None => {
            let files = find_epub_files(&options.input_dir)?;
            if files.is_empty() {
                prompter.say(format!(
                    "No EPUB files in '{}'. Place .epub files there and run again.",
                    options.input_dir.display()
                ))?;
                return Ok(SessionEnd::NoInputFiles);
            }
            prompter.say(format!("FILES IN {}:", options.input_dir.display()))?;
            let Some(choice) = prompter.choose_file(&files)? else {
                return Ok(SessionEnd::Cancelled);
            };
            files[choice].clone()
        }
    };

    let display_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    prompter.say(format!("\nLoading: {}...", display_name))?;

    let (mut epub, catalog) = match open_source(&source) {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("Cannot read {}: {}", source.display(), e);
            prompter.say(format!("Error loading file: {}", e))?;
            return Ok(SessionEnd::SourceUnreadable(e));
        }
    };

    if catalog.is_empty() {
        prompter.say("The book has no chapters to split.")?;
        return Ok(SessionEnd::NoChapters);
    }

    prompter.show_catalog(&catalog)?;
    if options.list_only {
        return Ok(SessionEnd::Listed);
    }

    let Some(selection) = resolve_selection(options, prompter, &catalog)? else {
        return Ok(SessionEnd::Cancelled);
    };

    let target = SplitTarget::for_source(&options.output_dir, &source);
    prompter.say(format!("\nDestination: {}/\n", target.output_dir.display()))?;

    if options.confirm && !prompter.confirm("Continue? (y/n): ")? {
        prompter.say("Cancelled.")?;
        return Ok(SessionEnd::Cancelled);
    }

    prompter.say(format!("\nSplitting {} chapter(s)...\n", selection.len()))?;
    let report = orchestrator::split_chapters(&mut epub, &catalog, &selection, &target);
    prompter.show_report(&report)?;
    if !report.has_errors() {
        prompter.say(format!("Files are in: {}/", target.output_dir.display()))?;
    }

    Ok(SessionEnd::Completed(report))
}

fn resolve_selection<R: BufRead, W: Write>(
    options: &SessionOptions,
    prompter: &mut Prompter<R, W>,
    catalog: &Catalog,
) -> Result<Option<RangeSelection>> {
    let mode = match &options.selection {
        Some(PresetSelection::All) => SelectionMode::All,
        Some(PresetSelection::Range(expr)) => {
            let selection = range::select(expr, catalog.len())
                .with_context(|| format!("Cannot use chapter range '{}'", expr))?;
            return Ok(Some(selection));
        }
        None => match prompter.choose_mode()? {
            Some(mode) => mode,
            None => return Ok(None),
        },
    };

    match mode {
        SelectionMode::All => {
            let selection = RangeSelection::all(catalog.len());
            prompter.say(format!("\nAll {} chapters will be split.", selection.len()))?;
            Ok(Some(selection))
        }
        SelectionMode::Range => prompter.choose_range(catalog.len()),
    }
}

/// Open the source once and enumerate its chapters; the handle stays open for the batch.
pub fn open_source(
    path: &Path,
) -> Result<(SplitEpub<std::io::BufReader<fs::File>>, Catalog), CatalogError> {
    let mut epub = SplitEpub::open(path)?;
    let catalog = Catalog::build(&mut epub)?;
    Ok((epub, catalog))
}

/// List `*.epub` files in `dir` sorted by name, creating `dir` if missing.
pub fn find_epub_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create input directory {}", dir.display()))?;
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).context("Failed to read directory")? {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if path.is_file() && is_epub(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Check if a path is an epub file (case-insensitive)
fn is_epub(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("epub"))
        .unwrap_or(false)
}
