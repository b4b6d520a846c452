use thiserror::Error;

/// Why a chapter selection could not be turned into a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Malformed range expression: '{0}'")]
    MalformedRangeExpression(String),

    #[error("No valid chapters selected")]
    EmptySelection,
}

/// The source document cannot be enumerated at all.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read chapters: {0}")]
    CollaboratorFailure(#[from] epubsplit::EpubSplitError),
}
