use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpubSplitError {
    #[error("Invalid EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {file}: {message}")]
    Xml { file: String, message: String },

    #[error("Missing required file: {0}")]
    MissingFile(String),

    #[error("Invalid EPUB structure: {0}")]
    InvalidStructure(String),

    #[error("Split line {index} does not exist ({count} lines available)")]
    LineOutOfRange { index: usize, count: usize },

    #[error("No split lines selected")]
    EmptySelection,
}

impl EpubSplitError {
    pub(crate) fn xml(file: &str, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            file: file.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EpubSplitError>;
