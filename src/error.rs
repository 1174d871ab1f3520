use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinnError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown import: {0}")]
    UnknownImport(i64),

    #[error("No importer registered for kind '{0}'")]
    UnknownImporterKind(String),

    #[error("Mapping config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Mapping config {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Cannot convert '{raw}' for field '{field}': {cause}")]
    Conversion {
        field: String,
        raw: String,
        cause: String,
    },

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Row rejected: {0}")]
    Build(String),

    #[error("Could not resolve {kind} '{name}': {source}")]
    Reference {
        kind: &'static str,
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl FinnError {
    /// Errors confined to a single CSV row. The batch records them and moves
    /// on; every other variant aborts the whole import.
    pub fn is_row_scoped(&self) -> bool {
        matches!(
            self,
            Self::Conversion { .. } | Self::Classification(_) | Self::Build(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FinnError>;
