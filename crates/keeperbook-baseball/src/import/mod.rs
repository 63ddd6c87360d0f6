// Auction-sheet import: sheet parsing, name normalization, entity resolution
// and the per-file orchestrator that writes to a canonical store.

pub mod file;
pub mod names;
pub mod orchestrator;
pub mod resolver;
pub mod sheet;

use keeperbook_core::store::StoreError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("no four-digit year in file name {path}")]
    MissingYear { path: String },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} is not a wide-format auction sheet: {source}")]
    Sheet {
        path: String,
        source: sheet::SheetError,
    },

    #[error("integrity violation: {message}")]
    Integrity { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
