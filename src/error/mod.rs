use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors. Anything row-scoped is handled inside the intake
/// pipeline and never surfaces here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transactions file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("could not open transactions file")]
    FileError(#[from] std::io::Error),
    #[error("storage error: {0}")]
    StorageError(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
