//! Error types for batch PDF unlocking.

use std::path::PathBuf;

use thiserror::Error;

use crate::pdf::PdfError;

/// Primary error type for unlock operations.
///
/// The first three variants abort a run; the rest are confined to the one
/// input file they name.
#[derive(Error, Debug)]
pub enum UnlockError {
    #[error("cannot read password file {}: {source}", path.display())]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create output directory {}: {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list input directory {}: {source}", path.display())]
    ReadInputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source}")]
    Pdf {
        #[source]
        source: PdfError,
    },

    #[error("{source}")]
    Decrypt {
        #[source]
        source: PdfError,
    },

    #[error("cannot write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UnlockError {
    /// Whether this error aborts the whole batch rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            UnlockError::CredentialsRead { .. }
                | UnlockError::CreateOutputDir { .. }
                | UnlockError::ReadInputDir { .. }
        )
    }
}

/// Convenience Result type alias for UnlockError.
pub type Result<T> = std::result::Result<T, UnlockError>;
