//! pdfunlock - batch decryption of password-protected PDF files.
//!
//! Given a directory of encrypted PDFs and a record file mapping file names
//! to passwords, writes an unencrypted copy of every file it can open.

pub mod credentials;
pub mod error;
pub mod pdf;
pub mod unlock;

pub use credentials::CredentialTable;
pub use error::{Result, UnlockError};
pub use pdf::{LopdfBackend, PdfBackend, PdfError};
pub use unlock::{
    FileOutcome, Outcome, UnlockOptions, UnlockReport, Unlocker, output_file_name,
    unlock_directory,
};
