//! Batch unlocking of a directory of password-protected PDFs.
//!
//! A run loads the credential table, makes sure the output directory exists,
//! then visits the entries of the input directory once, sorted by name.
//! Every `.pdf` file with a recorded password is decrypted, its pages are
//! copied into a fresh document, and the result is written next to the
//! others as `<stem>_unlocked.pdf`.
//!
//! Failures on one file are logged and recorded in the [`UnlockReport`];
//! they never stop the batch. Only failing to read the credential table or
//! to prepare the directories aborts a run.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::credentials::CredentialTable;
use crate::error::{Result, UnlockError};
use crate::pdf::{LopdfBackend, PdfBackend};

/// Suffix appended to the input stem to name the output file.
pub const OUTPUT_SUFFIX: &str = "_unlocked";

const PDF_EXTENSION: &str = "pdf";

/// Where to read from and where to write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockOptions {
    /// Directory holding the encrypted PDFs. Not searched recursively.
    pub input_dir: PathBuf,

    /// Record file mapping file names to passwords.
    pub credentials_path: PathBuf,

    /// Destination directory, created if missing.
    pub output_dir: PathBuf,
}

impl UnlockOptions {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        credentials_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            credentials_path: credentials_path.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// What happened to one `.pdf` entry of the input directory.
#[derive(Debug)]
pub enum Outcome {
    /// Written to `output`.
    Unlocked { output: PathBuf },
    /// No password recorded for this file name.
    MissingPassword,
    /// Reading, decrypting, rebuilding or writing failed.
    Failed { error: UnlockError },
}

#[derive(Debug)]
pub struct FileOutcome {
    /// File name as it appears in the input directory.
    pub name: String,
    pub outcome: Outcome,
}

/// Per-file outcomes of a run, in processing order.
///
/// Entries that are not `.pdf` files do not appear.
#[derive(Debug, Default)]
pub struct UnlockReport {
    pub files: Vec<FileOutcome>,
}

impl UnlockReport {
    /// Output paths of the files that were unlocked.
    pub fn unlocked(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().filter_map(|f| match &f.outcome {
            Outcome::Unlocked { output } => Some(output.as_path()),
            _ => None,
        })
    }

    /// Names of the files skipped or failed, in processing order.
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|f| !matches!(f.outcome, Outcome::Unlocked { .. }))
            .map(|f| f.name.as_str())
    }
}

/// Drives one batch run over a [`PdfBackend`].
#[derive(Debug, Clone)]
pub struct Unlocker<B = LopdfBackend> {
    backend: B,
    options: UnlockOptions,
}

impl Unlocker<LopdfBackend> {
    pub fn new(options: UnlockOptions) -> Self {
        Self::with_backend(LopdfBackend, options)
    }
}

impl<B: PdfBackend> Unlocker<B> {
    pub fn with_backend(backend: B, options: UnlockOptions) -> Self {
        Self { backend, options }
    }

    /// Process every eligible file in the input directory.
    ///
    /// Returns `Err` only for fatal errors; per-file failures are logged and
    /// reported in the returned [`UnlockReport`].
    pub fn run(&self) -> Result<UnlockReport> {
        let credentials = CredentialTable::load(&self.options.credentials_path)?;

        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir).map_err(|source| UnlockError::CreateOutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let mut report = UnlockReport::default();
        for path in sorted_entries(&self.options.input_dir)? {
            let name = display_name(&path);

            if !has_pdf_extension(&path) {
                debug!("Skipping {name}: not a PDF file");
                continue;
            }
            if !path.is_file() {
                debug!("Skipping {name}: not a regular file");
                continue;
            }

            let outcome = self.process(&path, &name, &credentials);
            report.files.push(FileOutcome { name, outcome });
        }

        Ok(report)
    }

    fn process(&self, path: &Path, name: &str, credentials: &CredentialTable) -> Outcome {
        let password = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| credentials.get(n));
        let Some(password) = password else {
            warn!("No password found for {name}. Skipping.");
            return Outcome::MissingPassword;
        };

        match self.unlock_file(path, password) {
            Ok(output) => {
                info!("Unlocked {name} -> {}", display_name(&output));
                Outcome::Unlocked { output }
            }
            Err(error) => {
                match &error {
                    UnlockError::Decrypt { source } => {
                        error!("Failed to decrypt {name}: {source}")
                    }
                    other => error!("Failed to unlock {name}: {other}"),
                }
                Outcome::Failed { error }
            }
        }
    }

    fn unlock_file(&self, path: &Path, password: &str) -> Result<PathBuf> {
        let bytes = fs::read(path).map_err(|source| UnlockError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;

        let mut doc = self
            .backend
            .parse(bytes)
            .map_err(|source| UnlockError::Pdf { source })?;
        if self.backend.is_encrypted(&doc) {
            self.backend
                .decrypt(&mut doc, password)
                .map_err(|source| UnlockError::Decrypt { source })?;
        }
        debug!(
            "Copying {} pages from {}",
            self.backend.page_count(&doc),
            path.display()
        );

        // Fully rebuilt in memory before anything touches the output directory.
        let unlocked = self
            .backend
            .rebuild(&doc)
            .map_err(|source| UnlockError::Pdf { source })?;

        let output = self.options.output_dir.join(output_file_name(path));
        write_atomically(&output, &unlocked)?;
        Ok(output)
    }
}

/// Convenience wrapper: unlock `input_dir` into `output_dir` with `lopdf`.
pub fn unlock_directory(
    input_dir: impl Into<PathBuf>,
    credentials_path: impl Into<PathBuf>,
    output_dir: impl Into<PathBuf>,
) -> Result<UnlockReport> {
    Unlocker::new(UnlockOptions::new(input_dir, credentials_path, output_dir)).run()
}

/// Output file name for `input`: `<stem>_unlocked.pdf`.
pub fn output_file_name(input: &Path) -> OsString {
    let mut name = input.file_stem().map(OsString::from).unwrap_or_default();
    name.push(OUTPUT_SUFFIX);
    name.push(".");
    name.push(PDF_EXTENSION);
    name
}

/// Whether the final extension of `path` is `pdf`, ignoring case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
}

/// Entries directly inside `dir`, sorted by file name.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir_error = |source| UnlockError::ReadInputDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(read_dir_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_dir_error)?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// replacing any existing file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source| UnlockError::WriteOutput {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(bytes).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_replaces_final_extension() {
        assert_eq!(output_file_name(Path::new("report.pdf")), "report_unlocked.pdf");
        assert_eq!(output_file_name(Path::new("Scan.PDF")), "Scan_unlocked.pdf");
        assert_eq!(
            output_file_name(Path::new("archive.2024.pdf")),
            "archive.2024_unlocked.pdf"
        );
        assert_eq!(
            output_file_name(Path::new("/in/dir/memo.pdf")),
            "memo_unlocked.pdf"
        );
    }

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("a.pdf")));
        assert!(has_pdf_extension(Path::new("a.PDF")));
        assert!(has_pdf_extension(Path::new("a.Pdf")));
        assert!(!has_pdf_extension(Path::new("a.txt")));
        assert!(!has_pdf_extension(Path::new("a.pdf.bak")));
        assert!(!has_pdf_extension(Path::new("pdf")));
        assert!(!has_pdf_extension(Path::new(".pdf")));
    }

    #[test]
    fn entries_are_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.pdf", "a.pdf", "c.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<String> = sorted_entries(dir.path())
            .unwrap()
            .iter()
            .map(|p| display_name(p))
            .collect();
        assert_eq!(names, ["A.pdf", "a.pdf", "b.pdf", "c.txt"]);
    }

    #[test]
    fn missing_input_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = sorted_entries(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, UnlockError::ReadInputDir { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out_unlocked.pdf");
        fs::write(&target, b"old contents").unwrap();

        write_atomically(&target, b"new").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
