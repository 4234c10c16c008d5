//! unlock-pdfs - Decrypt a directory of password-protected PDF files
//!
//! Reads a `filename,password` record file, then writes an unencrypted
//! `<stem>_unlocked.pdf` copy of every PDF in the input directory that has
//! a recorded password and opens with it. Files that cannot be unlocked are
//! logged and skipped; the exit status is non-zero only when the run itself
//! cannot proceed.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pdfunlock_core::{UnlockOptions, Unlocker};
use tracing::error;

/// Unlock password-protected PDF files.
#[derive(Parser, Debug)]
#[command(name = "unlock-pdfs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing encrypted PDFs
    input_dir: PathBuf,

    /// CSV file mapping PDF filenames to passwords
    password_file: PathBuf,

    /// Directory to store unlocked PDFs (created if missing)
    output_dir: PathBuf,

    /// Logging level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long = "log-level", default_value = "INFO")]
    log_level: String,
}

impl Args {
    fn options(&self) -> UnlockOptions {
        UnlockOptions::new(&self.input_dir, &self.password_file, &self.output_dir)
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    Unlocker::new(args.options())
        .run()
        .context("unlock run failed")?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(logging::parse_level(&args.log_level));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
