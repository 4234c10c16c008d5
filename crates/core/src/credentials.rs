//! Credential table - maps PDF file names to their passwords.
//!
//! The table is read from a comma-separated record file, one
//! `filename,password` record per line. Parsing is permissive:
//! - records with fewer than two fields are dropped without a diagnostic
//! - fields past the second are ignored
//! - a repeated file name keeps the password from its last record
//!
//! Fields use CSV quoting: `"a,b"` is a single field and `""` inside a
//! quoted field is a literal quote. Unquoted fields are taken verbatim.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Result, UnlockError};

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// In-memory mapping from exact file name (extension included) to password.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialTable {
    entries: HashMap<String, String>,
}

impl CredentialTable {
    /// Read and parse the record file at `path`.
    ///
    /// The file must be valid UTF-8. Any failure to read it is fatal for the
    /// caller's run and is reported as [`UnlockError::CredentialsRead`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| UnlockError::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::parse(&text);
        info!("Loaded {} password entries", table.len());
        Ok(table)
    }

    /// Build a table from the text of a record file.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut entries = HashMap::new();
        for record in parse_records(text) {
            let mut fields = record.into_iter();
            if let (Some(name), Some(password)) = (fields.next(), fields.next()) {
                entries.insert(name, password);
            }
        }

        Self { entries }
    }

    /// Password for the file called `name`, if one was recorded.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    RecordStart,
    FieldStart,
    Unquoted,
    Quoted,
    /// Just saw a quote inside a quoted field: either an escaped quote or
    /// the closing one.
    AfterQuote,
}

/// Split `text` into records of fields. Blank lines produce no record.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut state = State::RecordStart;

    for c in text.chars() {
        state = match (state, c) {
            (State::RecordStart, '\r' | '\n') => State::RecordStart,
            (State::RecordStart | State::FieldStart, QUOTE) => State::Quoted,
            (State::Quoted, QUOTE) => State::AfterQuote,
            (State::Quoted, c) => {
                field.push(c);
                State::Quoted
            }
            (State::AfterQuote, QUOTE) => {
                field.push(QUOTE);
                State::Quoted
            }
            (_, DELIMITER) => {
                record.push(std::mem::take(&mut field));
                State::FieldStart
            }
            (_, '\r' | '\n') => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                State::RecordStart
            }
            (_, c) => {
                field.push(c);
                State::Unquoted
            }
        };
    }

    // Final record without a trailing newline; an unterminated quoted field
    // keeps whatever was read.
    if state != State::RecordStart {
        record.push(field);
        records.push(record);
    }

    records
}
