// src/process/mod.rs
pub mod columns;
pub mod convert;
pub mod schema;

use crate::error::IngestError;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::{fs, io::Cursor, path::Path};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names exactly as the CSV header spells them.
    pub headers: Vec<String>,
    /// One Vec per data record, padded to `headers.len()`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// All values of column `idx`, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |r| r[idx].as_str())
    }
}

/// Read `path`, decode it with `encoding` and split it on `sep`.
///
/// The first record is the header. Records shorter than the header are
/// padded with empty cells; longer ones are rejected. Bytes that are not
/// valid in `encoding` fail the load.
#[tracing::instrument(level = "info", skip(path, encoding), fields(path = %path.as_ref().display(), encoding = encoding.name()))]
pub fn load_csv<P: AsRef<Path>>(path: P, encoding: &'static Encoding, sep: u8) -> Result<RawTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IngestError::CsvNotFound(path.to_path_buf()).into());
    }

    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (text, had_errors) = encoding.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(IngestError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name().to_string(),
        }
        .into());
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(sep)
        .flexible(true)
        .from_reader(Cursor::new(text.as_bytes()));

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    // blank header cells are kept; clean_columns names them
    if headers.is_empty() {
        return Err(IngestError::EmptyCsv(path.to_path_buf()).into());
    }

    let width = headers.len();
    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        if record.len() > width {
            return Err(IngestError::RaggedRecord {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            }
            .into());
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    debug!(columns = width, rows = rows.len(), "loaded CSV");
    Ok(RawTable { headers, rows })
}
