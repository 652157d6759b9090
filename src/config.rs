// src/config.rs

use crate::error::IngestError;
use anyhow::{Context, Result};
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_DB: &str = "data/movies.sqlite";
pub const DEFAULT_TABLE: &str = "raw_movies";
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const DEFAULT_SEP: &str = ",";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// How the destination table is treated when it already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Drop and recreate the table.
    #[default]
    Replace,
    /// Insert into the existing table, creating it if absent.
    Append,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
        }
    }
}

/// Every knob of one ingestion run, after file values, flags and defaults
/// have been merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestConfig {
    pub csv: PathBuf,
    pub db: PathBuf,
    pub table: String,
    pub mode: WriteMode,
    pub encoding: String,
    pub sep: String,
}

/// A partially specified config, as read from YAML or collected from flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub csv: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub table: Option<String>,
    pub mode: Option<WriteMode>,
    pub encoding: Option<String>,
    pub sep: Option<String>,
}

impl PartialConfig {
    /// Read a YAML config file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Fields set in `overrides` win over fields set in `self`.
    pub fn merge(self, overrides: PartialConfig) -> Self {
        PartialConfig {
            csv: overrides.csv.or(self.csv),
            db: overrides.db.or(self.db),
            table: overrides.table.or(self.table),
            mode: overrides.mode.or(self.mode),
            encoding: overrides.encoding.or(self.encoding),
            sep: overrides.sep.or(self.sep),
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> Result<IngestConfig, IngestError> {
        let csv = self
            .csv
            .ok_or_else(|| IngestError::InvalidConfig("a CSV path is required".into()))?;
        let cfg = IngestConfig {
            csv,
            db: self.db.unwrap_or_else(|| PathBuf::from(DEFAULT_DB)),
            table: self.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            mode: self.mode.unwrap_or_default(),
            encoding: self.encoding.unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
            sep: self.sep.unwrap_or_else(|| DEFAULT_SEP.to_string()),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

impl IngestConfig {
    /// Config with defaults for everything but the CSV path.
    pub fn new(csv: impl Into<PathBuf>) -> Self {
        IngestConfig {
            csv: csv.into(),
            db: PathBuf::from(DEFAULT_DB),
            table: DEFAULT_TABLE.to_string(),
            mode: WriteMode::default(),
            encoding: DEFAULT_ENCODING.to_string(),
            sep: DEFAULT_SEP.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if !IDENTIFIER.is_match(&self.table) {
            return Err(IngestError::InvalidConfig(format!(
                "table name {:?} is not a plain SQL identifier",
                self.table
            )));
        }
        self.delimiter()?;
        self.text_encoding()?;
        Ok(())
    }

    /// The separator as a single byte.
    pub fn delimiter(&self) -> Result<u8, IngestError> {
        match self.sep.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(IngestError::InvalidConfig(format!(
                "separator {:?} must be a single ASCII character",
                self.sep
            ))),
        }
    }

    pub fn text_encoding(&self) -> Result<&'static Encoding, IngestError> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            IngestError::InvalidConfig(format!("unknown encoding {:?}", self.encoding))
        })
    }
}
