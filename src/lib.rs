pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod sqlite;

pub use config::{IngestConfig, WriteMode};
pub use error::IngestError;
pub use pipeline::{run, verify, IngestSummary, VerifyReport};
