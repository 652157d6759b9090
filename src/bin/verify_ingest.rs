use anyhow::Result;
use clap::Parser;
use movie_ingest::{
    config::{IngestConfig, DEFAULT_DB, DEFAULT_ENCODING, DEFAULT_SEP, DEFAULT_TABLE},
    pipeline,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Compare a CSV with the table it was ingested into.
#[derive(Parser, Debug)]
#[command(name = "verify-ingest")]
struct Args {
    /// Source CSV
    #[arg(long)]
    csv: PathBuf,

    #[arg(long, default_value = DEFAULT_DB)]
    db: PathBuf,

    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    #[arg(long, default_value = DEFAULT_ENCODING)]
    encoding: String,

    #[arg(long, default_value = DEFAULT_SEP)]
    sep: String,
}

impl Args {
    fn config(&self) -> IngestConfig {
        let mut cfg = IngestConfig::new(&self.csv);
        cfg.db = self.db.clone();
        cfg.table = self.table.clone();
        cfg.encoding = self.encoding.clone();
        cfg.sep = self.sep.clone();
        cfg
    }
}

fn main() -> Result<ExitCode> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let report = pipeline::verify(&args.config())?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.ok {
        info!(table = %args.table, rows = report.table_rows, "table matches CSV");
        Ok(ExitCode::SUCCESS)
    } else {
        // append mode legitimately multiplies rows
        warn!(table = %args.table, "table does not match CSV");
        Ok(ExitCode::FAILURE)
    }
}
