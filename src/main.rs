use anyhow::Result;
use clap::Parser;
use movie_ingest::{
    config::{PartialConfig, WriteMode},
    pipeline, IngestError, IngestSummary,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Ingest a CSV into a SQLite table.
#[derive(Parser, Debug)]
#[command(name = "movie-ingest", version, about)]
struct Args {
    /// Path to input CSV (e.g. data/imdb_top_1000.csv)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// SQLite DB path [default: data/movies.sqlite]
    #[arg(long)]
    db: Option<PathBuf>,

    /// Destination table name [default: raw_movies]
    #[arg(long)]
    table: Option<String>,

    /// Write mode [default: replace]
    #[arg(long, value_enum)]
    mode: Option<WriteMode>,

    /// CSV encoding label [default: utf-8]
    #[arg(long)]
    encoding: Option<String>,

    /// CSV delimiter [default: ,]
    #[arg(long)]
    sep: Option<String>,

    /// YAML file with any of the options above; flags win over it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            csv: self.csv.clone(),
            db: self.db.clone(),
            table: self.table.clone(),
            mode: self.mode,
            encoding: self.encoding.clone(),
            sep: self.sep.clone(),
        }
    }
}

fn try_main(args: &Args) -> Result<IngestSummary> {
    let base = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "loading config file");
            PartialConfig::from_yaml_file(path)?
        }
        None => PartialConfig::default(),
    };
    let cfg = base.merge(args.overrides()).resolve()?;
    pipeline::run(&cfg)
}

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) parse flags + run ────────────────────────────────────────
    let args = Args::parse();
    match try_main(&args) {
        Ok(summary) => {
            info!(
                table = %summary.table,
                rows = summary.rows,
                columns = summary.columns.len(),
                index = ?summary.index,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<IngestError>() {
                Some(e @ IngestError::CsvNotFound(_)) => eprintln!("{}", e),
                _ => {
                    error!("{:#}", err);
                    eprintln!("error: {:#}", err);
                }
            }
            ExitCode::FAILURE
        }
    }
}
