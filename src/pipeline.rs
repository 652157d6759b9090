// src/pipeline.rs

use crate::config::IngestConfig;
use crate::process::{self, columns::clean_columns, convert::coerce_types, schema::infer_schema};
use crate::sqlite;
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub index: Option<String>,
}

/// Read the CSV, normalize it, and write it into SQLite.
#[tracing::instrument(level = "info", skip(cfg), fields(csv = %cfg.csv.display(), db = %cfg.db.display(), table = %cfg.table))]
pub fn run(cfg: &IngestConfig) -> Result<IngestSummary> {
    let start = Instant::now();
    cfg.validate()?;

    // ─── 1) read ─────────────────────────────────────────────────────
    info!("reading CSV");
    let mut raw = process::load_csv(&cfg.csv, cfg.text_encoding()?, cfg.delimiter()?)?;
    info!(rows = raw.rows.len(), columns = raw.width(), "read CSV");

    // ─── 2) clean column names ───────────────────────────────────────
    let cleaned = clean_columns(&raw.headers);
    for (before, after) in raw.headers.iter().zip(&cleaned) {
        if before != after {
            tracing::debug!(from = %before, to = %after, "renamed column");
        }
    }
    raw.headers = cleaned;

    // ─── 3) infer + coerce types ─────────────────────────────────────
    let schema = infer_schema(&raw);
    let typed = coerce_types(&raw, &schema)?;

    // ─── 4) write ────────────────────────────────────────────────────
    info!(mode = cfg.mode.as_str(), "writing to SQLite");
    let mut conn = sqlite::open_database(&cfg.db)?;
    let rows = sqlite::write_table(&mut conn, &cfg.table, &typed, cfg.mode)?;

    // ─── 5) index ────────────────────────────────────────────────────
    let index = sqlite::create_identity_index(&conn, &cfg.table, &typed.column_names());

    info!(rows, elapsed = ?start.elapsed(), "ingestion complete");
    Ok(IngestSummary {
        table: cfg.table.clone(),
        rows,
        columns: typed.columns.iter().map(|c| c.name.clone()).collect(),
        index,
    })
}

/// Row and column counts of a CSV next to those of its stored table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyReport {
    pub csv_rows: usize,
    pub csv_columns: usize,
    pub table_rows: i64,
    pub table_columns: usize,
    pub missing_columns: Vec<String>,
    pub indexes: Vec<String>,
    pub ok: bool,
}

/// Re-read the CSV and check that `cfg.table` holds every cleaned column
/// and exactly as many rows.
pub fn verify(cfg: &IngestConfig) -> Result<VerifyReport> {
    cfg.validate()?;

    let raw = process::load_csv(&cfg.csv, cfg.text_encoding()?, cfg.delimiter()?)?;
    let expected = clean_columns(&raw.headers);

    anyhow::ensure!(cfg.db.exists(), "database {} not found", cfg.db.display());
    let conn = sqlite::open_database(&cfg.db)?;
    let stats = sqlite::table_stats(&conn, &cfg.table)
        .with_context(|| format!("reading stats of {}", cfg.table))?;

    let missing_columns: Vec<String> = expected
        .iter()
        .filter(|c| !stats.columns.contains(c))
        .cloned()
        .collect();
    let ok = missing_columns.is_empty()
        && stats.columns.len() == expected.len()
        && stats.rows == raw.rows.len() as i64;

    Ok(VerifyReport {
        csv_rows: raw.rows.len(),
        csv_columns: expected.len(),
        table_rows: stats.rows,
        table_columns: stats.columns.len(),
        missing_columns,
        indexes: stats.indexes,
        ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteMode;
    use crate::error::IngestError;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{fmt, EnvFilter};

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(false)
            .with_test_writer()
            .try_init();
    }

    const IMDB_SAMPLE: &str = "\
Poster_Link,Series_Title,Released_Year,Certificate,Runtime,Genre,IMDB_Rating,Meta_score,No_of_Votes,Gross
https://x/1.jpg,The Shawshank Redemption,1994,A,142 min,Drama,9.3,80,2343110,\"28,341,469\"
https://x/2.jpg,The Godfather,1972,A,175 min,\"Crime, Drama\",9.2,100,1620367,\"134,966,411\"
https://x/3.jpg,Apollo 13,PG,U,140 min,Adventure,7.6,77,269197,\"173,837,933\"
https://x/4.jpg,Ikiru,1952,,143 min,Drama,8.3,,78635,
";

    #[test]
    fn ingests_imdb_style_csv() -> Result<()> {
        init_logging();
        let dir = tempdir()?;
        let csv = dir.path().join("imdb_top_1000.csv");
        fs::write(&csv, IMDB_SAMPLE)?;

        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("nested/data/movies.sqlite");
        let summary = run(&cfg)?;

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.columns.len(), 10);
        assert_eq!(summary.columns[1], "series_title");
        assert_eq!(summary.columns[6], "imdb_rating");
        assert_eq!(
            summary.index.as_deref(),
            Some("idx_raw_movies_series_title_released_year")
        );

        let conn = sqlite::open_database(&cfg.db)?;
        let stats = sqlite::table_stats(&conn, "raw_movies")?;
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.columns, summary.columns);

        let apollo_year: Option<i64> = conn.query_row(
            "SELECT released_year FROM raw_movies WHERE series_title = 'Apollo 13'",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(apollo_year, None);

        let (year, gross, votes): (i64, Option<f64>, i64) = conn.query_row(
            "SELECT released_year, gross, no_of_votes FROM raw_movies WHERE series_title = 'The Godfather'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        // Ikiru has no gross, so the column widens to REAL
        assert_eq!((year, gross, votes), (1972, Some(134_966_411.0), 1_620_367));

        let runtimes: i64 = conn.query_row(
            "SELECT COUNT(runtime) FROM raw_movies",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(runtimes, 0);

        let genre: String = conn.query_row(
            "SELECT genre FROM raw_movies WHERE series_title = 'The Godfather'",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(genre, "Crime, Drama");
        Ok(())
    }

    #[test]
    fn replace_and_append_modes() -> Result<()> {
        init_logging();
        let dir = tempdir()?;
        let csv = dir.path().join("movies.csv");
        fs::write(&csv, "title,released_year,rating\nHeat,1995,8.3\nUp,2009,8.2\n")?;

        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("movies.sqlite");
        cfg.table = "films".into();

        let first = run(&cfg)?;
        assert_eq!(first.index.as_deref(), Some("idx_films_title_released_year"));
        run(&cfg)?;
        let conn = sqlite::open_database(&cfg.db)?;
        assert_eq!(sqlite::table_stats(&conn, "films")?.rows, 2);

        cfg.mode = WriteMode::Append;
        run(&cfg)?;
        assert_eq!(sqlite::table_stats(&conn, "films")?.rows, 4);
        Ok(())
    }

    #[test]
    fn missing_csv_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let mut cfg = IngestConfig::new(dir.path().join("absent.csv"));
        cfg.db = dir.path().join("movies.sqlite");
        let err = run(&cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::CsvNotFound(_))
        ));
        assert!(!cfg.db.exists());
        Ok(())
    }

    fn declared_types(conn: &rusqlite::Connection, table: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt
            .query_map([table], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    #[test]
    fn blank_headers_become_unnamed_columns() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("blank.csv");
        fs::write(&csv, ",\n1,2\n")?;

        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("movies.sqlite");
        let summary = run(&cfg)?;
        assert_eq!(summary.columns, vec!["unnamed_0", "unnamed_1"]);
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.index, None);
        Ok(())
    }

    #[test]
    fn header_only_csv_declares_types() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("empty.csv");
        fs::write(&csv, "title,released_year,imdb_rating\n")?;

        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("movies.sqlite");
        assert_eq!(run(&cfg)?.rows, 0);

        let conn = sqlite::open_database(&cfg.db)?;
        assert_eq!(
            declared_types(&conn, "raw_movies")?,
            vec![
                ("title".to_string(), "TEXT".to_string()),
                ("released_year".into(), "INTEGER".into()),
                ("imdb_rating".into(), "REAL".into()),
            ]
        );
        Ok(())
    }

    #[test]
    fn malformed_encoding_fails_the_run() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("latin1.csv");
        fs::write(&csv, b"title\nAm\xE9lie\n")?;

        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("movies.sqlite");
        let err = run(&cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::Decode { .. })
        ));
        assert!(!cfg.db.exists());

        cfg.encoding = "latin1".into();
        run(&cfg)?;
        let conn = sqlite::open_database(&cfg.db)?;
        let title: String =
            conn.query_row("SELECT title FROM raw_movies", [], |r| r.get(0))?;
        assert_eq!(title, "Amélie");
        Ok(())
    }

    #[test]
    fn verify_flags_row_mismatch() -> Result<()> {
        init_logging();
        let dir = tempdir()?;
        let csv = dir.path().join("movies.csv");
        fs::write(&csv, "Title,Released Year\nHeat,1995\nUp,2009\n")?;

        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("movies.sqlite");
        run(&cfg)?;

        let report = verify(&cfg)?;
        assert!(report.ok);
        assert_eq!((report.csv_rows, report.table_rows), (2, 2));
        assert_eq!((report.csv_columns, report.table_columns), (2, 2));
        assert_eq!(report.indexes, vec!["idx_raw_movies_title_released_year"]);

        cfg.mode = WriteMode::Append;
        run(&cfg)?;
        let report = verify(&cfg)?;
        assert!(!report.ok);
        assert_eq!((report.csv_rows, report.table_rows), (2, 4));
        assert!(report.missing_columns.is_empty());
        Ok(())
    }

    #[test]
    fn verify_flags_missing_columns() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("movies.csv");
        fs::write(&csv, "title,rating\nHeat,8.3\n")?;
        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("movies.sqlite");
        run(&cfg)?;

        fs::write(&csv, "title,rating,director\nHeat,8.3,Mann\n")?;
        let report = verify(&cfg)?;
        assert!(!report.ok);
        assert_eq!(report.missing_columns, vec!["director"]);
        Ok(())
    }

    #[test]
    fn verify_without_database_fails() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("movies.csv");
        fs::write(&csv, "title\nHeat\n")?;
        let mut cfg = IngestConfig::new(&csv);
        cfg.db = dir.path().join("absent.sqlite");
        assert!(verify(&cfg).is_err());
        assert!(!cfg.db.exists());
        Ok(())
    }
}
