// src/sqlite/mod.rs

use crate::config::WriteMode;
use crate::process::convert::{Cell, TypedTable};
use anyhow::{Context, Result};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::{debug, info, warn};

/// Column pairs that identify a movie, in order of preference.
pub const IDENTITY_KEYS: [[&str; 2]; 3] = [
    ["series_title", "released_year"],
    ["title", "released_year"],
    ["movie_name", "released_year"],
];

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Cell::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Cell::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Open the SQLite file at `path`, creating it and its parent directory if needed.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening SQLite database {}", path.display()))?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

fn create_table_sql(table: &str, data: &TypedTable, if_not_exists: bool) -> String {
    let cols: Vec<String> = data
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql()))
        .collect();
    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(table),
        cols.join(", ")
    )
}

/// Write every row of `data` into `table` inside one transaction and return
/// the number of rows written.
#[tracing::instrument(level = "info", skip(conn, data, mode), fields(rows = data.rows.len(), mode = mode.as_str()))]
pub fn write_table(
    conn: &mut Connection,
    table: &str,
    data: &TypedTable,
    mode: WriteMode,
) -> Result<usize> {
    let tx = conn.transaction().context("starting write transaction")?;

    match mode {
        WriteMode::Replace => {
            tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])
                .with_context(|| format!("dropping table {}", table))?;
            tx.execute(&create_table_sql(table, data, false), [])
                .with_context(|| format!("creating table {}", table))?;
        }
        WriteMode::Append => {
            tx.execute(&create_table_sql(table, data, true), [])
                .with_context(|| format!("creating table {}", table))?;
        }
    }

    let col_list: Vec<String> = data.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=data.columns.len()).map(|i| format!("?{}", i)).collect();
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        col_list.join(", "),
        placeholders.join(", ")
    );

    let mut written = 0;
    {
        let mut stmt = tx
            .prepare(&insert)
            .with_context(|| format!("preparing insert into {}", table))?;
        for (idx, row) in data.rows.iter().enumerate() {
            stmt.execute(params_from_iter(row.iter()))
                .with_context(|| format!("inserting row {} into {}", idx, table))?;
            written += 1;
        }
    }
    tx.commit().context("committing write transaction")?;

    debug!(table, written, "rows written");
    Ok(written)
}

/// Create an index on the first identity key whose columns all exist.
/// Failures are logged and swallowed; only the first matching key is tried.
pub fn create_identity_index(conn: &Connection, table: &str, columns: &[&str]) -> Option<String> {
    let key = IDENTITY_KEYS
        .iter()
        .find(|key| key.iter().all(|k| columns.contains(k)))?;

    let idx_name = format!("idx_{}_{}", table, key.join("_"));
    let cols: Vec<String> = key.iter().map(|k| quote_ident(k)).collect();
    let sql = format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(&idx_name),
        quote_ident(table),
        cols.join(", ")
    );
    match conn.execute(&sql, []) {
        Ok(_) => {
            info!(index = %idx_name, columns = %key.join(", "), "created index");
            Some(idx_name)
        }
        Err(e) => {
            warn!(index = %idx_name, error = %e, "could not create index");
            None
        }
    }
}

/// What a stored table looks like, for verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub columns: Vec<String>,
    pub rows: i64,
    pub indexes: Vec<String>,
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

pub fn table_stats(conn: &Connection, table: &str) -> Result<TableStats> {
    anyhow::ensure!(table_exists(conn, table)?, "table {} does not exist", table);

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let rows: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare("SELECT name FROM pragma_index_list(?1) ORDER BY name")?;
    let indexes = stmt
        .query_map([table], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(TableStats {
        columns,
        rows,
        indexes,
    })
}
