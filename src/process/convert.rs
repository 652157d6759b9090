use crate::process::schema::{is_missing, ColumnSpec, ColumnType, TableSchema};
use crate::process::RawTable;
use anyhow::{ensure, Result};
use rayon::prelude::*;
use tracing::debug;

/// One typed value, as it will be bound into SQLite.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Columns with their final types, and rows of typed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedTable {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Cell>>,
}

impl TypedTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Characters commonly wrapped around numbers in scraped data.
fn strip_number_symbols(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, ',' | '$' | ' ')).collect()
}

enum Parsed {
    Int(i64),
    Float(f64),
    Missing,
}

fn parse_number(s: &str) -> Parsed {
    if let Ok(i) = s.parse::<i64>() {
        return Parsed::Int(i);
    }
    match s.parse::<f64>() {
        Ok(f) if !f.is_nan() => Parsed::Float(f),
        _ => Parsed::Missing,
    }
}

/// Force a keyword-matched column to numbers. Anything that does not parse
/// after stripping `,`, `$` and spaces becomes NULL.
fn coerce_numeric<'a>(values: impl Iterator<Item = &'a str>) -> (ColumnType, Vec<Cell>) {
    let parsed: Vec<Parsed> = values
        .map(|v| {
            if is_missing(v) {
                Parsed::Missing
            } else {
                parse_number(&strip_number_symbols(v))
            }
        })
        .collect();

    let all_int = !parsed.is_empty() && parsed.iter().all(|p| matches!(p, Parsed::Int(_)));
    let cells = parsed
        .into_iter()
        .map(|p| match (p, all_int) {
            (Parsed::Int(i), true) => Cell::Integer(i),
            (Parsed::Int(i), false) => Cell::Real(i as f64),
            (Parsed::Float(f), _) => Cell::Real(f),
            (Parsed::Missing, _) => Cell::Null,
        })
        .collect();
    let ty = if all_int {
        ColumnType::Integer
    } else {
        ColumnType::Real
    };
    (ty, cells)
}

/// Values as the base inferred type says; missing markers become NULL.
fn convert_plain<'a>(ty: ColumnType, values: impl Iterator<Item = &'a str>) -> Vec<Cell> {
    values
        .map(|v| {
            if is_missing(v) {
                return Cell::Null;
            }
            match ty {
                ColumnType::Integer => v.trim().parse().map(Cell::Integer).unwrap_or(Cell::Null),
                ColumnType::Real => match v.trim().parse::<f64>() {
                    Ok(f) if !f.is_nan() => Cell::Real(f),
                    _ => Cell::Null,
                },
                ColumnType::Text => Cell::Text(v.to_string()),
            }
        })
        .collect()
}

/// Year columns become nullable integers when every present value is whole.
fn narrow_year(ty: ColumnType, cells: Vec<Cell>) -> (ColumnType, Vec<Cell>) {
    if ty != ColumnType::Real {
        return (ty, cells);
    }
    let whole = cells.iter().all(|c| match c {
        // i64::MAX as f64 rounds up to 2^63, which does not fit
        Cell::Real(f) => f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64,
        Cell::Null | Cell::Integer(_) => true,
        Cell::Text(_) => false,
    });
    if !whole {
        return (ty, cells);
    }
    let cells = cells
        .into_iter()
        .map(|c| match c {
            Cell::Real(f) => Cell::Integer(f as i64),
            other => other,
        })
        .collect();
    (ColumnType::Integer, cells)
}

fn coerce_column(raw: &RawTable, idx: usize, spec: &ColumnSpec) -> (ColumnSpec, Vec<Cell>) {
    let (ty, cells) = if spec.numeric_candidate {
        coerce_numeric(raw.column(idx))
    } else {
        (spec.ty, convert_plain(spec.ty, raw.column(idx)))
    };
    let (ty, cells) = if spec.is_year() {
        narrow_year(ty, cells)
    } else {
        (ty, cells)
    };
    if ty != spec.ty {
        debug!(column = %spec.name, from = ?spec.ty, to = ?ty, "coerced");
    }
    (
        ColumnSpec {
            name: spec.name.clone(),
            ty,
            numeric_candidate: spec.numeric_candidate,
        },
        cells,
    )
}

/// Apply the schema to `raw`, column by column in parallel. Row order and
/// the row/column counts are preserved.
pub fn coerce_types(raw: &RawTable, schema: &TableSchema) -> Result<TypedTable> {
    ensure!(
        raw.width() == schema.columns.len(),
        "schema has {} columns, table has {}",
        schema.columns.len(),
        raw.width()
    );

    let converted: Vec<(ColumnSpec, Vec<Cell>)> = schema
        .columns
        .par_iter()
        .enumerate()
        .map(|(idx, spec)| coerce_column(raw, idx, spec))
        .collect();

    let mut columns = Vec::with_capacity(converted.len());
    let mut column_cells: Vec<std::vec::IntoIter<Cell>> = Vec::with_capacity(converted.len());
    for (spec, cells) in converted {
        columns.push(spec);
        column_cells.push(cells.into_iter());
    }

    let rows = (0..raw.rows.len())
        .map(|_| {
            column_cells
                .iter_mut()
                .map(|col| col.next().unwrap_or(Cell::Null))
                .collect()
        })
        .collect();

    Ok(TypedTable { columns, rows })
}
