use crate::process::RawTable;
use serde::Serialize;

/// Substrings that mark a column as numeric by name.
pub const NUMERIC_KEYWORDS: [&str; 9] = [
    "id", "year", "score", "rating", "votes", "gross", "runtime", "minutes", "count",
];

/// Cell spellings read as a missing value.
pub const MISSING_MARKERS: [&str; 14] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Declared type in `CREATE TABLE`.
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    /// Name matched one of `NUMERIC_KEYWORDS`; values get symbol-stripped and forced numeric.
    pub numeric_candidate: bool,
}

impl ColumnSpec {
    pub fn is_year(&self) -> bool {
        self.name.contains("year")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

/// Exact match only: `" NA "` or `" "` is a value, not a gap.
pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw)
}

/// Names that look numeric, by keyword.
pub fn infer_numeric_candidates(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| is_numeric_name(c))
        .cloned()
        .collect()
}

fn is_numeric_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    NUMERIC_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Type a column from its values alone:
/// every value an integer and none missing → Integer,
/// every present value a float → Real (this includes an all-missing column),
/// anything else → Text.
pub fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut all_int = true;
    for v in values {
        if is_missing(v) {
            all_int = false;
            continue;
        }
        let v = v.trim();
        if v.parse::<i64>().is_ok() {
            continue;
        }
        if v.parse::<f64>().is_ok() {
            all_int = false;
            continue;
        }
        return ColumnType::Text;
    }
    if all_int {
        ColumnType::Integer
    } else {
        ColumnType::Real
    }
}

/// Base types for every column of `raw`. `raw.headers` should already be cleaned.
pub fn infer_schema(raw: &RawTable) -> TableSchema {
    let columns = raw
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let ty = if raw.rows.is_empty() {
                ColumnType::Text
            } else {
                infer_column_type(raw.column(idx))
            };
            ColumnSpec {
                name: name.clone(),
                ty,
                numeric_candidate: is_numeric_name(name),
            }
        })
        .collect();
    TableSchema { columns }
}
