use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").expect("non-word regex"));
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("camel regex"));
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("underscore regex"));

/// Convert a header into snake_case:
/// - trim surrounding whitespace,
/// - turn every run of non-word characters into `_`,
/// - split camelCase / PascalCase boundaries,
/// - collapse repeated `_`, strip them from both ends and lowercase.
pub fn to_snake(name: &str) -> String {
    let name = name.trim();
    let name = NON_WORD.replace_all(name, "_");
    let name = CAMEL_BOUNDARY.replace_all(&name, "${1}_${2}");
    let name = UNDERSCORES.replace_all(&name, "_");
    name.trim_matches('_').to_lowercase()
}

/// Normalize every header. Headers that normalize to nothing become
/// `unnamed_<idx>`; collisions get the first free `_<n>` suffix.
pub fn clean_columns(headers: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());

    for (idx, raw) in headers.iter().enumerate() {
        let mut name = to_snake(raw);
        if name.is_empty() {
            name = format!("unnamed_{}", idx);
        }
        if taken.contains(&name) {
            let base = name;
            let mut n = 1;
            name = format!("{}_{}", base, n);
            while taken.contains(&name) {
                n += 1;
                name = format!("{}_{}", base, n);
            }
        }
        taken.insert(name.clone());
        out.push(name);
    }
    out
}
