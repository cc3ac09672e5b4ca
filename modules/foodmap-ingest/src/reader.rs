//! CSV reading with prelude skipping and original-file line numbers.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::sources::SourceSpec;

/// One raw CSV row: the original header/value pairs plus a lookup keyed by
/// normalized header (lowercased, non-alphanumerics stripped) so alias
/// candidates resolve regardless of source punctuation and casing.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source file, prelude included.
    pub line_number: u64,
    columns: Vec<(String, String)>,
    lookup: HashMap<String, usize>,
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

impl RawRow {
    pub fn new(line_number: u64, columns: Vec<(String, String)>) -> Self {
        let mut lookup = HashMap::new();
        for (idx, (header, _)) in columns.iter().enumerate() {
            // first column wins on duplicate normalized headers
            lookup.entry(normalize_key(header)).or_insert(idx);
        }
        Self {
            line_number,
            columns,
            lookup,
        }
    }

    /// Resolve an ordered alias list to the first matching column's value.
    /// Empty cells resolve to `Some("")`; absence of every alias is `None`.
    pub fn get(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .find_map(|c| self.lookup.get(&normalize_key(c)))
            .map(|&idx| self.columns[idx].1.as_str())
    }

    /// The row as an opaque JSON object under its original headers, for
    /// provenance and reject logs.
    pub fn to_json(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .columns
            .iter()
            .map(|(header, value)| (header.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Read the source file into raw rows, skipping the descriptor's prelude
/// lines before the header. Line numbers count from the top of the file.
pub fn read_rows(path: &Path, spec: &SourceSpec, limit: Option<usize>) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading input file {}", path.display()))?;
    read_rows_from_str(&content, spec, limit)
}

pub fn read_rows_from_str(
    content: &str,
    spec: &SourceSpec,
    limit: Option<usize>,
) -> Result<Vec<RawRow>> {
    let mut remaining = content;
    for _ in 0..spec.skip_rows {
        remaining = match remaining.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        };
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(remaining.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        if let Some(limit) = limit {
            if rows.len() >= limit {
                break;
            }
        }
        let record = record.with_context(|| format!("reading CSV record {idx}"))?;
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                (
                    header.clone(),
                    record.get(i).unwrap_or_default().to_string(),
                )
            })
            .collect();
        rows.push(RawRow::new(spec.first_data_line() + idx as u64, columns));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    #[test]
    fn alias_lookup_ignores_case_and_punctuation() {
        let row = RawRow::new(
            2,
            vec![
                ("Location Name".to_string(), "Dudley Town Common".to_string()),
                ("ZIP".to_string(), "02119".to_string()),
            ],
        );
        assert_eq!(
            row.get(&["LocationName", "Name"]),
            Some("Dudley Town Common")
        );
        assert_eq!(row.get(&["Zip Code", "Zip"]), Some("02119"));
        assert_eq!(row.get(&["Phone"]), None);
    }

    #[test]
    fn prelude_lines_are_skipped_and_line_numbers_offset() {
        let content = "\
MassGrown export
generated 2024-01-01
Location Name,Address,City,Zip
Dudley Town Common,10 Warren St,Roxbury,02119
Copley Square,139 St James Ave,Boston,02116
";
        let spec = SourceKind::FarmersMarkets.spec();
        let rows = read_rows_from_str(content, spec, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_number, 4);
        assert_eq!(rows[1].line_number, 5);
        assert_eq!(rows[0].get(&["Name", "Location Name"]), Some("Dudley Town Common"));
    }

    #[test]
    fn limit_caps_rows() {
        let content = "Name,Street\na,1\nb,2\nc,3\n";
        let spec = SourceKind::FoodPantries.spec();
        let rows = read_rows_from_str(content, spec, Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_number, 2);
    }

    #[test]
    fn short_records_resolve_missing_cells_as_empty() {
        let content = "Name,Street,City\nPantry,,\n";
        let spec = SourceKind::FoodPantries.spec();
        let rows = read_rows_from_str(content, spec, None).unwrap();
        assert_eq!(rows[0].get(&["Street"]), Some(""));
    }
}
