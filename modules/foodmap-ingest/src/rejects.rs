//! Reject log output. The file is written on every run, empty or not, so a
//! missing file always means the run did not finish.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use foodmap_common::types::Reject;

pub fn write_rejects(path: &Path, rejects: &[Reject]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating rejects directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(rejects)?;
    std::fs::write(path, json)
        .with_context(|| format!("writing rejects file {}", path.display()))?;
    info!(path = %path.display(), count = rejects.len(), "wrote rejects file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_empty_array_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rejects.json");

        write_rejects(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[]");
    }

    #[test]
    fn round_trips_reject_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rejects.json");
        let rejects = vec![Reject {
            csv_line_number: 7,
            reason: "missing required field: name".to_string(),
            raw: serde_json::json!({"Address": "10 Warren St"}),
        }];

        write_rejects(&path, &rejects).unwrap();

        let parsed: Vec<Reject> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].csv_line_number, 7);
    }
}
