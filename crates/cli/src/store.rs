//! The persisted JSON document: one array of output records.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lagtrack::output::OutputRecord;
use lagtrack::TrackerError;

/// Read the previous run's records.
///
/// A missing, unreadable, or corrupt document is treated as empty so a bad
/// file never blocks the next run.
pub fn load(path: &Path) -> Vec<OutputRecord> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no existing store; starting empty");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "store unreadable; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<OutputRecord>>(text.trim_start_matches('\u{feff}')) {
        Ok(records) => {
            tracing::info!(path = %path.display(), records = records.len(), "store loaded");
            records
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "store is not valid JSON; starting empty");
            Vec::new()
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `records` as a pretty-printed JSON array, replacing `path`
/// atomically via a sibling temp file.
pub fn save(path: &Path, records: &[OutputRecord]) -> Result<(), TrackerError> {
    let json = serde_json::to_string_pretty(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::info!(path = %path.display(), records = records.len(), "store written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lagtrack::model::{Cloud, SupportStatus};

    fn record(feature: &str) -> OutputRecord {
        OutputRecord {
            id: "aws-x".into(),
            cloud: Cloud::Aws,
            service: "EKS".into(),
            feature: feature.into(),
            link: "https://example.test".into(),
            status: SupportStatus::Supported,
            version: "v5.0.0".into(),
            lag: 3,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lag_data.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load(&path).is_empty());

        fs::write(&path, r#"{"an": "object"}"#).unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/lag_data.json");
        let records = vec![record("a"), record("b")];

        save(&path, &records).unwrap();
        assert!(!tmp_path(&path).exists());
        assert_eq!(load(&path), records);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n"));
        assert!(text.contains("\"date\": \"2024-01-01\""));
    }

    #[test]
    fn save_replaces_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lag_data.json");
        save(&path, &[record("old")]).unwrap();
        save(&path, &[record("new")]).unwrap();
        let loaded = load(&path);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].feature, "new");
    }
}
