// # JSON File Record Source
//
// Reads the record set from a JSON array on disk, e.g.
//
// ```json
// [
//   {"zone": "example.com", "hostname": "www", "address": "10.0.0.1"},
//   {"zone": "example.com", "hostname": "db", "address": "fd00::1", "kind": "AAAA", "status": "inactive"}
// ]
// ```
//
// The file is re-read on every call, so edits take effect at the next
// generate without restarting anything.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::traits::{DnsRecord, RecordSource};
use crate::Error;

/// Record source backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRecordSource {
    path: PathBuf,
}

impl JsonFileRecordSource {
    /// Read records from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonFileRecordSource {
    async fn active_records(&self) -> Result<Vec<DnsRecord>, Error> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found(format!(
                    "Record file not found: {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<DnsRecord> = serde_json::from_slice(&raw)?;
        let total = records.len();
        let active: Vec<DnsRecord> = records.into_iter().filter(DnsRecord::is_active).collect();
        debug!(
            path = %self.path.display(),
            total,
            active = active.len(),
            "Loaded records"
        );
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_active_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[
                {"zone": "example.com", "hostname": "www", "address": "10.0.0.1"},
                {"zone": "example.com", "hostname": "old", "address": "10.0.0.9", "status": "inactive"},
                {"zone": "example.com", "hostname": "db", "address": "fd00::1", "kind": "AAAA"}
            ]"#,
        )
        .unwrap();

        let records = JsonFileRecordSource::new(&path).active_records().await.unwrap();
        let hosts: Vec<_> = records.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["www", "db"]);
    }

    #[tokio::test]
    async fn unfamiliar_record_type_does_not_reject_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[
                {"zone": "example.com", "hostname": "www", "address": "10.0.0.1"},
                {"zone": "example.com", "hostname": "@", "address": "mail.example.com", "kind": "MX"}
            ]"#,
        )
        .unwrap();

        let records = JsonFileRecordSource::new(&path).active_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind.to_string(), "MX");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let source = JsonFileRecordSource::new(dir.path().join("absent.json"));
        assert!(matches!(source.active_records().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn malformed_file_is_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "{not json").unwrap();
        let source = JsonFileRecordSource::new(&path);
        assert!(matches!(source.active_records().await, Err(Error::Json(_))));
    }
}
