//! Snapshot metadata and identifiers
//!
//! A snapshot id is the UTC creation time with microsecond precision,
//! `YYYYMMDD_HHMMSS_ffffff`. Fixed width makes lexical order equal to
//! chronological order, and the id alone yields `created_at`.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// File name prefix of every snapshot in the backup directory
pub const BACKUP_PREFIX: &str = "Corefile.backup.";

const ID_LEN: usize = 22;

/// Why a snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupReason {
    /// Explicit request
    Manual,
    /// Automatic copy before generate overwrites the Corefile
    PreWrite,
    /// Safety copy before a restore overwrites the Corefile
    PreRestore,
}

impl fmt::Display for BackupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupReason::Manual => f.write_str("manual"),
            BackupReason::PreWrite => f.write_str("pre-write"),
            BackupReason::PreRestore => f.write_str("pre-restore"),
        }
    }
}

/// An immutable point-in-time copy of the Corefile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Timestamp-derived identifier
    pub id: String,
    /// File name inside the backup directory
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    /// Creation time, decoded from the id
    pub created_at: DateTime<Utc>,
    /// Newest snapshot in the archive (first entry of the first page only)
    pub is_latest: bool,
    /// Full text, only when fetched individually
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One page of snapshots, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotPage {
    /// Snapshots on this page
    pub backups: Vec<Snapshot>,
    /// Snapshots in the whole archive
    pub total: usize,
    /// 1-based page number
    pub page: usize,
    /// Requested page size
    pub page_size: usize,
}

/// Result of restoring a snapshot over the Corefile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    /// Snapshot that was restored
    pub backup_id: String,
    /// When the Corefile was overwritten
    pub restored_at: DateTime<Utc>,
    /// Corefile that was overwritten
    pub corefile_path: PathBuf,
    /// Safety copy of the previous Corefile, if there was one
    pub safety_backup: Option<Snapshot>,
}

/// Encode a timestamp as a snapshot id
pub fn format_id(at: DateTime<Utc>) -> String {
    format!(
        "{}_{:06}",
        at.format("%Y%m%d_%H%M%S"),
        at.nanosecond() / 1_000 % 1_000_000
    )
}

/// Decode a snapshot id, `None` if it is not one
pub fn parse_id(id: &str) -> Option<DateTime<Utc>> {
    if id.len() != ID_LEN || !id.is_ascii() {
        return None;
    }
    let bytes = id.as_bytes();
    if bytes[8] != b'_' || bytes[15] != b'_' {
        return None;
    }
    let digits_ok = id
        .char_indices()
        .all(|(i, c)| i == 8 || i == 15 || c.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let seconds = NaiveDateTime::parse_from_str(&id[..15], "%Y%m%d_%H%M%S").ok()?;
    let micros: i64 = id[16..].parse().ok()?;
    Some(seconds.and_utc() + Duration::microseconds(micros))
}

/// Snapshot file name for `id`
pub fn file_name(id: &str) -> String {
    format!("{BACKUP_PREFIX}{id}")
}

/// Extract the id from a snapshot file name
pub fn id_from_file_name(name: &str) -> Option<&str> {
    let id = name.strip_prefix(BACKUP_PREFIX)?;
    parse_id(id).map(|_| id)
}

/// Id for a snapshot created at `now`, strictly after `newest`
pub fn next_id(now: DateTime<Utc>, newest: Option<&str>) -> String {
    let candidate = truncate_to_micros(now);
    match newest.and_then(parse_id) {
        Some(previous) if candidate <= previous => format_id(previous + Duration::microseconds(1)),
        _ => format_id(candidate),
    }
}

fn truncate_to_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = at.nanosecond() % 1_000_000_000;
    at.with_nanosecond(nanos - nanos % 1_000).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn id_encodes_microseconds() {
        let at = ts("2025-01-09T12:34:56.123456789Z");
        let id = format_id(at);
        assert_eq!(id, "20250109_123456_123456");
        assert_eq!(parse_id(&id), Some(ts("2025-01-09T12:34:56.123456Z")));
    }

    #[test]
    fn rejects_foreign_ids() {
        assert_eq!(parse_id("../../etc/passwd"), None);
        assert_eq!(parse_id("20250109-123456-123456"), None);
        assert_eq!(parse_id("2025010a_123456_123456"), None);
        assert_eq!(parse_id(""), None);
        assert_eq!(id_from_file_name("Corefile.backup.nope"), None);
        assert_eq!(
            id_from_file_name("Corefile.backup.20250109_123456_000001"),
            Some("20250109_123456_000001")
        );
    }

    #[test]
    fn next_id_is_strictly_increasing() {
        let now = ts("2025-01-09T12:00:00.000010Z");
        assert_eq!(next_id(now, None), "20250109_120000_000010");

        // Same microsecond as the newest snapshot
        assert_eq!(
            next_id(now, Some("20250109_120000_000010")),
            "20250109_120000_000011"
        );

        // Clock went backwards
        assert_eq!(
            next_id(now, Some("20250109_120001_999999")),
            "20250109_120002_000000"
        );
    }
}
