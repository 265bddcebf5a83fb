// # File Backup Store
//
// Snapshot archive for one Corefile path.
//
// ## Layout
//
// One directory, one file per snapshot, full-content copies:
//
// ```text
// backups/
//   Corefile.backup.20250109_120000_000001
//   Corefile.backup.20250109_120500_482113
// ```
//
// ## Guarantees
//
// - Admission: a snapshot is only taken if the Corefile fits under the size
//   limit and the backup directory has room for it.
// - Retention: after every creation the oldest snapshots beyond
//   `max_backups` are evicted. The newest is never evicted.
// - Restore always snapshots the current Corefile first.
// - Snapshot files are written with the same temp-then-rename procedure as
//   the Corefile, so a crash never leaves a truncated snapshot.

use chrono::Utc;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::atomic::write_atomic;
use super::snapshot::{
    self, BackupReason, RestoreOutcome, Snapshot, SnapshotPage, id_from_file_name, parse_id,
};
use super::space;
use crate::config::RetentionPolicy;
use crate::error::{Error, Result};

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

type SpaceProbe = Arc<dyn Fn(&Path) -> Option<u64> + Send + Sync>;

/// Snapshot archive for one Corefile
///
/// # Example
///
/// ```rust,no_run
/// use corefile_core::backup::{BackupReason, BackupStore};
/// use corefile_core::config::RetentionPolicy;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = BackupStore::new(
///         "/etc/coredns/Corefile",
///         "/var/lib/corefile/backups",
///         RetentionPolicy::default(),
///     );
///
///     let snapshot = store.create_snapshot(BackupReason::Manual).await?;
///     let page = store.list_snapshots(1, 20).await?;
///     assert!(page.backups[0].is_latest);
///     assert_eq!(page.backups[0].id, snapshot.id);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BackupStore {
    corefile_path: PathBuf,
    backup_dir: PathBuf,
    policy: RetentionPolicy,
    space_probe: SpaceProbe,
}

impl fmt::Debug for BackupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupStore")
            .field("corefile_path", &self.corefile_path)
            .field("backup_dir", &self.backup_dir)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BackupStore {
    /// Create a store for `corefile_path`, archiving into `backup_dir`
    pub fn new(
        corefile_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            corefile_path: corefile_path.into(),
            backup_dir: backup_dir.into(),
            policy,
            space_probe: Arc::new(space::available_bytes),
        }
    }

    /// Replace the free-space probe
    pub fn with_space_probe<F>(mut self, probe: F) -> Self
    where
        F: Fn(&Path) -> Option<u64> + Send + Sync + 'static,
    {
        self.space_probe = Arc::new(probe);
        self
    }

    /// Corefile this store protects
    pub fn corefile_path(&self) -> &Path {
        &self.corefile_path
    }

    /// Directory holding the snapshots
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Snapshot the current Corefile
    ///
    /// # Errors
    ///
    /// - `NotFound`: the Corefile does not exist
    /// - `SizeExceeded`: the Corefile is over `max_backup_size_bytes`
    /// - `InsufficientSpace`: the backup directory has less free space than the Corefile size
    pub async fn create_snapshot(&self, reason: BackupReason) -> Result<Snapshot> {
        let metadata = match fs::metadata(&self.corefile_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                return Err(Error::not_found(format!(
                    "Corefile not found: {}",
                    self.corefile_path.display()
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found(format!(
                    "Corefile not found: {}",
                    self.corefile_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let size = metadata.len();
        if size > self.policy.max_backup_size_bytes {
            warn!(
                path = %self.corefile_path.display(),
                size,
                limit = self.policy.max_backup_size_bytes,
                "Corefile exceeds maximum backup size"
            );
            return Err(Error::SizeExceeded {
                size,
                limit: self.policy.max_backup_size_bytes,
            });
        }

        fs::create_dir_all(&self.backup_dir).await?;
        self.check_space(size).await?;

        let content = fs::read(&self.corefile_path).await?;
        let newest = self.sorted_ids().await?.into_iter().next();
        let id = snapshot::next_id(Utc::now(), newest.as_deref());
        let path = self.snapshot_path(&id);

        write_atomic(&path, &content).await?;
        info!(
            snapshot_id = %id,
            reason = %reason,
            size = content.len(),
            path = %self.corefile_path.display(),
            "Backup created"
        );

        self.enforce_retention().await?;

        Ok(self.describe(&id, content.len() as u64, true, None))
    }

    /// One page of snapshots, newest first
    ///
    /// `is_latest` is set only on the first entry of page 1.
    pub async fn list_snapshots(&self, page: usize, page_size: usize) -> Result<SnapshotPage> {
        if page == 0 {
            return Err(Error::validation("page must be >= 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let ids = self.sorted_ids().await?;
        let total = ids.len();
        let start = (page - 1).saturating_mul(page_size);

        let mut backups = Vec::new();
        for (idx, id) in ids.iter().skip(start).take(page_size).enumerate() {
            match fs::metadata(self.snapshot_path(id)).await {
                Ok(m) => {
                    let is_latest = page == 1 && idx == 0;
                    backups.push(self.describe(id, m.len(), is_latest, None));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(snapshot_id = %id, "Snapshot vanished while listing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(SnapshotPage {
            backups,
            total,
            page,
            page_size,
        })
    }

    /// Fetch one snapshot including its content
    pub async fn get_snapshot(&self, id: &str) -> Result<Snapshot> {
        let bytes = self.read_snapshot(id).await?;
        let newest = self.sorted_ids().await?.into_iter().next();
        let is_latest = newest.as_deref() == Some(id);
        let content = String::from_utf8_lossy(&bytes).into_owned();
        Ok(self.describe(id, bytes.len() as u64, is_latest, Some(content)))
    }

    /// Overwrite the Corefile with a snapshot
    ///
    /// If a Corefile exists it is snapshotted first (`pre-restore`); a
    /// failure to take that safety copy aborts the restore.
    pub async fn restore_snapshot(&self, id: &str) -> Result<RestoreOutcome> {
        // Read first: the safety snapshot may evict this one under retention.
        let bytes = self.read_snapshot(id).await?;

        let safety_backup = if fs::try_exists(&self.corefile_path).await? {
            Some(self.create_snapshot(BackupReason::PreRestore).await?)
        } else {
            None
        };

        write_atomic(&self.corefile_path, &bytes)
            .await
            .map_err(|e| Error::write(&self.corefile_path, e))?;

        info!(
            snapshot_id = %id,
            path = %self.corefile_path.display(),
            "Backup restored"
        );

        Ok(RestoreOutcome {
            backup_id: id.to_string(),
            restored_at: Utc::now(),
            corefile_path: self.corefile_path.clone(),
            safety_backup,
        })
    }

    /// Delete a snapshot
    ///
    /// The newest snapshot is protected while any other snapshot exists.
    pub async fn delete_snapshot(&self, id: &str) -> Result<()> {
        let path = self.checked_path(id)?;
        if !fs::try_exists(&path).await? {
            return Err(Error::not_found(format!("Backup not found: {id}")));
        }

        let ids = self.sorted_ids().await?;
        if ids.len() > 1 && ids.first().map(String::as_str) == Some(id) {
            return Err(Error::ProtectedLatest(id.to_string()));
        }

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found(format!("Backup not found: {id}")));
            }
            Err(e) => return Err(e.into()),
        }
        info!(snapshot_id = %id, "Backup deleted");
        Ok(())
    }

    /// Evict the oldest snapshots beyond the retention limit
    async fn enforce_retention(&self) -> Result<()> {
        let ids = self.sorted_ids().await?;
        for id in ids.iter().skip(self.policy.max_backups) {
            match fs::remove_file(self.snapshot_path(id)).await {
                Ok(()) => info!(snapshot_id = %id, "Old backup deleted"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(snapshot_id = %id, error = %e, "Failed to evict old backup"),
            }
        }
        Ok(())
    }

    async fn check_space(&self, required: u64) -> Result<()> {
        let probe = Arc::clone(&self.space_probe);
        let dir = self.backup_dir.clone();
        let available = tokio::task::spawn_blocking(move || probe(dir.as_path()))
            .await
            .ok()
            .flatten();

        match available {
            Some(available) if available < required => {
                warn!(
                    dir = %self.backup_dir.display(),
                    required,
                    available,
                    "Insufficient disk space for backup"
                );
                Err(Error::InsufficientSpace {
                    required,
                    available,
                })
            }
            Some(_) => Ok(()),
            None => {
                debug!(dir = %self.backup_dir.display(), "Disk space probe unavailable, admitting backup");
                Ok(())
            }
        }
    }

    /// Snapshot ids, newest first
    async fn sorted_ids(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(id_from_file_name) {
                ids.push(id.to_string());
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    async fn read_snapshot(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.checked_path(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::not_found(format!("Backup not found: {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn checked_path(&self, id: &str) -> Result<PathBuf> {
        if parse_id(id).is_none() {
            return Err(Error::validation(format!("Invalid backup id: {id:?}")));
        }
        Ok(self.snapshot_path(id))
    }

    fn snapshot_path(&self, id: &str) -> PathBuf {
        self.backup_dir.join(snapshot::file_name(id))
    }

    fn describe(&self, id: &str, size: u64, is_latest: bool, content: Option<String>) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            filename: snapshot::file_name(id),
            size,
            created_at: parse_id(id).unwrap_or_else(Utc::now),
            is_latest,
            content,
        }
    }
}
