//! Corefile lifecycle manager
//!
//! The CorefileManager is responsible for:
//! - Rendering the active record set into Corefile text
//! - Snapshotting the existing Corefile before it is replaced
//! - Writing the new Corefile atomically
//! - Asking CoreDNS to reload it
//!
//! ## Generate flow
//!
//! ```text
//!  Idle ──▶ Rendering ──▶ Backing up ──▶ Writing ──▶ Reloading ──▶ Done
//!              │          (if a file       │          (if auto
//!              │           exists)         │           reload)
//!              ▼                           ▼
//!           Preview                      Failed
//! ```
//!
//! ## Failure policy
//!
//! Only a failure up to and including the write aborts a generate. A
//! refused pre-write snapshot becomes `backup_warning` and a failed reload
//! becomes `reload_error`; the Corefile on disk is already correct by then.
//!
//! ## Concurrency
//!
//! Generate, restore and manual backup hold a lock on the Corefile path for
//! their whole sequence (see [`lock`]).

pub mod events;
pub mod lock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::backup::{
    BackupReason, BackupStore, RestoreOutcome, Snapshot, SnapshotPage, write_atomic,
};
use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::reload::check_corefile;
use crate::render::{self, RenderStats};
use crate::traits::{RecordSource, ReloadResult, ReloadStatus, Reloader, UpstreamSource};

pub use events::LifecycleEvent;

/// Result of [`CorefileManager::generate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateOutcome {
    /// Rendered Corefile text
    pub content: String,
    /// Structural counts
    pub stats: RenderStats,
    /// Timestamp embedded in the header
    pub generated_at: DateTime<Utc>,
    /// Where the Corefile was written, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Pre-write snapshot of the replaced file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<Snapshot>,
    /// Why no pre-write snapshot was taken although a file existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_warning: Option<String>,
    /// Outcome of the reload attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_result: Option<ReloadResult>,
    /// Why the reload failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

/// Result of [`CorefileManager::preview`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// Rendered Corefile text
    pub content: String,
    /// Structural counts
    pub stats: RenderStats,
    /// Timestamp embedded in the header
    pub generated_at: DateTime<Utc>,
}

/// Corefile lifecycle manager
///
/// Owns the configured Corefile path and its backup archive. Every
/// collaborator is injected at construction, including the reload backend,
/// which never changes for the lifetime of the manager.
///
/// ## Lifecycle
///
/// 1. Create with [`CorefileManager::new()`]
/// 2. Call operations from any task; the manager is `Send + Sync`
/// 3. Drain the event receiver, or drop it to ignore events
pub struct CorefileManager {
    /// Active record set
    records: Box<dyn RecordSource>,

    /// Forwarding settings for the root block
    upstream: Box<dyn UpstreamSource>,

    /// Reload backend
    reloader: Box<dyn Reloader>,

    /// Snapshot archive for the configured Corefile
    store: BackupStore,

    /// Reload after `regenerate()` when true
    auto_reload: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<LifecycleEvent>,
}

impl CorefileManager {
    /// Create a new manager
    ///
    /// # Parameters
    ///
    /// - `records`: record store (read-only)
    /// - `upstream`: forwarding settings
    /// - `reloader`: reload backend
    /// - `config`: manager configuration
    ///
    /// # Returns
    ///
    /// A tuple of (manager, event_receiver) where event_receiver yields lifecycle events
    pub fn new(
        records: Box<dyn RecordSource>,
        upstream: Box<dyn UpstreamSource>,
        reloader: Box<dyn Reloader>,
        config: ManagerConfig,
    ) -> Result<(Self, mpsc::Receiver<LifecycleEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let store = BackupStore::new(config.corefile_path, config.backup_dir, config.retention);

        let manager = Self {
            records,
            upstream,
            reloader,
            store,
            auto_reload: config.auto_reload_on_generate,
            event_tx: tx,
        };

        Ok((manager, rx))
    }

    /// Replace the free-space probe used for snapshot admission
    pub fn with_space_probe<F>(mut self, probe: F) -> Self
    where
        F: Fn(&Path) -> Option<u64> + Send + Sync + 'static,
    {
        self.store = self.store.with_space_probe(probe);
        self
    }

    /// Configured Corefile path
    pub fn corefile_path(&self) -> &Path {
        self.store.corefile_path()
    }

    /// Render and write the configured Corefile, reloading if configured to
    pub async fn regenerate(&self) -> Result<GenerateOutcome> {
        let path = self.store.corefile_path().to_path_buf();
        self.generate(Some(&path), self.auto_reload).await
    }

    /// Render, snapshot, write and reload
    ///
    /// Without `output_path` this renders only, like [`preview`](Self::preview).
    /// A file replaced at any path other than the configured Corefile is not
    /// snapshotted; `backup_warning` says so.
    ///
    /// # Errors
    ///
    /// - Record or settings source failures (nothing has been touched yet)
    /// - `Error::Write`: the Corefile could not be written
    pub async fn generate(
        &self,
        output_path: Option<&Path>,
        auto_reload: bool,
    ) -> Result<GenerateOutcome> {
        let Some(path) = output_path else {
            let preview = self.preview().await?;
            return Ok(GenerateOutcome {
                content: preview.content,
                stats: preview.stats,
                generated_at: preview.generated_at,
                output_path: None,
                backup: None,
                backup_warning: None,
                reload_result: None,
                reload_error: None,
            });
        };

        let guard = lock::acquire(path).await;
        debug!(path = %guard.path().display(), "Generating Corefile");

        let preview = self.preview().await?;
        let mut outcome = GenerateOutcome {
            content: preview.content,
            stats: preview.stats,
            generated_at: preview.generated_at,
            output_path: Some(path.to_path_buf()),
            backup: None,
            backup_warning: None,
            reload_result: None,
            reload_error: None,
        };

        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            let snapshot = if guard.path() == lock::lock_key(self.store.corefile_path()) {
                self.store.create_snapshot(BackupReason::PreWrite).await
            } else {
                // The archive only holds versions of the configured Corefile.
                Err(Error::validation(format!(
                    "backups only cover {}",
                    self.store.corefile_path().display()
                )))
            };
            match snapshot {
                Ok(snapshot) => {
                    self.emit_event(LifecycleEvent::BackupCreated {
                        snapshot_id: snapshot.id.clone(),
                        reason: BackupReason::PreWrite,
                    });
                    outcome.backup = Some(snapshot);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Pre-write backup skipped");
                    self.emit_event(LifecycleEvent::BackupSkipped {
                        path: path.to_path_buf(),
                        error: e.to_string(),
                    });
                    outcome.backup_warning = Some(e.to_string());
                }
            }
        }

        if let Err(e) = write_atomic(path, outcome.content.as_bytes()).await {
            error!(path = %path.display(), error = %e, "Failed to write Corefile");
            return Err(Error::write(path, e));
        }
        info!(
            path = %path.display(),
            zones = outcome.stats.total_zones,
            records = outcome.stats.total_records,
            "Corefile written"
        );
        self.emit_event(LifecycleEvent::Written {
            path: path.to_path_buf(),
            bytes: outcome.content.len(),
        });

        drop(guard);

        if auto_reload {
            match self.reload_and_report().await {
                Ok(result) => outcome.reload_result = Some(result),
                Err(e) => {
                    outcome.reload_result = Some(ReloadResult::failed(
                        self.reloader.method(),
                        self.reloader.target(),
                        &e,
                    ));
                    outcome.reload_error = Some(e.to_string());
                }
            }
        }

        Ok(outcome)
    }

    /// Render without touching the filesystem or CoreDNS
    pub async fn preview(&self) -> Result<Preview> {
        let records = self.records.active_records().await?;
        let upstream = self.upstream.upstream().await?;
        let generated_at = Utc::now();

        let rendered = render::render(&records, upstream.as_ref(), generated_at);
        debug!(
            zones = rendered.stats.total_zones,
            records = rendered.stats.total_records,
            "Corefile rendered"
        );
        self.emit_event(LifecycleEvent::Rendered {
            stats: rendered.stats,
        });

        Ok(Preview {
            content: rendered.content,
            stats: rendered.stats,
            generated_at,
        })
    }

    /// Snapshot the configured Corefile on request
    pub async fn create_backup(&self) -> Result<Snapshot> {
        let _guard = lock::acquire(self.store.corefile_path()).await;
        let snapshot = self.store.create_snapshot(BackupReason::Manual).await?;
        self.emit_event(LifecycleEvent::BackupCreated {
            snapshot_id: snapshot.id.clone(),
            reason: BackupReason::Manual,
        });
        Ok(snapshot)
    }

    /// One page of snapshots, newest first
    pub async fn list_backups(&self, page: usize, page_size: usize) -> Result<SnapshotPage> {
        self.store.list_snapshots(page, page_size).await
    }

    /// One snapshot including its content
    pub async fn get_backup(&self, id: &str) -> Result<Snapshot> {
        self.store.get_snapshot(id).await
    }

    /// Restore a snapshot over the configured Corefile
    ///
    /// Does not reload; call [`reload_now`](Self::reload_now) afterwards.
    pub async fn restore_backup(&self, id: &str) -> Result<RestoreOutcome> {
        let _guard = lock::acquire(self.store.corefile_path()).await;
        let outcome = self.store.restore_snapshot(id).await?;
        if let Some(safety) = &outcome.safety_backup {
            self.emit_event(LifecycleEvent::BackupCreated {
                snapshot_id: safety.id.clone(),
                reason: BackupReason::PreRestore,
            });
        }
        self.emit_event(LifecycleEvent::Restored {
            snapshot_id: outcome.backup_id.clone(),
            path: outcome.corefile_path.clone(),
        });
        Ok(outcome)
    }

    /// Delete a snapshot
    pub async fn delete_backup(&self, id: &str) -> Result<()> {
        self.store.delete_snapshot(id).await?;
        self.emit_event(LifecycleEvent::BackupDeleted {
            snapshot_id: id.to_string(),
        });
        Ok(())
    }

    /// Check the configured Corefile, then reload CoreDNS
    ///
    /// # Errors
    ///
    /// - `Validation`: the Corefile is missing, empty or unbalanced
    /// - Any reload failure, including nothing to reload
    pub async fn reload_now(&self) -> Result<ReloadResult> {
        check_corefile(self.store.corefile_path()).await?;
        self.reload_and_report().await
    }

    /// Whether CoreDNS is up, according to the reload backend
    pub async fn status(&self) -> ReloadStatus {
        self.reloader.status().await
    }

    async fn reload_and_report(&self) -> Result<ReloadResult> {
        match self.reloader.reload().await {
            Ok(result) => {
                self.emit_event(LifecycleEvent::Reloaded {
                    method: result.method,
                    target: result.target.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                error!(
                    method = %self.reloader.method(),
                    target = self.reloader.target(),
                    error = %e,
                    "CoreDNS reload failed"
                );
                self.emit_event(LifecycleEvent::ReloadFailed {
                    method: self.reloader.method(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Emit a lifecycle event, dropping it if nobody keeps up
    fn emit_event(&self, event: LifecycleEvent) {
        if let Err(mpsc::error::TrySendError::Full(dropped)) = self.event_tx.try_send(event) {
            warn!(?dropped, "Event channel full, dropping event");
        }
    }
}
