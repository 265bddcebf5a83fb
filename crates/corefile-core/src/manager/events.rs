//! Lifecycle events emitted by the CorefileManager

use serde::Serialize;
use std::path::PathBuf;

use crate::backup::BackupReason;
use crate::render::RenderStats;
use crate::traits::ReloadMethod;

/// Events emitted by the [`CorefileManager`](super::CorefileManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Corefile text rendered
    Rendered {
        stats: RenderStats,
    },

    /// Snapshot taken
    BackupCreated {
        snapshot_id: String,
        reason: BackupReason,
    },

    /// Pre-write snapshot refused; the write went ahead anyway
    BackupSkipped {
        path: PathBuf,
        error: String,
    },

    /// Corefile replaced
    Written {
        path: PathBuf,
        bytes: usize,
    },

    /// Snapshot copied back over the Corefile
    Restored {
        snapshot_id: String,
        path: PathBuf,
    },

    /// Snapshot removed on request
    BackupDeleted {
        snapshot_id: String,
    },

    /// CoreDNS signalled
    Reloaded {
        method: ReloadMethod,
        target: String,
    },

    /// CoreDNS could not be signalled
    ReloadFailed {
        method: ReloadMethod,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let event = LifecycleEvent::BackupCreated {
            snapshot_id: "20250109_120000_000001".to_string(),
            reason: BackupReason::PreWrite,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "backup_created");
        assert_eq!(json["reason"], "pre-write");
    }
}
