// # Path Lock
//
// Single-flight guard keyed by Corefile path.
//
// Generate, restore and manual backup each run a read-snapshot-write
// sequence against one file. Two of them interleaving on the same path
// could snapshot a file the other is about to replace, or write over a
// restore. Holding the path lock for the whole sequence rules that out.
//
// The registry is process-wide: two managers pointed at the same file
// share one lock. Different paths never contend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

type Registry = Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>;

static LOCKS: LazyLock<Registry> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Held for the duration of one lifecycle operation on `path`
#[derive(Debug)]
pub struct PathGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl PathGuard {
    /// Normalised path the guard is held for
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock key for `path`: absolute, so `./Corefile` and its absolute form agree
pub fn lock_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Wait for exclusive use of `path`
pub async fn acquire(path: &Path) -> PathGuard {
    let key = lock_key(path);
    let mutex = {
        // A panic while the registry is held cannot leave the map inconsistent.
        let mut locks = LOCKS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(key.clone()).or_default())
    };

    trace!(path = %key.display(), "Waiting for path lock");
    let guard = mutex.lock_owned().await;
    PathGuard {
        path: key,
        _guard: guard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_path_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Corefile");

        let first = acquire(&path).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), acquire(&path)).await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_secs(1), acquire(&path)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn different_paths_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let _a = acquire(&dir.path().join("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(50), acquire(&dir.path().join("b"))).await;
        assert!(b.is_ok());
    }

    #[test]
    fn relative_paths_are_made_absolute() {
        assert!(lock_key(Path::new("data/Corefile")).is_absolute());
    }
}
