//! Minimal Corefile sanity check
//!
//! A candidate Corefile is acceptable if it exists, is non-empty and its
//! braces form at least one properly closed block. Nothing else of the
//! CoreDNS grammar is checked.

use std::path::Path;
use tokio::fs;

use crate::error::{Error, Result};
use crate::render::is_well_formed;

/// Explain why `path` is not an acceptable Corefile
pub async fn check_corefile(path: &Path) -> Result<()> {
    let content = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::validation(format!(
                "Corefile does not exist: {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if content.is_empty() {
        return Err(Error::validation(format!("Corefile is empty: {}", path.display())));
    }

    if !is_well_formed(&String::from_utf8_lossy(&content)) {
        return Err(Error::validation(format!(
            "Corefile has no complete block: {}",
            path.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn accepts_closed_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Corefile");
        fs::write(&path, ".:53 {\n    errors\n}\n").await.unwrap();
        assert!(check_corefile(&path).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_missing_empty_and_unbalanced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Corefile");
        let err = check_corefile(&path).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        fs::write(&path, b"").await.unwrap();
        let err = check_corefile(&path).await.unwrap_err();
        assert!(err.to_string().contains("empty"));

        fs::write(&path, ".:53 {\n    errors\n").await.unwrap();
        let err = check_corefile(&path).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
