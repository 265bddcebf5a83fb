//! Error types for the Corefile manager
//!
//! Every fallible operation in the crate returns [`Error`]. Callers that sit
//! behind a transport (HTTP, CLI) classify failures with [`Error::kind`]
//! instead of matching on individual variants.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Corefile manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the Corefile manager
#[derive(Error, Debug)]
pub enum Error {
    /// Missing Corefile, snapshot or other named resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input (bad snapshot id, bad pagination, invalid Corefile)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Source file larger than the configured backup size limit
    #[error("Corefile size {size} bytes exceeds maximum backup size of {limit} bytes")]
    SizeExceeded {
        /// Size of the source file
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// Not enough free space in the backup directory
    #[error("Insufficient disk space for backup: need {required} bytes, {available} available")]
    InsufficientSpace {
        /// Bytes needed for the snapshot
        required: u64,
        /// Bytes free at the backup directory
        available: u64,
    },

    /// Attempt to delete the newest snapshot while older ones exist
    #[error("Cannot delete the latest backup: {0}")]
    ProtectedLatest(String),

    /// No CoreDNS container or process to reload
    #[error("CoreDNS instance not found: {0}")]
    ProcessNotFound(String),

    /// The CoreDNS instance exists but is not running
    #[error("CoreDNS instance is not running: {0}")]
    NotRunning(String),

    /// Reload backend unreachable or failing
    #[error("External service error: {0}")]
    ExternalService(String),

    /// External command exceeded the reload timeout
    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, String),

    /// The Corefile itself could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Target path
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors outside the write step
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing file, snapshot or process
    NotFound,
    /// Caller supplied something unacceptable
    Validation,
    /// Capacity limits (size cap, disk space)
    ResourceExhausted,
    /// Operation refused to protect recoverable history
    ProtectedOperation,
    /// Reload backend failure
    ExternalService,
    /// The Corefile could not be written, or an unexpected internal failure
    Fatal,
}

impl ErrorKind {
    /// HTTP status an API layer should answer with
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation | ErrorKind::ProtectedOperation => 400,
            ErrorKind::ResourceExhausted => 507,
            ErrorKind::ExternalService | ErrorKind::Fatal => 500,
        }
    }
}

impl Error {
    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an external service error
    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an I/O failure of the Corefile write step
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::ProcessNotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) | Error::Config(_) | Error::Json(_) => ErrorKind::Validation,
            Error::SizeExceeded { .. } | Error::InsufficientSpace { .. } => {
                ErrorKind::ResourceExhausted
            }
            Error::ProtectedLatest(_) => ErrorKind::ProtectedOperation,
            Error::NotRunning(_) | Error::ExternalService(_) | Error::Timeout(..) => {
                ErrorKind::ExternalService
            }
            Error::Write { .. } | Error::Io(_) => ErrorKind::Fatal,
        }
    }

    /// Message safe to hand to a remote caller
    ///
    /// Reload backend failures are logged in full where they happen; the
    /// caller only learns that the backend failed.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::ExternalService => "CoreDNS reload backend failed".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_http_statuses() {
        assert_eq!(Error::not_found("x").kind().http_status(), 404);
        assert_eq!(Error::validation("x").kind().http_status(), 400);
        assert_eq!(
            Error::SizeExceeded { size: 2, limit: 1 }.kind().http_status(),
            507
        );
        assert_eq!(Error::ProtectedLatest("x".into()).kind().http_status(), 400);
        assert_eq!(Error::external("x").kind().http_status(), 500);
        let write = Error::write("/nope", std::io::Error::other("denied"));
        assert_eq!(write.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn external_errors_hide_detail() {
        let err = Error::external("docker daemon socket /var/run/docker.sock refused");
        assert!(!err.public_message().contains("docker.sock"));
        assert!(Error::not_found("backup 1").public_message().contains("backup 1"));
    }
}
