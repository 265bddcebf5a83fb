// # Reloader Trait
//
// Defines the interface for asking a running CoreDNS instance to re-read
// its Corefile.
//
// ## Implementations
//
// - Docker: `reload::DockerReloader` (signals a named container)
// - Process: `reload::ProcessReloader` (signals a host process found by pattern)
//
// ## Usage
//
// ```rust,ignore
// use corefile_core::Reloader;
//
// #[tokio::main]
// async fn main() -> corefile_core::Result<()> {
//     let reloader = /* Reloader implementation */;
//
//     // Absent instance is reported, not raised
//     let status = reloader.status().await;
//
//     // Absent instance is an error here
//     let result = reloader.reload().await?;
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Reload backend in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMethod {
    /// `docker kill --signal SIGUSR1 <container>`
    Docker,
    /// `kill(pid, SIGUSR1)` on a host process
    Process,
}

impl fmt::Display for ReloadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadMethod::Docker => f.write_str("docker"),
            ReloadMethod::Process => f.write_str("process"),
        }
    }
}

/// Outcome of a reload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// Signal delivered
    Success,
    /// Instance exists but is stopped
    NotRunning,
    /// No instance to signal
    NotFound,
    /// Backend failure or timeout
    Error(String),
}

impl ReloadOutcome {
    /// Classify a reload failure
    pub fn from_error(err: &crate::Error) -> Self {
        match err {
            crate::Error::ProcessNotFound(_) => ReloadOutcome::NotFound,
            crate::Error::NotRunning(_) => ReloadOutcome::NotRunning,
            other => ReloadOutcome::Error(other.to_string()),
        }
    }
}

/// Result of a reload call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadResult {
    /// Backend that performed the reload
    pub method: ReloadMethod,
    /// Container name or process id that was signalled
    pub target: String,
    /// When the reload was attempted
    pub reloaded_at: DateTime<Utc>,
    /// What happened
    pub outcome: ReloadOutcome,
}

impl ReloadResult {
    /// Successful reload of `target`
    pub fn success(method: ReloadMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            reloaded_at: Utc::now(),
            outcome: ReloadOutcome::Success,
        }
    }

    /// Failed reload of `target`
    pub fn failed(method: ReloadMethod, target: impl Into<String>, err: &crate::Error) -> Self {
        Self {
            method,
            target: target.into(),
            reloaded_at: Utc::now(),
            outcome: ReloadOutcome::from_error(err),
        }
    }

    /// Whether the signal was delivered
    pub fn is_success(&self) -> bool {
        self.outcome == ReloadOutcome::Success
    }
}

/// Coarse liveness of the CoreDNS instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadStatus {
    /// Backend that answered
    pub method: ReloadMethod,
    /// Whether an instance is up
    pub running: bool,
    /// Backend-specific state, e.g. `running`, `exited`, `not_found`
    pub detail: String,
    /// Container id or pid, when one was found
    pub instance: Option<String>,
}

/// Trait for reload backends
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - `status()` never fails: an absent instance is `running: false`.
/// - `reload()` fails when there is nothing to reload.
/// - Both bound every external call by the configured timeout.
#[async_trait]
pub trait Reloader: Send + Sync {
    /// Send the reload signal
    ///
    /// # Returns
    ///
    /// - `Ok(ReloadResult)`: Signal delivered
    /// - `Err(Error::ProcessNotFound)`: No instance found
    /// - `Err(Error::NotRunning)`: Instance stopped
    /// - `Err(Error)`: Backend failure or timeout
    async fn reload(&self) -> Result<ReloadResult, crate::Error>;

    /// Report whether an instance is running
    async fn status(&self) -> ReloadStatus;

    /// Backend identifier (for logging and results)
    fn method(&self) -> ReloadMethod;

    /// Container name or process pattern this backend targets
    fn target(&self) -> &str;
}
