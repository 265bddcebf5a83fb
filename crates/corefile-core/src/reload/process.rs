//! Bare-process reload backend
//!
//! Finds CoreDNS by matching a pattern against full command lines and
//! signals the first match. "First" means lowest pid. With several
//! matching processes the choice is arbitrary from the operator's point of
//! view; make the pattern specific enough to match exactly one.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::traits::{ReloadMethod, ReloadResult, ReloadStatus, Reloader};

/// Reloads CoreDNS running as a host process
#[derive(Debug, Clone)]
pub struct ProcessReloader {
    pattern: String,
    timeout: Duration,
}

impl ProcessReloader {
    /// Create a backend matching `pattern` against process command lines
    pub fn new(pattern: impl Into<String>, timeout: Duration) -> Self {
        Self {
            pattern: pattern.into(),
            timeout,
        }
    }

    /// Lowest pid whose command line contains the pattern
    pub async fn find_pid(&self) -> Result<Option<u32>> {
        #[cfg(target_os = "linux")]
        {
            let pattern = self.pattern.clone();
            let scan = tokio::task::spawn_blocking(move || scan_proc(&pattern));
            match tokio::time::timeout(self.timeout, scan).await {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => Err(Error::external(format!("process scan panicked: {e}"))),
                Err(_) => Err(Error::Timeout(self.timeout, "/proc scan".to_string())),
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.pgrep().await
        }
    }

    #[cfg(not(target_os = "linux"))]
    async fn pgrep(&self) -> Result<Option<u32>> {
        let args = vec!["-f".to_string(), self.pattern.clone()];
        let output = super::command::run("pgrep", &args, self.timeout).await?;
        // pgrep exits 1 when nothing matched
        if output.status.code() == Some(1) {
            return Ok(None);
        }
        if !output.status.success() {
            return Err(Error::external(format!(
                "pgrep failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let own = std::process::id();
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .filter(|pid| *pid != own)
            .min())
    }
}

#[cfg(target_os = "linux")]
fn scan_proc(pattern: &str) -> Result<Option<u32>> {
    let own = std::process::id();
    let mut matches = Vec::new();

    for entry in std::fs::read_dir("/proc")? {
        let Ok(entry) = entry else { continue };
        let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        if pid == own {
            continue;
        }
        // Processes may exit mid-scan; unreadable entries are skipped.
        let Ok(raw) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let cmdline = String::from_utf8_lossy(&raw).replace('\0', " ");
        if cmdline.trim_end().contains(pattern) {
            matches.push(pid);
        }
    }

    if matches.len() > 1 {
        warn!(pattern, count = matches.len(), "Several processes match, using the lowest pid");
    }
    Ok(matches.into_iter().min())
}

#[cfg(unix)]
fn send_reload_signal(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid).map_err(|_| Error::external(format!("pid {pid} out of range")))?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, libc::SIGUSR1) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Err(Error::ProcessNotFound(format!("pid {pid} exited before it could be signalled")))
    } else {
        Err(Error::external(format!("failed to signal pid {pid}: {err}")))
    }
}

#[cfg(not(unix))]
fn send_reload_signal(pid: u32) -> Result<()> {
    Err(Error::external(format!(
        "cannot signal pid {pid}: signals are not supported on this platform"
    )))
}

#[async_trait]
impl Reloader for ProcessReloader {
    async fn reload(&self) -> Result<ReloadResult> {
        let pid = self
            .find_pid()
            .await?
            .ok_or_else(|| Error::ProcessNotFound(format!("no process matching {:?}", self.pattern)))?;

        send_reload_signal(pid).inspect_err(|e| {
            error!(pid, pattern = %self.pattern, error = %e, "Failed to signal CoreDNS");
        })?;

        info!(method = "process", pid, pattern = %self.pattern, "CoreDNS reload signalled");
        Ok(ReloadResult::success(ReloadMethod::Process, pid.to_string()))
    }

    async fn status(&self) -> ReloadStatus {
        match self.find_pid().await {
            Ok(Some(pid)) => ReloadStatus {
                method: ReloadMethod::Process,
                running: true,
                detail: "running".to_string(),
                instance: Some(pid.to_string()),
            },
            Ok(None) => {
                debug!(pattern = %self.pattern, "No matching process");
                ReloadStatus {
                    method: ReloadMethod::Process,
                    running: false,
                    detail: "not_running".to_string(),
                    instance: None,
                }
            }
            Err(e) => {
                error!(pattern = %self.pattern, error = %e, "Process status query failed");
                ReloadStatus {
                    method: ReloadMethod::Process,
                    running: false,
                    detail: "error".to_string(),
                    instance: None,
                }
            }
        }
    }

    fn method(&self) -> ReloadMethod {
        ReloadMethod::Process
    }

    fn target(&self) -> &str {
        &self.pattern
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;

    #[tokio::test]
    async fn missing_process_fails_reload_but_not_status() {
        let reloader = ProcessReloader::new("no-such-coredns-7f3a9c", Duration::from_secs(2));

        assert!(matches!(reloader.reload().await, Err(Error::ProcessNotFound(_))));

        let status = reloader.status().await;
        assert!(!status.running);
        assert_eq!(status.detail, "not_running");
        assert_eq!(status.method, ReloadMethod::Process);
    }

    #[tokio::test]
    async fn signals_matching_process() {
        let mut child = Command::new("sleep").arg("31.4159").spawn().unwrap();
        let reloader = ProcessReloader::new("sleep 31.4159", Duration::from_secs(2));

        let status = reloader.status().await;
        assert!(status.running);
        assert_eq!(status.instance, Some(child.id().to_string()));

        let result = reloader.reload().await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.target, child.id().to_string());

        // `sleep` has no SIGUSR1 handler, so delivery terminates it
        let exit = child.wait().unwrap();
        assert_eq!(exit.signal(), Some(libc::SIGUSR1));
    }
}
