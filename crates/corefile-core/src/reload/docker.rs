//! Docker reload backend
//!
//! Talks to the Docker CLI rather than the daemon socket so that whatever
//! context, credentials and remote host the operator configured for
//! `docker` apply unchanged.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

use super::RELOAD_SIGNAL;
use super::command;
use crate::error::{Error, Result};
use crate::traits::{ReloadMethod, ReloadResult, ReloadStatus, Reloader};

const INSPECT_FORMAT: &str = "{{.Id}} {{.State.Status}}";

/// Container as reported by `docker inspect`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContainerState {
    id: String,
    status: String,
}

impl ContainerState {
    fn short_id(&self) -> String {
        self.id.chars().take(12).collect()
    }
}

/// Reloads CoreDNS running in a named container
#[derive(Debug, Clone)]
pub struct DockerReloader {
    container_name: String,
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl DockerReloader {
    /// Create a backend for `container_name` using the `docker_bin` CLI
    pub fn new(
        container_name: impl Into<String>,
        docker_bin: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            program: docker_bin.into(),
            base_args: Vec::new(),
            timeout,
        }
    }

    /// Invoke the CLI through a wrapper, e.g. `sudo docker` or `sh fake-docker.sh`
    pub fn with_command(mut self, program: impl Into<String>, base_args: Vec<String>) -> Self {
        self.program = program.into();
        self.base_args = base_args;
        self
    }

    fn args(&self, extra: &[&str]) -> Vec<String> {
        self.base_args
            .iter()
            .cloned()
            .chain(extra.iter().map(|s| s.to_string()))
            .collect()
    }

    /// Look the container up; `Ok(None)` if Docker does not know it
    async fn inspect(&self) -> Result<Option<ContainerState>> {
        let args = self.args(&["inspect", "--format", INSPECT_FORMAT, self.container_name.as_str()]);
        let output = command::run(&self.program, &args, self.timeout).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if stderr.contains("No such object") || stderr.contains("No such container") {
                debug!(container = %self.container_name, "Container not found");
                return Ok(None);
            }
            error!(
                container = %self.container_name,
                status = %output.status,
                stderr = %stderr.trim(),
                "docker inspect failed"
            );
            return Err(Error::external(format!(
                "docker inspect {} failed: {}",
                self.container_name,
                stderr.trim()
            )));
        }

        let line = stdout.lines().next().unwrap_or("").trim();
        match line.split_once(' ') {
            Some((id, status)) => Ok(Some(ContainerState {
                id: id.to_string(),
                status: status.trim().to_string(),
            })),
            None => {
                error!(container = %self.container_name, output = %line, "Unexpected docker inspect output");
                Err(Error::external(format!(
                    "unexpected docker inspect output for {}: {line:?}",
                    self.container_name
                )))
            }
        }
    }
}

#[async_trait]
impl Reloader for DockerReloader {
    async fn reload(&self) -> Result<ReloadResult> {
        let container = self
            .inspect()
            .await?
            .ok_or_else(|| Error::ProcessNotFound(format!("container {}", self.container_name)))?;

        if container.status != "running" {
            return Err(Error::NotRunning(format!(
                "container {} is {}",
                self.container_name, container.status
            )));
        }

        let args = self.args(&["kill", "--signal", RELOAD_SIGNAL, self.container_name.as_str()]);
        let output = command::run(&self.program, &args, self.timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                container = %self.container_name,
                status = %output.status,
                stderr = %stderr.trim(),
                "docker kill failed"
            );
            return Err(Error::external(format!(
                "docker kill {} failed: {}",
                self.container_name,
                stderr.trim()
            )));
        }

        info!(
            method = "docker",
            container = %self.container_name,
            id = %container.short_id(),
            "CoreDNS reload signalled"
        );
        Ok(ReloadResult::success(ReloadMethod::Docker, &self.container_name))
    }

    async fn status(&self) -> ReloadStatus {
        match self.inspect().await {
            Ok(Some(container)) => ReloadStatus {
                method: ReloadMethod::Docker,
                running: container.status == "running",
                instance: Some(container.short_id()),
                detail: container.status,
            },
            Ok(None) => ReloadStatus {
                method: ReloadMethod::Docker,
                running: false,
                detail: "not_found".to_string(),
                instance: None,
            },
            Err(e) => {
                error!(container = %self.container_name, error = %e, "Docker status query failed");
                ReloadStatus {
                    method: ReloadMethod::Docker,
                    running: false,
                    detail: "error".to_string(),
                    instance: None,
                }
            }
        }
    }

    fn method(&self) -> ReloadMethod {
        ReloadMethod::Docker
    }

    fn target(&self) -> &str {
        &self.container_name
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::{TempDir, tempdir};

    // Stand-in for the Docker CLI, run through `sh` so it never needs the
    // executable bit.
    const FAKE_DOCKER: &str = r#"
log="$(dirname "$0")/calls.log"
echo "$*" >> "$log"
case "$1" in
  inspect)
    case "$4" in
      coredns) echo "3f4e5d6c7b8a9f0e1d2c3b4a running" ;;
      stopped) echo "0a1b2c3d4e5f6a7b8c9d0e1f exited" ;;
      slow) sleep 5 ;;
      broken) echo "Cannot connect to the Docker daemon" >&2; exit 1 ;;
      *) echo "Error: No such object: $4" >&2; exit 1 ;;
    esac
    ;;
  kill) exit 0 ;;
esac
"#;

    fn fake_docker(dir: &TempDir) -> PathBuf {
        let script = dir.path().join("docker.sh");
        std::fs::write(&script, FAKE_DOCKER).unwrap();
        script
    }

    fn reloader(script: &Path, container: &str, timeout: Duration) -> DockerReloader {
        DockerReloader::new(container, "docker", timeout)
            .with_command("sh", vec![script.display().to_string()])
    }

    fn calls(dir: &TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn reload_signals_running_container() {
        let dir = tempdir().unwrap();
        let script = fake_docker(&dir);
        let reloader = reloader(&script, "coredns", Duration::from_secs(5));

        let result = reloader.reload().await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.method, ReloadMethod::Docker);
        assert_eq!(result.target, "coredns");
        assert!(calls(&dir).contains(&"kill --signal SIGUSR1 coredns".to_string()));
    }

    #[tokio::test]
    async fn reload_of_missing_container_fails_but_status_does_not() {
        let dir = tempdir().unwrap();
        let script = fake_docker(&dir);
        let reloader = reloader(&script, "ghost", Duration::from_secs(5));

        assert!(matches!(reloader.reload().await, Err(Error::ProcessNotFound(_))));

        let status = reloader.status().await;
        assert!(!status.running);
        assert_eq!(status.detail, "not_found");
        assert!(!calls(&dir).iter().any(|c| c.starts_with("kill")));
    }

    #[tokio::test]
    async fn stopped_container_is_not_running() {
        let dir = tempdir().unwrap();
        let script = fake_docker(&dir);
        let reloader = reloader(&script, "stopped", Duration::from_secs(5));

        assert!(matches!(reloader.reload().await, Err(Error::NotRunning(_))));

        let status = reloader.status().await;
        assert!(!status.running);
        assert_eq!(status.detail, "exited");
        assert_eq!(status.instance.as_deref(), Some("0a1b2c3d4e5f"));
    }

    #[tokio::test]
    async fn daemon_errors_are_external() {
        let dir = tempdir().unwrap();
        let script = fake_docker(&dir);
        let reloader = reloader(&script, "broken", Duration::from_secs(5));

        assert!(matches!(reloader.reload().await, Err(Error::ExternalService(_))));
        assert_eq!(reloader.status().await.detail, "error");
    }

    #[tokio::test]
    async fn slow_cli_times_out() {
        let dir = tempdir().unwrap();
        let script = fake_docker(&dir);
        let reloader = reloader(&script, "slow", Duration::from_millis(200));

        assert!(matches!(reloader.reload().await, Err(Error::Timeout(..))));
    }

    #[tokio::test]
    async fn missing_cli_is_external() {
        let reloader = DockerReloader::new(
            "coredns",
            "/nonexistent/bin/docker-cli-that-is-not-there",
            Duration::from_secs(1),
        );
        assert!(matches!(reloader.reload().await, Err(Error::ExternalService(_))));
        assert!(!reloader.status().await.running);
    }
}
