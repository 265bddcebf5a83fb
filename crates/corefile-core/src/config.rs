//! Configuration types for the Corefile manager
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::traits::Upstream;

/// Main Corefile manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Path of the authoritative Corefile
    #[serde(default = "default_corefile_path")]
    pub corefile_path: PathBuf,

    /// Directory holding `Corefile.backup.*` snapshots
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Retention and admission limits for snapshots
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Reload after every successful generate unless the caller opts out
    #[serde(default = "default_auto_reload")]
    pub auto_reload_on_generate: bool,

    /// How the running CoreDNS instance is reloaded
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Upper bound on each external reload command (in seconds)
    #[serde(default = "default_reload_timeout_secs")]
    pub reload_timeout_secs: u64,

    /// Forwarders used when the settings store has nothing saved
    #[serde(default)]
    pub upstream: UpstreamDefaults,

    /// Capacity of the lifecycle event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ManagerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            corefile_path: default_corefile_path(),
            backup_dir: default_backup_dir(),
            retention: RetentionPolicy::default(),
            auto_reload_on_generate: default_auto_reload(),
            reload: ReloadConfig::default(),
            reload_timeout_secs: default_reload_timeout_secs(),
            upstream: UpstreamDefaults::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Point the manager at a Corefile and backup directory
    pub fn with_paths(mut self, corefile: impl Into<PathBuf>, backups: impl Into<PathBuf>) -> Self {
        self.corefile_path = corefile.into();
        self.backup_dir = backups.into();
        self
    }

    /// Select the reload backend
    pub fn with_reload(mut self, reload: ReloadConfig) -> Self {
        self.reload = reload;
        self
    }

    /// Reload timeout as a [`Duration`]
    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.corefile_path.as_os_str().is_empty() {
            return Err(crate::Error::config("Corefile path cannot be empty"));
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(crate::Error::config("Backup directory cannot be empty"));
        }
        if !(1..=60).contains(&self.reload_timeout_secs) {
            return Err(crate::Error::config(format!(
                "Reload timeout must be between 1 and 60 seconds, got {}",
                self.reload_timeout_secs
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        self.retention.validate()?;
        self.reload.validate()?;
        self.upstream.validate()?;

        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot retention and admission limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Keep at most this many snapshots, oldest evicted first
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Refuse to snapshot a Corefile larger than this
    #[serde(default = "default_max_backup_size_bytes")]
    pub max_backup_size_bytes: u64,
}

impl RetentionPolicy {
    /// Create a policy with explicit limits
    pub fn new(max_backups: usize, max_backup_size_bytes: u64) -> Self {
        Self {
            max_backups,
            max_backup_size_bytes,
        }
    }

    /// Validate the retention policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_backups == 0 {
            return Err(crate::Error::config("max_backups must be at least 1"));
        }
        if self.max_backup_size_bytes == 0 {
            return Err(crate::Error::config("max_backup_size_bytes must be > 0"));
        }
        Ok(())
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_backups: default_max_backups(),
            max_backup_size_bytes: default_max_backup_size_bytes(),
        }
    }
}

/// Reload backend configuration
///
/// Chosen once at startup; the manager never switches backends at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadConfig {
    /// CoreDNS runs in a Docker container
    Docker {
        /// Container name or id
        #[serde(default = "default_container_name")]
        container_name: String,
        /// Docker CLI binary
        #[serde(default = "default_docker_bin")]
        docker_bin: String,
    },

    /// CoreDNS runs as a bare process on this host
    Process {
        /// Substring matched against the full command line
        #[serde(default = "default_process_pattern")]
        pattern: String,
    },
}

impl ReloadConfig {
    /// Validate the reload configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ReloadConfig::Docker {
                container_name,
                docker_bin,
            } => {
                if container_name.trim().is_empty() {
                    return Err(crate::Error::config("Docker container name cannot be empty"));
                }
                if docker_bin.trim().is_empty() {
                    return Err(crate::Error::config("Docker binary cannot be empty"));
                }
                Ok(())
            }
            ReloadConfig::Process { pattern } => {
                if pattern.trim().is_empty() {
                    return Err(crate::Error::config("Process pattern cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ReloadConfig::Docker { .. } => "docker",
            ReloadConfig::Process { .. } => "process",
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        ReloadConfig::Docker {
            container_name: default_container_name(),
            docker_bin: default_docker_bin(),
        }
    }
}

/// Fallback forwarders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamDefaults {
    /// Primary forwarder, used when none is stored
    #[serde(default = "default_primary_dns")]
    pub primary: String,

    /// Secondary forwarder, used when none is stored
    #[serde(default = "default_secondary_dns")]
    pub secondary: Option<String>,
}

impl UpstreamDefaults {
    /// Validate the defaults
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.primary.trim().is_empty() {
            return Err(crate::Error::config("Default primary upstream cannot be empty"));
        }
        Ok(())
    }

    /// Defaults as a renderable [`Upstream`]
    pub fn to_upstream(&self) -> Upstream {
        Upstream::new(self.primary.clone(), self.secondary.clone())
    }
}

impl Default for UpstreamDefaults {
    fn default() -> Self {
        Self {
            primary: default_primary_dns(),
            secondary: default_secondary_dns(),
        }
    }
}

fn default_corefile_path() -> PathBuf {
    PathBuf::from("./data/Corefile")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./data/backups")
}

fn default_auto_reload() -> bool {
    true
}

fn default_max_backups() -> usize {
    30
}

fn default_max_backup_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_reload_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    64
}

fn default_container_name() -> String {
    "coredns".to_string()
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

fn default_process_pattern() -> String {
    "coredns".to_string()
}

fn default_primary_dns() -> String {
    "8.8.8.8".to_string()
}

fn default_secondary_dns() -> Option<String> {
    Some("8.8.4.4".to_string())
}
