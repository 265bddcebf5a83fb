// # corefiled - Corefile lifecycle CLI
//
// Thin front end over corefile-core. Every operation of the lifecycle
// manager is a subcommand; results are printed to stdout as JSON, logs go
// to stderr.
//
// The corefiled binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Wiring the record source, settings and reload backend
// 4. Running exactly one manager operation
//
// ## Configuration
//
// ### Corefile & backups
// - `COREFILE_PATH`: Corefile to manage (default ./data/Corefile)
// - `COREFILE_BACKUP_DIR`: Snapshot directory (default ./data/backups)
// - `COREFILE_MAX_BACKUPS`: Snapshots kept (default 30)
// - `COREFILE_MAX_BACKUP_SIZE_BYTES`: Largest Corefile that is snapshotted (default 5 MiB)
// - `COREFILE_AUTO_RELOAD`: Reload after generate (default true)
//
// ### Records & forwarding
// - `COREFILE_RECORDS_PATH`: JSON array of records (empty record set if unset)
// - `UPSTREAM_PRIMARY_DNS`: Primary forwarder (default 8.8.8.8)
// - `UPSTREAM_SECONDARY_DNS`: Secondary forwarder (default 8.8.4.4, empty for none)
//
// ### Reload
// - `COREDNS_RELOAD_METHOD`: docker or process (default docker)
// - `COREDNS_CONTAINER_NAME`: Container to signal (default coredns)
// - `COREDNS_DOCKER_BIN`: Docker CLI (default docker)
// - `COREDNS_PROCESS_PATTERN`: Command line pattern (default coredns)
// - `COREDNS_RELOAD_TIMEOUT_SECS`: Bound on each reload command (default 5)
//
// ### Logging
// - `COREFILE_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export COREFILE_PATH=/etc/coredns/Corefile
// export COREFILE_BACKUP_DIR=/var/lib/corefile/backups
// export COREFILE_RECORDS_PATH=/etc/coredns/records.json
// export COREDNS_RELOAD_METHOD=process
//
// corefiled generate
// corefiled backup list --page-size 5
// corefiled backup restore 20250109_120000_000001 --reload
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corefile_core::config::{ManagerConfig, ReloadConfig, RetentionPolicy};
use corefile_core::source::{JsonFileRecordSource, MemoryRecordSource, SettingsUpstreamSource};
use corefile_core::traits::RecordSource;
use corefile_core::{CorefileManager, ErrorKind, reload};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different outcomes
///
/// - 0: Operation succeeded
/// - 1: Configuration or startup error
/// - 2: Runtime error (write failure, reload backend failure)
/// - 3: Operation refused (not found, invalid input, protected, capacity)
#[derive(Debug, Clone, Copy)]
enum CorefileExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    Refused = 3,
}

impl From<CorefileExitCode> for ExitCode {
    fn from(code: CorefileExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<ErrorKind> for CorefileExitCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound
            | ErrorKind::Validation
            | ErrorKind::ResourceExhausted
            | ErrorKind::ProtectedOperation => CorefileExitCode::Refused,
            ErrorKind::ExternalService | ErrorKind::Fatal => CorefileExitCode::RuntimeError,
        }
    }
}

#[derive(Parser)]
#[command(name = "corefiled")]
#[command(about = "Render, back up and reload a CoreDNS Corefile", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the active records and write the Corefile
    Generate {
        /// Write here instead of COREFILE_PATH
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not reload CoreDNS afterwards
        #[arg(long)]
        no_reload: bool,
    },
    /// Render without writing anything
    Preview,
    /// Manage Corefile snapshots
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Check the Corefile and reload CoreDNS
    Reload,
    /// Report whether CoreDNS is running
    Status,
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Snapshot the current Corefile
    Create,
    /// List snapshots, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Show one snapshot including its content
    Show { id: String },
    /// Restore a snapshot over the Corefile
    Restore {
        id: String,
        /// Reload CoreDNS after restoring
        #[arg(long)]
        reload: bool,
    },
    /// Delete a snapshot
    Delete { id: String },
}

/// Application configuration
struct Config {
    manager: ManagerConfig,
    records_path: Option<PathBuf>,
    upstream_primary: Option<String>,
    upstream_secondary: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let defaults = ManagerConfig::default();

        let retention = RetentionPolicy::new(
            parse_env("COREFILE_MAX_BACKUPS")?.unwrap_or(defaults.retention.max_backups),
            parse_env("COREFILE_MAX_BACKUP_SIZE_BYTES")?
                .unwrap_or(defaults.retention.max_backup_size_bytes),
        );

        let reload = match env::var("COREDNS_RELOAD_METHOD")
            .unwrap_or_else(|_| "docker".to_string())
            .to_lowercase()
            .as_str()
        {
            "docker" => ReloadConfig::Docker {
                container_name: env::var("COREDNS_CONTAINER_NAME")
                    .unwrap_or_else(|_| "coredns".to_string()),
                docker_bin: env::var("COREDNS_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string()),
            },
            "process" => ReloadConfig::Process {
                pattern: env::var("COREDNS_PROCESS_PATTERN")
                    .unwrap_or_else(|_| "coredns".to_string()),
            },
            other => anyhow::bail!(
                "COREDNS_RELOAD_METHOD '{}' is not supported. \
                Supported methods: docker, process",
                other
            ),
        };

        let auto_reload = match env::var("COREFILE_AUTO_RELOAD").ok() {
            None => defaults.auto_reload_on_generate,
            Some(raw) => parse_bool(&raw).with_context(|| {
                format!("COREFILE_AUTO_RELOAD must be true or false. Got: {raw}")
            })?,
        };

        let mut manager = defaults
            .clone()
            .with_paths(
                env::var("COREFILE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.corefile_path.clone()),
                env::var("COREFILE_BACKUP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.backup_dir.clone()),
            )
            .with_reload(reload);
        manager.retention = retention;
        manager.auto_reload_on_generate = auto_reload;
        manager.reload_timeout_secs =
            parse_env("COREDNS_RELOAD_TIMEOUT_SECS")?.unwrap_or(defaults.reload_timeout_secs);

        Ok(Self {
            manager,
            records_path: env::var("COREFILE_RECORDS_PATH").ok().map(PathBuf::from),
            upstream_primary: env::var("UPSTREAM_PRIMARY_DNS").ok(),
            upstream_secondary: env::var("UPSTREAM_SECONDARY_DNS").ok(),
            log_level: env::var("COREFILE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.manager
            .validate()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        if self
            .records_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            anyhow::bail!("COREFILE_RECORDS_PATH cannot be empty when set");
        }

        if let Some(parent) = self.manager.backup_dir.parent()
            && !parent.as_os_str().is_empty()
            && parent.is_file()
        {
            anyhow::bail!(
                "COREFILE_BACKUP_DIR parent is a file, not a directory: {}",
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "COREFILE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Parse an optional numeric environment variable
fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a number. Got: {raw}")),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CorefileExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return CorefileExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CorefileExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CorefileExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(cli.command, config).await {
            Ok(code) => code,
            Err(e) => {
                error!("corefiled error: {:#}", e);
                CorefileExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the manager and run one command
async fn run(command: Commands, config: Config) -> Result<CorefileExitCode> {
    let records: Box<dyn RecordSource> = match &config.records_path {
        Some(path) => {
            info!(path = %path.display(), "Reading records from file");
            Box::new(JsonFileRecordSource::new(path))
        }
        None => {
            warn!("COREFILE_RECORDS_PATH not set, rendering an empty record set");
            Box::new(MemoryRecordSource::new())
        }
    };

    let upstream = upstream_settings(&config).await;

    let reloader = reload::from_config(&config.manager.reload, config.manager.reload_timeout());
    info!(
        method = config.manager.reload.type_name(),
        target = reloader.target(),
        corefile = %config.manager.corefile_path.display(),
        "Reload backend selected"
    );

    let auto_reload = config.manager.auto_reload_on_generate;
    let (manager, mut events) =
        CorefileManager::new(records, Box::new(upstream), reloader, config.manager)
            .context("Failed to build Corefile manager")?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Lifecycle event");
        }
    });

    match execute(&manager, command, auto_reload).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(CorefileExitCode::Success)
        }
        Err(e) => {
            let kind = e.kind();
            error!(kind = ?kind, "{e}");
            let body = json!({
                "error": kind,
                "status": kind.http_status(),
                "message": e.public_message(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(kind.into())
        }
    }
}

/// Forwarding settings; unset variables keep the defaults
async fn upstream_settings(config: &Config) -> SettingsUpstreamSource {
    let upstream = SettingsUpstreamSource::new(config.manager.upstream.clone());
    if let Some(primary) = &config.upstream_primary {
        upstream.set_primary(Some(primary.clone())).await;
    }
    if let Some(secondary) = &config.upstream_secondary {
        upstream.set_secondary(Some(secondary.clone())).await;
    }
    upstream
}

async fn execute(
    manager: &CorefileManager,
    command: Commands,
    auto_reload: bool,
) -> corefile_core::Result<serde_json::Value> {
    let value = match command {
        Commands::Generate { output, no_reload } => {
            let target = output.unwrap_or_else(|| manager.corefile_path().to_path_buf());
            let outcome = manager
                .generate(Some(&target), auto_reload && !no_reload)
                .await?;
            serde_json::to_value(outcome)?
        }
        Commands::Preview => serde_json::to_value(manager.preview().await?)?,
        Commands::Backup { command } => match command {
            BackupCommands::Create => serde_json::to_value(manager.create_backup().await?)?,
            BackupCommands::List { page, page_size } => {
                serde_json::to_value(manager.list_backups(page, page_size).await?)?
            }
            BackupCommands::Show { id } => serde_json::to_value(manager.get_backup(&id).await?)?,
            BackupCommands::Restore { id, reload } => {
                let outcome = manager.restore_backup(&id).await?;
                let mut value = serde_json::to_value(outcome)?;
                if reload {
                    match manager.reload_now().await {
                        Ok(result) => value["reload_result"] = serde_json::to_value(result)?,
                        Err(e) => value["reload_error"] = json!(e.public_message()),
                    }
                }
                value
            }
            BackupCommands::Delete { id } => {
                manager.delete_backup(&id).await?;
                json!({ "deleted": id })
            }
        },
        Commands::Reload => serde_json::to_value(manager.reload_now().await?)?,
        Commands::Status => serde_json::to_value(manager.status().await)?,
    };
    Ok(value)
}
