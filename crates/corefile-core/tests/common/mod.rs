//! Test doubles and fixtures for lifecycle contract tests
//!
//! The reload backend is always mocked here; the real Docker and process
//! backends are exercised by their own unit tests.

#![allow(dead_code)]

use async_trait::async_trait;
use corefile_core::error::{Error, Result};
use corefile_core::source::{MemoryRecordSource, StaticUpstream};
use corefile_core::traits::{
    DnsRecord, RecordSource, ReloadMethod, ReloadResult, ReloadStatus, Reloader, Upstream,
};
use corefile_core::{CorefileManager, LifecycleEvent, ManagerConfig, RetentionPolicy};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// What the mock reloader does when asked to reload
#[derive(Debug, Clone)]
pub enum ReloadScript {
    Succeed,
    NotFound,
    NotRunning,
    Fail(String),
}

/// A mock Reloader that tracks calls
///
/// Clones share the call counter and the script.
#[derive(Debug, Clone)]
pub struct MockReloader {
    reload_calls: Arc<AtomicUsize>,
    status_calls: Arc<AtomicUsize>,
    script: Arc<Mutex<ReloadScript>>,
}

impl MockReloader {
    pub fn new() -> Self {
        Self {
            reload_calls: Arc::new(AtomicUsize::new(0)),
            status_calls: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(ReloadScript::Succeed)),
        }
    }

    /// Change what the next reload does
    pub fn script(&self, script: ReloadScript) {
        *self.script.lock().unwrap() = script;
    }

    /// Get the number of times reload() was called
    pub fn reload_calls(&self) -> usize {
        self.reload_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times status() was called
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reloader for MockReloader {
    async fn reload(&self) -> Result<ReloadResult> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        match script {
            ReloadScript::Succeed => Ok(ReloadResult::success(ReloadMethod::Process, "4242")),
            ReloadScript::NotFound => Err(Error::ProcessNotFound("no process matching \"coredns\"".into())),
            ReloadScript::NotRunning => Err(Error::NotRunning("container coredns is exited".into())),
            ReloadScript::Fail(msg) => Err(Error::external(msg)),
        }
    }

    async fn status(&self) -> ReloadStatus {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let running = matches!(*self.script.lock().unwrap(), ReloadScript::Succeed);
        ReloadStatus {
            method: ReloadMethod::Process,
            running,
            detail: if running { "running" } else { "not_running" }.to_string(),
            instance: running.then(|| "4242".to_string()),
        }
    }

    fn method(&self) -> ReloadMethod {
        ReloadMethod::Process
    }

    fn target(&self) -> &str {
        "coredns"
    }
}

/// A record source that sleeps on every read and records how many reads
/// overlapped
#[derive(Debug, Clone)]
pub struct SlowRecordSource {
    inner: MemoryRecordSource,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowRecordSource {
    pub fn new(inner: MemoryRecordSource, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Highest number of concurrent reads observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for SlowRecordSource {
    async fn active_records(&self) -> Result<Vec<DnsRecord>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let records = self.inner.active_records().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        records
    }
}

/// Temporary Corefile location plus handles on the injected doubles
pub struct Fixture {
    pub dir: TempDir,
    pub records: MemoryRecordSource,
    pub reloader: MockReloader,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            records: MemoryRecordSource::new(),
            reloader: MockReloader::new(),
        }
    }

    pub fn corefile_path(&self) -> PathBuf {
        self.dir.path().join("coredns").join("Corefile")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.path().join("backups")
    }

    pub fn config(&self, max_backups: usize) -> ManagerConfig {
        let mut config = ManagerConfig::new().with_paths(self.corefile_path(), self.backup_dir());
        config.retention = RetentionPolicy::new(max_backups, 64 * 1024);
        config
    }

    /// Manager forwarding to 1.1.1.1 / 1.0.0.1 with unlimited disk space
    pub fn manager(&self) -> (CorefileManager, mpsc::Receiver<LifecycleEvent>) {
        self.manager_with(self.config(10), Box::new(self.records.clone()))
    }

    pub fn manager_with(
        &self,
        config: ManagerConfig,
        records: Box<dyn RecordSource>,
    ) -> (CorefileManager, mpsc::Receiver<LifecycleEvent>) {
        let upstream = StaticUpstream::new(Upstream::new("1.1.1.1", Some("1.0.0.1".to_string())));
        let (manager, rx) = CorefileManager::new(
            records,
            Box::new(upstream),
            Box::new(self.reloader.clone()),
            config,
        )
        .expect("manager construction succeeds");
        (manager.with_space_probe(|_| Some(u64::MAX)), rx)
    }

    pub fn write_corefile(&self, content: &str) {
        let path = self.corefile_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read_corefile(&self) -> String {
        std::fs::read_to_string(self.corefile_path()).unwrap()
    }
}

/// Everything currently queued on the event channel
pub fn drain(rx: &mut mpsc::Receiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Event names, for order assertions
pub fn kinds(events: &[LifecycleEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e {
            LifecycleEvent::Rendered { .. } => "rendered",
            LifecycleEvent::BackupCreated { .. } => "backup_created",
            LifecycleEvent::BackupSkipped { .. } => "backup_skipped",
            LifecycleEvent::Written { .. } => "written",
            LifecycleEvent::Restored { .. } => "restored",
            LifecycleEvent::BackupDeleted { .. } => "backup_deleted",
            LifecycleEvent::Reloaded { .. } => "reloaded",
            LifecycleEvent::ReloadFailed { .. } => "reload_failed",
        })
        .collect()
}
