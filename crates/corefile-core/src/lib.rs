// # corefile-core
//
// Core library for managing the lifecycle of a CoreDNS Corefile.
//
// ## Architecture Overview
//
// This library provides everything between "the record set changed" and
// "CoreDNS is serving the new records":
// - **render**: Pure renderer from active records to Corefile text
// - **backup**: Bounded, chronologically ordered snapshot archive
// - **reload**: Docker and bare-process reload backends behind one trait
// - **CorefileManager**: Coordinates render → backup → write → reload
//
// The record store, the settings store and the HTTP surface live outside
// this crate. They are reached through the traits in `traits`; `source`
// holds the implementations used by tests and by `corefiled`.
//
// ## Failure Policy
//
// 1. Only an unwritable Corefile fails a generate outright
// 2. A refused pre-write backup is reported as a warning
// 3. A failed reload is reported as a field of the result
// 4. Restores always snapshot the file they replace

pub mod backup;
pub mod config;
pub mod error;
pub mod manager;
pub mod reload;
pub mod render;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use backup::{BackupStore, RestoreOutcome, Snapshot, SnapshotPage};
pub use config::{ManagerConfig, ReloadConfig, RetentionPolicy, UpstreamDefaults};
pub use error::{Error, ErrorKind, Result};
pub use manager::{CorefileManager, GenerateOutcome, LifecycleEvent, Preview};
pub use render::{RenderStats, Rendered, render};
pub use traits::{RecordSource, Reloader, UpstreamSource};
