//! Core traits for the Corefile manager
//!
//! This module defines the seams between the lifecycle manager and the
//! things it does not own.
//!
//! - [`RecordSource`]: Read-only view of the DNS record store
//! - [`UpstreamSource`]: Forwarding settings from the settings store
//! - [`Reloader`]: Signal a running CoreDNS instance to re-read its Corefile

pub mod record_source;
pub mod reloader;
pub mod upstream_source;

pub use record_source::{DnsRecord, RecordKind, RecordSource, RecordStatus};
pub use reloader::{ReloadMethod, ReloadOutcome, ReloadResult, ReloadStatus, Reloader};
pub use upstream_source::{Upstream, UpstreamSource};
