// # Record Source Trait
//
// Read-only access to the DNS record store.
//
// The record store owns CRUD, validation and querying. The lifecycle
// manager only ever asks it for the records that are currently active, and
// renders them in the order the store returns them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a record in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Rendered into the Corefile
    Active,
    /// Kept in the store but not served
    Inactive,
    /// Soft-deleted
    Deleted,
}

/// DNS record type
///
/// The store accepts any type name; the well-known ones get their own
/// variant. Names are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordKind {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
    /// Any other type, upper-cased
    Other(String),
}

impl From<String> for RecordKind {
    fn from(name: String) -> Self {
        let name = name.trim().to_ascii_uppercase();
        match name.as_str() {
            "A" => RecordKind::A,
            "AAAA" => RecordKind::Aaaa,
            "CNAME" => RecordKind::Cname,
            _ => RecordKind::Other(name),
        }
    }
}

impl From<RecordKind> for String {
    fn from(kind: RecordKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Cname => "CNAME",
            RecordKind::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// A DNS record as held by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Domain suffix, e.g. `example.com`
    pub zone: String,
    /// Label within the zone, e.g. `www`; `@` is the zone apex
    pub hostname: String,
    /// Target address
    pub address: String,
    /// Record type
    #[serde(default = "default_kind")]
    pub kind: RecordKind,
    /// Lifecycle status
    #[serde(default = "default_status")]
    pub status: RecordStatus,
}

impl DnsRecord {
    /// Create an active `A` record
    pub fn new(
        zone: impl Into<String>,
        hostname: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            zone: zone.into(),
            hostname: hostname.into(),
            address: address.into(),
            kind: RecordKind::A,
            status: RecordStatus::Active,
        }
    }

    /// Set the record type
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the lifecycle status
    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this record belongs in the Corefile
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Fully qualified name, hostname joined with zone
    pub fn fqdn(&self) -> String {
        let host = self.hostname.trim();
        if host.is_empty() || host == "@" {
            self.zone.clone()
        } else {
            format!("{}.{}", host, self.zone)
        }
    }
}

fn default_kind() -> RecordKind {
    RecordKind::A
}

fn default_status() -> RecordStatus {
    RecordStatus::Active
}

/// Trait for record store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All records whose status is `active`, in store order
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: Active records only
    /// - `Err(Error)`: Store unavailable
    async fn active_records(&self) -> Result<Vec<DnsRecord>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_joins_hostname_and_zone() {
        assert_eq!(DnsRecord::new("example.com", "www", "10.0.0.1").fqdn(), "www.example.com");
        assert_eq!(DnsRecord::new("example.com", "@", "10.0.0.1").fqdn(), "example.com");
    }

    #[test]
    fn record_deserializes_with_defaults() {
        let json = r#"{"zone": "example.com", "hostname": "db", "address": "fd00::1", "kind": "AAAA"}"#;
        let record: DnsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, RecordKind::Aaaa);
        assert!(record.is_active());
    }

    #[test]
    fn unknown_record_types_are_kept() {
        let json = r#"{"zone": "example.com", "hostname": "@", "address": "mail.example.com", "kind": "mx"}"#;
        let record: DnsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, RecordKind::Other("MX".to_string()));
        assert_eq!(serde_json::to_value(&record).unwrap()["kind"], "MX");
    }
}
