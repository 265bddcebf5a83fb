// # Memory Record Source
//
// In-memory implementation of RecordSource.
//
// Records keep their insertion order, which is the order they are rendered
// in. Status changes are made in place so a record keeps its position when
// it is deactivated and reactivated.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::traits::{DnsRecord, RecordSource, RecordStatus};
use crate::Error;

/// In-memory record store
///
/// Cloning shares the underlying records, so a test can keep a handle while
/// the manager owns another.
///
/// # Example
///
/// ```rust,no_run
/// use corefile_core::source::MemoryRecordSource;
/// use corefile_core::traits::{DnsRecord, RecordSource, RecordStatus};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordSource::new();
///     store.insert(DnsRecord::new("example.com", "www", "10.0.0.1")).await;
///     assert_eq!(store.active_records().await?.len(), 1);
///
///     store.set_status("example.com", "www", RecordStatus::Inactive).await;
///     assert!(store.active_records().await?.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    inner: Arc<RwLock<Vec<DnsRecord>>>,
}

impl MemoryRecordSource {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(records)),
        }
    }

    /// Append a record
    pub async fn insert(&self, record: DnsRecord) {
        self.inner.write().await.push(record);
    }

    /// Change the status of every record named `hostname` in `zone`
    ///
    /// Returns the number of records changed.
    pub async fn set_status(&self, zone: &str, hostname: &str, status: RecordStatus) -> usize {
        let mut records = self.inner.write().await;
        let mut changed = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.zone == zone && r.hostname == hostname)
        {
            record.status = status;
            changed += 1;
        }
        changed
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn active_records(&self) -> Result<Vec<DnsRecord>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .iter()
            .filter(|r| r.is_active())
            .cloned()
            .collect())
    }
}
