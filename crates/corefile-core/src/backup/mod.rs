// # Backup Store
//
// Filesystem-backed, chronologically ordered archive of prior Corefile
// contents for one Corefile path.
//
// - `snapshot`: snapshot metadata and id encoding
// - `store`: create/list/get/restore/delete with retention and admission
// - `atomic`: temp-then-rename writes shared with the lifecycle manager
// - `space`: free-space probe for admission control

pub mod atomic;
pub mod snapshot;
pub mod space;
pub mod store;

pub use atomic::write_atomic;
pub use snapshot::{BACKUP_PREFIX, BackupReason, RestoreOutcome, Snapshot, SnapshotPage};
pub use store::BackupStore;
