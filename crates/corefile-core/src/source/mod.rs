// # Collaborator Implementations
//
// Concrete record and settings sources for the lifecycle manager.
//
// - `memory`: mutable in-memory record store (tests, embedding)
// - `file`: JSON record file (used by `corefiled`)
// - `settings`: upstream forwarders with configured fallbacks

pub mod file;
pub mod memory;
pub mod settings;

pub use file::JsonFileRecordSource;
pub use memory::MemoryRecordSource;
pub use settings::{SettingsUpstreamSource, StaticUpstream};
