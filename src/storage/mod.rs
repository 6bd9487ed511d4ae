//! Storage Layer
//!
//! - `config` - config.json loading and validation
//! - `records` - record providers (JSON file, static rows)
//! - `snapshot` - the read-only in-memory SQLite snapshot

pub mod config;
pub mod records;
pub mod snapshot;

pub use config::ConfigService;
pub use records::{JsonFileProvider, RecordProvider, StaticProvider};
pub use snapshot::{RecordSnapshot, SnapshotOptions, SnapshotStats};
