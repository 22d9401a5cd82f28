//! Storage backends for FAQ collections
//!
//! Stores implement the `NodeStore` trait. `SqliteStore` is the persistent
//! backend used by the CLI; `JsonFileStore` keeps a portable file next to the
//! source data. The bot's `faq.json` layout is read by the importer.

mod json;
mod sqlite;
mod traits;

pub use json::{import_faq_file, import_faq_value, ImportStats, JsonFileStore};
pub use sqlite::SqliteStore;
pub use traits::{NodeStore, OpenStore, StorageError, StorageResult};
