pub mod archive;
pub mod file;

pub use archive::{ResultArchive, EXAM_RESULTS_KEY, RECENT_ACTIVITIES_KEY, RECENT_ACTIVITY_LIMIT};
pub use file::{JsonFileStore, MemoryStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Flat string key-value storage, the shape of a browser's local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: String) -> Result<()>;
}
