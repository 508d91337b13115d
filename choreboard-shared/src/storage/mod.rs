/// On-device key-value storage
///
/// The client keeps two things on the device: the persisted auth session and
/// the list of locally archived chore IDs. Both go through the
/// [`KeyValueStore`] trait so the platform store (keychain, browser storage,
/// a file) stays swappable.
///
/// # Implementations
///
/// - [`MemoryStore`]: process-local map, used in tests
/// - [`FileStore`]: one JSON document on disk
///
/// # Example
///
/// ```
/// use choreboard_shared::storage::{KeyValueStore, MemoryStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.set_item("@archived_chores", "[]").await?;
/// assert_eq!(store.get_item("@archived_chores").await?.as_deref(), Some("[]"));
/// # Ok(())
/// # }
/// ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded
    #[error("Corrupt storage data: {0}")]
    Corrupt(String),

    /// The store refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Async string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores a value, replacing any previous one
    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes a key; removing an absent key is not an error
    async fn remove_item(&self, key: &str) -> StorageResult<()>;
}
