/// Locally archived chore IDs
///
/// Older deployments of the hosted schema have no `chores.archived` column,
/// so the archived state is also recorded on the device: a JSON array of
/// chore IDs under [`ARCHIVED_CHORES_KEY`]. Chore reads treat a chore as
/// archived when either the ledger or the remote flag says so.
///
/// Reads never fail; an unreadable or corrupt entry counts as an empty
/// ledger. Writes return their error so callers can decide whether it
/// matters (the chore service only logs it). Writes through clones of one
/// ledger are serialized, so concurrent archives on a device keep every ID.

use choreboard_shared::storage::{KeyValueStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage key of the ledger
pub const ARCHIVED_CHORES_KEY: &str = "@archived_chores";

#[derive(Clone)]
pub struct ArchiveLedger {
    store: Arc<dyn KeyValueStore>,

    /// Held across load-modify-save
    write_lock: Arc<Mutex<()>>,
}

impl ArchiveLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load(&self) -> StorageResult<Vec<Uuid>> {
        match self.store.get_item(ARCHIVED_CHORES_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::Corrupt(format!("{}: {}", ARCHIVED_CHORES_KEY, e))),
            None => Ok(Vec::new()),
        }
    }

    async fn load_or_empty(&self) -> Vec<Uuid> {
        match self.load().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Archived chore ledger unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    async fn save(&self, ids: &[Uuid]) -> StorageResult<()> {
        let raw = serde_json::to_string(ids).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        self.store.set_item(ARCHIVED_CHORES_KEY, &raw).await
    }

    /// All locally archived chore IDs
    pub async fn ids(&self) -> HashSet<Uuid> {
        self.load_or_empty().await.into_iter().collect()
    }

    pub async fn contains(&self, chore_id: Uuid) -> bool {
        self.load_or_empty().await.contains(&chore_id)
    }

    /// Records a chore as archived; recording it twice is a no-op
    pub async fn add(&self, chore_id: Uuid) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.load_or_empty().await;
        if ids.contains(&chore_id) {
            return Ok(());
        }
        ids.push(chore_id);
        self.save(&ids).await?;
        debug!(chore_id = %chore_id, total = ids.len(), "Recorded archived chore");
        Ok(())
    }

    pub async fn remove(&self, chore_id: Uuid) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.load_or_empty().await;
        ids.retain(|id| *id != chore_id);
        self.save(&ids).await
    }
}
