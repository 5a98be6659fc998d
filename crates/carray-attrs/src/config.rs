use serde::{Deserialize, Serialize};

/// Flush strategy for metadata writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// `fsync` the temp file before it is renamed over the metadata file.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Configuration for [`JsonFilePersister`](crate::JsonFilePersister).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Sync/flush strategy.
    pub sync_mode: SyncMode,
    /// Pretty-print the JSON document.
    pub pretty: bool,
}

impl PersistConfig {
    /// Skip fsync. Meant for scratch containers and tests.
    pub fn fast() -> Self {
        Self {
            sync_mode: SyncMode::OsDefault,
            ..Default::default()
        }
    }
}
