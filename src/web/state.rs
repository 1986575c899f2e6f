//! # Shared Application State
//!
//! ```text
//! AppState (cloned into every handler)
//!   ├── orchestrator   Arc<Orchestrator>  turn engine, runs in spawn_blocking
//!   ├── store          Arc<MemoryStore>   same store the orchestrator writes to
//!   └── snapshots      Arc<Snapshotter>   serialises writes of the data file
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::MemoryStore;
use crate::orchestrator::Orchestrator;
use crate::persistence;

/// Writes store snapshots one at a time.
pub struct Snapshotter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Snapshotter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Saves `store`, logging failures. Blocking.
    pub fn save(&self, store: &MemoryStore) {
        let _guard = self.lock.lock();
        if let Err(e) = persistence::save_store(store, &self.path) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to save store snapshot");
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<MemoryStore>,
    pub snapshots: Arc<Snapshotter>,
}
