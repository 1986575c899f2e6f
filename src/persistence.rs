//! # Persistence — Store Snapshots on Disk
//!
//! The whole [`StoreData`] (sessions, messages, leads, unanswered queries) is
//! serialised as pretty JSON, so the file can be inspected by hand.
//!
//! ## When Is It Written?
//!
//! After every answered chat turn. The snapshot is written to a sibling
//! `.tmp` file and renamed over the previous one, so a crash mid-write
//! leaves the last good snapshot in place.
//!
//! ## Loading
//!
//! A missing file starts an empty store. A corrupt one is logged and
//! replaced by an empty store on the next save. No turn survives a restart,
//! so every session's in-flight flag is cleared on load.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::{MemoryStore, StoreData};
use crate::services::InMemoryCatalog;

/// Writes a snapshot of `store` to `path`, creating parent directories.
pub fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = store.snapshot();
    let json = serde_json::to_string_pretty(&data).context("failed to serialise store")?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Loads the store snapshot at `path`, or an empty store.
pub fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no store snapshot found, starting empty");
        return Ok(MemoryStore::new());
    }
    let json = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    match serde_json::from_str::<StoreData>(&json) {
        Ok(mut data) => {
            let mut interrupted = 0;
            for session in data.sessions.values_mut().filter(|s| s.memory.is_processing) {
                session.memory.is_processing = false;
                interrupted += 1;
            }
            tracing::info!(
                path = %path.display(),
                sessions = data.sessions.len(),
                leads = data.leads.len(),
                interrupted,
                "store snapshot loaded"
            );
            Ok(MemoryStore::from_data(data))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store snapshot, starting empty");
            Ok(MemoryStore::new())
        }
    }
}

/// Loads the product/order export at `path`; missing file → empty catalog.
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "no catalog export found, product and order lookups will be empty");
        return Ok(InMemoryCatalog::default());
    }
    let json = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let catalog = InMemoryCatalog::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::info!(
        products = catalog.product_count(),
        orders = catalog.order_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{ChatStore, Sender};
    use crate::faq::FaqMatcher;
    use crate::orchestrator::{Orchestrator, OrchestratorSettings, TurnOutcome};
    use crate::services::SmtpNotifier;

    #[test]
    fn snapshot_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("assistant.json");

        let store = MemoryStore::new();
        let session = store.create_session().unwrap();
        store.append_message(session.id, Sender::User, "hi").unwrap();
        save_store(&store, &path).unwrap();

        let restored = load_store(&path).unwrap();
        assert!(restored.session(session.id).unwrap().is_some());
        assert_eq!(restored.messages(session.id).unwrap()[0].content, "hi");
        assert!(!path.with_extension("json.tmp").exists());

        // ids keep counting after a restart
        let next = restored.append_message(session.id, Sender::Bot, "hello").unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn turn_in_flight_at_snapshot_time_does_not_block_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assistant.json");

        let store = MemoryStore::new();
        let session = store.create_session().unwrap();
        assert!(store.try_begin_turn(session.id).unwrap());
        save_store(&store, &path).unwrap();

        let restored = Arc::new(load_store(&path).unwrap());
        assert!(!restored.session(session.id).unwrap().unwrap().memory.is_processing);

        let catalog = Arc::new(InMemoryCatalog::default());
        let orchestrator = Orchestrator::new(
            restored.clone(),
            FaqMatcher::new(0.6),
            catalog.clone(),
            catalog,
            Arc::new(SmtpNotifier::new(Default::default())),
            OrchestratorSettings::default(),
        );
        let id = session.id.to_string();
        match orchestrator.handle(Some(&id), "hi") {
            TurnOutcome::Answered(reply) => assert_eq!(reply.session_id, session.id),
            other => panic!("expected an answer, got {other:?}"),
        }
    }

    #[test]
    fn missing_snapshot_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = load_store(&dir.path().join("absent.json")).unwrap();
        assert!(store.snapshot().sessions.is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assistant.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_store(&path).unwrap().snapshot().leads.is_empty());
    }

    #[test]
    fn catalog_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        assert_eq!(load_catalog(&path).unwrap().product_count(), 0);

        std::fs::write(&path, r#"{"products": [{"id": 1, "name": "Body Wave Wig", "price": 85000, "stock": 2}]}"#)
            .unwrap();
        assert_eq!(load_catalog(&path).unwrap().product_count(), 1);

        std::fs::write(&path, "[]").unwrap();
        assert!(load_catalog(&path).is_err());
    }
}
