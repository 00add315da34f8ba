//! Compatibility projection of the servers collection and its persistence.
//!
//! # Design
//! - The mirror observes the servers [`EntityStore`](crate::store::EntityStore)
//!   and re-derives `{name, description, isActive, id}` for every snapshot.
//! - The persisted snapshot is read once when the mirror opens, normalised,
//!   and rewritten after every store change.
//! - Unknown legacy fields of a record survive re-derivation when the server
//!   is matched by id or name.
//! - Persistence failures are logged; they never fail a store operation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mcpdeck_models::{CompatServer, ToolServer};
use tracing::{info, warn};

use crate::normalize::{self, PersistedServers};
use crate::persistence::KeyValueStore;
use crate::store::SnapshotObserver;

/// Persisted compatibility view of the servers collection.
pub struct CompatibilityMirror {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    servers: Mutex<Arc<[CompatServer]>>,
}

impl CompatibilityMirror {
    /// Load and normalise the persisted snapshot stored under `key`.
    #[must_use]
    pub fn open(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let raw = match storage.read(&key) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(key = %key, error = %error, "persisted snapshot unreadable; starting empty");
                None
            }
        };
        let persisted: PersistedServers = normalize::migrate(raw.as_ref());
        let mirror = Self {
            storage,
            key,
            servers: Mutex::new(Arc::from(persisted.servers.clone())),
        };
        if raw.is_some() && persisted.migrated() {
            mirror.persist(&persisted.servers);
        }
        info!(
            key = %mirror.key,
            servers = persisted.servers.len(),
            "compatibility snapshot loaded"
        );
        mirror
    }

    /// Every projected server, in collection order.
    #[must_use]
    pub fn servers(&self) -> Arc<[CompatServer]> {
        Arc::clone(&self.lock())
    }

    /// Projected servers whose backing record is ENABLED.
    #[must_use]
    pub fn active(&self) -> Vec<CompatServer> {
        self.lock()
            .iter()
            .filter(|server| server.is_active)
            .cloned()
            .collect()
    }

    fn persist(&self, servers: &[CompatServer]) {
        if let Err(error) = self.storage.write(&self.key, &normalize::envelope(servers)) {
            warn!(key = %self.key, error = %error, "failed to persist compatibility snapshot");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<[CompatServer]>> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotObserver<ToolServer> for CompatibilityMirror {
    fn snapshot_changed(&self, rows: &[ToolServer]) {
        let mut current = self.lock();
        let projected: Vec<CompatServer> = rows
            .iter()
            .map(|server| {
                let mut compat = CompatServer::from(server);
                let previous = current
                    .iter()
                    .find(|old| old.id.as_ref() == Some(&server.id))
                    .or_else(|| current.iter().find(|old| old.name == server.name));
                if let Some(previous) = previous {
                    compat.extra.clone_from(&previous.extra);
                }
                compat
            })
            .collect();
        self.persist(&projected);
        *current = Arc::from(projected);
    }
}
