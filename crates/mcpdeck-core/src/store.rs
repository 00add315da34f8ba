//! In-memory collection snapshots with selection tracking.
//!
//! # Design
//! - The snapshot is an immutable `Arc<[E]>`; every change swaps in a new one
//!   so readers never observe a partially applied mutation.
//! - Operations are total: a missing or duplicate id leaves the snapshot
//!   unchanged and logs an inconsistency instead of failing.
//! - [`EntityStore::begin`] captures the prior snapshot and applies the
//!   optimistic one under a single lock acquisition.
//! - An optional [`SnapshotObserver`] sees every new snapshot; the servers
//!   collection uses it to derive and persist its compatibility projection.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mcpdeck_models::EntityId;
use tracing::{debug, warn};

use crate::entity::Entity;

/// Ordered, duplicate-free sequence of entities.
pub type Snapshot<E> = Arc<[E]>;

/// Ids selected for batch operations.
pub type SelectionSet = HashSet<EntityId>;

/// Receives every snapshot the store publishes.
pub trait SnapshotObserver<E>: Send + Sync {
    /// Called after the snapshot changed, while the store lock is held.
    fn snapshot_changed(&self, rows: &[E]);
}

/// Prior and optimistic snapshots of one in-flight mutation.
#[derive(Debug)]
pub struct PendingMutation<E> {
    prior: Snapshot<E>,
    optimistic: Snapshot<E>,
}

impl<E> PendingMutation<E> {
    /// Snapshot captured before the optimistic change.
    #[must_use]
    pub const fn prior(&self) -> &Snapshot<E> {
        &self.prior
    }

    /// Snapshot published as the assumed end state.
    #[must_use]
    pub const fn optimistic(&self) -> &Snapshot<E> {
        &self.optimistic
    }
}

struct StoreState<E> {
    rows: Snapshot<E>,
    selected: SelectionSet,
}

/// Process-wide store for one collection.
pub struct EntityStore<E: Entity> {
    state: Mutex<StoreState<E>>,
    observer: Option<Arc<dyn SnapshotObserver<E>>>,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> {
    /// Empty store without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                rows: Arc::from(Vec::new()),
                selected: SelectionSet::new(),
            }),
            observer: None,
        }
    }

    /// Empty store publishing every snapshot to `observer`.
    #[must_use]
    pub fn with_observer(observer: Arc<dyn SnapshotObserver<E>>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::new()
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn read(&self) -> Snapshot<E> {
        Arc::clone(&self.lock().rows)
    }

    /// Entity with the given id, if present.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<E> {
        self.lock().rows.iter().find(|row| row.id() == id).cloned()
    }

    /// Replace the whole snapshot, dropping duplicate ids and stale selections.
    pub fn replace(&self, rows: impl Into<Vec<E>>) {
        let mut state = self.lock();
        self.publish(&mut state, dedup(rows.into()));
    }

    /// Append an entity; a duplicate id is an inconsistency.
    pub fn apply_create(&self, entity: E) -> bool {
        let mut state = self.lock();
        if state.rows.iter().any(|row| row.id() == entity.id()) {
            inconsistency::<E>("create", entity.id());
            return false;
        }
        let mut rows = state.rows.to_vec();
        rows.push(entity);
        self.publish(&mut state, rows);
        drop(state);
        true
    }

    /// Replace the entity sharing `entity`'s id.
    pub fn apply_update(&self, entity: E) -> bool {
        let mut state = self.lock();
        let Some(index) = state.rows.iter().position(|row| row.id() == entity.id()) else {
            inconsistency::<E>("update", entity.id());
            return false;
        };
        let mut rows = state.rows.to_vec();
        rows[index] = entity;
        self.publish(&mut state, rows);
        drop(state);
        true
    }

    /// Remove the entity with the given id.
    pub fn apply_delete(&self, id: &EntityId) -> bool {
        let mut state = self.lock();
        if !state.rows.iter().any(|row| row.id() == id) {
            inconsistency::<E>("delete", id);
            return false;
        }
        let rows = state.rows.iter().filter(|row| row.id() != id).cloned().collect();
        self.publish(&mut state, rows);
        drop(state);
        true
    }

    /// Remove every listed id; unknown ids are reported and skipped.
    pub fn apply_batch_delete(&self, ids: &[EntityId]) -> usize {
        let mut state = self.lock();
        let (rows, removed) = without_ids(&state.rows, ids);
        if removed == 0 {
            return 0;
        }
        self.publish(&mut state, rows);
        drop(state);
        removed
    }

    /// Capture the current snapshot and publish `optimistic(current)` atomically.
    pub fn begin(&self, optimistic: impl FnOnce(&[E]) -> Vec<E>) -> PendingMutation<E> {
        let mut state = self.lock();
        let prior = Arc::clone(&state.rows);
        self.publish(&mut state, dedup(optimistic(&prior)));
        PendingMutation {
            prior,
            optimistic: Arc::clone(&state.rows),
        }
    }

    /// Restore the snapshot captured by `pending`.
    pub fn rollback(&self, pending: PendingMutation<E>) {
        let mut state = self.lock();
        warn!(
            collection = E::COLLECTION,
            rows = pending.prior.len(),
            "rolling back optimistic mutation"
        );
        state.rows = pending.prior;
        let present: HashSet<EntityId> = state.rows.iter().map(|row| row.id().clone()).collect();
        state.selected.retain(|id| present.contains(id));
        self.notify(&state.rows);
    }

    /// Add an id to the selection if it is listed.
    pub fn select(&self, id: &EntityId) -> bool {
        let mut state = self.lock();
        if !state.rows.iter().any(|row| row.id() == id) {
            inconsistency::<E>("select", id);
            return false;
        }
        state.selected.insert(id.clone());
        drop(state);
        true
    }

    /// Remove an id from the selection.
    pub fn deselect(&self, id: &EntityId) {
        self.lock().selected.remove(id);
    }

    /// Replace the selection with the listed ids that are present.
    pub fn set_selection(&self, ids: &[EntityId]) {
        let mut state = self.lock();
        let present: HashSet<&EntityId> = state.rows.iter().map(Entity::id).collect();
        let selected: SelectionSet = ids
            .iter()
            .filter(|id| present.contains(id))
            .cloned()
            .collect();
        state.selected = selected;
    }

    /// Selected ids in snapshot order.
    #[must_use]
    pub fn selection(&self) -> Vec<EntityId> {
        let state = self.lock();
        state
            .rows
            .iter()
            .map(Entity::id)
            .filter(|id| state.selected.contains(*id))
            .cloned()
            .collect()
    }

    /// Drop every selected id.
    pub fn clear_selection(&self) {
        self.lock().selected.clear();
    }

    fn publish(&self, state: &mut StoreState<E>, rows: Vec<E>) {
        state.rows = Arc::from(rows);
        let present: HashSet<&EntityId> = state.rows.iter().map(Entity::id).collect();
        state.selected.retain(|id| present.contains(id));
        debug!(
            collection = E::COLLECTION,
            rows = state.rows.len(),
            "snapshot published"
        );
        self.notify(&state.rows);
    }

    fn notify(&self, rows: &[E]) {
        if let Some(observer) = &self.observer {
            observer.snapshot_changed(rows);
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Copy of `rows` without the listed ids, plus how many were removed.
pub(crate) fn without_ids<E: Entity>(rows: &[E], ids: &[EntityId]) -> (Vec<E>, usize) {
    for id in ids {
        if !rows.iter().any(|row| row.id() == id) {
            inconsistency::<E>("batch-delete", id);
        }
    }
    let kept: Vec<E> = rows
        .iter()
        .filter(|row| !ids.contains(row.id()))
        .cloned()
        .collect();
    let removed = rows.len() - kept.len();
    (kept, removed)
}

pub(crate) fn inconsistency<E: Entity>(operation: &'static str, id: &EntityId) {
    warn!(
        collection = E::COLLECTION,
        operation,
        id = %id,
        "id not present in snapshot; leaving it unchanged"
    );
}

fn dedup<E: Entity>(rows: Vec<E>) -> Vec<E> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut unique = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.id().clone()) {
            unique.push(row);
        } else {
            warn!(
                collection = E::COLLECTION,
                id = %row.id(),
                "dropping duplicate id from snapshot"
            );
        }
    }
    unique
}
