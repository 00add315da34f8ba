//! Collection controller: cached reads, optimistic writes and background jobs.
//!
//! # Design
//! - Reads go through the [`QueryCoordinator`]; a changed query schedules a
//!   forced refresh on a background task after the configured settle delay.
//! - Update, delete, batch delete and status changes publish their optimistic
//!   snapshot before the remote call and restore the prior one on failure.
//! - Creates are applied only once the backend returns the new entity, since
//!   ids are server-assigned.
//! - Same-id mutations are serialized by the caller; the controller does not
//!   queue them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mcpdeck_models::{EntityId, EntityStatus};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::entity::{Editable, Entity, Toggleable};
use crate::error::ValidationError;
use crate::job_gate::{JobGate, JobTicket};
use crate::mutation::{Failure, MutationOutcome, Operation};
use crate::query::{QueryCoordinator, Resolution, ViewQuery};
use crate::remote::RemoteCollection;
use crate::store::{self, EntityStore, PendingMutation, Snapshot};

/// Rows answering one list request plus pagination metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<E> {
    /// Rows of the page.
    pub rows: Snapshot<E>,
    /// Rows matching the query across all pages.
    pub total: u64,
    /// Page number, starting at 1.
    pub page: u32,
    /// Page size used for the request.
    pub page_size: u32,
}

impl<E> Page<E> {
    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size.max(1)))
    }
}

/// Answer to a list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome<E> {
    /// Served from the store snapshot without a network call.
    Cached(Page<E>),
    /// Fetched from the backend; the store now holds these rows.
    Fetched(Page<E>),
    /// The fetch failed; the unchanged snapshot is returned alongside the failure.
    Stale {
        /// Rows still held by the store.
        page: Page<E>,
        /// Why the fetch failed.
        failure: Failure,
    },
}

impl<E> LoadOutcome<E> {
    /// Rows to display, fresh or stale.
    #[must_use]
    pub const fn page(&self) -> &Page<E> {
        match self {
            Self::Cached(page) | Self::Fetched(page) | Self::Stale { page, .. } => page,
        }
    }

    /// Failure of a stale answer.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Stale { failure, .. } => Some(failure),
            Self::Cached(_) | Self::Fetched(_) => None,
        }
    }

    /// Whether the request was answered from the snapshot.
    #[must_use]
    pub const fn from_cache(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

struct SyncInner<E: Entity, R> {
    store: Arc<EntityStore<E>>,
    coordinator: QueryCoordinator,
    remote: R,
    settle_delay: Duration,
    scheduled: Mutex<Option<JoinHandle<LoadOutcome<E>>>>,
}

/// Synchronization controller for one collection.
pub struct CollectionSync<E: Entity, R> {
    inner: Arc<SyncInner<E, R>>,
}

impl<E: Entity, R> Clone for CollectionSync<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, R> CollectionSync<E, R>
where
    E: Editable + Toggleable,
    R: RemoteCollection<E> + 'static,
{
    /// Controller over `store`, talking to `remote`.
    #[must_use]
    pub fn new(store: Arc<EntityStore<E>>, remote: R, config: &SyncConfig) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                store,
                coordinator: QueryCoordinator::new(),
                remote,
                settle_delay: config.settle_delay,
                scheduled: Mutex::new(None),
            }),
        }
    }

    /// Store backing this collection.
    #[must_use]
    pub fn store(&self) -> &Arc<EntityStore<E>> {
        &self.inner.store
    }

    /// Answer a list request from the snapshot or the backend.
    pub async fn load(&self, query: &ViewQuery) -> LoadOutcome<E> {
        let plan = self
            .inner
            .coordinator
            .resolve(query, self.inner.store.read().is_empty());
        if let Some(next) = plan.scheduled_refresh {
            self.schedule_refresh(next);
        }
        self.inner.answer(query, plan.resolution).await
    }

    /// Wait for the pending scheduled refresh, if any, and return its answer.
    pub async fn settle(&self) -> Option<LoadOutcome<E>> {
        let handle = self.scheduled().take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                warn!(
                    collection = E::COLLECTION,
                    error = %error,
                    "scheduled refresh did not complete"
                );
                None
            }
        }
    }

    fn schedule_refresh(&self, query: ViewQuery) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(inner.settle_delay).await;
            let plan = inner
                .coordinator
                .resolve(&query, inner.store.read().is_empty());
            inner.answer(&query, plan.resolution).await
        });
        let previous = self.scheduled().replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Create an entity; it is appended once the backend returns it.
    pub async fn create(&self, draft: E::Draft) -> MutationOutcome<Option<E>> {
        if let Err(error) = E::validate_draft(&draft, true) {
            return rejected(Operation::Create, &error);
        }
        match self.inner.remote.create(&draft).await {
            Ok(envelope) if envelope.success => {
                envelope.data.as_ref().map_or_else(
                    || self.inner.coordinator.invalidate(),
                    |created| {
                        self.inner.store.apply_create(created.clone());
                    },
                );
                committed::<E, _>(Operation::Create, envelope.data, envelope.message)
            }
            Ok(envelope) => failed(
                Operation::Create,
                None,
                Failure::application(Operation::Create, envelope.message),
                &self.inner.store,
            ),
            Err(error) => failed(
                Operation::Create,
                None,
                Failure::transport(Operation::Create, &error),
                &self.inner.store,
            ),
        }
    }

    /// Update an entity optimistically, then adopt the server's canonical copy.
    pub async fn update(&self, id: &EntityId, draft: E::Draft) -> MutationOutcome<Option<E>> {
        if let Err(error) = E::validate_draft(&draft, false) {
            return rejected(Operation::Update, &error);
        }
        let pending = self
            .inner
            .store
            .begin(|rows| map_by_id(rows, id, "update", |row| row.apply_draft(&draft)));
        match self.inner.remote.update(id, &draft).await {
            Ok(envelope) if envelope.success => {
                let payload = envelope.data.map_or_else(
                    || pending.optimistic().iter().find(|row| row.id() == id).cloned(),
                    |authoritative| {
                        self.inner.store.apply_update(authoritative.clone());
                        Some(authoritative)
                    },
                );
                committed::<E, _>(Operation::Update, payload, envelope.message)
            }
            Ok(envelope) => failed(
                Operation::Update,
                Some(pending),
                Failure::application(Operation::Update, envelope.message),
                &self.inner.store,
            ),
            Err(error) => failed(
                Operation::Update,
                Some(pending),
                Failure::transport(Operation::Update, &error),
                &self.inner.store,
            ),
        }
    }

    /// Delete an entity optimistically.
    pub async fn delete(&self, id: &EntityId) -> MutationOutcome<EntityId> {
        let pending = self.inner.store.begin(|rows| {
            let (kept, _) = store::without_ids(rows, std::slice::from_ref(id));
            kept
        });
        match self.inner.remote.delete(id).await {
            Ok(envelope) if envelope.success => {
                committed::<E, _>(Operation::Delete, id.clone(), envelope.message)
            }
            Ok(envelope) => failed(
                Operation::Delete,
                Some(pending),
                Failure::application(Operation::Delete, envelope.message),
                &self.inner.store,
            ),
            Err(error) => failed(
                Operation::Delete,
                Some(pending),
                Failure::transport(Operation::Delete, &error),
                &self.inner.store,
            ),
        }
    }

    /// Delete the listed entities optimistically; the selection is cleared on success.
    pub async fn batch_delete(&self, ids: Vec<EntityId>) -> MutationOutcome<Vec<EntityId>> {
        if ids.is_empty() {
            return rejected(Operation::BatchDelete, &ValidationError::EmptySelection);
        }
        let pending = self.inner.store.begin(|rows| store::without_ids(rows, &ids).0);
        match self.inner.remote.batch_delete(&ids).await {
            Ok(envelope) if envelope.success => {
                self.inner.store.clear_selection();
                committed::<E, _>(Operation::BatchDelete, ids, envelope.message)
            }
            Ok(envelope) => failed(
                Operation::BatchDelete,
                Some(pending),
                Failure::application(Operation::BatchDelete, envelope.message),
                &self.inner.store,
            ),
            Err(error) => failed(
                Operation::BatchDelete,
                Some(pending),
                Failure::transport(Operation::BatchDelete, &error),
                &self.inner.store,
            ),
        }
    }

    /// Delete the current selection.
    pub async fn batch_delete_selected(&self) -> MutationOutcome<Vec<EntityId>> {
        let selected = self.inner.store.selection();
        self.batch_delete(selected).await
    }

    /// Flip an entity's status between ENABLED and DISABLED.
    pub async fn toggle_status(&self, id: &EntityId) -> MutationOutcome<EntityStatus> {
        let Some(current) = self.inner.store.get(id) else {
            store::inconsistency::<E>("status_toggle", id);
            return rejected(
                Operation::StatusToggle,
                &ValidationError::UnknownRecord { id: id.clone() },
            );
        };
        self.set_status(id, current.status().toggled()).await
    }

    /// Set an entity's status optimistically.
    pub async fn set_status(
        &self,
        id: &EntityId,
        status: EntityStatus,
    ) -> MutationOutcome<EntityStatus> {
        let pending = self.inner.store.begin(|rows| {
            map_by_id(rows, id, "status_toggle", |row| row.with_status(status))
        });
        match self.inner.remote.set_status(id, status).await {
            Ok(envelope) if envelope.success => {
                committed::<E, _>(Operation::StatusToggle, status, envelope.message)
            }
            Ok(envelope) => failed(
                Operation::StatusToggle,
                Some(pending),
                Failure::application(Operation::StatusToggle, envelope.message),
                &self.inner.store,
            ),
            Err(error) => failed(
                Operation::StatusToggle,
                Some(pending),
                Failure::transport(Operation::StatusToggle, &error),
                &self.inner.store,
            ),
        }
    }

    /// Check an entity's connectivity; never touches the store.
    ///
    /// # Errors
    ///
    /// Returns a displayable [`Failure`] when the check fails or is refused.
    pub async fn test(&self, id: &EntityId) -> Result<String, Failure> {
        match self.inner.remote.test(id).await {
            Ok(envelope) if envelope.success => Ok(envelope
                .message
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| Operation::Test.default_success().to_string())),
            Ok(envelope) => Err(Failure::application(Operation::Test, envelope.message)),
            Err(error) => Err(Failure::transport(Operation::Test, &error)),
        }
    }

    /// Start the collection's refresh job for `id` through `gate`.
    ///
    /// The job runs in the background; its failures are logged and the
    /// effect is observed by listing again later.
    pub fn refresh(&self, gate: &JobGate, id: &EntityId) -> JobTicket {
        let inner = Arc::clone(&self.inner);
        let target = id.clone();
        gate.trigger(id.clone(), async move {
            match inner.remote.refresh_job(&target).await {
                Ok(envelope) if envelope.success => {
                    debug!(collection = E::COLLECTION, id = %target, "refresh job finished");
                }
                Ok(envelope) => {
                    let failure = Failure::application(Operation::Refresh, envelope.message);
                    warn!(
                        collection = E::COLLECTION,
                        id = %target,
                        error = %failure,
                        "refresh job rejected"
                    );
                }
                Err(error) => {
                    let failure = Failure::transport(Operation::Refresh, &error);
                    warn!(
                        collection = E::COLLECTION,
                        id = %target,
                        error = %failure,
                        "refresh job failed"
                    );
                }
            }
        })
    }

    fn scheduled(&self) -> MutexGuard<'_, Option<JoinHandle<LoadOutcome<E>>>> {
        self.inner
            .scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E, R> SyncInner<E, R>
where
    E: Editable + Toggleable,
    R: RemoteCollection<E>,
{
    async fn answer(&self, query: &ViewQuery, resolution: Resolution) -> LoadOutcome<E> {
        match resolution {
            Resolution::Cache => {
                let rows = self.store.read();
                LoadOutcome::Cached(Page {
                    total: rows.len() as u64,
                    rows,
                    page: query.page(),
                    page_size: query.page_size(),
                })
            }
            Resolution::Network(request) => self.fetch(&request).await,
        }
    }

    async fn fetch(&self, query: &ViewQuery) -> LoadOutcome<E> {
        let failure = match self.remote.list(query).await {
            Ok(envelope) if envelope.success => {
                let page = envelope.page.unwrap_or_else(|| query.page());
                let page_size = envelope.size.unwrap_or_else(|| query.page_size());
                let reported_total = envelope.total;
                let rows = envelope.into_rows();
                let total = reported_total.max(rows.len() as u64);
                self.store.replace(rows);
                self.coordinator.record_success(query);
                debug!(collection = E::COLLECTION, total, "list fetched");
                return LoadOutcome::Fetched(Page {
                    rows: self.store.read(),
                    total,
                    page,
                    page_size,
                });
            }
            Ok(envelope) => Failure::application(Operation::List, envelope.message),
            Err(error) => Failure::transport(Operation::List, &error),
        };
        warn!(
            collection = E::COLLECTION,
            error = %failure,
            "list fetch failed; keeping stale rows"
        );
        let rows = self.store.read();
        LoadOutcome::Stale {
            page: Page {
                total: rows.len() as u64,
                rows,
                page: query.page(),
                page_size: query.page_size(),
            },
            failure,
        }
    }
}

/// Copy of `rows` with the entity `id` transformed by `change`.
pub(crate) fn map_by_id<E: Entity>(
    rows: &[E],
    id: &EntityId,
    operation: &'static str,
    change: impl Fn(&E) -> E,
) -> Vec<E> {
    if !rows.iter().any(|row| row.id() == id) {
        store::inconsistency::<E>(operation, id);
    }
    rows.iter()
        .map(|row| if row.id() == id { change(row) } else { row.clone() })
        .collect()
}

pub(crate) fn committed<E: Entity, T>(
    operation: Operation,
    payload: T,
    message: Option<String>,
) -> MutationOutcome<T> {
    debug!(collection = E::COLLECTION, operation = %operation, "mutation committed");
    MutationOutcome::committed(operation, payload, message)
}

pub(crate) fn failed<E: Entity, T>(
    operation: Operation,
    pending: Option<PendingMutation<E>>,
    failure: Failure,
    store: &Arc<EntityStore<E>>,
) -> MutationOutcome<T> {
    warn!(
        collection = E::COLLECTION,
        operation = %operation,
        error = %failure,
        "mutation failed"
    );
    if let Some(pending) = pending {
        store.rollback(pending);
    }
    MutationOutcome::RolledBack(failure)
}

pub(crate) fn rejected<T>(operation: Operation, error: &ValidationError) -> MutationOutcome<T> {
    debug!(operation = %operation, error = %error, "mutation rejected before any change");
    MutationOutcome::Rejected(Failure::validation(operation, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRemote, Scripted, server};
    use mcpdeck_models::{ToolKind, ToolServer, ToolServerDraft};

    type Harness = (
        CollectionSync<ToolServer, FakeRemote<ToolServer>>,
        FakeRemote<ToolServer>,
    );

    fn controller(rows: Vec<ToolServer>) -> Harness {
        let store = Arc::new(EntityStore::new());
        let remote = FakeRemote::new(rows).observing(Arc::clone(&store));
        let sync = CollectionSync::new(store, remote.clone(), &SyncConfig::default());
        (sync, remote)
    }

    fn id(value: i64) -> EntityId {
        EntityId::Number(value)
    }

    async fn primed(rows: Vec<ToolServer>) -> Harness {
        let (sync, remote) = controller(rows);
        let outcome = sync.load(&ViewQuery::new(10)).await;
        assert!(matches!(outcome, LoadOutcome::Fetched(_)));
        (sync, remote)
    }

    #[tokio::test]
    async fn cached_reads_skip_the_network() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        assert_eq!(remote.list_calls(), 1);

        let outcome = sync.load(&ViewQuery::new(10)).await;
        assert!(outcome.from_cache());
        assert_eq!(outcome.page().rows.len(), 1);
        assert_eq!(remote.list_calls(), 1);

        let filtered = ViewQuery::new(10).with_filter("type", "LOCAL");
        assert!(!sync.load(&filtered).await.from_cache());
        assert_eq!(remote.list_calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_stale_rows() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        remote.script(Scripted::Transport(crate::remote::RemoteError::status(502, None)));

        let outcome = sync.load(&ViewQuery::new(10).with_page(2)).await;
        let failure = outcome.failure().expect("fetch failed");
        assert_eq!(failure.message, "server error; try again later");
        assert_eq!(outcome.page().rows.len(), 1);
        assert_eq!(sync.store().read().len(), 1);
    }

    #[tokio::test]
    async fn keyword_change_runs_scheduled_refresh() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        let searched = ViewQuery::new(10).with_keyword("alpha");
        assert!(!sync.load(&searched).await.from_cache());

        let settled = sync.settle().await.expect("refresh scheduled");
        assert!(matches!(settled, LoadOutcome::Fetched(_)));
        assert_eq!(remote.list_calls(), 3);
        assert_eq!(
            remote.last_query().and_then(|query| query.keyword().map(str::to_string)),
            Some("alpha".to_string())
        );
        assert!(sync.settle().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_refresh_waits_for_settle_delay_and_latest_query_wins() {
        let store = Arc::new(EntityStore::new());
        let remote = FakeRemote::new(vec![server(1, EntityStatus::Enabled)]);
        let config = SyncConfig {
            settle_delay: Duration::from_millis(500),
            ..SyncConfig::default()
        };
        let sync = CollectionSync::new(store, remote.clone(), &config);
        assert!(matches!(sync.load(&ViewQuery::new(10)).await, LoadOutcome::Fetched(_)));

        sync.load(&ViewQuery::new(10).with_keyword("a")).await;
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(remote.list_calls(), 2);

        sync.load(&ViewQuery::new(10).with_keyword("b")).await;
        let settled = sync.settle().await.expect("refresh scheduled");
        assert!(matches!(settled, LoadOutcome::Fetched(_)));
        assert_eq!(remote.list_calls(), 4);
        assert_eq!(
            remote.last_query().and_then(|query| query.keyword().map(str::to_string)),
            Some("b".to_string())
        );
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back_to_prior_snapshot() {
        let (sync, remote) = primed(vec![
            server(1, EntityStatus::Enabled),
            server(2, EntityStatus::Disabled),
        ])
        .await;
        let prior = sync.store().read();
        remote.script(Scripted::Transport(crate::remote::RemoteError::network("connection reset")));

        let outcome = sync.toggle_status(&id(1)).await;
        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));

        let seen = remote.observed().pop().expect("snapshot during call");
        assert_eq!(seen[0].status, EntityStatus::Disabled);
        assert_eq!(seen[1].status, EntityStatus::Disabled);
        assert_eq!(sync.store().read(), prior);
    }

    #[tokio::test]
    async fn successful_toggle_keeps_optimistic_state() {
        let (sync, _remote) = primed(vec![
            server(1, EntityStatus::Enabled),
            server(2, EntityStatus::Disabled),
        ])
        .await;
        let outcome = sync.toggle_status(&id(2)).await;
        assert_eq!(outcome.into_result().map(|(status, _)| status), Ok(EntityStatus::Enabled));
        let rows = sync.store().read();
        assert_eq!(rows[0].status, EntityStatus::Enabled);
        assert_eq!(rows[1].status, EntityStatus::Enabled);
    }

    #[tokio::test]
    async fn toggle_of_unknown_id_is_rejected_without_a_call() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        let outcome = sync.toggle_status(&id(9)).await;
        assert!(matches!(outcome, MutationOutcome::Rejected(_)));
        assert_eq!(remote.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn batch_delete_commits_and_clears_selection() {
        let (sync, remote) = primed(vec![
            server(1, EntityStatus::Enabled),
            server(2, EntityStatus::Enabled),
            server(3, EntityStatus::Enabled),
        ])
        .await;
        sync.store().set_selection(&[id(1), id(2)]);

        let outcome = sync.batch_delete_selected().await;
        assert!(outcome.is_committed());
        let seen = remote.observed().pop().expect("snapshot during call");
        assert_eq!(seen.iter().map(|row| row.id.clone()).collect::<Vec<_>>(), vec![id(3)]);
        assert_eq!(sync.store().read().len(), 1);
        assert!(sync.store().selection().is_empty());
        assert_eq!(remote.rows().len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_validation_failure() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        let outcome = sync.batch_delete_selected().await;
        assert_eq!(
            outcome.failure().map(|failure| failure.message.as_str()),
            Some("select at least one record")
        );
        assert_eq!(remote.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn rejected_delete_restores_row_with_server_message() {
        let (sync, remote) = primed(vec![
            server(1, EntityStatus::Enabled),
            server(2, EntityStatus::Enabled),
        ])
        .await;
        let prior = sync.store().read();
        remote.script(Scripted::Reject(Some("server in use".into())));

        let outcome = sync.delete(&id(1)).await;
        assert_eq!(
            outcome.failure().map(|failure| failure.message.as_str()),
            Some("server in use")
        );
        assert_eq!(sync.store().read(), prior);
    }

    #[tokio::test]
    async fn update_adopts_authoritative_entity() {
        let (sync, remote) = primed(vec![
            server(1, EntityStatus::Enabled),
            server(2, EntityStatus::Enabled),
        ])
        .await;
        remote.canonicalize(|row: &ToolServer| ToolServer {
            name: row.name.trim().to_string(),
            ..row.clone()
        });
        let draft = ToolServerDraft {
            name: Some("  renamed  ".into()),
            ..ToolServerDraft::default()
        };
        let outcome = sync.update(&id(1), draft).await;
        let (payload, _) = outcome.into_result().expect("committed");
        assert_eq!(payload.map(|row| row.name), Some("renamed".to_string()));

        let optimistic = remote.observed().pop().expect("snapshot during call");
        assert_eq!(optimistic[0].name, "  renamed  ");
        let rows = sync.store().read();
        assert_eq!(rows[0].name, "renamed");
        assert_eq!(rows[1], server(2, EntityStatus::Enabled));
    }

    #[tokio::test]
    async fn invalid_config_json_is_rejected_before_any_change() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        let prior = sync.store().read();
        let draft = ToolServerDraft {
            config_json: Some("{broken".into()),
            ..ToolServerDraft::default()
        };
        let outcome = sync.update(&id(1), draft).await;
        assert!(matches!(outcome, MutationOutcome::Rejected(_)));
        assert_eq!(sync.store().read(), prior);
        assert_eq!(remote.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn create_appends_after_confirmation() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        let draft = ToolServerDraft {
            name: Some("search".into()),
            kind: Some(ToolKind::Remote),
            ..ToolServerDraft::default()
        };
        let outcome = sync.create(draft.clone()).await;
        assert!(outcome.is_committed());
        assert_eq!(remote.observed().pop().expect("snapshot during call").len(), 1);
        assert_eq!(sync.store().read().len(), 2);

        remote.script(Scripted::Reject(None));
        let outcome = sync.create(draft).await;
        assert_eq!(
            outcome.failure().map(|failure| failure.message.as_str()),
            Some("failed to create record")
        );
        assert_eq!(sync.store().read().len(), 2);
    }

    #[tokio::test]
    async fn connectivity_test_never_mutates() {
        let (sync, remote) = primed(vec![server(1, EntityStatus::Enabled)]).await;
        let prior = sync.store().read();
        assert_eq!(sync.test(&id(1)).await, Ok("connection ok".to_string()));
        remote.script(Scripted::Reject(Some("timeout".into())));
        assert_eq!(
            sync.test(&id(1)).await.map_err(|failure| failure.message),
            Err("timeout".to_string())
        );
        assert_eq!(sync.store().read(), prior);
    }
}
