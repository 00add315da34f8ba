//! Scripted in-memory fakes of the remote API for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mcpdeck_models::{
    AckEnvelope, DataEnvelope, EntityId, EntityStatus, ListEnvelope, Market, MarketTool,
    ToolKind, ToolServer,
};

use crate::entity::{Editable, Toggleable};
use crate::query::ViewQuery;
use crate::remote::{MarketToolsRemote, RemoteCollection, RemoteError, RemoteResult};
use crate::store::{EntityStore, Snapshot};

/// How the next remote call answers.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Answer with `success: false` and the given message.
    Reject(Option<String>),
    /// Fail before a body is parsed.
    Transport(RemoteError),
}

type Canonicalizer<E> = Arc<dyn Fn(&E) -> E + Send + Sync>;

struct FakeState<E> {
    rows: Vec<E>,
    script: VecDeque<Scripted>,
    observed: Vec<Snapshot<E>>,
    last_query: Option<ViewQuery>,
    canonical: Option<Canonicalizer<E>>,
}

struct FakeInner<E: Editable> {
    state: Mutex<FakeState<E>>,
    watched: Option<Arc<EntityStore<E>>>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
    next_id: AtomicI64,
}

/// In-memory collection backend.
///
/// Every call consumes the next scripted answer, succeeding when none is queued.
/// Mutating calls record the watched store's snapshot at call time.
pub struct FakeRemote<E: Editable> {
    inner: Arc<FakeInner<E>>,
}

impl<E: Editable> Clone for FakeRemote<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Editable> FakeRemote<E> {
    /// Backend holding `rows`.
    #[must_use]
    pub fn new(rows: Vec<E>) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                state: Mutex::new(FakeState {
                    rows,
                    script: VecDeque::new(),
                    observed: Vec::new(),
                    last_query: None,
                    canonical: None,
                }),
                watched: None,
                list_calls: AtomicUsize::new(0),
                mutation_calls: AtomicUsize::new(0),
                next_id: AtomicI64::new(100),
            }),
        }
    }

    /// Record `store`'s snapshot whenever a mutating call arrives.
    ///
    /// # Panics
    ///
    /// Panics if the fake was already cloned.
    #[must_use]
    pub fn observing(self, store: Arc<EntityStore<E>>) -> Self {
        let mut inner =
            Arc::into_inner(self.inner).expect("observing must be set before cloning");
        inner.watched = Some(store);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Queue the answer of the next call.
    pub fn script(&self, answer: Scripted) {
        self.state().script.push_back(answer);
    }

    /// Rewrite entities returned by update, mimicking server-side canonicalisation.
    pub fn canonicalize(&self, canonical: impl Fn(&E) -> E + Send + Sync + 'static) {
        self.state().canonical = Some(Arc::new(canonical));
    }

    /// Rows currently held by the backend.
    #[must_use]
    pub fn rows(&self) -> Vec<E> {
        self.state().rows.clone()
    }

    /// Number of list calls received.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    /// Number of mutating calls received.
    #[must_use]
    pub fn mutation_calls(&self) -> usize {
        self.inner.mutation_calls.load(Ordering::SeqCst)
    }

    /// Snapshots recorded at the time of each mutating call.
    #[must_use]
    pub fn observed(&self) -> Vec<Snapshot<E>> {
        self.state().observed.clone()
    }

    /// Query of the most recent list call.
    #[must_use]
    pub fn last_query(&self) -> Option<ViewQuery> {
        self.state().last_query.clone()
    }

    fn state(&self) -> MutexGuard<'_, FakeState<E>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutation(&self) -> Result<(), Answer> {
        self.inner.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.inner.watched.as_ref().map(|store| store.read());
        let mut state = self.state();
        if let Some(snapshot) = snapshot {
            state.observed.push(snapshot);
        }
        state.script.pop_front().map_or(Ok(()), |answer| Err(Answer(answer)))
    }
}

struct Answer(Scripted);

impl Answer {
    fn into_ack(self) -> RemoteResult<AckEnvelope> {
        match self.0 {
            Scripted::Reject(message) => Ok(AckEnvelope {
                success: false,
                message,
                success_count: None,
            }),
            Scripted::Transport(error) => Err(error),
        }
    }

    fn into_data<T>(self) -> RemoteResult<DataEnvelope<T>> {
        match self.0 {
            Scripted::Reject(message) => Ok(DataEnvelope {
                success: false,
                data: None,
                message,
            }),
            Scripted::Transport(error) => Err(error),
        }
    }

    fn into_list<T>(self) -> RemoteResult<ListEnvelope<T>> {
        match self.0 {
            Scripted::Reject(message) => Ok(ListEnvelope {
                success: false,
                data: None,
                total: 0,
                page: None,
                size: None,
                pages: None,
                message,
            }),
            Scripted::Transport(error) => Err(error),
        }
    }
}

#[async_trait]
impl<E> RemoteCollection<E> for FakeRemote<E>
where
    E: Editable + Toggleable,
{
    async fn list(&self, query: &ViewQuery) -> RemoteResult<ListEnvelope<E>> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.last_query = Some(query.clone());
        if let Some(answer) = state.script.pop_front() {
            return Answer(answer).into_list();
        }
        Ok(ListEnvelope::ok(state.rows.clone()))
    }

    async fn create(&self, draft: &E::Draft) -> RemoteResult<DataEnvelope<E>> {
        if let Err(answer) = self.mutation() {
            return answer.into_data();
        }
        let id = EntityId::Number(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let created = E::from_draft(id, draft);
        if let Some(entity) = &created {
            self.state().rows.push(entity.clone());
        }
        Ok(DataEnvelope {
            success: true,
            data: created,
            message: None,
        })
    }

    async fn update(&self, id: &EntityId, draft: &E::Draft) -> RemoteResult<DataEnvelope<E>> {
        if let Err(answer) = self.mutation() {
            return answer.into_data();
        }
        let mut state = self.state();
        let canonical = state.canonical.clone();
        let updated = state
            .rows
            .iter_mut()
            .find(|row| row.id() == id)
            .map(|row| {
                let next = row.apply_draft(draft);
                *row = canonical.as_ref().map_or_else(|| next.clone(), |apply| apply(&next));
                row.clone()
            });
        Ok(DataEnvelope {
            success: true,
            data: updated,
            message: None,
        })
    }

    async fn delete(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        if let Err(answer) = self.mutation() {
            return answer.into_ack();
        }
        self.state().rows.retain(|row| row.id() != id);
        Ok(AckEnvelope::ok("deleted"))
    }

    async fn set_status(&self, id: &EntityId, status: EntityStatus) -> RemoteResult<AckEnvelope> {
        if let Err(answer) = self.mutation() {
            return answer.into_ack();
        }
        self.state()
            .rows
            .iter_mut()
            .filter(|row| row.id() == id)
            .for_each(|row| *row = row.with_status(status));
        Ok(AckEnvelope::ok("status updated"))
    }

    async fn batch_delete(&self, ids: &[EntityId]) -> RemoteResult<AckEnvelope> {
        if let Err(answer) = self.mutation() {
            return answer.into_ack();
        }
        self.state().rows.retain(|row| !ids.contains(row.id()));
        Ok(AckEnvelope::ok("deleted"))
    }

    async fn refresh_job(&self, _id: &EntityId) -> RemoteResult<AckEnvelope> {
        if let Err(answer) = self.mutation() {
            return answer.into_ack();
        }
        Ok(AckEnvelope::ok("refresh started"))
    }

    async fn test(&self, _id: &EntityId) -> RemoteResult<AckEnvelope> {
        let scripted = self.state().script.pop_front();
        if let Some(answer) = scripted {
            return Answer(answer).into_ack();
        }
        Ok(AckEnvelope::ok("connection ok"))
    }
}

/// In-memory market tool catalogue.
#[derive(Clone)]
pub struct FakeMarketTools {
    inner: Arc<Mutex<ToolsState>>,
}

struct ToolsState {
    tools: Vec<MarketTool>,
    script: VecDeque<Scripted>,
    list_calls: Vec<(EntityId, u32, u32)>,
    observed: Vec<Snapshot<MarketTool>>,
    watched: Option<Arc<EntityStore<MarketTool>>>,
}

impl FakeMarketTools {
    /// Catalogue holding `tools`.
    #[must_use]
    pub fn new(tools: Vec<MarketTool>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ToolsState {
                tools,
                script: VecDeque::new(),
                list_calls: Vec::new(),
                observed: Vec::new(),
                watched: None,
            })),
        }
    }

    /// Record `store`'s snapshot whenever a load call arrives.
    pub fn observe(&self, store: Arc<EntityStore<MarketTool>>) {
        self.state().watched = Some(store);
    }

    /// Queue the answer of the next call.
    pub fn script(&self, answer: Scripted) {
        self.state().script.push_back(answer);
    }

    /// `(market, page, size)` of every list call.
    #[must_use]
    pub fn list_calls(&self) -> Vec<(EntityId, u32, u32)> {
        self.state().list_calls.clone()
    }

    /// Snapshots recorded at the time of each load call.
    #[must_use]
    pub fn observed(&self) -> Vec<Snapshot<MarketTool>> {
        self.state().observed.clone()
    }

    fn state(&self) -> MutexGuard<'_, ToolsState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_call(&self) -> Option<Scripted> {
        let watched = self.state().watched.clone();
        let snapshot = watched.map(|store| store.read());
        let mut state = self.state();
        if let Some(snapshot) = snapshot {
            state.observed.push(snapshot);
        }
        state.script.pop_front()
    }
}

#[async_trait]
impl MarketToolsRemote for FakeMarketTools {
    async fn list_tools(
        &self,
        market_id: &EntityId,
        page: u32,
        size: u32,
    ) -> RemoteResult<ListEnvelope<MarketTool>> {
        let matching: Vec<MarketTool> = {
            let mut state = self.state();
            state.list_calls.push((market_id.clone(), page, size));
            if let Some(answer) = state.script.pop_front() {
                return Answer(answer).into_list();
            }
            state
                .tools
                .iter()
                .filter(|tool| &tool.market_id == market_id)
                .cloned()
                .collect()
        };
        let total = matching.len() as u64;
        let skip = (page.saturating_sub(1) as usize).saturating_mul(size as usize);
        let rows: Vec<MarketTool> = matching.into_iter().skip(skip).take(size as usize).collect();
        Ok(ListEnvelope {
            success: true,
            data: Some(rows),
            total,
            page: Some(page),
            size: Some(size),
            pages: None,
            message: None,
        })
    }

    async fn load_tool(&self, tool_id: &EntityId) -> RemoteResult<AckEnvelope> {
        if let Some(answer) = self.load_call() {
            return Answer(answer).into_ack();
        }
        self.state()
            .tools
            .iter_mut()
            .filter(|tool| &tool.id == tool_id)
            .for_each(|tool| tool.is_loaded = true);
        Ok(AckEnvelope::ok("tool loaded"))
    }

    async fn batch_load_tools(&self, tool_ids: &[EntityId]) -> RemoteResult<AckEnvelope> {
        if let Some(answer) = self.load_call() {
            return Answer(answer).into_ack();
        }
        let mut loaded = 0;
        self.state()
            .tools
            .iter_mut()
            .filter(|tool| tool_ids.contains(&tool.id))
            .for_each(|tool| {
                tool.is_loaded = true;
                loaded += 1;
            });
        Ok(AckEnvelope {
            success: true,
            message: None,
            success_count: Some(loaded),
        })
    }
}

/// Local server named `server-{id}`.
#[must_use]
pub fn server(id: i64, status: EntityStatus) -> ToolServer {
    ToolServer {
        id: EntityId::Number(id),
        name: format!("server-{id}"),
        description: None,
        kind: ToolKind::Local,
        status,
        config_json: None,
        create_time: None,
        update_time: None,
    }
}

/// Market named `market-{id}`.
#[must_use]
pub fn market(id: i64, status: EntityStatus) -> Market {
    Market {
        id: EntityId::Number(id),
        name: format!("market-{id}"),
        url: format!("https://market-{id}.example"),
        description: None,
        auth_config: None,
        status,
        create_time: None,
        update_time: None,
    }
}

/// Unloaded tool `tool-{id}` of `market_id`.
#[must_use]
pub fn tool(id: i64, market_id: i64) -> MarketTool {
    MarketTool {
        id: EntityId::Number(id),
        market_id: EntityId::Number(market_id),
        tool_name: format!("tool-{id}"),
        tool_description: None,
        tool_version: None,
        tool_metadata: None,
        is_loaded: false,
        local_tool_id: None,
        create_time: None,
    }
}
