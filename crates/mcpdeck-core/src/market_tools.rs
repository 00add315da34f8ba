//! Paginated tool catalogue of one market at a time.
//!
//! # Design
//! - The store holds the page last fetched; browsing another market or page
//!   replaces it.
//! - Loads flip `is_loaded` optimistically and re-read the current page once
//!   the backend confirms, since loading creates records elsewhere.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mcpdeck_models::{EntityId, Market, MarketTool};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::ValidationError;
use crate::mutation::{Failure, MutationOutcome, Operation};
use crate::remote::MarketToolsRemote;
use crate::store::EntityStore;
use crate::sync::{LoadOutcome, Page, committed, failed, map_by_id, rejected};

/// Controller over a market's tool catalogue.
pub struct MarketToolsSync<R> {
    store: Arc<EntityStore<MarketTool>>,
    remote: R,
    page_size: u32,
    cursor: Mutex<Option<(EntityId, u32)>>,
}

impl<R: MarketToolsRemote> MarketToolsSync<R> {
    /// Controller using the configured page size.
    #[must_use]
    pub fn new(store: Arc<EntityStore<MarketTool>>, remote: R, config: &SyncConfig) -> Self {
        Self {
            store,
            remote,
            page_size: config.default_page_size,
            cursor: Mutex::new(None),
        }
    }

    /// Store holding the current page.
    #[must_use]
    pub const fn store(&self) -> &Arc<EntityStore<MarketTool>> {
        &self.store
    }

    /// Market and page currently displayed.
    #[must_use]
    pub fn cursor(&self) -> Option<(EntityId, u32)> {
        self.cursor_guard().clone()
    }

    /// Fetch `page` of `market`'s tools.
    ///
    /// # Errors
    ///
    /// Returns a validation [`Failure`] without calling the backend when the
    /// market is disabled. Fetch failures are reported as [`LoadOutcome::Stale`].
    pub async fn browse(
        &self,
        market: &Market,
        page: u32,
    ) -> Result<LoadOutcome<MarketTool>, Failure> {
        if !market.status.is_enabled() {
            let error = ValidationError::MarketDisabled {
                market_id: market.id.clone(),
            };
            debug!(market = %market.id, "tool listing refused for disabled market");
            return Err(Failure::validation(Operation::ListTools, &error));
        }
        let page = page.max(1);
        *self.cursor_guard() = Some((market.id.clone(), page));
        Ok(self.fetch(&market.id, page).await)
    }

    /// Mark one tool loaded optimistically, then re-read the current page.
    pub async fn load_tool(&self, tool_id: &EntityId) -> MutationOutcome<EntityId> {
        let pending = self.store.begin(|rows| {
            map_by_id(rows, tool_id, "load_tool", |tool| MarketTool {
                is_loaded: true,
                ..tool.clone()
            })
        });
        match self.remote.load_tool(tool_id).await {
            Ok(envelope) if envelope.success => {
                self.refetch().await;
                committed::<MarketTool, _>(Operation::LoadTool, tool_id.clone(), envelope.message)
            }
            Ok(envelope) => failed(
                Operation::LoadTool,
                Some(pending),
                Failure::application(Operation::LoadTool, envelope.message),
                &self.store,
            ),
            Err(error) => failed(
                Operation::LoadTool,
                Some(pending),
                Failure::transport(Operation::LoadTool, &error),
                &self.store,
            ),
        }
    }

    /// Load several tools; the payload is the number the backend loaded.
    pub async fn batch_load(&self, tool_ids: Vec<EntityId>) -> MutationOutcome<u32> {
        if tool_ids.is_empty() {
            return rejected(Operation::BatchLoadTools, &ValidationError::EmptySelection);
        }
        let pending = self.store.begin(|rows| {
            rows.iter()
                .map(|tool| MarketTool {
                    is_loaded: tool.is_loaded || tool_ids.contains(&tool.id),
                    ..tool.clone()
                })
                .collect()
        });
        match self.remote.batch_load_tools(&tool_ids).await {
            Ok(envelope) if envelope.success => {
                self.store.clear_selection();
                self.refetch().await;
                let loaded = envelope
                    .success_count
                    .unwrap_or_else(|| u32::try_from(tool_ids.len()).unwrap_or(u32::MAX));
                committed::<MarketTool, _>(Operation::BatchLoadTools, loaded, envelope.message)
            }
            Ok(envelope) => failed(
                Operation::BatchLoadTools,
                Some(pending),
                Failure::application(Operation::BatchLoadTools, envelope.message),
                &self.store,
            ),
            Err(error) => failed(
                Operation::BatchLoadTools,
                Some(pending),
                Failure::transport(Operation::BatchLoadTools, &error),
                &self.store,
            ),
        }
    }

    /// Load the current selection.
    pub async fn batch_load_selected(&self) -> MutationOutcome<u32> {
        let selected = self.store.selection();
        self.batch_load(selected).await
    }

    async fn refetch(&self) {
        let Some((market_id, page)) = self.cursor() else {
            return;
        };
        if let LoadOutcome::Stale { failure, .. } = self.fetch(&market_id, page).await {
            debug!(market = %market_id, error = %failure, "tool page not refreshed after load");
        }
    }

    async fn fetch(&self, market_id: &EntityId, page: u32) -> LoadOutcome<MarketTool> {
        let failure = match self.remote.list_tools(market_id, page, self.page_size).await {
            Ok(envelope) if envelope.success => {
                let page_size = envelope.size.unwrap_or(self.page_size);
                let reported_total = envelope.total;
                let rows = envelope.into_rows();
                let total = reported_total.max(rows.len() as u64);
                self.store.replace(rows);
                debug!(market = %market_id, page, total, "market tools fetched");
                return LoadOutcome::Fetched(Page {
                    rows: self.store.read(),
                    total,
                    page,
                    page_size,
                });
            }
            Ok(envelope) => Failure::application(Operation::ListTools, envelope.message),
            Err(error) => Failure::transport(Operation::ListTools, &error),
        };
        warn!(
            market = %market_id,
            error = %failure,
            "market tools fetch failed; keeping stale rows"
        );
        let rows = self.store.read();
        LoadOutcome::Stale {
            page: Page {
                total: rows.len() as u64,
                rows,
                page,
                page_size: self.page_size,
            },
            failure,
        }
    }

    fn cursor_guard(&self) -> MutexGuard<'_, Option<(EntityId, u32)>> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::FailureKind;
    use crate::remote::RemoteError;
    use crate::testing::{FakeMarketTools, Scripted, market, tool};
    use mcpdeck_models::EntityStatus;

    fn controller(tools: Vec<MarketTool>) -> (MarketToolsSync<FakeMarketTools>, FakeMarketTools) {
        let store = Arc::new(EntityStore::new());
        let remote = FakeMarketTools::new(tools);
        remote.observe(Arc::clone(&store));
        let config = SyncConfig {
            default_page_size: 2,
            ..SyncConfig::default()
        };
        (MarketToolsSync::new(store, remote.clone(), &config), remote)
    }

    fn id(value: i64) -> EntityId {
        EntityId::Number(value)
    }

    #[tokio::test]
    async fn disabled_market_is_refused_without_a_call() {
        let (sync, remote) = controller(vec![tool(1, 5)]);
        let failure = sync
            .browse(&market(5, EntityStatus::Disabled), 1)
            .await
            .expect_err("disabled market");
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.message, "market is disabled; enable it first");
        assert!(remote.list_calls().is_empty());
    }

    #[tokio::test]
    async fn browse_pages_through_one_market() {
        let (sync, remote) = controller(vec![tool(1, 5), tool(2, 5), tool(3, 5), tool(4, 6)]);
        let outcome = sync
            .browse(&market(5, EntityStatus::Enabled), 2)
            .await
            .expect("enabled market");
        let page = outcome.page();
        assert_eq!(page.total, 3);
        assert_eq!(page.pages(), 2);
        assert_eq!(page.rows.iter().map(|row| row.id.clone()).collect::<Vec<_>>(), vec![id(3)]);
        assert_eq!(remote.list_calls(), vec![(id(5), 2, 2)]);
        assert_eq!(sync.cursor(), Some((id(5), 2)));
    }

    #[tokio::test]
    async fn load_is_optimistic_then_refetched() {
        let (sync, remote) = controller(vec![tool(1, 5), tool(2, 5)]);
        sync.browse(&market(5, EntityStatus::Enabled), 1)
            .await
            .expect("enabled market");

        let outcome = sync.load_tool(&id(2)).await;
        assert_eq!(outcome.into_result(), Ok((id(2), "tool loaded".to_string())));
        let seen = remote.observed().pop().expect("snapshot during call");
        assert!(!seen[0].is_loaded);
        assert!(seen[1].is_loaded);
        assert_eq!(remote.list_calls().len(), 2);
        assert!(sync.store().read()[1].is_loaded);
    }

    #[tokio::test]
    async fn failed_load_restores_the_page() {
        let (sync, remote) = controller(vec![tool(1, 5)]);
        sync.browse(&market(5, EntityStatus::Enabled), 1)
            .await
            .expect("enabled market");
        let prior = sync.store().read();
        remote.script(Scripted::Transport(RemoteError::status(500, Some("market offline".into()))));

        let outcome = sync.load_tool(&id(1)).await;
        assert_eq!(
            outcome.failure().map(|failure| failure.message.as_str()),
            Some("market offline")
        );
        assert_eq!(sync.store().read(), prior);
        assert_eq!(remote.list_calls().len(), 1);
    }

    #[tokio::test]
    async fn batch_load_reports_count_and_clears_selection() {
        let (sync, _remote) = controller(vec![tool(1, 5), tool(2, 5)]);
        sync.browse(&market(5, EntityStatus::Enabled), 1)
            .await
            .expect("enabled market");
        sync.store().set_selection(&[id(1), id(2)]);

        let outcome = sync.batch_load_selected().await;
        assert_eq!(outcome.into_result().map(|(count, _)| count), Ok(2));
        assert!(sync.store().selection().is_empty());
        assert!(sync.store().read().iter().all(|row| row.is_loaded));
    }

    #[tokio::test]
    async fn empty_batch_load_is_rejected() {
        let (sync, remote) = controller(vec![tool(1, 5)]);
        let outcome = sync.batch_load_selected().await;
        assert!(matches!(outcome, MutationOutcome::Rejected(_)));
        assert!(remote.observed().is_empty());
    }
}
