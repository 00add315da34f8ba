//! Market endpoints under `/api/mcp/markets`, including tool catalogues.

use async_trait::async_trait;
use mcpdeck_core::remote::RemoteResult;
use mcpdeck_core::{MarketToolsRemote, RemoteCollection, ViewQuery};
use mcpdeck_models::{
    AckEnvelope, DataEnvelope, EntityId, EntityStatus, ListEnvelope, Market, MarketDraft,
    MarketTool,
};
use serde::Serialize;

use crate::backend::{HttpBackend, list_params};

/// Remote market collection.
#[derive(Clone, Debug)]
pub struct MarketsClient {
    backend: HttpBackend,
}

impl MarketsClient {
    pub(crate) const fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchLoadRequest<'a> {
    tool_ids: &'a [EntityId],
}

#[async_trait]
impl RemoteCollection<Market> for MarketsClient {
    async fn list(&self, query: &ViewQuery) -> RemoteResult<ListEnvelope<Market>> {
        let url = self.backend.endpoint(&["api", "mcp", "markets"])?;
        let request = self.backend.get(url).query(&list_params(query));
        self.backend.send("list_markets", request).await
    }

    async fn create(&self, draft: &MarketDraft) -> RemoteResult<DataEnvelope<Market>> {
        let url = self.backend.endpoint(&["api", "mcp", "markets"])?;
        let request = self.backend.post(url).json(draft);
        self.backend.send("create_market", request).await
    }

    async fn update(
        &self,
        id: &EntityId,
        draft: &MarketDraft,
    ) -> RemoteResult<DataEnvelope<Market>> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", "markets", &id])?;
        let request = self.backend.put(url).json(draft);
        self.backend.send("update_market", request).await
    }

    async fn delete(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", "markets", &id])?;
        self.backend.send("delete_market", self.backend.delete(url)).await
    }

    async fn set_status(&self, id: &EntityId, status: EntityStatus) -> RemoteResult<AckEnvelope> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", "markets", &id, "status"])?;
        let request = self.backend.put(url).query(&[("status", status.as_str())]);
        self.backend.send("set_market_status", request).await
    }

    async fn refresh_job(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", "markets", &id, "refresh"])?;
        self.backend.send("refresh_market", self.backend.post(url)).await
    }
}

#[async_trait]
impl MarketToolsRemote for MarketsClient {
    async fn list_tools(
        &self,
        market_id: &EntityId,
        page: u32,
        size: u32,
    ) -> RemoteResult<ListEnvelope<MarketTool>> {
        let market_id = market_id.to_string();
        let url = self
            .backend
            .endpoint(&["api", "mcp", "markets", &market_id, "tools"])?;
        let request = self
            .backend
            .get(url)
            .query(&[("page", page), ("size", size)]);
        self.backend.send("list_market_tools", request).await
    }

    async fn load_tool(&self, tool_id: &EntityId) -> RemoteResult<AckEnvelope> {
        let tool_id = tool_id.to_string();
        let url = self
            .backend
            .endpoint(&["api", "mcp", "markets", "tools", &tool_id, "load"])?;
        self.backend.send("load_market_tool", self.backend.post(url)).await
    }

    async fn batch_load_tools(&self, tool_ids: &[EntityId]) -> RemoteResult<AckEnvelope> {
        let url = self
            .backend
            .endpoint(&["api", "mcp", "markets", "tools", "batch-load"])?;
        let request = self.backend.post(url).json(&BatchLoadRequest { tool_ids });
        self.backend.send("batch_load_market_tools", request).await
    }
}
