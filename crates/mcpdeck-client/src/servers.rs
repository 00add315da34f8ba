//! Tool server endpoints under `/api/mcp`.

use async_trait::async_trait;
use mcpdeck_core::remote::RemoteResult;
use mcpdeck_core::{RemoteCollection, ViewQuery};
use mcpdeck_models::{
    AckEnvelope, DataEnvelope, EntityId, EntityStatus, ListEnvelope, ToolServer, ToolServerDraft,
};

use crate::backend::{HttpBackend, list_params};

/// Remote tool server collection.
#[derive(Clone, Debug)]
pub struct ServersClient {
    backend: HttpBackend,
}

impl ServersClient {
    pub(crate) const fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }
}

fn ids_param(ids: &[EntityId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl RemoteCollection<ToolServer> for ServersClient {
    async fn list(&self, query: &ViewQuery) -> RemoteResult<ListEnvelope<ToolServer>> {
        let url = self.backend.endpoint(&["api", "mcp", "servers"])?;
        let request = self.backend.get(url).query(&list_params(query));
        self.backend.send("list_servers", request).await
    }

    async fn create(&self, draft: &ToolServerDraft) -> RemoteResult<DataEnvelope<ToolServer>> {
        let url = self.backend.endpoint(&["api", "mcp"])?;
        let request = self.backend.post(url).json(draft);
        self.backend.send("create_server", request).await
    }

    async fn update(
        &self,
        id: &EntityId,
        draft: &ToolServerDraft,
    ) -> RemoteResult<DataEnvelope<ToolServer>> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", &id])?;
        let request = self.backend.put(url).json(draft);
        self.backend.send("update_server", request).await
    }

    async fn delete(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", &id])?;
        self.backend.send("delete_server", self.backend.delete(url)).await
    }

    async fn set_status(&self, id: &EntityId, status: EntityStatus) -> RemoteResult<AckEnvelope> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", &id, "status"])?;
        let request = self.backend.put(url).query(&[("status", status.as_str())]);
        self.backend.send("set_server_status", request).await
    }

    async fn batch_delete(&self, ids: &[EntityId]) -> RemoteResult<AckEnvelope> {
        let url = self.backend.endpoint(&["api", "mcp", "batch"])?;
        let request = self.backend.delete(url).query(&[("ids", ids_param(ids))]);
        self.backend.send("batch_delete_servers", request).await
    }

    async fn test(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        let id = id.to_string();
        let url = self.backend.endpoint(&["api", "mcp", &id, "test"])?;
        self.backend.send("test_server", self.backend.post(url)).await
    }
}
