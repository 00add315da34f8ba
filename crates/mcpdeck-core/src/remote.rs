//! Remote resource API consumed by the synchronization core.

use async_trait::async_trait;
use mcpdeck_models::{
    AckEnvelope, DataEnvelope, EntityId, EntityStatus, ListEnvelope, MarketTool,
};
use thiserror::Error;

use crate::entity::Editable;
use crate::query::ViewQuery;

/// Result alias for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Transport-level failure: the request did not yield a parsed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote request failed")]
pub struct RemoteError {
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    /// Server-supplied message, when the error body carried one.
    pub message: Option<String>,
}

impl RemoteError {
    /// Failure before any response arrived.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: Some(message.into()),
        }
    }

    /// Non-success HTTP status with an optional body message.
    #[must_use]
    pub fn status(status: u16, message: Option<String>) -> Self {
        Self {
            status: Some(status),
            message: message.filter(|text| !text.trim().is_empty()),
        }
    }

    /// Operation the backend or adapter does not offer.
    #[must_use]
    pub fn unsupported(operation: &str) -> Self {
        Self::network(format!("{operation} is not supported by this backend"))
    }

    /// Displayable text: the server message, else a default derived from the status.
    #[must_use]
    pub fn display_message(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        self.status.map(|status| {
            match status {
                400 => "request was rejected as invalid",
                401 => "authentication required",
                403 => "permission denied",
                404 => "resource not found",
                408 | 504 => "request timed out",
                409 => "request conflicts with the current state",
                429 => "too many requests; try again later",
                500..=599 => "server error; try again later",
                _ => "unexpected response from server",
            }
            .to_string()
        })
    }
}

/// CRUD, status and job endpoints of one collection.
#[async_trait]
pub trait RemoteCollection<E: Editable>: Send + Sync {
    /// Fetch the rows matching `query`.
    async fn list(&self, query: &ViewQuery) -> RemoteResult<ListEnvelope<E>>;

    /// Create an entity; the backend assigns its id.
    async fn create(&self, draft: &E::Draft) -> RemoteResult<DataEnvelope<E>>;

    /// Update an entity's writable fields.
    async fn update(&self, id: &EntityId, draft: &E::Draft) -> RemoteResult<DataEnvelope<E>>;

    /// Delete one entity.
    async fn delete(&self, id: &EntityId) -> RemoteResult<AckEnvelope>;

    /// Set an entity's status.
    async fn set_status(&self, id: &EntityId, status: EntityStatus) -> RemoteResult<AckEnvelope>;

    /// Delete several entities; default implementation reports lack of support.
    async fn batch_delete(&self, ids: &[EntityId]) -> RemoteResult<AckEnvelope> {
        let _ = ids;
        Err(RemoteError::unsupported("batch delete"))
    }

    /// Start the slow refresh job; default implementation reports lack of support.
    async fn refresh_job(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        let _ = id;
        Err(RemoteError::unsupported("refresh"))
    }

    /// Check an entity's connectivity; default implementation reports lack of support.
    async fn test(&self, id: &EntityId) -> RemoteResult<AckEnvelope> {
        let _ = id;
        Err(RemoteError::unsupported("connection test"))
    }
}

/// Tool catalogue endpoints of the markets collection.
#[async_trait]
pub trait MarketToolsRemote: Send + Sync {
    /// Fetch one page of a market's tools.
    async fn list_tools(
        &self,
        market_id: &EntityId,
        page: u32,
        size: u32,
    ) -> RemoteResult<ListEnvelope<MarketTool>>;

    /// Load one tool into the local server list.
    async fn load_tool(&self, tool_id: &EntityId) -> RemoteResult<AckEnvelope>;

    /// Load several tools at once.
    async fn batch_load_tools(&self, tool_ids: &[EntityId]) -> RemoteResult<AckEnvelope>;
}
