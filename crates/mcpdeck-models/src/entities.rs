//! Entities managed through the settings API.
//!
//! # Design
//! - Entities are immutable value snapshots; edits produce new values.
//! - Drafts carry only the writable fields and skip unset values on the wire.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, EntityStatus};

/// Where a tool server runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolKind {
    /// Process started on the local machine.
    Local,
    /// Server reached over the network.
    Remote,
}

impl ToolKind {
    /// Wire representation used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
        }
    }

    /// Parse a wire value, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Some(Self::Local),
            "REMOTE" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Tool server record as returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolServer {
    /// Backend-assigned identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Local or remote server.
    #[serde(rename = "type")]
    pub kind: ToolKind,
    /// Activation status.
    pub status: EntityStatus,
    /// Raw JSON configuration blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_json: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<NaiveDateTime>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<NaiveDateTime>,
}

/// Writable fields of a tool server, used for create and update requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolServerDraft {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Local or remote server.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,
    /// Activation status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
    /// Raw JSON configuration blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_json: Option<String>,
}

impl ToolServerDraft {
    /// Apply the draft on top of an existing server, producing a new value.
    #[must_use]
    pub fn apply_to(&self, server: &ToolServer) -> ToolServer {
        let mut next = server.clone();
        if let Some(name) = &self.name {
            next.name.clone_from(name);
        }
        if self.description.is_some() {
            next.description.clone_from(&self.description);
        }
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if self.config_json.is_some() {
            next.config_json.clone_from(&self.config_json);
        }
        next
    }
}

/// Tool market record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Backend-assigned identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Market endpoint.
    pub url: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw JSON authentication settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<String>,
    /// Activation status.
    pub status: EntityStatus,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<NaiveDateTime>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<NaiveDateTime>,
}

/// Writable fields of a market.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDraft {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Market endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw JSON authentication settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<String>,
    /// Activation status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
}

impl MarketDraft {
    /// Apply the draft on top of an existing market, producing a new value.
    #[must_use]
    pub fn apply_to(&self, market: &Market) -> Market {
        let mut next = market.clone();
        if let Some(name) = &self.name {
            next.name.clone_from(name);
        }
        if let Some(url) = &self.url {
            next.url.clone_from(url);
        }
        if self.description.is_some() {
            next.description.clone_from(&self.description);
        }
        if self.auth_config.is_some() {
            next.auth_config.clone_from(&self.auth_config);
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        next
    }
}

/// Tool advertised by a market.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTool {
    /// Backend-assigned identifier.
    pub id: EntityId,
    /// Owning market.
    pub market_id: EntityId,
    /// Tool name.
    pub tool_name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_description: Option<String>,
    /// Optional version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// Raw JSON metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_metadata: Option<String>,
    /// Whether the tool has been loaded into the local server list.
    #[serde(default)]
    pub is_loaded: bool,
    /// Identifier of the local server created on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_tool_id: Option<EntityId>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_server_decodes_backend_payload() {
        let payload = json!({
            "id": 3,
            "name": "search",
            "description": null,
            "type": "REMOTE",
            "status": "ENABLED",
            "configJson": "{\"url\":\"http://x\"}",
            "createTime": "2024-05-01T10:00:00",
            "updateTime": "2024-05-02T11:30:00.125"
        });
        let server: ToolServer = serde_json::from_value(payload).expect("decode server");
        assert_eq!(server.id, EntityId::Number(3));
        assert_eq!(server.kind, ToolKind::Remote);
        assert!(server.description.is_none());
        assert!(server.update_time.is_some());
    }

    #[test]
    fn draft_skips_unset_fields() {
        let draft = ToolServerDraft {
            name: Some("fs".into()),
            kind: Some(ToolKind::Local),
            ..ToolServerDraft::default()
        };
        let encoded = serde_json::to_value(&draft).expect("encode draft");
        assert_eq!(encoded, json!({"name": "fs", "type": "LOCAL"}));
    }

    #[test]
    fn draft_applies_only_present_fields() {
        let server = ToolServer {
            id: EntityId::Number(1),
            name: "old".into(),
            description: Some("keep".into()),
            kind: ToolKind::Local,
            status: EntityStatus::Enabled,
            config_json: None,
            create_time: None,
            update_time: None,
        };
        let draft = ToolServerDraft {
            name: Some("new".into()),
            ..ToolServerDraft::default()
        };
        let next = draft.apply_to(&server);
        assert_eq!(next.name, "new");
        assert_eq!(next.description.as_deref(), Some("keep"));
        assert_eq!(server.name, "old");
    }

    #[test]
    fn market_tool_defaults_loaded_flag() {
        let tool: MarketTool = serde_json::from_value(json!({
            "id": 9,
            "marketId": 2,
            "toolName": "weather"
        }))
        .expect("decode tool");
        assert!(!tool.is_loaded);
        assert_eq!(tool.market_id, EntityId::Number(2));
    }
}
