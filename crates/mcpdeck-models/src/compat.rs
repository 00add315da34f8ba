//! Reduced server record kept for older consumers of the persisted snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::ToolServer;
use crate::ids::EntityId;

/// Compatibility view of a tool server: name, description and an activity flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatServer {
    /// Display name; legacy mapping keys fill this in when absent.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True when the backing server is ENABLED.
    #[serde(default)]
    pub is_active: bool,
    /// Identifier of the backing server, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Unrecognised fields carried over from legacy records.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<&ToolServer> for CompatServer {
    fn from(server: &ToolServer) -> Self {
        Self {
            name: server.name.clone(),
            description: server.description.clone(),
            is_active: server.status.is_enabled(),
            id: Some(server.id.clone()),
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ToolKind;
    use crate::ids::EntityStatus;
    use serde_json::json;

    #[test]
    fn projection_tracks_enabled_status() {
        let server = ToolServer {
            id: EntityId::Number(5),
            name: "git".into(),
            description: Some("repo tools".into()),
            kind: ToolKind::Local,
            status: EntityStatus::Enabled,
            config_json: None,
            create_time: None,
            update_time: None,
        };
        let compat = CompatServer::from(&server);
        assert!(compat.is_active);
        assert_eq!(compat.id, Some(EntityId::Number(5)));
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({"name": "a", "isActive": true, "command": "npx a"});
        let compat: CompatServer = serde_json::from_value(raw.clone()).expect("decode");
        assert_eq!(compat.extra.get("command"), Some(&json!("npx a")));
        let encoded = serde_json::to_value(&compat).expect("encode");
        assert_eq!(encoded, raw);
    }
}
