//! Normalisation and migration of the persisted server snapshot.
//!
//! Earlier releases stored the servers either as an array of records or as a
//! mapping keyed by server name, sometimes with a `status` string instead of
//! the `isActive` flag. Everything read from storage passes through
//! [`normalize`] so the rest of the crate only ever sees a clean sequence.

use std::collections::BTreeMap;

use mcpdeck_models::{CompatServer, EntityId, EntityStatus};
use serde_json::{Map, Value, json};
use tracing::info;

/// Schema version written by this release.
pub const CURRENT_VERSION: u64 = 2;

/// Decoded persisted envelope at the current schema version.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistedServers {
    /// Schema version the payload was written with before migration.
    pub source_version: Option<u64>,
    /// Normalised server records.
    pub servers: Vec<CompatServer>,
}

impl PersistedServers {
    /// Whether the payload had to be rewritten to reach the current version.
    #[must_use]
    pub fn migrated(&self) -> bool {
        self.source_version != Some(CURRENT_VERSION)
    }
}

/// Encode the persisted envelope at the current version.
#[must_use]
pub fn envelope(servers: &[CompatServer]) -> Value {
    json!({
        "version": CURRENT_VERSION,
        "state": { "servers": servers },
    })
}

/// Decode whatever was stored under the snapshot key into the current shape.
#[must_use]
pub fn migrate(raw: Option<&Value>) -> PersistedServers {
    let Some(raw) = raw else {
        return PersistedServers::default();
    };
    let version = raw.get("version").and_then(Value::as_u64);
    let servers_raw = raw
        .get("state")
        .and_then(|state| state.get("servers"))
        .or_else(|| version.is_none().then_some(raw));
    let servers = servers_raw.map(normalize).unwrap_or_default();
    if version != Some(CURRENT_VERSION) {
        info!(
            from = ?version,
            to = CURRENT_VERSION,
            servers = servers.len(),
            "migrating persisted server snapshot"
        );
    }
    PersistedServers {
        source_version: version,
        servers,
    }
}

/// Coerce any persisted shape into an ordered list of server records.
///
/// Array elements that are null, empty or not objects are dropped. Every
/// entry of a legacy mapping is kept; a value that is not an object counts
/// as an empty record named after its key.
#[must_use]
pub fn normalize(raw: &Value) -> Vec<CompatServer> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(fields) if !fields.is_empty() => Some(from_fields(fields, None)),
                _ => None,
            })
            .collect(),
        Value::Object(entries) => {
            let empty = Map::new();
            entries
                .iter()
                .map(|(key, entry)| match entry {
                    Value::Object(fields) => from_fields(fields, Some(key)),
                    _ => from_fields(&empty, Some(key)),
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn from_fields(fields: &Map<String, Value>, fallback_name: Option<&str>) -> CompatServer {
    let id = match fields.get("id") {
        Some(Value::Number(number)) => number.as_i64().map(EntityId::Number),
        Some(Value::String(text)) if !text.is_empty() => Some(EntityId::Text(text.clone())),
        _ => None,
    };
    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .or_else(|| fallback_name.map(str::to_string))
        .or_else(|| id.as_ref().map(ToString::to_string))
        .unwrap_or_default();
    let description = fields
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let is_active = match fields.get("isActive") {
        Some(Value::Bool(flag)) => *flag,
        _ => fields
            .get("status")
            .and_then(Value::as_str)
            .and_then(EntityStatus::parse)
            .is_some_and(EntityStatus::is_enabled),
    };
    let extra: BTreeMap<String, Value> = fields
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                "name" | "description" | "isActive" | "status" | "id"
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    CompatServer {
        name,
        description,
        is_active,
        id,
        extra,
    }
}
