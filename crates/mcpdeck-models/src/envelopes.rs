//! Response envelopes wrapping every backend payload.

use serde::{Deserialize, Serialize};

/// Paged or unpaged list response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnvelope<T> {
    /// Application-level success flag.
    pub success: bool,
    /// Returned rows; the backend sends `null` on some empty results.
    #[serde(default = "Option::default")]
    pub data: Option<Vec<T>>,
    /// Total number of rows matching the query.
    #[serde(default)]
    pub total: u64,
    /// Current page (paged endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size (paged endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Page count (paged endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    /// Server-supplied message, usually on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ListEnvelope<T> {
    /// Successful envelope over the given rows.
    #[must_use]
    pub const fn ok(rows: Vec<T>) -> Self {
        let total = rows.len() as u64;
        Self {
            success: true,
            data: Some(rows),
            total,
            page: None,
            size: None,
            pages: None,
            message: None,
        }
    }

    /// Rows carried by the envelope, empty when absent.
    #[must_use]
    pub fn into_rows(self) -> Vec<T> {
        self.data.unwrap_or_default()
    }
}

/// Single-entity response for create and update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    /// Application-level success flag.
    pub success: bool,
    /// Authoritative entity returned by the backend.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Server-supplied message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> DataEnvelope<T> {
    /// Successful envelope over one entity.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Acknowledgement for commands that return no entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckEnvelope {
    /// Application-level success flag.
    pub success: bool,
    /// Server-supplied message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of items processed by batch commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u32>,
}

impl AckEnvelope {
    /// Successful acknowledgement with a message.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            success_count: None,
        }
    }

    /// Rejected acknowledgement with a message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            success_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_envelope_tolerates_null_data() {
        let envelope: ListEnvelope<u32> =
            serde_json::from_value(json!({"success": true, "data": null, "total": 0}))
                .expect("decode envelope");
        assert!(envelope.into_rows().is_empty());
    }

    #[test]
    fn ack_reads_batch_count() {
        let ack: AckEnvelope =
            serde_json::from_value(json!({"success": true, "successCount": 3})).expect("ack");
        assert_eq!(ack.success_count, Some(3));
        assert!(ack.message.is_none());
    }
}
