//! Records exchanged with the management API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the integration tests catch drift between the two crates. Wire names are
//! camelCase. Unknown fields are ignored and missing fields are decode errors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server metadata returned by `GET server`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub server_id: String,
    pub metrics_enabled: bool,
    pub created_timestamp_ms: i64,
    pub port_for_new_access_keys: u16,
}

impl ServerInfo {
    /// Creation time of the server, or `None` if the timestamp is out of range.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_timestamp_ms)
    }
}

/// A credential issued by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    /// Cipher name, e.g. `chacha20-ietf-poly1305`.
    pub method: String,
    /// Shareable `ss://` connection URI.
    pub access_url: String,
}

/// Body of `GET access-keys`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyList {
    pub access_keys: Vec<AccessKey>,
}

/// Body of `PUT name` and `PUT access-keys/{id}/name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Name {
    pub name: String,
}

/// Body of `GET`/`PUT metrics/enabled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSetting {
    pub metrics_enabled: bool,
}

/// Body of `GET metrics/transfer`, keyed by access key id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageMetrics {
    #[serde(rename = "bytesTransferredByUserId")]
    pub bytes_transferred_by_user_id: HashMap<String, i64>,
}
