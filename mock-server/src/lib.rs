//! In-memory stand-in for the Outline server management API.
//!
//! Routes mirror the real server and can be mounted under a secret path
//! prefix. `tls` serves the router over HTTPS with a self-signed certificate
//! that carries no Subject Alternative Names, like the real installer's.

pub mod tls;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

pub use tls::{serve_tls, TlsIdentity};

const DEFAULT_METHOD: &str = "chacha20-ietf-poly1305";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub server_id: String,
    pub metrics_enabled: bool,
    pub created_timestamp_ms: i64,
    pub port_for_new_access_keys: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    pub method: String,
    pub access_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyList {
    pub access_keys: Vec<AccessKey>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Name {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSetting {
    pub metrics_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(rename = "bytesTransferredByUserId")]
    pub bytes_transferred_by_user_id: HashMap<String, i64>,
}

/// Everything the mock server knows. Access keys keep insertion order.
#[derive(Debug)]
pub struct ServerState {
    pub info: ServerInfo,
    pub hostname: String,
    access_keys: Vec<AccessKey>,
    next_id: u64,
    bytes_transferred: HashMap<String, i64>,
}

impl ServerState {
    pub fn new(hostname: &str, port_for_new_access_keys: u16) -> Self {
        let created_timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self {
            info: ServerInfo {
                name: "Outline Server".to_string(),
                server_id: Uuid::new_v4().to_string(),
                metrics_enabled: false,
                created_timestamp_ms,
                port_for_new_access_keys,
            },
            hostname: hostname.to_string(),
            access_keys: Vec::new(),
            next_id: 0,
            bytes_transferred: HashMap::new(),
        }
    }

    /// Issue a new key with the next numeric id and an empty name.
    pub fn create_access_key(&mut self) -> AccessKey {
        let id = self.next_id.to_string();
        self.next_id += 1;
        let password = Uuid::new_v4().simple().to_string();
        let port = self.info.port_for_new_access_keys;
        let key = AccessKey {
            access_url: format!(
                "ss://{DEFAULT_METHOD}:{password}@{}:{port}/?outline=1",
                self.hostname
            ),
            id,
            name: String::new(),
            password,
            port,
            method: DEFAULT_METHOD.to_string(),
        };
        self.access_keys.push(key.clone());
        key
    }

    /// Add a key with a caller-chosen id, replacing any key with the same id.
    pub fn insert_access_key(&mut self, key: AccessKey) {
        self.access_keys.retain(|k| k.id != key.id);
        self.access_keys.push(key);
    }

    pub fn access_keys(&self) -> &[AccessKey] {
        &self.access_keys
    }

    /// Add `bytes` to the transfer counter of access key `id`.
    pub fn record_transfer(&mut self, id: &str, bytes: i64) {
        *self.bytes_transferred.entry(id.to_string()).or_default() += bytes;
    }
}

pub type Db = Arc<RwLock<ServerState>>;

pub fn new_db(hostname: &str, port_for_new_access_keys: u16) -> Db {
    Arc::new(RwLock::new(ServerState::new(hostname, port_for_new_access_keys)))
}

/// Router over a fresh state, mounted at the root.
pub fn app() -> Router {
    app_with_state(new_db("127.0.0.1", 443))
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/server", get(get_server))
        .route("/name", put(rename_server))
        .route("/metrics/enabled", get(get_metrics).put(set_metrics))
        .route("/metrics/transfer", get(get_transfer))
        .route("/access-keys", get(list_access_keys).post(create_access_key))
        .route("/access-keys/{id}", delete(delete_access_key))
        .route("/access-keys/{id}/name", put(rename_access_key))
        .with_state(db)
}

/// Router mounted under `/{prefix}`, the way the real server hides its API.
pub fn app_with_prefix(prefix: &str, db: Db) -> Router {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        return app_with_state(db);
    }
    Router::new().nest(&format!("/{prefix}"), app_with_state(db))
}

async fn get_server(State(db): State<Db>) -> Json<ServerInfo> {
    Json(db.read().await.info.clone())
}

async fn rename_server(State(db): State<Db>, Json(input): Json<Name>) -> StatusCode {
    if input.name.trim().is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    info!("server renamed to {:?}", input.name);
    db.write().await.info.name = input.name;
    StatusCode::NO_CONTENT
}

async fn get_metrics(State(db): State<Db>) -> Json<MetricsSetting> {
    Json(MetricsSetting {
        metrics_enabled: db.read().await.info.metrics_enabled,
    })
}

async fn set_metrics(State(db): State<Db>, Json(input): Json<MetricsSetting>) -> StatusCode {
    db.write().await.info.metrics_enabled = input.metrics_enabled;
    StatusCode::NO_CONTENT
}

async fn get_transfer(State(db): State<Db>) -> Json<UsageMetrics> {
    Json(UsageMetrics {
        bytes_transferred_by_user_id: db.read().await.bytes_transferred.clone(),
    })
}

async fn list_access_keys(State(db): State<Db>) -> Json<AccessKeyList> {
    Json(AccessKeyList {
        access_keys: db.read().await.access_keys.clone(),
    })
}

async fn create_access_key(State(db): State<Db>) -> (StatusCode, Json<AccessKey>) {
    let key = db.write().await.create_access_key();
    info!("created access key {}", key.id);
    (StatusCode::CREATED, Json(key))
}

async fn delete_access_key(State(db): State<Db>, Path(id): Path<String>) -> StatusCode {
    let mut state = db.write().await;
    let before = state.access_keys.len();
    state.access_keys.retain(|k| k.id != id);
    if state.access_keys.len() == before {
        return StatusCode::NOT_FOUND;
    }
    state.bytes_transferred.remove(&id);
    info!("deleted access key {id}");
    StatusCode::NO_CONTENT
}

async fn rename_access_key(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<Name>,
) -> StatusCode {
    let mut state = db.write().await;
    match state.access_keys.iter_mut().find(|k| k.id == id) {
        Some(key) => {
            key.name = input.name;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}
