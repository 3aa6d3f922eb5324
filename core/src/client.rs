//! Client for the Outline server management API.
//!
//! # Design
//! `OutlineClient` holds the API URL, the pinned certificate fingerprint and
//! a shared `Transport`; none of it changes after construction. Each
//! operation is split into a `build_*` method that produces an `HttpRequest`
//! and a `parse_*` method that consumes an `HttpResponse`, and an async
//! method that runs one round-trip through the transport between the two.
//!
//! Every `parse_*` call first checks the response's peer certificates
//! against the pinned fingerprint, then the status code, then decodes the
//! body. Nothing is retried and no trust decision outlives a single call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::access::AccessConfig;
use crate::error::ApiError;
use crate::fingerprint::{verify_chain, Fingerprint};
use crate::http::{build_request, encode_segment, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{HttpsTransport, Transport};
use crate::types::{AccessKey, AccessKeyList, MetricsSetting, Name, ServerInfo, UsageMetrics};

/// Pinned-certificate client for one Outline server.
#[derive(Clone)]
pub struct OutlineClient {
    api_url: Url,
    cert_sha256: Fingerprint,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for OutlineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineClient")
            .field("api_url", &self.api_url.as_str())
            .field("cert_sha256", &self.cert_sha256.to_string())
            .finish_non_exhaustive()
    }
}

impl OutlineClient {
    /// Create a client that uses the process-wide HTTPS transport.
    ///
    /// `api_url` and `cert_sha256` are the values from the server's
    /// `access.txt`. A trailing `/` is appended to the URL if missing.
    pub fn new(api_url: &str, cert_sha256: &str) -> Result<Self, ApiError> {
        Self::with_transport(api_url, cert_sha256, HttpsTransport::shared()?)
    }

    /// Create a client that sends requests through `transport`.
    pub fn with_transport(
        api_url: &str,
        cert_sha256: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let api_url = parse_api_url(api_url)?;
        let cert_sha256 = Fingerprint::from_hex(cert_sha256)?;
        Ok(Self {
            api_url,
            cert_sha256,
            transport,
        })
    }

    pub fn from_access_config(config: &AccessConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_url, &config.cert_sha256)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn cert_sha256(&self) -> &Fingerprint {
        &self.cert_sha256
    }

    // --- Request building ---

    pub fn build_get_server_info(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, "server")
    }

    pub fn build_rename_server(&self, name: &str) -> Result<HttpRequest, ApiError> {
        let payload = Name {
            name: name.to_string(),
        };
        self.request_with_body(HttpMethod::Put, "name", &payload)
    }

    pub fn build_get_metrics_setting(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, "metrics/enabled")
    }

    pub fn build_set_metrics_setting(&self, enabled: bool) -> Result<HttpRequest, ApiError> {
        let payload = MetricsSetting {
            metrics_enabled: enabled,
        };
        self.request_with_body(HttpMethod::Put, "metrics/enabled", &payload)
    }

    pub fn build_create_access_key(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, "access-keys")
    }

    pub fn build_get_access_keys(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, "access-keys")
    }

    pub fn build_delete_access_key(&self, id: &str) -> Result<HttpRequest, ApiError> {
        let path = format!("access-keys/{}", encode_segment(id));
        self.request(HttpMethod::Delete, &path)
    }

    pub fn build_rename_access_key(&self, id: &str, name: &str) -> Result<HttpRequest, ApiError> {
        let path = format!("access-keys/{}/name", encode_segment(id));
        let payload = Name {
            name: name.to_string(),
        };
        self.request_with_body(HttpMethod::Put, &path, &payload)
    }

    pub fn build_get_usage_metrics(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, "metrics/transfer")
    }

    // --- Response parsing ---

    pub fn parse_get_server_info(&self, response: HttpResponse) -> Result<ServerInfo, ApiError> {
        self.handle(&response, 200)?;
        decode(&response)
    }

    pub fn parse_rename_server(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.handle(&response, 204)
    }

    pub fn parse_get_metrics_setting(&self, response: HttpResponse) -> Result<bool, ApiError> {
        self.handle(&response, 200)?;
        let setting: MetricsSetting = decode(&response)?;
        Ok(setting.metrics_enabled)
    }

    pub fn parse_set_metrics_setting(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.handle(&response, 204)
    }

    pub fn parse_create_access_key(&self, response: HttpResponse) -> Result<AccessKey, ApiError> {
        self.handle(&response, 201)?;
        decode(&response)
    }

    pub fn parse_get_access_keys(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<AccessKey>, ApiError> {
        self.handle(&response, 200)?;
        let list: AccessKeyList = decode(&response)?;
        Ok(list.access_keys)
    }

    pub fn parse_delete_access_key(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.handle(&response, 204)
    }

    pub fn parse_rename_access_key(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.handle(&response, 204)
    }

    pub fn parse_get_usage_metrics(
        &self,
        response: HttpResponse,
    ) -> Result<HashMap<String, i64>, ApiError> {
        self.handle(&response, 200)?;
        let usage: UsageMetrics = decode(&response)?;
        Ok(usage.bytes_transferred_by_user_id)
    }

    // --- Round-trips ---

    /// Fetch the server's name, id, metrics flag, creation time and default port.
    pub async fn get_server_info(&self) -> Result<ServerInfo, ApiError> {
        let response = self.send(self.build_get_server_info()?).await?;
        self.parse_get_server_info(response)
    }

    pub async fn rename_server(&self, name: &str) -> Result<(), ApiError> {
        let response = self.send(self.build_rename_server(name)?).await?;
        self.parse_rename_server(response)
    }

    /// Whether the server shares anonymous metrics.
    pub async fn get_metrics_setting(&self) -> Result<bool, ApiError> {
        let response = self.send(self.build_get_metrics_setting()?).await?;
        self.parse_get_metrics_setting(response)
    }

    pub async fn set_metrics_setting(&self, enabled: bool) -> Result<(), ApiError> {
        let response = self.send(self.build_set_metrics_setting(enabled)?).await?;
        self.parse_set_metrics_setting(response)
    }

    pub async fn create_access_key(&self) -> Result<AccessKey, ApiError> {
        let response = self.send(self.build_create_access_key()?).await?;
        self.parse_create_access_key(response)
    }

    /// List all access keys in the order the server returns them.
    pub async fn get_access_keys(&self) -> Result<Vec<AccessKey>, ApiError> {
        let response = self.send(self.build_get_access_keys()?).await?;
        self.parse_get_access_keys(response)
    }

    pub async fn delete_access_key(&self, id: &str) -> Result<(), ApiError> {
        let response = self.send(self.build_delete_access_key(id)?).await?;
        self.parse_delete_access_key(response)
    }

    pub async fn rename_access_key(&self, id: &str, name: &str) -> Result<(), ApiError> {
        let response = self.send(self.build_rename_access_key(id, name)?).await?;
        self.parse_rename_access_key(response)
    }

    /// Bytes transferred per access key id.
    pub async fn get_usage_metrics(&self) -> Result<HashMap<String, i64>, ApiError> {
        let response = self.send(self.build_get_usage_metrics()?).await?;
        self.parse_get_usage_metrics(response)
    }

    // --- Internals ---

    fn request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, ApiError> {
        build_request::<()>(&self.api_url, method, path, None)
    }

    fn request_with_body<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        build_request(&self.api_url, method, path, Some(payload))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(request).await
    }

    /// Check the pinned fingerprint, then the status code.
    fn handle(&self, response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
        if !verify_chain(&response.peer_certificates, &self.cert_sha256) {
            warn!(
                "peer certificate does not match pinned fingerprint {} for {}",
                self.cert_sha256, self.api_url
            );
            return Err(ApiError::UntrustedCertificate);
        }
        check_status(response, expected)
    }
}

fn parse_api_url(api_url: &str) -> Result<Url, ApiError> {
    let mut api_url = api_url.trim().to_string();
    if !api_url.ends_with('/') {
        api_url.push('/');
    }
    let url = Url::parse(&api_url)
        .map_err(|e| ApiError::ConstructionError(format!("api url {api_url}: {e}")))?;
    if url.scheme() != "https" {
        return Err(ApiError::ConstructionError(format!(
            "api url {api_url}: scheme must be https"
        )));
    }
    Ok(url)
}

fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    debug!("unexpected status {}, body: {}", response.status, response.body);
    Err(ApiError::UnexpectedStatus {
        expected,
        actual: response.status,
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::DecodeError(e.to_string()))
}
