//! Executes `HttpRequest`s and reports the peer certificates of each response.
//!
//! # Design
//! `Transport` is the seam between request building and the network. The
//! production implementation, `HttpsTransport`, disables chain-of-trust
//! verification at the TLS layer because the server's certificate is
//! self-signed and has no SANs. It does not decide trust itself: it records
//! the certificate of the connection that carried every response, and
//! `OutlineClient` checks that against its pinned fingerprint after the fact.
//! Pooled connections are therefore re-checked on every request they serve.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::tls::TlsInfo;
use reqwest::{Client, Method};
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Upper bound on a full request/response round-trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static SHARED: OnceLock<Arc<HttpsTransport>> = OnceLock::new();

/// Executes a request and returns the response as plain data.
///
/// Implementations must fill `HttpResponse::peer_certificates` with the
/// certificates presented on the connection that produced the response.
/// Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// HTTPS transport backed by `reqwest` with certificate validation turned off.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    inner: Client,
}

impl HttpsTransport {
    pub fn new() -> Result<Self, ApiError> {
        let inner = Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(true)
            .tls_info(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::ConstructionError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { inner })
    }

    /// The process-wide transport, created on first use.
    pub fn shared() -> Result<Arc<Self>, ApiError> {
        if let Some(transport) = SHARED.get() {
            return Ok(Arc::clone(transport));
        }
        let transport = Arc::new(Self::new()?);
        Ok(Arc::clone(SHARED.get_or_init(|| transport)))
    }
}

#[async_trait]
impl Transport for HttpsTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!("{} {}", request.method.as_str(), request.url);

        let mut builder = self.inner.request(to_method(request.method), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_error)?;

        let status = response.status().as_u16();
        let peer_certificates = response
            .extensions()
            .get::<TlsInfo>()
            .and_then(TlsInfo::peer_certificate)
            .map(|der| vec![der.to_vec()])
            .unwrap_or_default();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(classify_error)?;

        debug!("response status {status}, {} peer certificate(s)", peer_certificates.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
            peer_certificates,
        })
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn classify_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::TransportError(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ApiError::TransportError(format!("connection failed: {e}"))
    } else {
        ApiError::TransportError(e.to_string())
    }
}
