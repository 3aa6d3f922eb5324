//! Async client for the Outline server management API.
//!
//! # Overview
//! Manages access keys, the server name, the metrics-sharing flag and usage
//! metrics on a running Outline ("shadowbox") server. The server presents a
//! self-signed certificate with no Subject Alternative Names, so the client
//! pins the certificate's SHA-256 fingerprint instead of validating a chain.
//!
//! # Design
//! - `OutlineClient` is immutable after construction and cheap to clone.
//! - Each operation is split into `build_*` (produces an `HttpRequest`),
//!   `parse_*` (consumes an `HttpResponse`) and an async method that runs the
//!   round-trip through a `Transport`.
//! - `HttpsTransport` skips chain validation and reports the peer certificate
//!   of every response; the fingerprint check runs on every call.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod access;
pub mod client;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod transport;
pub mod types;

pub use access::AccessConfig;
pub use client::OutlineClient;
pub use error::{ApiError, ApiResult};
pub use fingerprint::{verify_chain, Fingerprint};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{HttpsTransport, Transport, REQUEST_TIMEOUT};
pub use types::{AccessKey, AccessKeyList, MetricsSetting, Name, ServerInfo, UsageMetrics};
