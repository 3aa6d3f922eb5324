//! Error types for the Outline management API client.
//!
//! # Design
//! Every call either succeeds or fails with exactly one of these variants.
//! `UntrustedCertificate` is kept separate from `TransportError` because a
//! fingerprint mismatch means the peer is not the pinned server, while a
//! transport error only means the request never completed. Underlying
//! library errors are carried as their rendered message.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by `OutlineClient` and its helpers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API URL or the certificate fingerprint was rejected at client creation.
    #[error("invalid client configuration: {0}")]
    ConstructionError(String),

    /// The bootstrap descriptor is missing a line or could not be read.
    #[error("invalid access config: {0}")]
    InvalidAccessConfig(String),

    /// A relative endpoint path could not be resolved against the API URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request did not complete (connect, DNS, TLS handshake or timeout).
    #[error("transport error: {0}")]
    TransportError(String),

    /// No certificate presented by the peer matches the pinned fingerprint.
    #[error("untrusted certificate: peer does not match pinned fingerprint")]
    UntrustedCertificate,

    /// The server answered with a status other than the one the endpoint promises.
    #[error("unexpected status: expected {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    /// The response body could not be deserialized into the expected type.
    #[error("decode failed: {0}")]
    DecodeError(String),
}
