//! HTTP request and response descriptors and the request builder.
//!
//! # Design
//! Requests and responses are plain data. `OutlineClient` builds an
//! `HttpRequest`, hands it to a `Transport`, and receives an `HttpResponse`
//! that also records the certificates the peer presented on the connection
//! that carried it. Keeping both sides as values lets every endpoint be
//! tested without a network.
//!
//! Paths are resolved with RFC 3986 reference resolution against an API URL
//! that always ends in `/`. Endpoint paths never start with `/`, so they are
//! appended to the API URL's path (which usually carries a secret prefix)
//! instead of replacing it.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use url::Url;

use crate::error::ApiError;

/// Characters escaped when an identifier is substituted into a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
///
/// `peer_certificates` holds the DER certificates presented by the server
/// on the connection that produced this response, in the order the TLS
/// layer delivered them. It is empty for plain-HTTP connections.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub peer_certificates: Vec<Vec<u8>>,
}

/// Build a request for `path` relative to `base`, with an optional JSON payload.
pub fn build_request<T>(
    base: &Url,
    method: HttpMethod,
    path: &str,
    payload: Option<&T>,
) -> Result<HttpRequest, ApiError>
where
    T: Serialize + ?Sized,
{
    let url = base
        .join(path)
        .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))?;

    let (headers, body) = match payload {
        Some(payload) => {
            let body = serde_json::to_string(payload)
                .map_err(|e| ApiError::SerializationError(e.to_string()))?;
            (
                vec![("content-type".to_string(), "application/json".to_string())],
                Some(body),
            )
        }
        None => (Vec::new(), None),
    };

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

/// Percent-encode `segment` so it occupies exactly one path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
