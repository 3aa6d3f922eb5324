//! Parsing of the bootstrap descriptor written by the server installer.
//!
//! The installer leaves an `access.txt` with, among other lines:
//!
//! ```text
//! certSha256:E3B0C442...
//! apiURL:https://203.0.113.7:8081/SECRET
//! ```
//!
//! Only those two lines are read; everything else is ignored.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::ApiError;

lazy_static! {
    static ref CERT_SHA256: Regex = Regex::new(r"certSha256:(.+)").unwrap();
    static ref API_URL: Regex = Regex::new(r"apiURL:(.+)").unwrap();
}

/// Connection details needed to construct an `OutlineClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub api_url: String,
    pub cert_sha256: String,
}

impl AccessConfig {
    /// Extract the API URL and certificate fingerprint from descriptor text.
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        let cert_sha256 = capture(&CERT_SHA256, text)
            .ok_or_else(|| ApiError::InvalidAccessConfig("missing certSha256 line".into()))?;
        let api_url = capture(&API_URL, text)
            .ok_or_else(|| ApiError::InvalidAccessConfig("missing apiURL line".into()))?;
        Ok(Self {
            api_url,
            cert_sha256,
        })
    }

    /// Read and parse a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        debug!("reading access config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            ApiError::InvalidAccessConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_TXT: &str = "certSha256:E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855\r\n\
                              apiURL:https://203.0.113.7:8081/AbCdEf\r\n";

    #[test]
    fn parses_both_lines() {
        let config = AccessConfig::parse(ACCESS_TXT).unwrap();
        assert_eq!(config.api_url, "https://203.0.113.7:8081/AbCdEf");
        assert_eq!(
            config.cert_sha256,
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn line_order_does_not_matter() {
        let text = "apiURL:https://host:1/x\nsomething else\ncertSha256:AA\n";
        let config = AccessConfig::parse(text).unwrap();
        assert_eq!(config.api_url, "https://host:1/x");
        assert_eq!(config.cert_sha256, "AA");
    }

    #[test]
    fn missing_cert_line_is_error() {
        let err = AccessConfig::parse("apiURL:https://host:1/x\n").unwrap_err();
        assert!(matches!(err, ApiError::InvalidAccessConfig(ref m) if m.contains("certSha256")));
    }

    #[test]
    fn missing_api_url_line_is_error() {
        let err = AccessConfig::parse("certSha256:AA\n").unwrap_err();
        assert!(matches!(err, ApiError::InvalidAccessConfig(ref m) if m.contains("apiURL")));
    }

    #[test]
    fn from_file_reads_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.txt");
        std::fs::write(&path, ACCESS_TXT).unwrap();
        let config = AccessConfig::from_file(&path).unwrap();
        assert_eq!(config.api_url, "https://203.0.113.7:8081/AbCdEf");
    }

    #[test]
    fn from_file_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AccessConfig::from_file(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidAccessConfig(_)));
    }
}
