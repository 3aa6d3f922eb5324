//! SHA-256 certificate fingerprints and the pinning check.
//!
//! The managed server presents a self-signed certificate without any Subject
//! Alternative Names, so hostname and chain validation cannot succeed. Trust
//! is instead decided by comparing the SHA-256 digest of the raw DER
//! certificate against a fingerprint obtained out-of-band.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Length in bytes of a SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 32;

/// A pinned SHA-256 certificate fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Decode a hex fingerprint as found in the `certSha256:` line.
    ///
    /// Upper- and lower-case digits are accepted. Anything that is not
    /// exactly 32 bytes of hex fails with `ConstructionError`.
    pub fn from_hex(input: &str) -> Result<Self, ApiError> {
        let bytes = hex::decode(input.trim())
            .map_err(|e| ApiError::ConstructionError(format!("certificate fingerprint: {e}")))?;
        let digest: [u8; FINGERPRINT_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            ApiError::ConstructionError(format!(
                "certificate fingerprint must be {FINGERPRINT_LEN} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self(digest))
    }

    /// Hash the raw encoded bytes of a certificate.
    pub fn of_certificate(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    /// Whether `der` hashes to this fingerprint.
    pub fn matches(&self, der: &[u8]) -> bool {
        Self::of_certificate(der) == *self
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Decide whether a presented certificate chain is trusted.
///
/// Walks the chain in the order the TLS layer delivered it and returns true
/// on the first certificate whose digest equals `expected`. Issuer, expiry,
/// hostname and key usage are deliberately not inspected. An empty chain is
/// never trusted.
pub fn verify_chain<I, C>(chain: I, expected: &Fingerprint) -> bool
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    chain.into_iter().any(|cert| expected.matches(cert.as_ref()))
}
