#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical serialization of a document that does not exist yet.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Snapshot of the configuration document as seen by a transport.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    /// Serialized document.
    pub raw: String,
    /// Opaque fingerprint of `raw`, passed back as `baseHash` on writes.
    pub hash: String,
}

impl ConfigPayload {
    #[must_use]
    pub const fn new(raw: String, hash: String) -> Self {
        Self { raw, hash }
    }

    /// Payload whose hash is the SHA-256 digest of `raw`.
    #[must_use]
    pub fn hashed(raw: String) -> Self {
        let hash = hash_document(raw.as_bytes());

        Self { raw, hash }
    }

    /// The payload reported for a document that has never been written.
    #[must_use]
    pub fn empty() -> Self {
        Self::hashed(EMPTY_DOCUMENT.to_owned())
    }
}

/// Lowercase hex SHA-256 of the raw document bytes.
#[must_use]
pub fn hash_document(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthInfo {
    pub ok: bool,
    #[serde(rename = "ts")]
    pub timestamp: i64,
    pub duration_ms: i64,
    pub default_agent_id: String,
    pub heartbeat_seconds: i64,
}
