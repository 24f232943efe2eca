use async_trait::async_trait;
use clawcfg_document::Object;
use clawcfg_primitives::config::{ConfigPayload, HealthInfo};

use crate::errors::TransportError;

/// The operations every backend provides.
///
/// Higher layers only ever talk to a `dyn Transport`, so the same code runs
/// against a live gateway or against the document on disk.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the whole document together with its fingerprint.
    async fn get_config(&self) -> Result<ConfigPayload, TransportError>;

    /// Merges `patch` onto the current document.
    ///
    /// `base_hash` is the fingerprint the caller last observed. Whether it is
    /// enforced is up to the backend.
    async fn patch_config(&self, patch: &Object, base_hash: &str) -> Result<(), TransportError>;

    /// Replaces the whole document with `raw`.
    async fn apply_config(&self, raw: &str, base_hash: Option<&str>)
        -> Result<(), TransportError>;

    /// Reports gateway health. Backends without a live peer return
    /// [`TransportError::Unsupported`].
    async fn health(&self) -> Result<HealthInfo, TransportError>;

    /// Releases the underlying resource.
    async fn close(&self) -> Result<(), TransportError>;
}
