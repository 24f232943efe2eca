//! Document mode: the configuration file on disk is the source of truth.
//!
//! Used when no gateway is running, e.g. to provision a config before the
//! gateway boots for the first time.

use std::io::ErrorKind as IoErrorKind;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use clawcfg_document::{merge, parse, Object};
use clawcfg_primitives::config::{ConfigPayload, HealthInfo};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::TransportError;
use crate::transport::Transport;

/// Reads and writes one JSON document on disk.
///
/// Every operation holds the same lock for its whole duration, so within one
/// process reads and writes never interleave. Nothing coordinates separate
/// processes pointed at the same file.
#[derive(Debug)]
pub struct DocumentTransport {
    path: Utf8PathBuf,
    lock: Mutex<()>,
}

impl DocumentTransport {
    /// Creates a transport for `path`, expanding a leading `~/`. The file
    /// need not exist yet.
    pub fn new(path: &str) -> Result<Self, TransportError> {
        Ok(Self {
            path: expand_home(path)?,
            lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    async fn read_locked(&self) -> Result<ConfigPayload, TransportError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(ConfigPayload::hashed(raw)),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(ConfigPayload::empty()),
            Err(source) => Err(TransportError::Io {
                action: "read",
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write_locked(&self, contents: &[u8]) -> Result<(), TransportError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| TransportError::Io {
                    action: "create directory for",
                    path: self.path.clone(),
                    source,
                })?;
        }

        fs::write(&self.path, contents)
            .await
            .map_err(|source| TransportError::Io {
                action: "write",
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl Transport for DocumentTransport {
    async fn get_config(&self) -> Result<ConfigPayload, TransportError> {
        let _guard = self.lock.lock().await;

        self.read_locked().await
    }

    /// The base hash is not compared with the file; the patch always merges
    /// onto the current contents.
    async fn patch_config(&self, patch: &Object, _base_hash: &str) -> Result<(), TransportError> {
        let _guard = self.lock.lock().await;

        let current = self.read_locked().await?;
        let existing = parse(&current.raw)?;

        let merged = merge(Value::Object(existing), patch);

        let out = serde_json::to_vec_pretty(&merged).map_err(|source| TransportError::Encode {
            what: "merged document",
            source,
        })?;

        debug!(path = %self.path, keys = patch.len(), "Writing patched document");

        self.write_locked(&out).await
    }

    async fn apply_config(
        &self,
        raw: &str,
        _base_hash: Option<&str>,
    ) -> Result<(), TransportError> {
        let _guard = self.lock.lock().await;

        debug!(path = %self.path, bytes = raw.len(), "Replacing document");

        self.write_locked(raw.as_bytes()).await
    }

    async fn health(&self) -> Result<HealthInfo, TransportError> {
        Err(TransportError::Unsupported { method: "health" })
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Expands a leading `~/` to the current user's home directory.
pub fn expand_home(path: &str) -> Result<Utf8PathBuf, TransportError> {
    let rest = match path.strip_prefix("~/") {
        Some(rest) => rest,
        None if path == "~" => "",
        None => return Ok(Utf8PathBuf::from(path)),
    };

    let home = dirs::home_dir().ok_or_else(|| TransportError::Path {
        path: path.to_owned(),
        reason: "home directory is unknown",
    })?;

    let home = Utf8PathBuf::try_from(home).map_err(|_| TransportError::Path {
        path: path.to_owned(),
        reason: "home directory is not valid UTF-8",
    })?;

    Ok(home.join(rest))
}
