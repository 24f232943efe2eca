//! Read and write single sections of the document, addressed by key path.
//!
//! All helpers are generic over [`Transport`] and work the same in either
//! mode. Writes are expressed as merge patches, so keys outside the
//! addressed section are never touched.

use clawcfg_document::{nest, parse, section, Object};
use serde_json::Value;

use crate::errors::TransportError;
use crate::transport::Transport;

pub use clawcfg_document::lookup;

/// A section as read from the document, together with the fingerprint of the
/// document it was read from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    /// `None` when the section does not exist yet.
    pub value: Option<Object>,
    pub hash: String,
}

/// Reads the top-level section `key`.
pub async fn get_section<T>(transport: &T, key: &str) -> Result<Section, TransportError>
where
    T: Transport + ?Sized,
{
    get_nested_section(transport, &[key]).await
}

/// Reads the section at `path`, e.g. `["channels", "telegram"]`.
///
/// A missing segment yields a section without a value. A segment that holds
/// something other than an object is an error.
pub async fn get_nested_section<T, S>(transport: &T, path: &[S]) -> Result<Section, TransportError>
where
    T: Transport + ?Sized,
    S: AsRef<str> + Sync,
{
    let payload = transport.get_config().await?;
    let root = parse(&payload.raw)?;

    let value = section(&root, path)?.cloned();

    Ok(Section {
        value,
        hash: payload.hash,
    })
}

/// Merges `value` into the top-level section `key`.
pub async fn patch_section<T>(
    transport: &T,
    key: &str,
    value: Object,
    base_hash: &str,
) -> Result<(), TransportError>
where
    T: Transport + ?Sized,
{
    patch_nested_section(transport, &[key], value, base_hash).await
}

/// Merges `value` into the section at `path`, creating intermediate sections
/// as needed.
pub async fn patch_nested_section<T, S>(
    transport: &T,
    path: &[S],
    value: Object,
    base_hash: &str,
) -> Result<(), TransportError>
where
    T: Transport + ?Sized,
    S: AsRef<str> + Sync,
{
    let patch = nest(Value::Object(value), path)?;

    transport.patch_config(&patch, base_hash).await
}

/// Removes the top-level section `key`. Removing a missing section is a no-op.
pub async fn delete_section<T>(
    transport: &T,
    key: &str,
    base_hash: &str,
) -> Result<(), TransportError>
where
    T: Transport + ?Sized,
{
    delete_nested_section(transport, &[key], base_hash).await
}

/// Removes the section at `path`, leaving its siblings in place.
pub async fn delete_nested_section<T, S>(
    transport: &T,
    path: &[S],
    base_hash: &str,
) -> Result<(), TransportError>
where
    T: Transport + ?Sized,
    S: AsRef<str> + Sync,
{
    let patch = nest(Value::Null, path)?;

    transport.patch_config(&patch, base_hash).await
}
