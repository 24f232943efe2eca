//! OpenClaw Config Client
//!
//! Reads and edits the OpenClaw configuration document, either through a
//! running gateway or directly on disk.
//!
//! ## Modes
//!
//! - **Gateway**: when `OPENCLAW_GATEWAY_URL` is set, every operation is an
//!   RPC over an authenticated WebSocket session. Writes are forwarded to the
//!   gateway, which validates and persists them (and may restart itself).
//! - **Document**: otherwise the JSON file at `OPENCLAW_CONFIG_PATH`
//!   (default `~/.openclaw/openclaw.json`) is read and written directly.
//!
//! Both modes implement [`Transport`], and the [`section`] helpers work on
//! top of either.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clawcfg_client::{section, soften_disconnect, ClientConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = ClientConfig::from_env()?.connect().await?;
//!
//!     let gateway = section::get_section(&*transport, "gateway").await?;
//!     println!("gateway section: {:?}", gateway.value);
//!
//!     let mut port = serde_json::Map::new();
//!     let _ = port.insert("port".to_owned(), json!(18789));
//!
//!     // A restarting gateway may drop the connection before it acknowledges.
//!     let outcome = soften_disconnect(
//!         section::patch_section(&*transport, "gateway", port, &gateway.hash).await,
//!     )?;
//!     println!("write outcome: {outcome:?}");
//!
//!     transport.close().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod errors;
pub mod gateway;
pub mod section;
pub mod transport;

pub use clawcfg_document::Object;
pub use clawcfg_primitives::config::{ConfigPayload, HealthInfo};
pub use config::{ClientConfig, ConfigError, Mode};
pub use document::DocumentTransport;
pub use errors::{soften_disconnect, ErrorKind, TransportError, WriteOutcome};
pub use gateway::{GatewayConfig, GatewayTransport, ReconnectPolicy};
pub use section::Section;
pub use transport::Transport;
pub use url::Url;

/// Current version of the client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
