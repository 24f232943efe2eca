//! Mode selection and client settings, layered as explicit value, then
//! environment, then default.

use core::time::Duration;
use std::env;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::document::DocumentTransport;
use crate::errors::TransportError;
use crate::gateway::{GatewayConfig, GatewayTransport};
use crate::transport::Transport;

pub const GATEWAY_URL_ENV: &str = "OPENCLAW_GATEWAY_URL";
pub const GATEWAY_TOKEN_ENV: &str = "OPENCLAW_GATEWAY_TOKEN";
pub const CONFIG_PATH_ENV: &str = "OPENCLAW_CONFIG_PATH";

pub const DEFAULT_CONFIG_PATH: &str = "~/.openclaw/openclaw.json";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid gateway URL {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("gateway URL must use ws:// or wss://, got {scheme}://")]
    UnsupportedScheme { scheme: String },
}

/// Which backend a [`ClientConfig`] selects.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Talk to a running gateway.
    Gateway,
    /// Edit the document on disk.
    Document,
}

#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ClientConfig {
    pub gateway_url: Option<Url>,
    pub token: Option<String>,
    pub config_path: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            token: None,
            config_path: DEFAULT_CONFIG_PATH.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`ClientConfig::from_env`], with variables resolved by `lookup`.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value: &String| !value.trim().is_empty());

        let mut config = Self::default();

        if let Some(url) = var(GATEWAY_URL_ENV) {
            config.gateway_url = Some(parse_gateway_url(&url)?);
        }

        config.token = var(GATEWAY_TOKEN_ENV);

        if let Some(path) = var(CONFIG_PATH_ENV) {
            config.config_path = path;
        }

        Ok(config)
    }

    pub fn with_gateway_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.gateway_url = Some(parse_gateway_url(url)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|token: &String| !token.is_empty());
        self
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        if self.gateway_url.is_some() {
            Mode::Gateway
        } else {
            Mode::Document
        }
    }

    /// Gateway settings derived from this configuration, if a URL is set.
    #[must_use]
    pub fn gateway(&self) -> Option<GatewayConfig> {
        let url = self.gateway_url.clone()?;

        let mut gateway = GatewayConfig::new(url).with_request_timeout(self.request_timeout);
        gateway.token.clone_from(&self.token);

        Some(gateway)
    }

    /// Opens the transport for the selected mode.
    pub async fn connect(&self) -> Result<Arc<dyn Transport>, TransportError> {
        if let Some(gateway) = self.gateway() {
            info!(url = %gateway.url, "Using gateway mode");

            return Ok(Arc::new(GatewayTransport::connect(gateway).await?));
        }

        let transport = DocumentTransport::new(&self.config_path)?;

        info!(path = %transport.path(), "Using document mode");

        Ok(Arc::new(transport))
    }
}

fn parse_gateway_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        scheme => Err(ConfigError::UnsupportedScheme {
            scheme: scheme.to_owned(),
        }),
    }
}
