//! Gateway mode: talk to a running gateway over its WebSocket RPC API.

use core::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use clawcfg_document::Object;
use clawcfg_primitives::config::{ConfigPayload, HealthInfo};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::TransportError;
use crate::transport::Transport;

mod backoff;
pub mod handshake;
mod session;

pub use backoff::ReconnectPolicy;
use session::Session;

/// Connection parameters for [`GatewayTransport`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub url: Url,
    /// Shared secret, signed into the device claim and sent as `auth.token`.
    pub token: Option<String>,
    /// Deadline for a single request/response exchange.
    pub request_timeout: Duration,
    /// How long to wait for the gateway's connect challenge.
    pub challenge_timeout: Duration,
    /// Deadline for the WebSocket opening handshake.
    pub dial_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub user_agent: String,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            token: None,
            request_timeout: Duration::from_secs(30),
            challenge_timeout: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            user_agent: concat!("clawcfg/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|token: &String| !token.is_empty());
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub const fn with_dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    #[must_use]
    pub const fn with_challenge_timeout(mut self, challenge_timeout: Duration) -> Self {
        self.challenge_timeout = challenge_timeout;
        self
    }

    #[must_use]
    pub const fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// [`Transport`] backed by a live gateway session.
///
/// A session lost mid-way (typically because a write made the gateway
/// restart) is replaced on the next call by a freshly authenticated one.
/// Requests themselves are never resent. Closing the transport also stops a
/// reconnect that is in progress.
pub struct GatewayTransport {
    config: GatewayConfig,
    session: Mutex<Option<Arc<Session>>>,
    closed: CancellationToken,
}

impl core::fmt::Debug for GatewayTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GatewayTransport")
            .field("url", &self.config.url.as_str())
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl GatewayTransport {
    /// Connects and authenticates, retrying per [`GatewayConfig::reconnect`].
    pub async fn connect(config: GatewayConfig) -> Result<Self, TransportError> {
        let closed = CancellationToken::new();
        let session = establish(&config, &closed).await?;

        Ok(Self {
            config,
            session: Mutex::new(Some(Arc::new(session))),
            closed,
        })
    }

    /// Identity the current session authenticated with. `None` while no
    /// session is open, including while a reconnect is in progress.
    #[must_use]
    pub fn device_id(&self) -> Option<String> {
        self.session
            .try_lock()
            .ok()?
            .as_ref()
            .filter(|session| !session.is_closed())
            .map(|session| session.device_id().to_owned())
    }

    /// Number of requests currently waiting for a response.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.session.try_lock().map_or(0, |current| {
            current.as_ref().map_or(0, |session| session.in_flight())
        })
    }

    /// Issues an arbitrary RPC and returns the payload of an affirmative
    /// response.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let session = self.session().await?;

        debug!(%method, "Calling gateway");

        let response = session.call(method, params).await?;

        if !response.ok {
            return Err(TransportError::Rejected {
                method: method.to_owned(),
                message: response.error_message(),
            });
        }

        Ok(response.payload.unwrap_or(Value::Null))
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, TransportError> {
        let payload = self.request(method, params).await?;

        serde_json::from_value(payload).map_err(|source| TransportError::Decode {
            method: method.to_owned(),
            source,
        })
    }

    async fn session(&self) -> Result<Arc<Session>, TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }

        let mut current = self.session.lock().await;

        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }

        if let Some(session) = current.as_ref().filter(|session| !session.is_closed()) {
            return Ok(Arc::clone(session));
        }

        info!(url = %self.config.url, "Gateway session lost, reconnecting");

        let session = Arc::new(establish(&self.config, &self.closed).await?);
        *current = Some(Arc::clone(&session));

        Ok(session)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigGetPayload {
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    config: Option<Object>,
}

#[async_trait]
impl Transport for GatewayTransport {
    async fn get_config(&self) -> Result<ConfigPayload, TransportError> {
        let payload: ConfigGetPayload = self.request_as("config.get", json!({})).await?;

        // Before the gateway has written a file, `raw` is null and the
        // effective defaults come back under `config`.
        let raw = match (payload.raw, payload.config) {
            (Some(raw), _) => raw,
            (None, Some(config)) => {
                serde_json::to_string_pretty(&config).map_err(|source| TransportError::Encode {
                    what: "effective config",
                    source,
                })?
            }
            (None, None) => String::new(),
        };

        Ok(ConfigPayload::new(raw, payload.hash))
    }

    async fn patch_config(&self, patch: &Object, base_hash: &str) -> Result<(), TransportError> {
        let raw = serde_json::to_string(patch).map_err(|source| TransportError::Encode {
            what: "patch",
            source,
        })?;

        let _payload = self
            .request("config.patch", json!({ "raw": raw, "baseHash": base_hash }))
            .await?;

        Ok(())
    }

    async fn apply_config(
        &self,
        raw: &str,
        base_hash: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut params = json!({ "raw": raw });

        if let Some(base_hash) = base_hash.filter(|hash| !hash.is_empty()) {
            params["baseHash"] = Value::from(base_hash);
        }

        let _payload = self.request("config.apply", params).await?;

        Ok(())
    }

    async fn health(&self) -> Result<HealthInfo, TransportError> {
        self.request_as("health", json!({})).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.cancel();

        if let Some(session) = self.session.lock().await.take() {
            session.shutdown().await;
        }

        Ok(())
    }
}

/// Opens a session, retrying with backoff. Dialing is the only step that is
/// ever retried. Gives up with [`TransportError::Closed`] as soon as `closed`
/// fires, whether mid-dial or between attempts.
async fn establish(
    config: &GatewayConfig,
    closed: &CancellationToken,
) -> Result<Session, TransportError> {
    let mut attempt = 1;

    loop {
        let opened = tokio::select! {
            biased;
            () = closed.cancelled() => return Err(TransportError::Closed),
            opened = Session::open(config) => opened,
        };

        match opened {
            Ok(session) => return Ok(session),
            Err(err) if attempt >= config.reconnect.attempts() => {
                return Err(TransportError::ConnectExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                let delay = config.reconnect.delay(attempt);

                warn!(
                    url = %config.url,
                    attempt,
                    error = %err,
                    ?delay,
                    "Gateway connection attempt failed, retrying"
                );

                tokio::select! {
                    biased;
                    () = closed.cancelled() => return Err(TransportError::Closed),
                    () = sleep(delay) => {}
                }

                attempt += 1;
            }
        }
    }
}
