use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use clawcfg_primitives::frame::{Event, Frame, Request, RequestId, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::handshake::{ConnectParams, DeviceIdentity};
use super::GatewayConfig;
use crate::errors::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<SyncMutex<HashMap<RequestId, oneshot::Sender<Response>>>>;

const REQUEST_ID_PREFIX: &str = "clawcfg";

/// One authenticated connection to a gateway.
///
/// The receiver task is the only reader of the socket. Writers share the
/// sink behind a lock that is held for exactly one frame.
pub(crate) struct Session {
    sink: Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    next_id: AtomicU64,
    closed: CancellationToken,
    receiver: JoinHandle<()>,
    request_timeout: core::time::Duration,
    device_id: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device_id", &self.device_id)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Dials the gateway and runs the connect handshake.
    ///
    /// On any failure the socket is torn down before returning, so no
    /// half-authenticated session survives.
    pub(crate) async fn open(config: &GatewayConfig) -> Result<Self, TransportError> {
        let url = config.url.as_str();

        let (stream, _response) = timeout(config.dial_timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::DialTimeout {
                url: url.to_owned(),
            })?
            .map_err(|source| TransportError::Dial {
                url: url.to_owned(),
                source,
            })?;

        let (sink, stream) = stream.split();

        let pending = Pending::default();
        let closed = CancellationToken::new();
        let (challenge_tx, mut challenge_rx) = mpsc::channel(1);

        // Must be reading before anything is sent: the challenge is pushed
        // as soon as the socket opens.
        let receiver = tokio::spawn(receive(
            stream,
            Arc::clone(&pending),
            challenge_tx,
            closed.clone(),
        ));

        let identity = DeviceIdentity::generate();

        let session = Self {
            sink: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(0),
            closed,
            receiver,
            request_timeout: config.request_timeout,
            device_id: identity.id().to_owned(),
        };

        match session
            .handshake(config, &identity, &mut challenge_rx)
            .await
        {
            Ok(()) => {
                info!(%url, device_id = %session.device_id, "Connected to gateway");
                Ok(session)
            }
            Err(err) => {
                session.shutdown().await;
                Err(err)
            }
        }
    }

    async fn handshake(
        &self,
        config: &GatewayConfig,
        identity: &DeviceIdentity,
        challenge: &mut mpsc::Receiver<Event>,
    ) -> Result<(), TransportError> {
        let nonce = match timeout(config.challenge_timeout, challenge.recv()).await {
            Ok(Some(event)) => event.nonce().map(str::to_owned),
            Ok(None) => None,
            Err(_) => {
                debug!("No connect challenge received, signing without a nonce");
                None
            }
        };

        let params = ConnectParams::signed(
            identity,
            config.token.as_deref(),
            nonce.as_deref(),
            Utc::now().timestamp_millis(),
            &config.user_agent,
        );

        let params = serde_json::to_value(params).map_err(|source| TransportError::Encode {
            what: "connect parameters",
            source,
        })?;

        let response = self.call("connect", params).await?;

        if !response.ok {
            return Err(TransportError::HandshakeRejected(response.error_message()));
        }

        Ok(())
    }

    /// Sends one request and waits for its response.
    ///
    /// Resolves with [`TransportError::Timeout`] once the request deadline
    /// passes and with [`TransportError::ConnectionClosed`] if the receiver
    /// stops first. In both cases the request may already have been applied.
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Response, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed {
                method: method.to_owned(),
            });
        }

        let id = format!(
            "{REQUEST_ID_PREFIX}-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
        );

        let (tx, rx) = oneshot::channel();
        let _slot = PendingSlot::register(&self.pending, id.clone(), tx);

        let frame = Frame::Request(Request::new(id, method.to_owned(), params));
        let text = serde_json::to_string(&frame).map_err(|source| TransportError::Encode {
            what: "request frame",
            source,
        })?;

        trace!(%method, frame = %text, "Sending request");

        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|err| TransportError::from_send(method, err))?;

        tokio::select! {
            biased;
            response = rx => response.map_err(|_| TransportError::ConnectionClosed {
                method: method.to_owned(),
            }),
            () = self.closed.cancelled() => Err(TransportError::ConnectionClosed {
                method: method.to_owned(),
            }),
            () = sleep(self.request_timeout) => Err(TransportError::Timeout {
                method: method.to_owned(),
            }),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Closes the socket and stops the receiver. Every outstanding caller is
    /// woken with [`TransportError::ConnectionClosed`].
    pub(crate) async fn shutdown(&self) {
        self.closed.cancel();

        if let Err(err) = self.sink.lock().await.close().await {
            debug!(error = %err, "Gateway socket was already gone");
        }

        self.receiver.abort();
        self.pending.lock().clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.closed.cancel();
        self.receiver.abort();
    }
}

/// A registered response slot, removed again however the call ends.
struct PendingSlot<'a> {
    pending: &'a Pending,
    id: RequestId,
}

impl<'a> PendingSlot<'a> {
    fn register(pending: &'a Pending, id: RequestId, tx: oneshot::Sender<Response>) -> Self {
        let _previous = pending.lock().insert(id.clone(), tx);

        Self { pending, id }
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        let _ignored = self.pending.lock().remove(&self.id);
    }
}

async fn receive(
    mut stream: SplitStream<WsStream>,
    pending: Pending,
    challenge: mpsc::Sender<Event>,
    closed: CancellationToken,
) {
    while let Some(message) = stream.next().await {
        let decoded = match message {
            Ok(Message::Text(text)) => serde_json::from_str::<Frame>(&text),
            Ok(Message::Binary(data)) => serde_json::from_slice::<Frame>(&data),
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Gateway closed the connection");
                break;
            }
            Ok(_) => continue,
            Err(err) => {
                debug!(error = %err, "Gateway read failed");
                break;
            }
        };

        match decoded {
            Ok(Frame::Response(response)) => deliver(&pending, response),
            Ok(Frame::Event(event)) if event.is_challenge() => {
                if challenge.try_send(event).is_err() {
                    debug!("Dropping connect challenge, nobody is waiting for it");
                }
            }
            Ok(frame) => trace!(?frame, "Ignoring frame"),
            Err(err) => debug!(error = %err, "Ignoring undecodable frame"),
        }
    }

    closed.cancel();
    pending.lock().clear();
}

fn deliver(pending: &Pending, response: Response) {
    if response.id.is_empty() {
        trace!(?response, "Ignoring response without an id");
        return;
    }

    let Some(slot) = pending.lock().remove(&response.id) else {
        debug!(id = %response.id, "Response for a request nobody is waiting on");
        return;
    };

    if slot.send(response).is_err() {
        trace!("Caller stopped waiting before its response arrived");
    }
}
