use std::io;

use camino::Utf8PathBuf;
use clawcfg_document::DocumentError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tracing::warn;

/// Broad category of a [`TransportError`], for callers deciding how to react.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Could not establish (or no longer holds) a session. Only connection
    /// establishment is ever retried, and only by the transport itself.
    Connection,
    /// The per-request deadline elapsed. The outcome of the request is
    /// unknown: it was sent and may still be applied.
    Timeout,
    /// The connection went away while a request was outstanding.
    ConnectionLost,
    /// The document or patch has the wrong shape. Never retryable.
    Structural,
    /// The operation does not exist for this transport.
    Capability,
    /// The gateway answered, but not affirmatively or not intelligibly.
    Remote,
    /// Local filesystem failure.
    Io,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("failed to dial {url}")]
    Dial {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("timed out dialing {url}")]
    DialTimeout { url: String },
    #[error("connect rejected: {0}")]
    HandshakeRejected(String),
    #[error("gave up connecting after {attempts} attempts")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: Box<TransportError>,
    },
    #[error("transport has been closed")]
    Closed,
    #[error("{method}: no response before the deadline")]
    Timeout { method: String },
    #[error("{method}: connection closed")]
    ConnectionClosed { method: String },
    #[error("{method} failed: {message}")]
    Rejected { method: String, message: String },
    #[error("{method}: malformed response payload")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {what}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("{method} is not available in document mode (no running gateway)")]
    Unsupported { method: &'static str },
    #[error("failed to {action} {path}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot expand {path}: {reason}")]
    Path { path: String, reason: &'static str },
}

impl TransportError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Dial { .. }
            | Self::DialTimeout { .. }
            | Self::HandshakeRejected(_)
            | Self::ConnectExhausted { .. }
            | Self::Closed => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ConnectionClosed { .. } => ErrorKind::ConnectionLost,
            Self::Document(_) | Self::Encode { .. } => ErrorKind::Structural,
            Self::Unsupported { .. } => ErrorKind::Capability,
            Self::Rejected { .. } | Self::Decode { .. } => ErrorKind::Remote,
            Self::Io { .. } | Self::Path { .. } => ErrorKind::Io,
        }
    }

    /// True when the connection dropped underneath an outstanding request,
    /// which is what a gateway restarting itself after a config write looks
    /// like from this side.
    #[must_use]
    pub const fn is_connection_closed(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConnectionLost)
    }

    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.kind(), ErrorKind::Capability)
    }

    /// Classifies a failed socket write.
    pub(crate) fn from_send(method: &str, err: tungstenite::Error) -> Self {
        if is_closed_socket(&err) {
            return Self::ConnectionClosed {
                method: method.to_owned(),
            };
        }

        Self::Rejected {
            method: method.to_owned(),
            message: format!("failed to send request: {err}"),
        }
    }
}

pub(crate) const fn is_closed_socket(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(
                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
                    | tungstenite::error::ProtocolError::SendAfterClosing
            )
    )
}

/// How a write ended once a dropped connection has been taken into account.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    /// The gateway acknowledged the write.
    Applied,
    /// The connection closed before the acknowledgement arrived. The write
    /// has most likely been applied and the gateway is reloading.
    ConnectionLost,
}

/// Turns a lost connection during a write into a warning.
///
/// A patch that makes the gateway restart tears the socket down before the
/// response can be delivered, so the caller sees [`ErrorKind::ConnectionLost`]
/// even though the write went through. Every other error is passed on.
pub fn soften_disconnect(result: Result<(), TransportError>) -> Result<WriteOutcome, TransportError> {
    match result {
        Ok(()) => Ok(WriteOutcome::Applied),
        Err(err) if err.is_connection_closed() => {
            warn!(error = %err, "Connection closed during write, the gateway is probably reloading");
            Ok(WriteOutcome::ConnectionLost)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_distinct() {
        let lost = TransportError::ConnectionClosed {
            method: "config.patch".to_owned(),
        };
        let timeout = TransportError::Timeout {
            method: "config.patch".to_owned(),
        };
        let unsupported = TransportError::Unsupported { method: "health" };
        let structural = TransportError::Document(DocumentError::EmptyPath);

        assert!(lost.is_connection_closed());
        assert!(!timeout.is_connection_closed());
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert!(unsupported.is_unsupported());
        assert_eq!(structural.kind(), ErrorKind::Structural);
        assert_eq!(TransportError::Closed.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = TransportError::Rejected {
            method: "config.apply".to_owned(),
            message: "base hash mismatch".to_owned(),
        };

        assert_eq!(err.to_string(), "config.apply failed: base hash mismatch");
        assert_eq!(
            TransportError::Unsupported { method: "health" }.to_string(),
            "health is not available in document mode (no running gateway)"
        );
    }

    #[test]
    fn test_send_errors_on_a_dead_socket_mean_connection_lost() {
        let closed = TransportError::from_send("config.patch", tungstenite::Error::AlreadyClosed);
        let reset = TransportError::from_send(
            "config.patch",
            tungstenite::Error::Io(io::Error::from(io::ErrorKind::BrokenPipe)),
        );
        let other = TransportError::from_send("config.patch", tungstenite::Error::AttackAttempt);

        assert!(closed.is_connection_closed());
        assert!(reset.is_connection_closed());
        assert_eq!(other.kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_soften_disconnect() {
        assert_eq!(soften_disconnect(Ok(())).ok(), Some(WriteOutcome::Applied));

        let lost = soften_disconnect(Err(TransportError::ConnectionClosed {
            method: "config.patch".to_owned(),
        }));
        assert_eq!(lost.ok(), Some(WriteOutcome::ConnectionLost));

        let hard = soften_disconnect(Err(TransportError::Timeout {
            method: "config.patch".to_owned(),
        }));
        assert!(matches!(hard, Err(TransportError::Timeout { .. })));
    }
}
