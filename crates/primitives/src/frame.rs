#[cfg(test)]
#[path = "tests/frame.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request Id is a locally unique identifier of a gateway request.
pub type RequestId = String;

/// Name of the unsolicited event a gateway pushes right after accepting a
/// connection.
pub const CHALLENGE_EVENT: &str = "connect.challenge";

/// One JSON message on the gateway socket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "req")]
    Request(Request),
    #[serde(rename = "res")]
    Response(Response),
    #[serde(rename = "event")]
    Event(Event),
}

// **************************** request *******************************
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    #[must_use]
    pub const fn new(id: RequestId, method: String, params: Value) -> Self {
        Self { id, method, params }
    }
}
// *************************************************************************

// **************************** response *******************************
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: RequestId,
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    #[must_use]
    pub const fn success(id: RequestId, payload: Value) -> Self {
        Self {
            id,
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    #[must_use]
    pub const fn failure(id: RequestId, error: Value) -> Self {
        Self {
            id,
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Renders the error body for diagnostics, whatever shape the gateway
    /// chose for it.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.error {
            None | Some(Value::Null) => "no error details".to_owned(),
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(body)) => match body.get("message").and_then(Value::as_str) {
                Some(message) => message.to_owned(),
                None => Value::Object(body.clone()).to_string(),
            },
            Some(other) => other.to_string(),
        }
    }
}
// *************************************************************************

// **************************** event *******************************
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Event {
    #[must_use]
    pub const fn new(event: String, payload: Option<Value>) -> Self {
        Self { event, payload }
    }

    #[must_use]
    pub fn is_challenge(&self) -> bool {
        self.event == CHALLENGE_EVENT
    }

    /// The challenge nonce, if the payload carries a non-empty one.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .get("nonce")?
            .as_str()
            .filter(|nonce| !nonce.is_empty())
    }
}
// *************************************************************************
