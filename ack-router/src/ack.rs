//! Acknowledgment values returned by handlers and their wire encoding.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppError;

/// What a handler returns to acknowledge a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Ack {
    /// No-content ack: an empty 200 response.
    #[default]
    Empty,
    /// Plain text, sent as `{"text": ...}`.
    Text(String),
    /// Structured response sent as-is.
    Json(Value),
}

impl Ack {
    /// Build a structured ack from any serializable value.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, AppError> {
        serde_json::to_value(value)
            .map(Ack::Json)
            .map_err(|e| AppError::Ack(e.to_string()))
    }
}

impl From<()> for Ack {
    fn from(_: ()) -> Self {
        Ack::Empty
    }
}

impl From<&str> for Ack {
    fn from(text: &str) -> Self {
        Ack::Text(text.to_string())
    }
}

impl From<String> for Ack {
    fn from(text: String) -> Self {
        Ack::Text(text)
    }
}

impl From<Value> for Ack {
    fn from(value: Value) -> Self {
        Ack::Json(value)
    }
}

impl<T: Into<Ack>> From<Option<T>> for Ack {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Encode an ack into a response body. Absent values encode as `""`.
pub fn encode(ack: &Ack) -> Result<String, AppError> {
    let value = match ack {
        Ack::Empty | Ack::Json(Value::Null) => return Ok(String::new()),
        Ack::Text(text) => json!({ "text": text }),
        Ack::Json(value) => value.clone(),
    };

    serde_json::to_string(&value).map_err(|e| AppError::Ack(e.to_string()))
}
