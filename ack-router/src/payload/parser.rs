//! Request body decoding.
//!
//! Slack delivers three body shapes:
//! - Events API: a JSON object
//! - Slash commands: form-encoded fields
//! - Interactive components: form-encoded with a single `payload` field
//!   holding the real JSON payload

use serde_json::{Map, Value};
use tracing::debug;
use url::form_urlencoded;

use super::Payload;
use crate::error::BodyError;

/// Form field that carries the JSON payload of interactive components.
pub const PAYLOAD_FIELD: &str = "payload";

/// Decode a raw request body into a payload.
///
/// Parsing is all-or-nothing: any JSON error, a non-object document, or an
/// empty result fails the whole body.
pub fn parse(raw_body: &str) -> Result<Payload, BodyError> {
    if raw_body.is_empty() {
        return Err(BodyError::Empty);
    }

    let fields = if raw_body.starts_with('{') {
        debug!(body_length = raw_body.len(), "payload_parse_json");
        decode_json_object(raw_body)?
    } else {
        let mut form = decode_form(raw_body);
        match form.remove(PAYLOAD_FIELD) {
            Some(Value::String(embedded)) => {
                debug!(payload_length = embedded.len(), "payload_parse_form_envelope");
                decode_json_object(&embedded)?
            }
            _ => {
                debug!(field_count = form.len(), "payload_parse_form");
                form
            }
        }
    };

    if fields.is_empty() {
        return Err(BodyError::EmptyPayload);
    }

    Ok(Payload::new(fields))
}

fn decode_json_object(raw: &str) -> Result<Map<String, Value>, BodyError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(BodyError::NotAnObject),
    }
}

/// Percent-decode form fields into string values. A repeated key keeps its
/// last value.
fn decode_form(raw: &str) -> Map<String, Value> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}
