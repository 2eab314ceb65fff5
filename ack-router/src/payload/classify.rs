//! Derive the routable `(type, id)` identity of a payload.
//!
//! The id location depends on the payload type and follows Slack's wire
//! format. The table is closed: unknown types are rejected.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use super::{Payload, PayloadIdentity};
use crate::error::PayloadError;

/// Payload types the router knows how to identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    BlockActions,
    BlockSuggestion,
    Command,
    EventCallback,
    MessageAction,
    Shortcut,
    WorkflowStepEdit,
    ViewClosed,
    ViewSubmission,
}

impl PayloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadType::BlockActions => "block_actions",
            PayloadType::BlockSuggestion => "block_suggestion",
            PayloadType::Command => "command",
            PayloadType::EventCallback => "event_callback",
            PayloadType::MessageAction => "message_action",
            PayloadType::Shortcut => "shortcut",
            PayloadType::WorkflowStepEdit => "workflow_step_edit",
            PayloadType::ViewClosed => "view_closed",
            PayloadType::ViewSubmission => "view_submission",
        }
    }

    /// Location of the id field within a payload of this type.
    pub fn id_path(&self) -> &'static [&'static str] {
        match self {
            PayloadType::BlockActions => &["actions", "0", "action_id"],
            PayloadType::BlockSuggestion => &["action_id"],
            PayloadType::Command => &["command"],
            PayloadType::EventCallback => &["event", "type"],
            PayloadType::MessageAction | PayloadType::Shortcut | PayloadType::WorkflowStepEdit => {
                &["callback_id"]
            }
            PayloadType::ViewClosed | PayloadType::ViewSubmission => &["view", "callback_id"],
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadType {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block_actions" => Ok(PayloadType::BlockActions),
            "block_suggestion" => Ok(PayloadType::BlockSuggestion),
            "command" => Ok(PayloadType::Command),
            "event_callback" => Ok(PayloadType::EventCallback),
            "message_action" => Ok(PayloadType::MessageAction),
            "shortcut" => Ok(PayloadType::Shortcut),
            "workflow_step_edit" => Ok(PayloadType::WorkflowStepEdit),
            "view_closed" => Ok(PayloadType::ViewClosed),
            "view_submission" => Ok(PayloadType::ViewSubmission),
            other => Err(PayloadError::UnsupportedType(other.to_string())),
        }
    }
}

/// Determine the routable identity of a payload.
///
/// The type comes from the `type` field, or is `command` when only a
/// `command` field is present. The id must be a non-empty string.
pub fn classify(payload: &Payload) -> Result<PayloadIdentity, PayloadError> {
    let payload_type = detect_type(payload)?;
    let path = payload_type.id_path();

    let id = match payload.str_at(path) {
        Some(id) if !id.is_empty() => id,
        _ => {
            warn!(
                payload_type = %payload_type,
                id_path = %path.join("."),
                "payload_id_missing"
            );
            return Err(PayloadError::MissingId {
                kind: payload_type.to_string(),
                path: path.join("."),
            });
        }
    };

    let identity = PayloadIdentity {
        kind: payload_type.to_string(),
        id: id.to_string(),
    };

    debug!(payload_type = %identity.kind, id = %identity.id, "payload_classified");

    Ok(identity)
}

fn detect_type(payload: &Payload) -> Result<PayloadType, PayloadError> {
    if let Some(kind) = payload.str_at(&["type"]).filter(|s| !s.is_empty()) {
        return kind.parse().map_err(|e| {
            warn!(payload_type = %kind, "payload_type_unsupported");
            e
        });
    }

    if payload.get("command").is_some() {
        return Ok(PayloadType::Command);
    }

    warn!("payload_type_missing");
    Err(PayloadError::MissingType)
}
