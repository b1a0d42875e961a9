use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::RawMessage;

/// An invitation body could not be turned into an `InvitationEvent`.
#[derive(Error, Debug)]
#[error("message {message_id} has an invalid invitation body: {error}")]
pub struct ParseError {
    pub message_id: String,
    pub error: serde_json::Error,
}

/// An invitation as published on the SMS notification queue.
///
/// The whole event is the deduplication identity: two messages with equal
/// content are the same invitation, whatever their queue message ids are.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvitationEvent {
    /// The SMS API endpoint the invitation must be posted to.
    #[serde(rename = "url")]
    pub destination_url: String,
    #[serde(rename = "from", default)]
    pub from_name: String,
    #[serde(rename = "evt_name", default)]
    pub event_name: String,
    #[serde(rename = "evt_url", default)]
    pub event_url: String,
    #[serde(rename = "to")]
    pub recipient: String,
}

impl InvitationEvent {
    pub fn from_message(message: &RawMessage) -> Result<Self, ParseError> {
        serde_json::from_str(&message.body).map_err(|error| ParseError {
            message_id: message.message_id.to_owned(),
            error,
        })
    }
}

/// The request body expected by the SMS API.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub to: String,
    pub message: String,
    pub url: String,
}

impl From<&InvitationEvent> for DispatchRequest {
    fn from(event: &InvitationEvent) -> Self {
        // The trailing space is part of the text recipients have always received.
        let message = format!(
            "{} wants you to attend {}, check it out here: {} ",
            event.from_name, event.event_name, event.event_url
        );

        Self {
            to: event.recipient.to_owned(),
            message,
            url: event.destination_url.to_owned(),
        }
    }
}
