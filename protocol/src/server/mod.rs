mod room;
mod tests;

use crate::ParseError;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub use room::{RoomChange, decode_room_messages, decode_rooms_changed};

/// A change pushed by the server for a subscribed collection.
///
/// Stream collections carry an event name (room ID, or `"{userId}/rooms-changed"`)
/// and a list of untyped arguments whose shape depends on the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeNotification {
    #[serde(default)]
    pub collection: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl ChangeNotification {
    pub fn new(collection: impl Into<String>, event_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            collection: collection.into(),
            event_name: event_name.into(),
            args,
        }
    }

    /// Argument at `index`, or a `MissingField` error naming it.
    pub fn arg(&self, index: usize) -> Result<&Value> {
        self.args
            .get(index)
            .ok_or_else(|| ParseError::MissingField(format!("args[{}]", index)).into())
    }
}

/// Parse a raw DDP `changed` frame into a notification.
///
/// Frame shape: `{"msg":"changed","collection":C,"id":ID,"fields":{"eventName":E,"args":[...]}}`
pub fn parse_changed_frame(frame: &Value) -> Result<ChangeNotification> {
    let kind = frame
        .get("msg")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingField("msg".to_string()))?;

    if kind != "changed" {
        return Err(ParseError::InvalidFormat(format!("expected changed frame, got {}", kind)).into());
    }

    let collection = frame
        .get("collection")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingField("collection".to_string()))?;

    let fields = frame
        .get("fields")
        .cloned()
        .ok_or_else(|| ParseError::MissingField("fields".to_string()))?;

    let mut notification: ChangeNotification =
        serde_json::from_value(fields).context("Failed to decode changed fields")?;
    notification.collection = collection.to_string();

    Ok(notification)
}
