use super::ChangeNotification;
use crate::client::ROOMS_CHANGED_EVENT;
use crate::models::{Message, Room};
use crate::ParseError;
use anyhow::{Context, Result};
use serde::Deserialize;

/// What happened to a room in the user's room list.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomChange {
    Inserted(Room),
    Updated(Room),
    Removed(Room),
}

impl RoomChange {
    pub fn room(&self) -> &Room {
        match self {
            Self::Inserted(room) | Self::Updated(room) | Self::Removed(room) => room,
        }
    }
}

/// Decode a room message stream notification.
///
/// The server may batch several messages into one notification. Each
/// argument is decoded on its own, so one malformed message does not take
/// its siblings down with it. Only an empty argument list fails outright.
pub fn decode_room_messages(notification: &ChangeNotification) -> Result<Vec<Result<Message>>> {
    if notification.args.is_empty() {
        return Err(ParseError::EmptyArgs.into());
    }

    Ok(notification
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            Message::deserialize(arg).with_context(|| format!("Invalid message at args[{}]", i))
        })
        .collect())
}

/// Decode a `rooms-changed` notification: `args[0]` is the tag, `args[1]` the room.
pub fn decode_rooms_changed(notification: &ChangeNotification) -> Result<RoomChange> {
    let selector = notification
        .event_name
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if selector != ROOMS_CHANGED_EVENT {
        return Err(ParseError::InvalidFormat(format!(
            "not a rooms-changed event: {}",
            notification.event_name
        ))
        .into());
    }

    let tag = notification
        .arg(0)?
        .as_str()
        .ok_or_else(|| ParseError::InvalidFormat("rooms-changed tag is not a string".to_string()))?;

    let room = Room::deserialize(notification.arg(1)?)
        .context("Invalid room in rooms-changed notification")?;

    match tag {
        "inserted" => Ok(RoomChange::Inserted(room)),
        "updated" => Ok(RoomChange::Updated(room)),
        "removed" => Ok(RoomChange::Removed(room)),
        other => Err(ParseError::UnknownTag(other.to_string()).into()),
    }
}
