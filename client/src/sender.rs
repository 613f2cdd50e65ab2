use anyhow::Result;
use quill_protocol::client::TYPING_EVENT;
use quill_protocol::{ClientCommand, Message};
use serde_json::{Value, json};

use crate::Session;

impl Session {
    /// Post a plain text message to a room
    pub async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        self.send_custom_message(Message::new(channel_id, text)).await
    }

    /// Post a fully built message (alias, avatar, attachments, ...).
    ///
    /// The message comes back through the room stream like any other.
    pub async fn send_custom_message(&self, message: Message) -> Result<()> {
        self.ensure_logged_in()?;
        self.call(&ClientCommand::SendMessage(message)).await?;
        Ok(())
    }

    /// Broadcast a room-scoped event such as `typing` to the room's members
    pub async fn notify_room(&self, room_id: &str, event: &str, args: Vec<Value>) -> Result<()> {
        self.ensure_logged_in()?;
        self.call(&ClientCommand::NotifyRoom {
            room_id: room_id.to_string(),
            event: event.to_string(),
            args,
        })
        .await?;
        Ok(())
    }

    pub async fn is_typing(&self, room_id: &str, username: &str, typing: bool) -> Result<()> {
        self.notify_room(room_id, TYPING_EVENT, vec![json!(username), json!(typing)])
            .await
    }
}
