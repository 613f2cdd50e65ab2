mod tests;

use crate::models::{LoginRequest, Message};
use serde_json::{Value, json};

pub const ROOM_MESSAGES_STREAM: &str = "stream-room-messages";
pub const NOTIFY_USER_STREAM: &str = "stream-notify-user";
pub const NOTIFY_ROOM_STREAM: &str = "stream-notify-room";
pub const ROOMS_CHANGED_EVENT: &str = "rooms-changed";
pub const TYPING_EVENT: &str = "typing";
pub const DIGEST_ALGORITHM: &str = "sha-256";

/// Remote methods that clients can call on the server
#[derive(Debug, Clone)]
pub enum ClientCommand {
    /// login {user, password: {digest, algorithm}}
    Login(LoginRequest),

    /// rooms/get
    GetRooms,

    /// sendMessage {rid, msg, ...}
    SendMessage(Message),

    /// stream-notify-room "ROOMID/EVENT", ARGS...
    NotifyRoom {
        room_id: String,
        event: String,
        args: Vec<Value>,
    },
}

impl ClientCommand {
    /// Name of the remote method
    pub fn method(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::GetRooms => "rooms/get",
            Self::SendMessage(_) => "sendMessage",
            Self::NotifyRoom { .. } => NOTIFY_ROOM_STREAM,
        }
    }

    /// Positional call parameters
    pub fn params(&self) -> Vec<Value> {
        match self {
            Self::Login(request) => vec![json!(request)],
            Self::GetRooms => Vec::new(),
            Self::SendMessage(message) => vec![json!(message)],
            Self::NotifyRoom {
                room_id,
                event,
                args,
            } => {
                let mut params = Vec::with_capacity(args.len() + 1);
                params.push(Value::String(format!("{}/{}", room_id, event)));
                params.extend(args.iter().cloned());
                params
            }
        }
    }
}

/// Streams the client subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Messages posted in a single room
    RoomMessages(String),

    /// Room list changes for a user
    UserRoomsChanged(String),
}

impl Subscription {
    pub fn stream_name(&self) -> &'static str {
        match self {
            Self::RoomMessages(_) => ROOM_MESSAGES_STREAM,
            Self::UserRoomsChanged(_) => NOTIFY_USER_STREAM,
        }
    }

    pub fn params(&self) -> Vec<Value> {
        match self {
            Self::RoomMessages(room_id) => vec![json!(room_id), json!(false)],
            Self::UserRoomsChanged(user_id) => {
                vec![json!(format!("{}/{}", user_id, ROOMS_CHANGED_EVENT)), json!(false)]
            }
        }
    }
}
