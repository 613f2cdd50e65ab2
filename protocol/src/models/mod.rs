mod date;

use serde::{Deserialize, Serialize};

pub use date::Timestamp;

/// Kind of room as tagged on the wire.
///
/// The set is closed: a room carrying any other tag (a newer server's `v`,
/// say) fails to decode, and since `rooms/get` decodes the whole list at
/// once, so does the list and the login that fetches it. Extend this enum
/// when the server grows a new room kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "d")]
    Direct,
    #[serde(rename = "c")]
    Channel,
    #[serde(rename = "p")]
    Private,
    #[serde(rename = "l")]
    Livechat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<Timestamp>,
    #[serde(rename = "lm", default, skip_serializing_if = "Option::is_none")]
    pub last_message_date: Option<Timestamp>,
    #[serde(rename = "msg", default)]
    pub message_count: u64,
    #[serde(rename = "cl", default)]
    pub can_leave: bool,
    #[serde(rename = "ro", default)]
    pub read_only: bool,
    #[serde(default)]
    pub usernames: Vec<String>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Only present while authenticating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "tokenExpires", default, skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<Timestamp>,
}

impl User {
    /// Copy of this user with the authentication token fields cleared.
    pub fn without_token(&self) -> Self {
        Self {
            token: None,
            token_expiry: None,
            ..self.clone()
        }
    }
}

/// A chat message. Outbound messages only need `channel_id` and `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "rid")]
    pub channel_id: String,
    #[serde(rename = "msg", default)]
    pub text: String,
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl Message {
    pub fn new(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            channel_id: channel_id.into(),
            text: text.into(),
            timestamp: None,
            sender: None,
            alias: None,
            avatar: None,
            attachments: Vec::new(),
            emoji: None,
        }
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "thumb_url", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "message_link", default, skip_serializing_if = "Option::is_none")]
    pub message_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(rename = "author_link", default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "title_link", default, skip_serializing_if = "Option::is_none")]
    pub title_url: Option<String>,
    #[serde(rename = "title_link_download", default, skip_serializing_if = "is_false")]
    pub title_download: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentField {
    #[serde(default, skip_serializing_if = "is_false")]
    pub short: bool,
    pub title: String,
    pub value: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub user: LoginUser,
    pub password: LoginPassword,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginPassword {
    pub digest: String,
    pub algorithm: String,
}

/// Result of the `login` method. Only `id` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "tokenExpires", default)]
    pub token_expiry: Option<Timestamp>,
}
