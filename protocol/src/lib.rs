use thiserror::Error;

pub mod client;
pub mod models;
pub mod server;

pub use client::{ClientCommand, Subscription};
pub use models::{
    Attachment, AttachmentField, LoginPassword, LoginRequest, LoginResponse, LoginUser,
    Message, Room, RoomType, Timestamp, User,
};
pub use server::{
    ChangeNotification, RoomChange, decode_room_messages, decode_rooms_changed,
    parse_changed_frame,
};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Notification carried no arguments")]
    EmptyArgs,
}
