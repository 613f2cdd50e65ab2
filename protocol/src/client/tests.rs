#[cfg(test)]
mod tests {
    use crate::models::{LoginPassword, LoginRequest, LoginUser, Message};
    use crate::{ClientCommand, Subscription};
    use serde_json::json;

    #[test]
    fn test_login_params() {
        let cmd = ClientCommand::Login(LoginRequest {
            user: LoginUser {
                email: "bot@example.com".to_string(),
                username: String::new(),
            },
            password: LoginPassword {
                digest: "d".to_string(),
                algorithm: "sha-256".to_string(),
            },
        });

        assert_eq!(cmd.method(), "login");
        assert_eq!(
            cmd.params(),
            vec![json!({
                "user": { "email": "bot@example.com" },
                "password": { "digest": "d", "algorithm": "sha-256" }
            })]
        );
    }

    #[test]
    fn test_send_message_params() {
        let cmd = ClientCommand::SendMessage(Message::new("r1", "hello"));

        assert_eq!(cmd.method(), "sendMessage");
        assert_eq!(cmd.params(), vec![json!({ "rid": "r1", "msg": "hello" })]);
    }

    #[test]
    fn test_notify_room_params() {
        let cmd = ClientCommand::NotifyRoom {
            room_id: "r1".to_string(),
            event: "typing".to_string(),
            args: vec![json!("bot"), json!(true)],
        };

        assert_eq!(cmd.method(), "stream-notify-room");
        assert_eq!(cmd.params(), vec![json!("r1/typing"), json!("bot"), json!(true)]);
    }

    #[test]
    fn test_subscriptions() {
        let room = Subscription::RoomMessages("r1".to_string());
        let user = Subscription::UserRoomsChanged("u1".to_string());

        assert_eq!(room.stream_name(), "stream-room-messages");
        assert_eq!(room.params(), vec![json!("r1"), json!(false)]);
        assert_eq!(user.stream_name(), "stream-notify-user");
        assert_eq!(user.params(), vec![json!("u1/rooms-changed"), json!(false)]);
    }
}
