#[cfg(test)]
mod tests {
    use crate::{
        ChangeNotification, ParseError, RoomChange, decode_room_messages, decode_rooms_changed,
        parse_changed_frame,
    };
    use serde_json::json;

    fn notification(collection: &str, event_name: &str, args: serde_json::Value) -> ChangeNotification {
        let args = args.as_array().cloned().unwrap_or_default();
        ChangeNotification::new(collection, event_name, args)
    }

    #[test]
    fn test_parse_changed_frame() {
        let frame = json!({
            "msg": "changed",
            "collection": "stream-room-messages",
            "id": "id",
            "fields": {
                "eventName": "r1",
                "args": [{ "_id": "m1", "rid": "r1", "msg": "hi" }]
            }
        });

        let parsed = parse_changed_frame(&frame).unwrap();

        assert_eq!(parsed.collection, "stream-room-messages");
        assert_eq!(parsed.event_name, "r1");
        assert_eq!(parsed.args.len(), 1);
    }

    #[test]
    fn test_parse_changed_frame_wrong_kind() {
        let frame = json!({ "msg": "added", "collection": "users", "fields": {} });

        assert!(parse_changed_frame(&frame).is_err());
    }

    #[test]
    fn test_decode_batched_messages() {
        let n = notification(
            "stream-room-messages",
            "r1",
            json!([
                { "_id": "m1", "rid": "r1", "msg": "one", "ts": { "$date": 1609459200000i64 } },
                { "_id": "m2", "rid": "r1", "msg": "two" }
            ]),
        );

        let messages: Vec<_> = decode_room_messages(&n)
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "one");
        assert_eq!(messages[1].id.as_deref(), Some("m2"));
    }

    #[test]
    fn test_decode_messages_empty() {
        let n = notification("stream-room-messages", "r1", json!([]));
        let err = decode_room_messages(&n).unwrap_err();

        assert!(matches!(err.downcast_ref::<ParseError>(), Some(ParseError::EmptyArgs)));
    }

    #[test]
    fn test_decode_messages_malformed() {
        let n = notification("stream-room-messages", "r1", json!([{ "msg": "no room id" }]));
        let decoded = decode_room_messages(&n).unwrap();

        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].is_err());
    }

    #[test]
    fn test_decode_messages_keeps_good_siblings() {
        let n = notification(
            "stream-room-messages",
            "r1",
            json!([
                { "_id": "m1", "rid": "r1", "msg": "before" },
                { "msg": "no room id" },
                { "_id": "m3", "rid": "r1", "msg": "after" }
            ]),
        );

        let decoded = decode_room_messages(&n).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].as_ref().unwrap().text, "before");
        assert!(decoded[1].is_err());
        assert_eq!(decoded[2].as_ref().unwrap().text, "after");
    }

    #[test]
    fn test_decode_room_inserted() {
        let n = notification(
            "stream-notify-user",
            "u1/rooms-changed",
            json!(["inserted", { "_id": "r2", "name": "random", "t": "c" }]),
        );

        match decode_rooms_changed(&n).unwrap() {
            RoomChange::Inserted(room) => assert_eq!(room.id, "r2"),
            other => panic!("unexpected change: {:?}", other),
        }
    }

    #[test]
    fn test_decode_room_removed() {
        let n = notification(
            "stream-notify-user",
            "u1/rooms-changed",
            json!(["removed", { "_id": "r2" }]),
        );

        let change = decode_rooms_changed(&n).unwrap();

        assert!(matches!(change, RoomChange::Removed(_)));
        assert_eq!(change.room().id, "r2");
    }

    #[test]
    fn test_decode_rooms_changed_unknown_tag() {
        let n = notification(
            "stream-notify-user",
            "u1/rooms-changed",
            json!(["archived", { "_id": "r2" }]),
        );
        let err = decode_rooms_changed(&n).unwrap_err();

        assert!(matches!(err.downcast_ref::<ParseError>(), Some(ParseError::UnknownTag(t)) if t == "archived"));
    }

    #[test]
    fn test_decode_rooms_changed_wrong_selector() {
        let n = notification(
            "stream-notify-user",
            "u1/subscriptions-changed",
            json!(["inserted", { "_id": "r2" }]),
        );

        assert!(decode_rooms_changed(&n).is_err());
    }

    #[test]
    fn test_decode_rooms_changed_missing_room() {
        let n = notification("stream-notify-user", "u1/rooms-changed", json!(["inserted"]));
        let err = decode_rooms_changed(&n).unwrap_err();

        assert!(matches!(err.downcast_ref::<ParseError>(), Some(ParseError::MissingField(_))));
    }
}
