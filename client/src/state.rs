use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use quill_protocol::{Room, User};

/// Local cache of the rooms and users a session knows about.
///
/// Every accessor takes the lock for a single logical update and returns
/// owned copies, so callers never hold references into the maps.
pub struct State {
    rooms: RwLock<HashMap<String, Room>>,
    users: RwLock<HashMap<String, User>>,
}

impl State {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Discard every cached room and install `rooms` in one step
    pub fn replace_rooms(&self, rooms: impl IntoIterator<Item = Room>) {
        let fresh: HashMap<String, Room> = rooms.into_iter().map(|r| (r.id.clone(), r)).collect();
        *write(&self.rooms) = fresh;
    }

    /// Insert or overwrite a room, returning the previous entry
    pub fn upsert_room(&self, room: Room) -> Option<Room> {
        write(&self.rooms).insert(room.id.clone(), room)
    }

    pub fn upsert_rooms(&self, rooms: impl IntoIterator<Item = Room>) {
        let mut map = write(&self.rooms);
        for room in rooms {
            map.insert(room.id.clone(), room);
        }
    }

    pub fn remove_room(&self, id: &str) -> Option<Room> {
        write(&self.rooms).remove(id)
    }

    pub fn room_by_id(&self, id: &str) -> Option<Room> {
        read(&self.rooms).get(id).cloned()
    }

    /// First room with a matching name. Names are not unique.
    pub fn room_by_name(&self, name: &str) -> Option<Room> {
        read(&self.rooms).values().find(|r| r.name == name).cloned()
    }

    pub fn rooms(&self) -> Vec<Room> {
        read(&self.rooms).values().cloned().collect()
    }

    pub fn room_ids(&self) -> Vec<String> {
        read(&self.rooms).keys().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        read(&self.rooms).len()
    }

    /// Insert or overwrite a user. Token fields are never cached.
    pub fn upsert_user(&self, user: &User) -> Option<User> {
        write(&self.users).insert(user.id.clone(), user.without_token())
    }

    pub fn remove_user(&self, id: &str) -> Option<User> {
        write(&self.users).remove(id)
    }

    pub fn user_by_id(&self, id: &str) -> Option<User> {
        read(&self.users).get(id).cloned()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        read(&self.users)
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        read(&self.users).len()
    }

    pub fn clear(&self) {
        write(&self.rooms).clear();
        write(&self.users).clear();
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn room(id: &str, name: &str) -> Room {
        serde_json::from_value(serde_json::json!({ "_id": id, "name": name })).unwrap()
    }

    fn user(id: &str, username: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "username": username,
            "token": "secret"
        }))
        .unwrap()
    }

    #[test]
    fn test_replace_rooms() {
        let state = State::new();
        state.upsert_room(room("old", "stale"));

        state.replace_rooms(vec![room("r1", "general"), room("r2", "random")]);

        assert!(state.room_by_id("old").is_none());
        assert_eq!(state.room_by_id("r1").unwrap().name, "general");
        assert_eq!(state.room_by_id("r2").unwrap().name, "random");
        assert_eq!(state.room_count(), 2);
    }

    #[test]
    fn test_last_write_wins() {
        let state = State::new();

        state.upsert_room(room("r1", "first"));
        let previous = state.upsert_room(room("r1", "second"));

        assert_eq!(previous.unwrap().name, "first");
        assert_eq!(state.room_by_id("r1").unwrap().name, "second");

        state.remove_room("r1");
        assert!(state.room_by_id("r1").is_none());

        state.upsert_room(room("r1", "third"));
        assert_eq!(state.room_by_id("r1").unwrap().name, "third");
    }

    #[test]
    fn test_lookup_by_name() {
        let state = State::new();
        state.replace_rooms(vec![room("r1", "general")]);

        assert_eq!(state.room_by_name("general").unwrap().id, "r1");
        assert!(state.room_by_name("missing").is_none());
    }

    #[test]
    fn test_users_drop_token() {
        let state = State::new();
        state.upsert_user(&user("u1", "bot"));

        let cached = state.user_by_username("bot").unwrap();
        assert_eq!(cached.id, "u1");
        assert!(cached.token.is_none());

        assert!(state.remove_user("u1").is_some());
        assert!(state.user_by_id("u1").is_none());
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let state = Arc::new(State::new());

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for i in 0..100 {
                        let id = format!("r{}-{}", worker, i);
                        state.upsert_room(room(&id, "spam"));
                        assert!(state.room_by_id(&id).is_some());
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(state.room_count(), 800);
    }

    #[test]
    fn test_clear() {
        let state = State::new();
        state.upsert_room(room("r1", "general"));
        state.upsert_user(&user("u1", "bot"));

        state.clear();

        assert_eq!(state.room_count(), 0);
        assert_eq!(state.user_count(), 0);
    }
}
