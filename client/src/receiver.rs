use std::sync::{Arc, PoisonError, Weak};

use anyhow::{Context, Result};
use quill_protocol::client::{NOTIFY_USER_STREAM, ROOM_MESSAGES_STREAM};
use quill_protocol::{
    ChangeNotification, Message, Room, RoomChange, Subscription, decode_room_messages,
    decode_rooms_changed,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handler::{ChannelJoinEvent, ChannelLeaveEvent, Event, MessageCreateEvent};
use crate::{Inner, Session, SessionError, SubscriptionHandle};

/// The task that turns change notifications into dispatched events.
///
/// It only holds a weak reference to the session, so dropping the last
/// `Session` handle ends it.
pub(crate) struct Listener {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Listener {
    fn spawn(session: Weak<Inner>, incoming: mpsc::Receiver<ChangeNotification>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(session, incoming, shutdown_rx));
        Self { shutdown, task }
    }

    /// Ask the task to stop without waiting for it
    pub(crate) fn signal(&self) {
        let _ = self.shutdown.send(true);
    }

    pub(crate) async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "Listener task ended abnormally");
        }
    }

    pub(crate) async fn stop(self) {
        self.signal();
        self.join().await;
    }
}

async fn run(
    session: Weak<Inner>,
    mut incoming: mpsc::Receiver<ChangeNotification>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Event listener started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            next = incoming.recv() => match next {
                Some(notification) => {
                    let Some(inner) = session.upgrade() else {
                        break;
                    };
                    let session = Session { inner };
                    if session.is_closed() {
                        break;
                    }
                    session.handle_notification(notification).await;
                }
                None => break,
            },
        }
    }

    debug!("Event listener stopped");
}

impl Session {
    /// Subscribe to every cached room plus the user's room list and spawn the
    /// listener. Fails before subscribing anything when the cache has no rooms.
    pub(crate) async fn start_listener(&self, user_id: &str) -> Result<()> {
        let room_ids = self.inner.state.room_ids();
        if room_ids.is_empty() {
            return Err(SessionError::NoRooms.into());
        }

        let (tx, rx) = mpsc::channel(self.inner.config.notification_buffer.max(1));
        let transport = &self.inner.transport;
        transport.on_change(ROOM_MESSAGES_STREAM, tx.clone());
        transport.on_change(NOTIFY_USER_STREAM, tx);

        // TODO: per-room fan-out gets expensive past a few hundred rooms; move to one aggregated subscription
        for room_id in room_ids {
            self.subscribe(Subscription::RoomMessages(room_id)).await?;
        }
        self.subscribe(Subscription::UserRoomsChanged(user_id.to_string()))
            .await?;

        self.install_listener(rx)
    }

    /// Spawn the listener unless `close()` got in first. The closed flag is
    /// checked under the listener lock that `close()` takes the listener from.
    fn install_listener(&self, incoming: mpsc::Receiver<ChangeNotification>) -> Result<()> {
        let mut slot = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.is_closed() {
            return Err(SessionError::Closed.into());
        }

        *slot = Some(Listener::spawn(Arc::downgrade(&self.inner), incoming));
        Ok(())
    }

    /// Unsubscribe everything this session opened. Failures are logged.
    pub(crate) async fn release_subscriptions(&self) {
        let open: Vec<(Subscription, SubscriptionHandle)> = self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        // a closed transport has already dropped them
        if self.is_closed() {
            return;
        }

        for (subscription, handle) in open {
            self.release(&subscription, &handle).await;
        }
    }

    async fn unsubscribe(&self, subscription: &Subscription) {
        let handle = self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subscription);

        if let Some(handle) = handle {
            self.release(subscription, &handle).await;
        }
    }

    async fn release(&self, subscription: &Subscription, handle: &SubscriptionHandle) {
        match self.inner.transport.unsubscribe(handle).await {
            Ok(()) => debug!(subscription = ?subscription, handle = %handle.0, "Unsubscribed"),
            Err(e) => warn!(subscription = ?subscription, error = %e, "Failed to unsubscribe"),
        }
    }

    fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(subscription)
    }

    async fn subscribe(&self, subscription: Subscription) -> Result<()> {
        let stream = subscription.stream_name();
        let handle = self
            .inner
            .transport
            .subscribe(stream, subscription.params())
            .await
            .with_context(|| format!("Failed to subscribe to {} {:?}", stream, subscription))?;

        debug!(stream = stream, subscription = ?subscription, handle = %handle.0, "Subscribed");
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscription, handle);
        Ok(())
    }

    /// Decode one notification, update the cache and dispatch the resulting
    /// events. A notification that fails to decode is logged and skipped, as
    /// is a single bad message inside a batch.
    pub(crate) async fn handle_notification(&self, notification: ChangeNotification) {
        let events = match self.events_for(&notification).await {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    collection = %notification.collection,
                    event = %notification.event_name,
                    error = %format!("{:#}", e),
                    "Dropping undecodable notification"
                );
                return;
            }
        };

        for event in events {
            self.inner.handlers.dispatch(self, &event);
        }
    }

    async fn events_for(&self, notification: &ChangeNotification) -> Result<Vec<Event>> {
        match notification.collection.as_str() {
            ROOM_MESSAGES_STREAM => {
                let mut events = Vec::new();
                for decoded in decode_room_messages(notification)? {
                    let message = match decoded {
                        Ok(message) => message,
                        Err(e) => {
                            warn!(
                                room_id = %notification.event_name,
                                error = %format!("{:#}", e),
                                "Skipping undecodable message"
                            );
                            continue;
                        }
                    };
                    if !self.accepts_message(&message) {
                        continue;
                    }
                    self.cache_message_sender(&message);
                    events.push(Event::MessageCreate(MessageCreateEvent { message }));
                }
                Ok(events)
            }
            NOTIFY_USER_STREAM => {
                let change = decode_rooms_changed(notification)?;
                Ok(self.apply_room_change(change).await.into_iter().collect())
            }
            other => {
                debug!(collection = other, "Ignoring notification for unknown collection");
                Ok(Vec::new())
            }
        }
    }

    fn accepts_message(&self, message: &Message) -> bool {
        if !self.inner.config.filter_own_messages {
            return true;
        }
        match (message.sender_id(), self.user_id()) {
            (Some(sender), Some(me)) => sender != me,
            _ => true,
        }
    }

    fn cache_message_sender(&self, message: &Message) {
        if !self.inner.config.cache_senders {
            return;
        }
        if let Some(sender) = &message.sender {
            self.inner.state.upsert_user(sender);
        }
    }

    /// Joined rooms get their own message subscription before the join event
    /// is dispatched; left rooms lose theirs.
    async fn apply_room_change(&self, change: RoomChange) -> Option<Event> {
        let state = &self.inner.state;
        match change {
            RoomChange::Inserted(channel) => {
                self.cache_room_owner(&channel);
                state.upsert_room(channel.clone());

                let subscription = Subscription::RoomMessages(channel.id.clone());
                if !self.is_subscribed(&subscription) {
                    if let Err(e) = self.subscribe(subscription).await {
                        warn!(room_id = %channel.id, error = %format!("{:#}", e), "Failed to subscribe to joined room");
                    }
                }
                Some(Event::ChannelJoin(ChannelJoinEvent { channel }))
            }
            RoomChange::Updated(channel) => {
                self.cache_room_owner(&channel);
                state.upsert_room(channel);
                None
            }
            RoomChange::Removed(channel) => {
                state.remove_room(&channel.id);
                self.unsubscribe(&Subscription::RoomMessages(channel.id.clone()))
                    .await;
                Some(Event::ChannelLeave(ChannelLeaveEvent { channel }))
            }
        }
    }

    fn cache_room_owner(&self, room: &Room) {
        if !self.inner.config.cache_senders {
            return;
        }
        if let Some(owner) = &room.owner {
            self.inner.state.upsert_user(owner);
        }
    }
}
