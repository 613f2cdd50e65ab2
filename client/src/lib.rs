mod auth;
mod config;
mod handler;
mod receiver;
mod sender;
mod state;
mod transport;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use quill_protocol::{
    Attachment, AttachmentField, ChangeNotification, ClientCommand, Message, Room, RoomType,
    Subscription, Timestamp, User,
};

pub use auth::digest;
pub use config::SessionConfig;
pub use handler::{
    ChannelJoinEvent, ChannelLeaveEvent, Event, EventKind, EventPayload, HandlerId,
    HandlerRegistry, MessageCreateEvent,
};
pub use state::State;
pub use transport::{NotificationSink, SubscriptionHandle, Transport};

use receiver::Listener;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No rooms to subscribe to")]
    NoRooms,

    #[error("Session is not logged in")]
    NotLoggedIn,

    #[error("Another login is already in progress")]
    LoginInProgress,

    #[error("Session is closed")]
    Closed,
}

/// Authenticated session against a realtime chat backend.
///
/// Cheap to clone; every clone shares the same cache, handlers and transport.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    state: State,
    user_id: RwLock<Option<String>>,
    handlers: HandlerRegistry<Session>,
    login_lock: tokio::sync::Mutex<()>,
    listener: Mutex<Option<Listener>>,
    subscriptions: Mutex<HashMap<Subscription, SubscriptionHandle>>,
    closed: AtomicBool,
}

impl Drop for Inner {
    /// Last handle dropped without `close()`: stop the listener and close the
    /// transport in the background.
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.signal();
        }

        let transport = Arc::clone(&self.transport);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = transport.close().await {
                        warn!(error = %e, "Failed to close transport of dropped session");
                    }
                });
            }
            Err(_) => warn!("Session dropped outside a runtime, transport left open"),
        }
    }
}

impl Session {
    /// Connect the transport and wrap it in a session that is not yet logged in
    pub async fn connect(transport: Arc<dyn Transport>, config: SessionConfig) -> Result<Self> {
        transport
            .connect()
            .await
            .context("Failed to connect transport")?;

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: State::new(),
                user_id: RwLock::new(None),
                handlers: HandlerRegistry::new(),
                login_lock: tokio::sync::Mutex::new(()),
                listener: Mutex::new(None),
                subscriptions: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Fetch the full room list from the server. Does not touch the cache.
    pub async fn get_channels(&self) -> Result<Vec<Room>> {
        let result = self.call(&ClientCommand::GetRooms).await?;
        serde_json::from_value(result).context("Failed to decode room list")
    }

    /// Look up a room by ID, refetching the room list once on a cache miss
    pub async fn get_channel_by_id(&self, id: &str) -> Result<Option<Room>> {
        if let Some(room) = self.inner.state.room_by_id(id) {
            return Ok(Some(room));
        }

        self.refresh_channels().await?;
        Ok(self.inner.state.room_by_id(id))
    }

    /// Look up a room by name, refetching the room list once on a cache miss
    pub async fn get_channel_by_name(&self, name: &str) -> Result<Option<Room>> {
        if let Some(room) = self.inner.state.room_by_name(name) {
            return Ok(Some(room));
        }

        self.refresh_channels().await?;
        Ok(self.inner.state.room_by_name(name))
    }

    pub fn get_user_by_id(&self, id: &str) -> Option<User> {
        self.inner.state.user_by_id(id)
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.inner.state.user_by_username(username)
    }

    /// ID of the authenticated user, if logged in
    pub fn user_id(&self) -> Option<String> {
        self.inner
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> &State {
        &self.inner.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Register a handler for the event type `E`
    pub fn add_handler<E, F>(&self, handler: F) -> HandlerId
    where
        E: EventPayload,
        F: Fn(&Session, &E) + Send + Sync + 'static,
    {
        self.inner.handlers.add::<E, F>(handler)
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.remove(id)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the transport and wait for the listener task to finish.
    ///
    /// Notifications still queued when this is called are dropped.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let listener = self.take_listener();
        if let Some(listener) = &listener {
            listener.signal();
        }

        let result = self
            .inner
            .transport
            .close()
            .await
            .context("Failed to close transport");

        if let Some(listener) = listener {
            listener.join().await;
        }
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        info!("Session closed");
        result
    }

    async fn refresh_channels(&self) -> Result<()> {
        let rooms = self.get_channels().await?;
        debug!(count = rooms.len(), "Refetched room list after cache miss");
        self.inner.state.upsert_rooms(rooms);
        Ok(())
    }

    async fn call(&self, command: &ClientCommand) -> Result<Value> {
        let method = command.method();
        self.inner
            .transport
            .call(method, command.params())
            .await
            .with_context(|| format!("Remote call {} failed", method))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SessionError::Closed.into());
        }
        Ok(())
    }

    fn ensure_logged_in(&self) -> Result<String> {
        self.ensure_open()?;
        self.user_id().ok_or_else(|| SessionError::NotLoggedIn.into())
    }

    fn set_user_id(&self, user_id: Option<String>) {
        *self
            .inner
            .user_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = user_id;
    }

    fn take_listener(&self) -> Option<Listener> {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
