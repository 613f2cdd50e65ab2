use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use quill_protocol::{Message, Room};
use tracing::error;

/// Discriminant used to key the handler registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageCreate,
    ChannelJoin,
    ChannelLeave,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageCreateEvent {
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelJoinEvent {
    pub channel: Room,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelLeaveEvent {
    pub channel: Room,
}

/// Domain event produced from a change notification
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MessageCreate(MessageCreateEvent),
    ChannelJoin(ChannelJoinEvent),
    ChannelLeave(ChannelLeaveEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::ChannelJoin(_) => EventKind::ChannelJoin,
            Self::ChannelLeave(_) => EventKind::ChannelLeave,
        }
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::MessageCreateEvent {}
    impl Sealed for super::ChannelJoinEvent {}
    impl Sealed for super::ChannelLeaveEvent {}
}

/// Payload types a handler can be registered for.
///
/// Sealed: only the three event payloads implement it, so a handler for
/// anything else is rejected at compile time.
pub trait EventPayload: sealed::Sealed + Send + Sync + 'static {
    const KIND: EventKind;

    fn from_event(event: &Event) -> Option<&Self>;
}

impl EventPayload for MessageCreateEvent {
    const KIND: EventKind = EventKind::MessageCreate;

    fn from_event(event: &Event) -> Option<&Self> {
        match event {
            Event::MessageCreate(e) => Some(e),
            _ => None,
        }
    }
}

impl EventPayload for ChannelJoinEvent {
    const KIND: EventKind = EventKind::ChannelJoin;

    fn from_event(event: &Event) -> Option<&Self> {
        match event {
            Event::ChannelJoin(e) => Some(e),
            _ => None,
        }
    }
}

impl EventPayload for ChannelLeaveEvent {
    const KIND: EventKind = EventKind::ChannelLeave;

    fn from_event(event: &Event) -> Option<&Self> {
        match event {
            Event::ChannelLeave(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type BoxedHandler<C> = Arc<dyn Fn(&C, &Event) + Send + Sync>;

/// Handlers grouped by event kind, invoked in registration order.
///
/// `C` is the context passed to every handler (the session, in practice).
pub struct HandlerRegistry<C> {
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, BoxedHandler<C>)>>>,
    next_id: AtomicU64,
}

impl<C: 'static> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn add<E, F>(&self, handler: F) -> HandlerId
    where
        E: EventPayload,
        F: Fn(&C, &E) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let erased: BoxedHandler<C> = Arc::new(move |ctx: &C, event: &Event| {
            if let Some(payload) = E::from_event(event) {
                handler(ctx, payload);
            }
        });

        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(E::KIND)
            .or_default()
            .push((id, erased));

        id
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for list in handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(h, _)| *h == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the event's kind.
    ///
    /// The handler list is copied under the read lock and called outside it,
    /// so handlers may register or remove handlers themselves. A panicking
    /// handler is logged and does not stop its siblings. Returns how many
    /// handlers completed.
    pub fn dispatch(&self, ctx: &C, event: &Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<BoxedHandler<C>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        let mut completed = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(ctx, event))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(kind = ?kind, reason = %reason, "Event handler panicked");
                }
            }
        }
        completed
    }
}

impl<C: 'static> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
