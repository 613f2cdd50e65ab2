/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Drop `MessageCreate` events for messages sent by the session's own user.
    /// Off by default, leaving that decision to handlers.
    pub filter_own_messages: bool,
    /// Capacity of the queue between the transport and the listener task
    pub notification_buffer: usize,
    /// Cache message senders and room owners in the user cache
    pub cache_senders: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter_own_messages: false,
            notification_buffer: 100,
            cache_senders: true,
        }
    }
}
