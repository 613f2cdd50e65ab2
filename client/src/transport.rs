use anyhow::Result;
use async_trait::async_trait;
use quill_protocol::ChangeNotification;
use serde_json::Value;
use tokio::sync::mpsc;

/// Where a transport delivers change notifications for a collection
pub type NotificationSink = mpsc::Sender<ChangeNotification>;

/// Server-assigned identifier of an open subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub String);

/// Duplex publish/subscribe connection the session runs on.
///
/// Implementations own framing, reconnects and request/response matching.
/// Notifications for one subscription must reach the sink in the order the
/// server sent them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<()>;

    /// Invoke a remote method and wait for its result
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value>;

    async fn subscribe(&self, stream: &str, params: Vec<Value>) -> Result<SubscriptionHandle>;

    /// Stop a subscription opened by [`subscribe`](Transport::subscribe)
    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()>;

    /// Route change notifications for `collection` into `sink`, replacing any
    /// sink registered earlier for the same collection.
    fn on_change(&self, collection: &str, sink: NotificationSink);

    /// Close the connection and drop every registered sink
    async fn close(&self) -> Result<()>;
}
