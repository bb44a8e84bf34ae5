//! Connected client surfaces and the registry that tracks them.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::HubError;
use super::event::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConsumerId(Uuid);

impl ConsumerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event on its way to one consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub kind: EventKind,
    pub payload: Value,
}

/// Delivery side of one client connection.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Queue `event` for the connection without waiting.
    fn deliver(&self, event: OutboundEvent) -> Result<(), HubError>;

    /// Resolves once the connection behind this sink is gone.
    async fn closed(&self);
}

/// Sink backed by a bounded mpsc queue drained by the connection task.
pub struct ChannelSink {
    id: ConsumerId,
    tx: mpsc::Sender<OutboundEvent>,
}

impl ChannelSink {
    pub fn new(id: ConsumerId, tx: mpsc::Sender<OutboundEvent>) -> Self {
        Self { id, tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    fn deliver(&self, event: OutboundEvent) -> Result<(), HubError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::QueueFull(self.id),
            mpsc::error::TrySendError::Closed(_) => HubError::ConsumerGone(self.id),
        })
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// One connected client surface.
#[derive(Clone)]
pub struct Consumer {
    id: ConsumerId,
    sink: Arc<dyn EventSink>,
}

impl Consumer {
    pub fn new(id: ConsumerId, sink: Arc<dyn EventSink>) -> Self {
        Self { id, sink }
    }

    /// Creates a consumer with a fresh id and a queue of `capacity` events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let id = ConsumerId::new();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, Arc::new(ChannelSink::new(id, tx))), rx)
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub fn deliver(&self, kind: EventKind, payload: Value) -> Result<(), HubError> {
        self.sink.deliver(OutboundEvent { kind, payload })
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("id", &self.id).finish()
    }
}

/// Consumers currently reachable from the hub.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: HashMap<ConsumerId, Consumer>,
}

impl ConsumerRegistry {
    /// Returns `true` only the first time a consumer is tracked; the caller
    /// installs the disconnect watcher on that transition.
    pub fn track(&mut self, consumer: &Consumer) -> bool {
        if self.consumers.contains_key(&consumer.id) {
            return false;
        }
        self.consumers.insert(consumer.id, consumer.clone());
        true
    }

    pub fn remove(&mut self, id: ConsumerId) -> Option<Consumer> {
        self.consumers.remove(&id)
    }

    pub fn get(&self, id: ConsumerId) -> Option<&Consumer> {
        self.consumers.get(&id)
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.consumers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_track_is_idempotent() {
        let (consumer, _rx) = Consumer::channel(4);
        let mut registry = ConsumerRegistry::default();

        assert!(registry.track(&consumer));
        assert!(!registry.track(&consumer));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_twice_is_harmless() {
        let (consumer, _rx) = Consumer::channel(4);
        let mut registry = ConsumerRegistry::default();
        registry.track(&consumer);

        assert!(registry.remove(consumer.id()).is_some());
        assert!(registry.remove(consumer.id()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (consumer, mut rx) = Consumer::channel(4);
        consumer
            .deliver(EventKind::RecordingStarted, json!({"window": "a"}))
            .unwrap();
        consumer
            .deliver(EventKind::RecordingEnded, json!({"window": "a"}))
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RecordingStarted);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RecordingEnded);
    }

    #[test]
    fn test_channel_sink_reports_full_and_closed() {
        let (consumer, rx) = Consumer::channel(1);
        consumer.deliver(EventKind::Error, json!(1)).unwrap();
        assert!(matches!(
            consumer.deliver(EventKind::Error, json!(2)),
            Err(HubError::QueueFull(_))
        ));

        drop(rx);
        assert!(matches!(
            consumer.deliver(EventKind::Error, json!(3)),
            Err(HubError::ConsumerGone(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_resolves_when_receiver_dropped() {
        let (consumer, rx) = Consumer::channel(1);
        drop(rx);
        tokio::time::timeout(std::time::Duration::from_secs(1), consumer.sink().closed())
            .await
            .unwrap();
    }
}
