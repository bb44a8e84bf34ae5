//! Subscription and broadcast hub.
//!
//! Sits between many short-lived client connections and the single
//! capability provider:
//! - `consumer` tracks reachable connections
//! - `subscriptions` holds reference-counted (kind, consumer) interest
//! - `binder` lazily installs one provider listener per event kind
//! - `dispatcher` runs side effects and fans provider events out
//!
//! Every hub operation takes the registry lock once and never awaits while
//! holding it, so operations are applied one at a time and a fan-out always
//! works from a snapshot of the subscriber set.

pub mod binder;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod subscriptions;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::sdk::{CapabilityProvider, EventHandler};

pub use binder::UpstreamListenerBinder;
pub use consumer::{ChannelSink, Consumer, ConsumerId, ConsumerRegistry, EventSink, OutboundEvent};
pub use dispatcher::{BroadcastDispatcher, DispatchReport, EventSideEffects, SideEffect};
pub use error::HubError;
pub use event::{EventKind, UnknownEventKind};
pub use subscriptions::SubscriptionRegistry;

#[derive(Default)]
struct Registries {
    consumers: ConsumerRegistry,
    subscriptions: SubscriptionRegistry,
}

struct HubInner {
    registries: Mutex<Registries>,
    binder: UpstreamListenerBinder,
    dispatcher: BroadcastDispatcher,
}

/// Point-in-time view of the hub for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub consumers: usize,
    pub subscriptions: Vec<KindSubscribers>,
    pub listeners: Vec<EventKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSubscribers {
    pub kind: EventKind,
    pub consumers: usize,
}

/// Cheap-to-clone handle to the process-wide hub.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Kinds that carry a side effect get their provider listener right away,
    /// since their effect must run even when no consumer is subscribed.
    pub fn new(provider: Arc<dyn CapabilityProvider>, side_effects: EventSideEffects) -> Self {
        let hub = Self {
            inner: Arc::new(HubInner {
                registries: Mutex::new(Registries::default()),
                binder: UpstreamListenerBinder::new(provider),
                dispatcher: BroadcastDispatcher::new(side_effects),
            }),
        };

        for kind in hub.inner.dispatcher.side_effects().kinds() {
            let weak = Arc::downgrade(&hub.inner);
            hub.inner.binder.ensure(kind, || listener_for(kind, weak));
        }
        hub
    }

    /// Adds one logical listener for `kind` on behalf of `consumer`.
    pub fn subscribe(&self, kind: EventKind, consumer: &Consumer) {
        let (newly_tracked, count) = {
            let mut registries = self.inner.registries.lock();
            let newly_tracked = registries.consumers.track(consumer);
            let count = registries.subscriptions.subscribe(kind, consumer.id());
            (newly_tracked, count)
        };

        if newly_tracked {
            self.watch_disconnect(consumer);
        }

        if count == 1 {
            let weak = Arc::downgrade(&self.inner);
            self.inner
                .binder
                .ensure(kind, || listener_for(kind, weak));
        }

        debug!(
            "Consumer {} subscribed to '{}' (count {})",
            consumer.id(),
            kind,
            count
        );
    }

    /// Removes one logical listener. Unknown pairs are ignored.
    pub fn unsubscribe(&self, kind: EventKind, consumer: ConsumerId) {
        let remaining = self
            .inner
            .registries
            .lock()
            .subscriptions
            .unsubscribe(kind, consumer);
        debug!(
            "Consumer {} unsubscribed from '{}' (remaining {})",
            consumer, kind, remaining
        );
    }

    /// Forgets a consumer entirely. Safe to call any number of times; only the
    /// first call after tracking has an effect. Returns whether it did.
    pub fn disconnect(&self, consumer: ConsumerId) -> bool {
        let (was_tracked, kinds) = {
            let mut registries = self.inner.registries.lock();
            let kinds = registries.subscriptions.remove_consumer(consumer);
            let was_tracked = registries.consumers.remove(consumer).is_some();
            (was_tracked, kinds)
        };

        if was_tracked {
            info!(
                "Consumer {} disconnected, dropped {} subscription(s)",
                consumer,
                kinds.len()
            );
        }
        was_tracked
    }

    /// Entry point for provider callbacks.
    pub fn on_provider_event(&self, kind: EventKind, payload: Value) -> DispatchReport {
        self.inner
            .dispatcher
            .dispatch(kind, &payload, || self.inner.snapshot(kind))
    }

    pub fn subscribers_of(&self, kind: EventKind) -> Vec<ConsumerId> {
        self.inner.registries.lock().subscriptions.subscribers_of(kind)
    }

    pub fn subscription_count(&self, kind: EventKind, consumer: ConsumerId) -> usize {
        self.inner
            .registries
            .lock()
            .subscriptions
            .count(kind, consumer)
    }

    pub fn is_tracked(&self, consumer: ConsumerId) -> bool {
        self.inner.registries.lock().consumers.contains(consumer)
    }

    pub fn listener_bound(&self, kind: EventKind) -> bool {
        self.inner.binder.is_bound(kind)
    }

    pub fn stats(&self) -> HubStats {
        let registries = self.inner.registries.lock();
        HubStats {
            consumers: registries.consumers.len(),
            subscriptions: registries
                .subscriptions
                .summary()
                .into_iter()
                .map(|(kind, consumers)| KindSubscribers { kind, consumers })
                .collect(),
            listeners: self.inner.binder.bound_kinds(),
        }
    }

    /// Cleans the consumer up once its connection closes. Installed exactly
    /// once per tracked consumer. Without a runtime, callers are expected to
    /// call [`Hub::disconnect`] themselves.
    fn watch_disconnect(&self, consumer: &Consumer) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(
                "No async runtime, consumer {} relies on explicit disconnect",
                consumer.id()
            );
            return;
        };

        let id = consumer.id();
        let sink = Arc::clone(consumer.sink());
        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            sink.closed().await;
            if let Some(inner) = weak.upgrade() {
                Hub { inner }.disconnect(id);
            }
        });
    }
}

impl HubInner {
    fn snapshot(&self, kind: EventKind) -> Vec<Consumer> {
        let registries = self.registries.lock();
        registries
            .subscriptions
            .subscribers_of(kind)
            .into_iter()
            .filter_map(|id| registries.consumers.get(id).cloned())
            .collect()
    }
}

fn listener_for(kind: EventKind, hub: Weak<HubInner>) -> EventHandler {
    Arc::new(move |payload: Value| {
        if let Some(inner) = hub.upgrade() {
            Hub { inner }.on_provider_event(kind, payload);
        }
    })
}
