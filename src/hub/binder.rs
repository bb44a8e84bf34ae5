//! Lazy, once-per-kind registration of provider listeners.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use super::event::EventKind;
use crate::sdk::{CapabilityProvider, EventHandler};

/// Installs at most one provider-side listener per [`EventKind`] for the
/// lifetime of the binder. Listeners are never removed; who receives an event
/// is decided by the subscription registry at fan-out time.
pub struct UpstreamListenerBinder {
    provider: Arc<dyn CapabilityProvider>,
    bound: Mutex<[bool; EventKind::COUNT]>,
}

impl UpstreamListenerBinder {
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            provider,
            bound: Mutex::new([false; EventKind::COUNT]),
        }
    }

    /// Registers a listener for `kind` unless one already exists. The handler
    /// is only built when a registration actually happens. Returns whether a
    /// listener was registered by this call.
    pub fn ensure(&self, kind: EventKind, make_handler: impl FnOnce() -> EventHandler) -> bool {
        {
            let mut bound = self.bound.lock();
            if bound[kind.index()] {
                return false;
            }
            bound[kind.index()] = true;
        }

        self.provider.add_event_listener(kind, make_handler());
        info!("Registered provider listener for '{}'", kind);
        true
    }

    pub fn is_bound(&self, kind: EventKind) -> bool {
        self.bound.lock()[kind.index()]
    }

    pub fn bound_kinds(&self) -> Vec<EventKind> {
        let bound = self.bound.lock();
        EventKind::ALL
            .into_iter()
            .filter(|kind| bound[kind.index()])
            .collect()
    }
}
