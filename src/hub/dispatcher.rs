//! Fan-out of provider events to subscribed consumers.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::consumer::Consumer;
use super::error::HubError;
use super::event::EventKind;

/// State-mutating action run once per provider event, before fan-out.
pub type SideEffect = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Table of optional side effects, one slot per [`EventKind`].
pub struct EventSideEffects {
    table: [Option<SideEffect>; EventKind::COUNT],
}

impl EventSideEffects {
    pub fn none() -> Self {
        Self::build(|_| None)
    }

    /// Builds the table by asking `for_kind` about every kind once.
    pub fn build(mut for_kind: impl FnMut(EventKind) -> Option<SideEffect>) -> Self {
        Self {
            table: std::array::from_fn(|i| for_kind(EventKind::ALL[i])),
        }
    }

    pub fn with(mut self, kind: EventKind, effect: SideEffect) -> Self {
        self.table[kind.index()] = Some(effect);
        self
    }

    pub fn get(&self, kind: EventKind) -> Option<&SideEffect> {
        self.table[kind.index()].as_ref()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| self.table[kind.index()].is_some())
            .collect()
    }
}

impl Default for EventSideEffects {
    fn default() -> Self {
        Self::none()
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub side_effect_failed: bool,
}

pub struct BroadcastDispatcher {
    side_effects: EventSideEffects,
}

impl BroadcastDispatcher {
    pub fn new(side_effects: EventSideEffects) -> Self {
        Self { side_effects }
    }

    pub fn side_effects(&self) -> &EventSideEffects {
        &self.side_effects
    }

    /// Runs the side effect for `kind`, then delivers `payload` to the
    /// consumers returned by `snapshot`. The snapshot is taken after the side
    /// effect, so it reflects the subscriber set at the moment fan-out begins.
    pub fn dispatch(
        &self,
        kind: EventKind,
        payload: &Value,
        snapshot: impl FnOnce() -> Vec<Consumer>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        if let Some(effect) = self.side_effects.get(kind) {
            if let Err(source) = effect(payload) {
                report.side_effect_failed = true;
                warn!("{}", HubError::SideEffect { kind, source });
            }
        }

        for consumer in snapshot() {
            match consumer.deliver(kind, payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to deliver '{}' event: {}", kind, e);
                }
            }
        }

        debug!(
            "Dispatched '{}' to {} consumer(s), {} failed",
            kind, report.delivered, report.failed
        );
        report
    }
}
