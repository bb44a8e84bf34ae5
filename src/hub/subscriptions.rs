//! Reference-counted (event kind, consumer) subscriptions.

use std::collections::HashMap;

use super::consumer::ConsumerId;
use super::event::EventKind;

/// Per event kind, the consumers interested in it and how many logical
/// listeners each one holds. Counts never sit at zero: an entry is removed the
/// moment its count drops to zero.
#[derive(Default)]
pub struct SubscriptionRegistry {
    by_kind: HashMap<EventKind, HashMap<ConsumerId, usize>>,
}

impl SubscriptionRegistry {
    /// Increments the count and returns the new value. `1` means the consumer
    /// just became a subscriber of `kind`.
    pub fn subscribe(&mut self, kind: EventKind, consumer: ConsumerId) -> usize {
        let count = self
            .by_kind
            .entry(kind)
            .or_default()
            .entry(consumer)
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Decrements the count and returns what is left. Unknown pairs are a
    /// no-op returning `0`.
    pub fn unsubscribe(&mut self, kind: EventKind, consumer: ConsumerId) -> usize {
        let Some(consumers) = self.by_kind.get_mut(&kind) else {
            return 0;
        };
        let remaining = match consumers.get_mut(&consumer) {
            Some(count) if *count > 1 => {
                *count -= 1;
                *count
            }
            Some(_) => {
                consumers.remove(&consumer);
                0
            }
            None => 0,
        };
        if consumers.is_empty() {
            self.by_kind.remove(&kind);
        }
        remaining
    }

    /// Drops every subscription held by `consumer`. Returns the kinds it was
    /// subscribed to.
    pub fn remove_consumer(&mut self, consumer: ConsumerId) -> Vec<EventKind> {
        let mut removed = Vec::new();
        self.by_kind.retain(|kind, consumers| {
            if consumers.remove(&consumer).is_some() {
                removed.push(*kind);
            }
            !consumers.is_empty()
        });
        removed.sort();
        removed
    }

    pub fn subscribers_of(&self, kind: EventKind) -> Vec<ConsumerId> {
        let mut ids: Vec<ConsumerId> = self
            .by_kind
            .get(&kind)
            .map(|consumers| consumers.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn count(&self, kind: EventKind, consumer: ConsumerId) -> usize {
        self.by_kind
            .get(&kind)
            .and_then(|consumers| consumers.get(&consumer))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct subscribers per kind, omitting kinds nobody wants.
    pub fn summary(&self) -> Vec<(EventKind, usize)> {
        let mut summary: Vec<(EventKind, usize)> = self
            .by_kind
            .iter()
            .map(|(kind, consumers)| (*kind, consumers.len()))
            .collect();
        summary.sort();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_stack_per_consumer() {
        let mut registry = SubscriptionRegistry::default();
        let c = ConsumerId::new();

        assert_eq!(registry.subscribe(EventKind::RecordingStarted, c), 1);
        assert_eq!(registry.subscribe(EventKind::RecordingStarted, c), 2);
        assert_eq!(registry.unsubscribe(EventKind::RecordingStarted, c), 1);
        assert_eq!(registry.subscribers_of(EventKind::RecordingStarted), vec![c]);

        assert_eq!(registry.unsubscribe(EventKind::RecordingStarted, c), 0);
        assert!(registry.subscribers_of(EventKind::RecordingStarted).is_empty());
        assert!(registry.summary().is_empty());
    }

    #[test]
    fn test_unsubscribe_without_entry_is_noop() {
        let mut registry = SubscriptionRegistry::default();
        let c = ConsumerId::new();
        let other = ConsumerId::new();

        assert_eq!(registry.unsubscribe(EventKind::Error, c), 0);

        registry.subscribe(EventKind::Error, other);
        assert_eq!(registry.unsubscribe(EventKind::Error, c), 0);
        assert_eq!(registry.count(EventKind::Error, other), 1);
    }

    #[test]
    fn test_remove_consumer_clears_every_kind() {
        let mut registry = SubscriptionRegistry::default();
        let c = ConsumerId::new();
        let other = ConsumerId::new();

        registry.subscribe(EventKind::MeetingDetected, c);
        registry.subscribe(EventKind::MeetingClosed, c);
        registry.subscribe(EventKind::MeetingClosed, c);
        registry.subscribe(EventKind::MeetingClosed, other);

        let removed = registry.remove_consumer(c);
        assert_eq!(
            removed,
            vec![EventKind::MeetingDetected, EventKind::MeetingClosed]
        );
        assert!(registry.subscribers_of(EventKind::MeetingDetected).is_empty());
        assert_eq!(registry.subscribers_of(EventKind::MeetingClosed), vec![other]);
        assert_eq!(registry.count(EventKind::MeetingClosed, c), 0);

        assert!(registry.remove_consumer(c).is_empty());
    }
}
