use super::consumer::ConsumerId;
use super::event::EventKind;

/// Failures inside the hub. None of these are surfaced to clients; the
/// dispatcher logs them and carries on.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("consumer {0} is no longer connected")]
    ConsumerGone(ConsumerId),

    #[error("outbound queue for consumer {0} is full")]
    QueueFull(ConsumerId),

    #[error("side effect for '{kind}' failed: {source}")]
    SideEffect {
        kind: EventKind,
        #[source]
        source: anyhow::Error,
    },
}
