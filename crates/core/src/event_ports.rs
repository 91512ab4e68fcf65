//! Port for publishing client events to the embedding application.

use signage_domain::ClientEvent;

/// Fire-and-forget event publisher.
///
/// Publishing never fails from the caller's point of view; implementations
/// drop events nobody is listening for.
pub trait EventSink: Send + Sync {
    /// Publish one event.
    fn publish(&self, event: ClientEvent);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: ClientEvent) {}
}
