//! Broadcast bus for [`ClientEvent`]s

use signage_core::EventSink;
use signage_domain::constants::EVENT_CHANNEL_CAPACITY;
use signage_domain::ClientEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Fan-out of client events to any number of subscribers.
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded;
/// publishers never block.
#[derive(Debug, Clone)]
pub struct ClientEvents {
    sender: broadcast::Sender<ClientEvent>,
}

impl ClientEvents {
    /// Bus buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ClientEvents {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventSink for ClientEvents {
    fn publish(&self, event: ClientEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(?event, "No subscribers for client event");
        }
    }
}

#[cfg(test)]
mod tests {
    use signage_domain::{NetworkStatus, Priority};

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let events = ClientEvents::default();
        let mut rx = events.subscribe();

        events.publish(ClientEvent::NetworkChanged { status: NetworkStatus::Offline });
        events.publish(ClientEvent::RequestQueued { id: "q1".into(), priority: Priority::High });

        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::NetworkChanged { status: NetworkStatus::Offline }
        );
        assert!(matches!(rx.recv().await.unwrap(), ClientEvent::RequestQueued { .. }));
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let events = ClientEvents::new(4);
        events.publish(ClientEvent::SessionExpired { message: "bye".into() });
        assert_eq!(events.subscriber_count(), 0);
    }
}
