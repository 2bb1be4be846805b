//! Event system for panel notifications.
//!
//! Status frames arrive asynchronously; subscribers are told when the device
//! reports a brightness and when the link comes up or goes down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

/// Event types that can be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Connection established.
    Connected,
    /// Connection closed or lost.
    Disconnected,
    /// The device reported its brightness.
    BrightnessReported { level: u16 },
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event, or `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the next event matching `predicate`.
    ///
    /// Returns `None` if the timeout expires or the channel is closed.
    pub async fn wait_for<F>(&mut self, mut predicate: F, timeout: Duration) -> Option<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        tokio::time::timeout(timeout, async {
            loop {
                let event = self.recv().await?;
                if predicate(&event) {
                    return Some(event);
                }
            }
        })
        .await
        .ok()
        .flatten()
    }
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: Event) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_dispatch() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe();

        dispatcher.dispatch(Event::Connected);

        let event = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap();

        assert_eq!(event, Some(Event::Connected));
    }

    #[tokio::test]
    async fn test_wait_for_skips_other_events() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe();

        dispatcher.dispatch(Event::Connected);
        dispatcher.dispatch(Event::BrightnessReported { level: 12 });

        let event = sub
            .wait_for(
                |e| matches!(e, Event::BrightnessReported { .. }),
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(event, Some(Event::BrightnessReported { level: 12 }));
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe();
        dispatcher.dispatch(Event::Connected);

        let event = sub
            .wait_for(
                |e| *e == Event::Disconnected,
                Duration::from_millis(20),
            )
            .await;
        assert_eq!(event, None);
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let dispatcher = EventDispatcher::new(4);
        dispatcher.dispatch(Event::Disconnected);
    }
}
