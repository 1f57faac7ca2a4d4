//! concrnt-signal: the record-event pub/sub bus (C4).
//!
//! Publish is fire-and-forget; subscribers express interest as a list of
//! URI prefixes that replace (never merge with) any prior subscription.
//! Backpressure is handled the way a broadcast ring buffer always does: a
//! subscriber that falls too far behind loses the events it missed rather
//! than blocking the publisher — this is what spec §4.6 calls "the event
//! is dropped for that subscriber".

use std::sync::Arc;

use concrnt_core::document::Event;
use tokio::sync::broadcast;

/// Bound on the per-subscriber event queue. Past this many unreceived
/// events, the oldest is dropped for that subscriber — publish never
/// blocks on a slow reader.
const DEFAULT_CAPACITY: usize = 1024;

/// Shared handle to the bus. Cloning is cheap; every clone publishes to
/// and can subscribe from the same underlying channel.
#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<Arc<Event>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        SignalBus { sender }
    }

    /// Publish an event. No-op if there are currently no subscribers.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(Arc::new(event));
    }

    /// Open a new subscription with no prefixes — the `Opening` state of
    /// the realtime bridge's state machine (spec §4.8); no events match
    /// until `set_prefixes` is called on receipt of a `listen` frame.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            prefixes: Vec::new(),
        }
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<Event>>,
    prefixes: Vec<String>,
}

impl Subscription {
    /// Replace the prefix set (spec §4.8: prefixes replace, they do not
    /// merge, on a second `listen` frame).
    pub fn set_prefixes(&mut self, prefixes: Vec<String>) {
        self.prefixes = prefixes;
    }

    pub fn is_subscribed(&self) -> bool {
        !self.prefixes.is_empty()
    }

    /// Wait for the next event matching the current prefix set. Returns
    /// `None` once the bus has no more publishers (e.g. shutdown).
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn matches(&self, event: &Event) -> bool {
        if self.prefixes.is_empty() {
            return false;
        }
        let uri = event.uri();
        self.prefixes.iter().any(|prefix| uri.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concrnt_core::document::{Proof, SignedDocument};

    fn created(uri: &str) -> Event {
        Event::Created {
            uri: uri.to_string(),
            signed: SignedDocument {
                document: "{}".to_string(),
                proof: Proof::signed("sig"),
            },
        }
    }

    #[tokio::test]
    async fn delivers_only_matching_prefix() {
        let bus = SignalBus::new();
        let mut sub = bus.subscribe();
        sub.set_prefixes(vec!["cc://owner/a".to_string()]);

        bus.publish(created("cc://owner/b/x"));
        bus.publish(created("cc://owner/a/x"));

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.uri(), "cc://owner/a/x");
    }

    #[tokio::test]
    async fn no_subscription_drops_all_events() {
        let bus = SignalBus::new();
        let mut sub = bus.subscribe();
        assert!(!sub.is_subscribed());
        bus.publish(created("cc://owner/a"));

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await;
        assert!(result.is_err(), "no event should be delivered without a subscription");
    }

    #[tokio::test]
    async fn second_listen_replaces_not_merges_prefixes() {
        let bus = SignalBus::new();
        let mut sub = bus.subscribe();
        sub.set_prefixes(vec!["cc://owner/a".to_string()]);
        sub.set_prefixes(vec!["cc://owner/b".to_string()]);

        bus.publish(created("cc://owner/a/x"));
        bus.publish(created("cc://owner/b/x"));

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.uri(), "cc://owner/b/x");
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_matching_event() {
        let bus = SignalBus::new();
        let mut sub_a = bus.subscribe();
        sub_a.set_prefixes(vec!["cc://owner/".to_string()]);
        let mut sub_b = bus.subscribe();
        sub_b.set_prefixes(vec!["cc://owner/".to_string()]);

        bus.publish(created("cc://owner/x"));

        let a = tokio::time::timeout(std::time::Duration::from_millis(100), sub_a.recv())
            .await
            .unwrap();
        let b = tokio::time::timeout(std::time::Duration::from_millis(100), sub_b.recv())
            .await
            .unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }
}
