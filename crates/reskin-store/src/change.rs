//! Change notifications
//!
//! Every backend of one profile publishes into a shared [`ChangeHub`], so a
//! write made by any context (another tab, the options page) reaches every
//! subscriber.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;

/// Storage tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreArea {
    /// Fast, device-local tier
    Local,
    /// Replicated tier shared across devices
    Sync,
}

impl fmt::Display for StoreArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Sync => f.write_str("sync"),
        }
    }
}

/// One key's transition inside one area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub area: StoreArea,
}

impl StoreChange {
    /// Whether the key was removed by this change
    #[inline]
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Broadcast fan-out shared by the backends of one profile
#[derive(Debug, Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeHub {
    /// Default channel depth; lagging subscribers skip old changes
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create hub with default capacity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create hub with explicit capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, change: StoreChange) {
        let _ = self.sender.send(change);
    }

    /// Subscribe to all future changes
    #[must_use]
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Changes taken off a subscription in one go
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drained {
    /// Changes still in the channel, oldest first
    pub changes: Vec<StoreChange>,
    /// Changes overwritten before they were read
    pub skipped: u64,
}

impl Drained {
    /// Some changes were lost; state mirrored from them must be reloaded
    #[inline]
    #[must_use]
    pub fn lagged(&self) -> bool {
        self.skipped > 0
    }
}

/// Receiving end of a [`ChangeHub`]
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<StoreChange>,
}

impl ChangeSubscription {
    /// Wait for the next change. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "store change subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain every change that is already queued without waiting
    ///
    /// A subscriber that fell more than the hub's capacity behind gets the
    /// newest changes only, with [`Drained::skipped`] counting the rest.
    pub fn drain(&mut self) -> Drained {
        let mut out = Drained::default();
        loop {
            match self.receiver.try_recv() {
                Ok(change) => out.changes.push(change),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "store change subscriber lagged");
                    out.skipped += skipped;
                }
                Err(_) => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(key: &str) -> StoreChange {
        StoreChange {
            key: key.to_string(),
            old_value: None,
            new_value: Some(json!(1)),
            area: StoreArea::Sync,
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = ChangeHub::new();
        hub.publish(change("viewMode"));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_sees_every_change() {
        let hub = ChangeHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(change("viewMode"));
        hub.publish(change("cardStyle"));

        assert_eq!(a.drain().changes.len(), 2);
        let drained = b.drain();
        assert!(!drained.lagged());
        let keys: Vec<_> = drained.changes.into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["viewMode", "cardStyle"]);
    }

    #[test]
    fn overflow_is_reported_as_lag() {
        let hub = ChangeHub::with_capacity(4);
        let mut sub = hub.subscribe();
        for _ in 0..10 {
            hub.publish(change("dueDateCache"));
        }

        let drained = sub.drain();
        assert!(drained.lagged());
        assert_eq!(drained.skipped, 6);
        assert_eq!(drained.changes.len(), 4);
        assert!(!sub.drain().lagged());
    }

    #[tokio::test]
    async fn recv_returns_none_after_hub_dropped() {
        let hub = ChangeHub::new();
        let mut sub = hub.subscribe();
        drop(hub);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn change_serializes_camel_case() {
        let json = serde_json::to_value(change("favoriteCourseIds")).unwrap();
        assert_eq!(json["area"], "sync");
        assert!(json.get("newValue").is_some());
    }
}
