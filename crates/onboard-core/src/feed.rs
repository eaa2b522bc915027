//! Live change notifications from a store.
//!
//! Every write a store commits is announced on a broadcast channel so open
//! dashboards converge. Delivery is best-effort: a subscriber that falls
//! behind skips what it missed, and a writer will usually see the echo of its
//! own write, so consumers must apply events idempotently.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::record::OnboardingRecord;

const DEFAULT_CAPACITY: usize = 256;

/// One committed write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
  Inserted(OnboardingRecord),
  Updated(OnboardingRecord),
  Deleted { id: Uuid },
  /// Session numbers were rewritten in bulk.
  Renumbered { changes: Vec<(Uuid, u32)> },
  /// The whole record set was replaced; refetch everything.
  Replaced { count: usize },
}

/// Sending half, owned by a store.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
  tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl ChangeFeed {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  /// Announce a write. Having no subscribers is not an error.
  pub fn publish(&self, event: ChangeEvent) {
    let _ = self.tx.send(event);
  }

  pub fn subscribe(&self) -> Subscription {
    Subscription { rx: self.tx.subscribe() }
  }

  pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

/// Receiving half, handed out by
/// [`OnboardingStore::subscribe`](crate::store::OnboardingStore::subscribe).
#[derive(Debug)]
pub struct Subscription {
  rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
  /// Wait for the next event. Returns `None` once the store is gone.
  pub async fn recv(&mut self) -> Option<ChangeEvent> {
    loop {
      match self.rx.recv().await {
        Ok(event) => return Some(event),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
          tracing::warn!(missed, "change subscriber lagged, skipping events");
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }

  /// The next event if one is already queued.
  pub fn try_recv(&mut self) -> Option<ChangeEvent> {
    loop {
      match self.rx.try_recv() {
        Ok(event) => return Some(event),
        Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
        Err(_) => return None,
      }
    }
  }

  /// Stop listening.
  pub fn unsubscribe(self) {}
}
