//! Per-user change feeds.
//!
//! A [`Feed`] pushes the full current value of a per-user collection (cart,
//! favorites, address book) to every subscriber of that user. Each publish
//! replaces the previous value; a slow subscriber only ever sees the latest.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use furnish_core::UserId;

/// Last-write-wins fan-out of `T` keyed by user.
pub struct Feed<T> {
    senders: Arc<DashMap<UserId, watch::Sender<Arc<T>>>>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            senders: Arc::clone(&self.senders),
        }
    }
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            senders: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Send + Sync + 'static> Feed<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a user's feed, seeding it with `current`.
    ///
    /// The receiver starts with `current` already marked as seen.
    pub fn subscribe(&self, user: UserId, current: T) -> watch::Receiver<Arc<T>> {
        match self.senders.entry(user) {
            Entry::Occupied(entry) => {
                entry.get().send_replace(Arc::new(current));
                entry.get().subscribe()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(Arc::new(current));
                entry.insert(tx);
                rx
            }
        }
    }

    /// Replace the user's value and wake their subscribers.
    ///
    /// Channels nobody listens to any more are dropped instead.
    pub fn publish(&self, user: UserId, value: T) {
        self.senders
            .remove_if(&user, |_, tx| tx.receiver_count() == 0);
        if let Some(tx) = self.senders.get(&user) {
            tx.send_replace(Arc::new(value));
        }
    }

    /// Number of live subscribers for a user.
    #[must_use]
    pub fn subscriber_count(&self, user: UserId) -> usize {
        self.senders
            .get(&user)
            .map_or(0, |tx| tx.receiver_count())
    }
}
