//! Subscriptions and scopes.
//!
//! Every registration in the runtime (property listener, effect, document
//! listener, event listener) hands back a [`Subscription`]. Cancelling it,
//! or dropping it, removes the registration. A [`Scope`] collects the
//! subscriptions that belong to one attached lifetime of a widget so they
//! can be released together on disconnect.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Unique identifier for a listener or effect registration.
///
/// IDs are process wide so a registration can be removed from whichever
/// list it was added to without ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Handle to a registration.
///
/// Dropping the handle releases the registration. `cancel` does the same
/// eagerly; calling it more than once is a no-op.
#[must_use = "dropping a Subscription immediately cancels it"]
pub struct Subscription {
    release: Mutex<Option<Release>>,
}

impl Subscription {
    /// Create a subscription that runs `release` exactly once.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// Release the registration now.
    pub fn cancel(&self) {
        // Take first so the release closure runs without the lock held.
        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }
    }

    /// Whether the registration is still live.
    pub fn is_active(&self) -> bool {
        self.release.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A set of subscriptions released together.
#[derive(Debug, Default)]
pub struct Scope {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `subscription` alive until the scope is disposed.
    pub fn add(&self, subscription: Subscription) {
        self.subscriptions.lock().push(subscription);
    }

    /// Release everything held, in reverse registration order.
    pub fn dispose(&self) {
        let drained: Vec<Subscription> = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in drained.into_iter().rev() {
            subscription.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}
