//! Property Implementation
//!
//! A Property is the observable cell behind every widget attribute and
//! every piece of internal widget state.
//!
//! # How Properties Work
//!
//! 1. `set` compares the new value with the current one by `PartialEq`
//!    and commits only if they differ. Writing an equal value is a no-op.
//!
//! 2. On a real change, listeners registered with `on_change` run
//!    synchronously with the committed value.
//!
//! 3. The owning scheduler (if any) is told which property changed so it
//!    can queue the effects that declared it as a dependency.
//!
//! A listener that writes the property again (clamping, for instance)
//! starts a new transition. The outer notification stops at that point, so
//! every listener sees each transition at most once and never a stale value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::attribute::{AttributeValue, PropertyValue};
use super::subscription::{ListenerId, Subscription};

/// Unique identifier for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u64);

impl PropertyId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a property is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Externally settable and reflected to markup.
    Attribute,
    /// Internal only.
    State,
    /// Computed from other properties; not settable from outside.
    Derived,
}

/// Receives change notifications from properties. Implemented by the
/// effect scheduler.
pub(crate) trait ChangeSink: Send + Sync {
    fn property_changed(&self, id: PropertyId);
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A reactive property holding a value of type T.
///
/// Clones share the same cell.
pub struct Property<T: PropertyValue> {
    id: PropertyId,
    name: &'static str,
    kind: PropertyKind,

    /// Value restored by `reset` and substituted for unparsable markup.
    default: Arc<T>,

    value: Arc<RwLock<T>>,

    /// Bumped on every committed change.
    version: Arc<AtomicU64>,

    listeners: Arc<RwLock<Vec<(ListenerId, Listener<T>)>>>,

    sink: Option<Weak<dyn ChangeSink>>,
}

impl<T: PropertyValue> Property<T> {
    /// Create a standalone property that is not attached to a scheduler.
    pub fn new(name: &'static str, kind: PropertyKind, default: T) -> Self {
        Self {
            id: PropertyId::next(),
            name,
            kind,
            value: Arc::new(RwLock::new(default.clone())),
            default: Arc::new(default),
            version: Arc::new(AtomicU64::new(0)),
            listeners: Arc::new(RwLock::new(Vec::new())),
            sink: None,
        }
    }

    pub(crate) fn with_sink(mut self, sink: Weak<dyn ChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Commit a new value. Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut guard = self.value.write();
            if *guard == value {
                return false;
            }
            *guard = value;
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        trace!(property = self.name, "committed");

        self.notify();
        true
    }

    /// Update the value from the current one.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(next)
    }

    /// Restore the declared default.
    pub fn reset(&self) -> bool {
        self.set((*self.default).clone())
    }

    /// Register a listener that runs on every committed change.
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.listeners.write().push((id, Arc::new(listener)));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.write().retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Get the number of listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self) {
        let version = self.version.load(Ordering::SeqCst);
        let value = self.get();
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            // A listener wrote the property; the nested transition has
            // already been delivered to everyone.
            if self.version.load(Ordering::SeqCst) != version {
                break;
            }
            listener(&value);
        }

        if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
            sink.property_changed(self.id);
        }
    }
}

impl<T: AttributeValue> Property<T> {
    /// Set the value from markup, falling back to the default when the
    /// markup does not parse.
    pub fn set_markup(&self, raw: Option<&str>) -> bool {
        let value = match T::from_markup(raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(property = self.name, %err, "malformed attribute, using default");
                (*self.default).clone()
            }
        };
        self.set(value)
    }

    /// Reflect the current value to markup.
    pub fn markup(&self) -> Option<String> {
        self.value.read().to_markup()
    }
}

impl<T: PropertyValue> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            kind: self.kind,
            default: Arc::clone(&self.default),
            value: Arc::clone(&self.value),
            version: Arc::clone(&self.version),
            listeners: Arc::clone(&self.listeners),
            sink: self.sink.clone(),
        }
    }
}

impl<T: PropertyValue> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &*self.value.read())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

/// Type erased markup access, used by the store to route host attribute
/// writes by name.
pub(crate) trait AttributeReflect: Send + Sync {
    fn set_markup(&self, raw: Option<&str>) -> bool;
    fn markup(&self) -> Option<String>;
}

impl<T: AttributeValue> AttributeReflect for Property<T> {
    fn set_markup(&self, raw: Option<&str>) -> bool {
        Property::set_markup(self, raw)
    }

    fn markup(&self) -> Option<String> {
        Property::markup(self)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::attribute::Orientation;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn property_get_and_set() {
        let prop = Property::new("count", PropertyKind::State, 0);
        assert_eq!(prop.get(), 0);

        assert!(prop.set(42));
        assert_eq!(prop.get(), 42);
    }

    #[test]
    fn equal_writes_do_not_notify() {
        let prop = Property::new("count", PropertyKind::State, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let _sub = prop.on_change(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(prop.set(1));
        assert!(!prop.set(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listeners_see_committed_value() {
        let prop = Property::new("count", PropertyKind::State, 0);
        let seen = Arc::new(AtomicUsize::new(0));

        let prop_clone = prop.clone();
        let seen_clone = seen.clone();
        let _sub = prop.on_change(move |v| {
            assert_eq!(*v, prop_clone.get());
            seen_clone.store(*v, Ordering::SeqCst);
        });

        prop.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn cancelled_listener_stops() {
        let prop = Property::new("count", PropertyKind::State, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let sub = prop.on_change(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        prop.set(1);
        sub.cancel();
        prop.set(2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(prop.listener_count(), 0);
    }

    #[test]
    fn rewriting_listener_supersedes_outer_transition() {
        let prop = Property::new("value", PropertyKind::Attribute, 0);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let clamp = prop.clone();
        let _clamp = prop.on_change(move |v| {
            if *v > 10 {
                clamp.set(10);
            }
        });
        let seen_clone = seen.clone();
        let _observer = prop.on_change(move |v| seen_clone.lock().push(*v));

        prop.set(50);
        assert_eq!(prop.get(), 10);
        assert_eq!(*seen.lock(), vec![10]);
    }

    #[test]
    fn malformed_markup_falls_back_to_default() {
        let prop = Property::new("orientation", PropertyKind::Attribute, Orientation::Down);

        prop.set_markup(Some("up"));
        assert_eq!(prop.get(), Orientation::Up);

        prop.set_markup(Some("sideways"));
        assert_eq!(prop.get(), Orientation::Down);
        assert_eq!(prop.markup().as_deref(), Some("down"));
    }

    #[test]
    fn clone_shares_state() {
        let a = Property::new("value", PropertyKind::State, String::new());
        let b = a.clone();

        a.set("x".into());
        assert_eq!(b.get(), "x");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn reset_restores_default() {
        let prop: Property<Option<f64>> = Property::new("min", PropertyKind::Attribute, None);
        prop.set(Some(3.0));
        assert!(prop.reset());
        assert_eq!(prop.get(), None);
    }
}
