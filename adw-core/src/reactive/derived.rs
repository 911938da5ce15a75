//! Derived Implementation
//!
//! A Derived value is a pure function of one or more source properties.
//!
//! # How Derived Values Work
//!
//! 1. On creation the computation runs once to produce the initial value.
//!
//! 2. The derived value subscribes to every declared source. When any
//!    source commits a change, the computation re-runs.
//!
//! 3. The result is committed through an internal property, so listeners
//!    and effects depending on the derived value only hear about it when
//!    the result actually differs.
//!
//! Sources are declared explicitly rather than discovered by tracking
//! reads, which keeps the dependency set visible at the definition site.

use std::sync::Arc;

use super::attribute::PropertyValue;
use super::property::{Property, PropertyId, PropertyKind};
use super::subscription::Subscription;

/// Anything a derived value or effect can depend on.
pub trait Observable {
    fn id(&self) -> PropertyId;

    /// Run `notify` after every committed change.
    fn subscribe(&self, notify: Arc<dyn Fn() + Send + Sync>) -> Subscription;
}

impl<T: PropertyValue> Observable for Property<T> {
    fn id(&self) -> PropertyId {
        Property::id(self)
    }

    fn subscribe(&self, notify: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.on_change(move |_| notify())
    }
}

/// A read-only value recomputed from its sources.
///
/// Clones share the same value and source subscriptions; the subscriptions
/// are released when the last clone is dropped.
pub struct Derived<T: PropertyValue> {
    property: Property<T>,
    compute: Arc<dyn Fn() -> T + Send + Sync>,
    _sources: Arc<Vec<Subscription>>,
}

impl<T: PropertyValue> Derived<T> {
    /// Create a standalone derived value.
    pub fn new<F>(name: &'static str, sources: &[&dyn Observable], compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let initial = compute();
        Self::from_property(
            Property::new(name, PropertyKind::Derived, initial),
            sources,
            Arc::new(compute),
        )
    }

    pub(crate) fn from_property(
        property: Property<T>,
        sources: &[&dyn Observable],
        compute: Arc<dyn Fn() -> T + Send + Sync>,
    ) -> Self {
        let subscriptions = sources
            .iter()
            .map(|source| {
                let property = property.clone();
                let compute = Arc::clone(&compute);
                source.subscribe(Arc::new(move || {
                    property.set(compute());
                }))
            })
            .collect();

        Self {
            property,
            compute,
            _sources: Arc::new(subscriptions),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.property.id()
    }

    pub fn name(&self) -> &'static str {
        self.property.name()
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.property.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.property.with(f)
    }

    /// Re-run the computation outside of a source change, for inputs that
    /// are not properties themselves (child elements, for instance).
    pub fn recompute(&self) -> bool {
        self.property.set((self.compute)())
    }

    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.property.on_change(listener)
    }
}

impl<T: PropertyValue> Observable for Derived<T> {
    fn id(&self) -> PropertyId {
        self.property.id()
    }

    fn subscribe(&self, notify: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.property.on_change(move |_| notify())
    }
}

impl<T: PropertyValue> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            compute: Arc::clone(&self.compute),
            _sources: Arc::clone(&self._sources),
        }
    }
}

impl<T: PropertyValue> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("name", &self.name())
            .field("value", &self.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
