//! Reactive Primitives
//!
//! This module implements the reactive core shared by every widget:
//! observable properties, derived values and the effect scheduler.
//!
//! # Concepts
//!
//! ## Properties
//!
//! A Property is an observable cell. Attributes are settable by the host
//! and reflected to markup; state is internal. Committing a different
//! value notifies listeners synchronously and tells the scheduler.
//!
//! ## Derived values
//!
//! A Derived value is a pure function of declared source properties. It
//! cannot be set directly and only notifies when its result changes.
//!
//! ## Effects
//!
//! An Effect is a callback that re-runs when its declared dependencies
//! change. Deferred effects run after the render that reflects the change;
//! immediate effects run before it. Any number of dependency changes in one
//! turn coalesce into a single run.
//!
//! # Implementation Notes
//!
//! Dependencies are declared by name through the widget's property store
//! rather than discovered at runtime, so every effect's trigger set is
//! visible where it is registered.

mod attribute;
mod derived;
mod property;
mod scheduler;
mod store;
mod subscription;

pub use attribute::{AttributeValue, Orientation, Placement, PropertyValue, LIST_DELIMITER};
pub use derived::{Derived, Observable};
pub use property::{Property, PropertyId, PropertyKind};
pub use scheduler::{Deps, EffectHandle, Scheduler, Timing};
pub use store::{PropertyDescriptor, PropertyStore};
pub use subscription::{ListenerId, Scope, Subscription};
