//! Property Store
//!
//! Each widget type declares its properties once, as a static descriptor
//! list. The store interprets that list: it creates typed properties wired
//! to the widget's scheduler, keeps a name keyed registry, resolves effect
//! dependency names to property ids and routes host attribute writes by
//! their markup name.
//!
//! ```rust
//! use adw_core::config::RuntimeConfig;
//! use adw_core::reactive::{PropertyDescriptor, PropertyStore, Scheduler};
//!
//! static PROPS: &[PropertyDescriptor] = &[
//!     PropertyDescriptor::attribute("label", "label"),
//!     PropertyDescriptor::state("pressed"),
//! ];
//!
//! let mut store = PropertyStore::new(Scheduler::new(&RuntimeConfig::default()), PROPS).unwrap();
//! let label = store.attribute::<Option<String>>("label", None).unwrap();
//! store.set_attribute("label", Some("Hello")).unwrap();
//! assert_eq!(label.get().as_deref(), Some("Hello"));
//! ```

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;

use super::attribute::{AttributeValue, PropertyValue};
use super::derived::{Derived, Observable};
use super::property::{AttributeReflect, Property, PropertyId, PropertyKind};
use super::scheduler::{Deps, EffectHandle, Scheduler};
use crate::error::{Error, Result};

/// Static declaration of one widget property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    /// Attribute name in markup. Empty for state and derived properties.
    pub markup_name: &'static str,
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    pub const fn attribute(name: &'static str, markup_name: &'static str) -> Self {
        Self {
            name,
            markup_name,
            kind: PropertyKind::Attribute,
        }
    }

    pub const fn state(name: &'static str) -> Self {
        Self {
            name,
            markup_name: "",
            kind: PropertyKind::State,
        }
    }

    pub const fn derived(name: &'static str) -> Self {
        Self {
            name,
            markup_name: "",
            kind: PropertyKind::Derived,
        }
    }
}

struct Entry {
    id: PropertyId,
    handle: Box<dyn Any + Send + Sync>,
    reflect: Option<Arc<dyn AttributeReflect>>,
}

/// Registry of a widget's properties.
pub struct PropertyStore {
    scheduler: Scheduler,
    descriptors: &'static [PropertyDescriptor],
    entries: IndexMap<&'static str, Entry>,
}

impl PropertyStore {
    pub fn new(scheduler: Scheduler, descriptors: &'static [PropertyDescriptor]) -> Result<Self> {
        for (i, desc) in descriptors.iter().enumerate() {
            if descriptors[..i].iter().any(|d| d.name == desc.name) {
                return Err(Error::DuplicateProperty(desc.name.to_owned()));
            }
        }

        Ok(Self {
            scheduler,
            descriptors,
            entries: IndexMap::new(),
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn descriptors(&self) -> &'static [PropertyDescriptor] {
        self.descriptors
    }

    fn descriptor(&self, name: &str, kind: PropertyKind) -> Result<&'static PropertyDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name == name && d.kind == kind)
            .ok_or_else(|| Error::UnknownProperty(name.to_owned()))
    }

    /// Create the attribute declared as `name`.
    pub fn attribute<T: AttributeValue>(&mut self, name: &str, default: T) -> Result<Property<T>> {
        let desc = self.descriptor(name, PropertyKind::Attribute)?;
        let property =
            Property::new(desc.name, PropertyKind::Attribute, default).with_sink(self.scheduler.sink());
        self.entries.insert(
            desc.name,
            Entry {
                id: property.id(),
                handle: Box::new(property.clone()),
                reflect: Some(Arc::new(property.clone())),
            },
        );
        Ok(property)
    }

    /// Create the internal state property declared as `name`.
    pub fn state<T: PropertyValue>(&mut self, name: &str, default: T) -> Result<Property<T>> {
        let desc = self.descriptor(name, PropertyKind::State)?;
        let property =
            Property::new(desc.name, PropertyKind::State, default).with_sink(self.scheduler.sink());
        self.entries.insert(
            desc.name,
            Entry {
                id: property.id(),
                handle: Box::new(property.clone()),
                reflect: None,
            },
        );
        Ok(property)
    }

    /// Create the derived value declared as `name`, recomputed whenever any
    /// of `sources` changes.
    pub fn derive<T, F>(&mut self, name: &str, sources: &[&dyn Observable], compute: F) -> Result<Derived<T>>
    where
        T: PropertyValue,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let desc = self.descriptor(name, PropertyKind::Derived)?;
        let property = Property::new(desc.name, PropertyKind::Derived, compute())
            .with_sink(self.scheduler.sink());
        let derived = Derived::from_property(property, sources, Arc::new(compute));
        self.entries.insert(
            desc.name,
            Entry {
                id: derived.id(),
                handle: Box::new(derived.clone()),
                reflect: None,
            },
        );
        Ok(derived)
    }

    /// Typed lookup of an attribute or state property.
    pub fn get<T: PropertyValue>(&self, name: &str) -> Result<Property<T>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::UnknownProperty(name.to_owned()))?;
        entry
            .handle
            .downcast_ref::<Property<T>>()
            .cloned()
            .ok_or_else(|| Error::PropertyType {
                name: name.to_owned(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Typed lookup of a derived value.
    pub fn get_derived<T: PropertyValue>(&self, name: &str) -> Result<Derived<T>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::UnknownProperty(name.to_owned()))?;
        entry
            .handle
            .downcast_ref::<Derived<T>>()
            .cloned()
            .ok_or_else(|| Error::PropertyType {
                name: name.to_owned(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn id(&self, name: &str) -> Result<PropertyId> {
        self.entries
            .get(name)
            .map(|e| e.id)
            .ok_or_else(|| Error::UnknownProperty(name.to_owned()))
    }

    /// Resolve a dependency selector. `None` is "every update", an empty
    /// list is "once after mount".
    pub fn deps(&self, names: Option<&[&str]>) -> Result<Deps> {
        match names {
            None => Ok(Deps::EveryUpdate),
            Some(names) => Ok(Deps::on(
                names
                    .iter()
                    .map(|name| self.id(name))
                    .collect::<Result<Vec<_>>>()?,
            )),
        }
    }

    /// Register a deferred effect on named dependencies.
    pub fn effect<F>(&self, names: Option<&[&str]>, callback: F) -> Result<EffectHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Ok(self.scheduler.effect(self.deps(names)?, callback))
    }

    /// Register an immediate effect on named dependencies.
    pub fn immediate_effect<F>(&self, names: Option<&[&str]>, callback: F) -> Result<EffectHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Ok(self.scheduler.immediate_effect(self.deps(names)?, callback))
    }

    fn reflect(&self, markup_name: &str) -> Result<&Arc<dyn AttributeReflect>> {
        let desc = self
            .descriptors
            .iter()
            .find(|d| d.kind == PropertyKind::Attribute && d.markup_name.eq_ignore_ascii_case(markup_name))
            .ok_or_else(|| Error::UnknownAttribute(markup_name.to_owned()))?;
        self.entries
            .get(desc.name)
            .and_then(|e| e.reflect.as_ref())
            .ok_or_else(|| Error::UnknownAttribute(markup_name.to_owned()))
    }

    /// Host attribute write. `None` removes the attribute. Returns whether
    /// the property changed.
    pub fn set_attribute(&self, markup_name: &str, raw: Option<&str>) -> Result<bool> {
        Ok(self.reflect(markup_name)?.set_markup(raw))
    }

    /// Current markup of an attribute.
    pub fn attribute_markup(&self, markup_name: &str) -> Result<Option<String>> {
        Ok(self.reflect(markup_name)?.markup())
    }

    /// Markup names the widget reacts to.
    pub fn observed_attributes(&self) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .filter(|d| d.kind == PropertyKind::Attribute)
            .map(|d| d.markup_name)
            .collect()
    }
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyStore")
            .field("properties", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::reactive::attribute::Orientation;

    static PROPS: &[PropertyDescriptor] = &[
        PropertyDescriptor::attribute("value", "value"),
        PropertyDescriptor::attribute("orientation", "orientation"),
        PropertyDescriptor::attribute("showAll", "showall"),
        PropertyDescriptor::state("open"),
        PropertyDescriptor::derived("label"),
    ];

    fn store() -> PropertyStore {
        PropertyStore::new(Scheduler::new(&RuntimeConfig::default()), PROPS).unwrap()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        static DUP: &[PropertyDescriptor] = &[
            PropertyDescriptor::attribute("value", "value"),
            PropertyDescriptor::state("value"),
        ];
        let err = PropertyStore::new(Scheduler::new(&RuntimeConfig::default()), DUP).unwrap_err();
        assert!(matches!(err, Error::DuplicateProperty(_)));
    }

    #[test]
    fn undeclared_properties_are_rejected() {
        let mut store = store();
        assert!(matches!(
            store.attribute::<bool>("hidden", false),
            Err(Error::UnknownProperty(_))
        ));
        // Declared as state, not attribute.
        assert!(store.attribute::<bool>("open", false).is_err());
    }

    #[test]
    fn attributes_route_by_markup_name() {
        let mut store = store();
        let show_all = store.attribute::<bool>("showAll", false).unwrap();

        assert!(store.set_attribute("showAll", Some("")).unwrap());
        assert!(show_all.get());
        assert_eq!(store.attribute_markup("showall").unwrap(), Some(String::new()));

        assert!(matches!(
            store.set_attribute("open", Some("")),
            Err(Error::UnknownAttribute(_))
        ));
    }

    #[test]
    fn malformed_markup_uses_default() {
        let mut store = store();
        let orientation = store.attribute("orientation", Orientation::Down).unwrap();
        store.set_attribute("orientation", Some("up")).unwrap();
        store.set_attribute("orientation", Some("diagonal")).unwrap();
        assert_eq!(orientation.get(), Orientation::Down);
    }

    #[test]
    fn typed_lookup_checks_type() {
        let mut store = store();
        store.state("open", false).unwrap();

        assert!(store.get::<bool>("open").is_ok());
        assert!(matches!(
            store.get::<String>("open"),
            Err(Error::PropertyType { .. })
        ));
    }

    #[test]
    fn effects_resolve_names() {
        let mut store = store();
        let value = store.attribute::<Option<String>>("value", None).unwrap();
        let open = store.state("open", false).unwrap();
        let value_clone = value.clone();
        let label = store
            .derive("label", &[&value], move || value_clone.get().unwrap_or_default())
            .unwrap();

        let handle = store.effect(Some(&["value", "open", "label"]), || {}).unwrap();
        assert!(store.effect(Some(&["nope"]), || {}).is_err());

        store.scheduler().mount();
        value.set(Some("a".into()));
        open.set(true);
        store.scheduler().flush();

        assert_eq!(label.get(), "a");
        assert_eq!(handle.run_count(), 1);
    }

    #[test]
    fn observed_attributes_lists_markup_names() {
        assert_eq!(store().observed_attributes(), vec!["value", "orientation", "showall"]);
    }
}
