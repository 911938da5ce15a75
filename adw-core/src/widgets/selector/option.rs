//! Selector options.
//!
//! Options are owned by the host's markup and only referenced by the
//! selector. Their attributes are observable so the selector can follow
//! changes made to an option directly.

use std::sync::Arc;

use crate::element::ElementId;
use crate::error::{Error, Result};
use crate::reactive::{Property, PropertyKind, Subscription};

struct OptionInner {
    id: ElementId,
    value: Property<Option<String>>,
    label: Property<String>,
    selected: Property<bool>,
    inert: Property<bool>,
}

/// One entry of a selector. Clones refer to the same option; equality is
/// identity, not content.
#[derive(Clone)]
pub struct SelectorOption {
    inner: Arc<OptionInner>,
}

impl SelectorOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self::build(Some(value.into()), label.into())
    }

    /// An option without a `value` attribute. It can never be selected.
    pub fn without_value(label: impl Into<String>) -> Self {
        Self::build(None, label.into())
    }

    fn build(value: Option<String>, label: String) -> Self {
        // Removing the attribute unsets the value.
        let value_property = Property::new("value", PropertyKind::Attribute, None);
        value_property.set(value);
        Self {
            inner: Arc::new(OptionInner {
                id: ElementId::new(),
                value: value_property,
                label: Property::new("label", PropertyKind::State, label),
                selected: Property::new("selected", PropertyKind::Attribute, false),
                inert: Property::new("inert", PropertyKind::Attribute, false),
            }),
        }
    }

    /// Builder: start out with the `selected` attribute.
    pub fn selected(self) -> Self {
        self.inner.selected.set(true);
        self
    }

    /// Builder: start out with the `inert` attribute.
    pub fn inert(self) -> Self {
        self.inner.inert.set(true);
        self
    }

    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    pub fn has_value(&self) -> bool {
        self.inner.value.with(Option::is_some)
    }

    /// The option's value; a missing attribute reads as empty.
    pub fn value(&self) -> String {
        self.inner.value.get().unwrap_or_default()
    }

    pub fn raw_value(&self) -> Option<String> {
        self.inner.value.get()
    }

    /// Whether this option stands for `value`. Options without a value
    /// never match.
    pub fn is_equal_to(&self, value: Option<&str>) -> bool {
        match value {
            Some(value) => self.inner.value.with(|v| v.as_deref() == Some(value)),
            None => false,
        }
    }

    pub fn set_value(&self, value: Option<String>) -> bool {
        self.inner.value.set(value)
    }

    pub fn label(&self) -> String {
        self.inner.label.get()
    }

    /// Replace the option's text content.
    pub fn set_label(&self, label: impl Into<String>) -> bool {
        self.inner.label.set(label.into())
    }

    pub fn is_selected(&self) -> bool {
        self.inner.selected.get()
    }

    pub fn set_selected(&self, selected: bool) -> bool {
        self.inner.selected.set(selected)
    }

    pub fn is_inert(&self) -> bool {
        self.inner.inert.get()
    }

    pub fn set_inert(&self, inert: bool) -> bool {
        self.inner.inert.set(inert)
    }

    /// Host attribute write on the option element.
    pub fn set_attribute(&self, name: &str, raw: Option<&str>) -> Result<bool> {
        if name.eq_ignore_ascii_case("value") {
            Ok(self.inner.value.set_markup(raw))
        } else if name.eq_ignore_ascii_case("selected") {
            Ok(self.inner.selected.set_markup(raw))
        } else if name.eq_ignore_ascii_case("inert") {
            Ok(self.inner.inert.set_markup(raw))
        } else {
            Err(Error::UnknownAttribute(name.to_owned()))
        }
    }

    pub(super) fn on_selected_change<F>(&self, f: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.inner.selected.on_change(f)
    }

    pub(super) fn on_value_change<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Option<String>) + Send + Sync + 'static,
    {
        self.inner.value.on_change(f)
    }

    pub(super) fn on_inert_change<F>(&self, f: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.inner.inert.on_change(f)
    }

    pub(super) fn on_label_change<F>(&self, f: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.inner.label.on_change(f)
    }
}

impl PartialEq for SelectorOption {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SelectorOption {}

impl std::fmt::Debug for SelectorOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorOption")
            .field("value", &self.raw_value())
            .field("label", &self.label())
            .field("selected", &self.is_selected())
            .field("inert", &self.is_inert())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_identity() {
        let a = SelectorOption::new("x", "X");
        let b = SelectorOption::new("x", "X");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn options_without_value_never_match() {
        let opt = SelectorOption::without_value("Header");
        assert!(!opt.has_value());
        assert_eq!(opt.value(), "");
        assert!(!opt.is_equal_to(Some("")));
        assert!(!opt.is_equal_to(None));
    }

    #[test]
    fn attributes_parse_from_markup() {
        let opt = SelectorOption::new("a", "A");
        assert!(opt.set_attribute("selected", Some("")).unwrap());
        assert!(opt.is_selected());
        opt.set_attribute("value", None).unwrap();
        assert!(!opt.has_value());
        assert!(matches!(
            opt.set_attribute("label", Some("x")),
            Err(Error::UnknownAttribute(_))
        ));
    }
}
