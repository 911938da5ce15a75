//! Switch
//!
//! A two state toggle. Click, Space and Enter flip it unless it is
//! disabled; a `change` event reports every real flip.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::element::{
    ChangeDetail, ClickDetail, Document, ElementCore, ElementOptions, Key, NativeAction, Widget,
    WidgetEvent,
};
use crate::error::Result;
use crate::reactive::{Property, PropertyDescriptor};

use super::{install_render, Controller};

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::attribute("active", "active"),
    PropertyDescriptor::attribute("disabled", "disabled"),
    PropertyDescriptor::attribute("name", "name"),
    PropertyDescriptor::attribute("form", "form"),
];

/// Hidden checkbox kept in sync for form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckboxMirror {
    pub checked: bool,
    pub disabled: bool,
    pub name: Option<String>,
    pub form: Option<String>,
}

/// Render snapshot of a switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchView {
    pub role: &'static str,
    pub active: bool,
    pub disabled: bool,
    pub aria_checked: bool,
    pub aria_disabled: bool,
    pub tab_index: i32,
    pub checkbox: CheckboxMirror,
}

struct SwitchInner {
    core: ElementCore,
    active: Property<bool>,
    disabled: Property<bool>,
    name: Property<Option<String>>,
    form: Property<Option<String>>,
    view: RwLock<SwitchView>,
}

impl Controller for SwitchInner {
    type View = SwitchView;

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn view_cell(&self) -> &RwLock<SwitchView> {
        &self.view
    }

    fn render(&self) -> SwitchView {
        let active = self.active.get();
        let disabled = self.disabled.get();
        SwitchView {
            role: "switch",
            active,
            disabled,
            aria_checked: active,
            aria_disabled: disabled,
            tab_index: 0,
            checkbox: CheckboxMirror {
                checked: active,
                disabled,
                name: self.name.get(),
                form: self.form.get(),
            },
        }
    }
}

impl SwitchInner {
    fn set_active(&self, active: bool) {
        if self.active.set(active) {
            debug!(element = ?self.core.id(), active, "switch flipped");
            let _ = self.core.emit(WidgetEvent::Change(ChangeDetail::Switch { active }));
        }
    }
}

/// Toggle switch widget.
#[derive(Clone)]
pub struct Switch {
    inner: Arc<SwitchInner>,
}

impl Switch {
    pub fn new(options: ElementOptions) -> Result<Self> {
        let mut core = ElementCore::new(PROPERTIES, options)?;
        let store = core.store_mut();
        let active = store.attribute("active", false)?;
        let disabled = store.attribute("disabled", false)?;
        let name = store.attribute("name", None)?;
        let form = store.attribute("form", None)?;

        let inner = Arc::new(SwitchInner {
            core,
            active,
            disabled,
            name,
            form,
            view: RwLock::default(),
        });
        install_render(&inner);

        Ok(Self { inner })
    }

    pub fn active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn set_active(&self, active: bool) {
        self.inner.set_active(active);
    }

    pub fn disabled(&self) -> bool {
        self.inner.disabled.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.set(disabled);
    }

    /// Flip the state. Not gated by `disabled`; this is the programmatic
    /// entry point.
    pub fn toggle(&self) {
        self.inner.set_active(!self.inner.active.get());
    }

    /// Pointer click on the switch or its checkbox.
    pub fn click(&self) -> NativeAction {
        let next_value = !self.inner.active.get();
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::Click(ClickDetail::Switch { next_value }))
            .on_commit(|| {
                if !self.inner.disabled.get() {
                    self.inner.set_active(next_value);
                }
            });
        NativeAction::STOP
    }

    pub fn key_down(&self, key: Key) -> NativeAction {
        let toggles = matches!(key, Key::Space | Key::Enter);
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::KeyDown { key })
            .on_commit(|| {
                if toggles && !self.inner.disabled.get() {
                    self.inner.set_active(!self.inner.active.get());
                }
            });
        NativeAction::STOP
    }
}

impl Widget for Switch {
    type View = SwitchView;

    fn core(&self) -> &ElementCore {
        &self.inner.core
    }

    fn connect(&self, document: &Document) {
        let core = &self.inner.core;
        if core.is_connected() {
            debug!(element = ?core.id(), "already connected");
            return;
        }
        core.attach(document);
    }

    fn view(&self) -> SwitchView {
        self.inner.view.read().clone()
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("active", &self.active())
            .field("disabled", &self.disabled())
            .finish()
    }
}
