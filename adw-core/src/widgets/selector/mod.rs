//! Selector
//!
//! Single select dropdown over a list of [`SelectorOption`]s.
//!
//! # Selection
//!
//! The options, not an internal index, are the source of truth. Whenever
//! the children or the bound `value` change, the selector reconciles the
//! two:
//!
//! 1. A bound value that disagrees with the selected options wins: the
//!    matching option is marked selected and every other one unmarked.
//! 2. A bound value no option matches is cleared.
//! 3. A selected option with no bound value is adopted, and when several
//!    are marked the last one wins.
//!
//! Reconciling twice without an intervening change is a no-op.
//!
//! # Presentation
//!
//! On touch devices the options are shown in a modal dialog; elsewhere in
//! an inline panel dismissed by a click anywhere outside the selector.
//! The document listener for that exists only while the panel is open.

mod option;

pub use option::SelectorOption;

use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::element::{
    ChangeDetail, ClickDetail, Document, ElementCore, ElementId, ElementOptions, GlobalEvent,
    GlobalEventKind, Key, NativeAction, Widget, WidgetEvent,
};
use crate::error::Result;
use crate::reactive::{
    Deps, Derived, Orientation, Placement, Property, PropertyDescriptor, Scope, Subscription,
};

use super::{install_render, Controller, ScrollBehavior};

/// Rows are estimated at this many em when measuring the panel.
const ROW_EM: f64 = 1.9;
/// The panel never grows past this many em.
const MAX_PANEL_EM: f64 = 20.0;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::attribute("placeholder", "placeholder"),
    PropertyDescriptor::attribute("disabled", "disabled"),
    PropertyDescriptor::attribute("name", "name"),
    PropertyDescriptor::attribute("form", "form"),
    PropertyDescriptor::attribute("value", "value"),
    PropertyDescriptor::attribute("orientation", "orientation"),
    PropertyDescriptor::attribute("reverseOrder", "reverseorder"),
    PropertyDescriptor::attribute("scrollIntoViewOnOpen", "scrollintoview"),
    PropertyDescriptor::state("open"),
    PropertyDescriptor::state("options"),
    PropertyDescriptor::state("optionsRevision"),
    PropertyDescriptor::state("forcedPlacement"),
    PropertyDescriptor::state("focused"),
    PropertyDescriptor::derived("label"),
];

/// What the options list should scroll to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScrollTarget {
    /// Center the option with this value.
    Option { value: String },
    Top,
    Bottom,
}

/// Request to scroll the options list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionsScroll {
    pub target: ScrollTarget,
    pub behavior: ScrollBehavior,
}

/// One rendered option button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub value: Option<String>,
    pub label: String,
    /// `option`, or `presentation` for inert entries.
    pub role: &'static str,
    pub inert: bool,
    pub selected: bool,
    pub focused: bool,
}

/// One entry of the hidden `<select>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorOption {
    pub value: String,
    pub selected: bool,
}

/// Hidden `<select>` kept in sync for form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectMirror {
    pub name: Option<String>,
    pub form: Option<String>,
    pub disabled: bool,
    pub options: Vec<MirrorOption>,
}

/// Render snapshot of a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectorView {
    pub role: &'static str,
    pub open: bool,
    pub disabled: bool,
    pub aria_expanded: bool,
    pub listbox_id: String,
    pub placeholder: Option<String>,
    /// Label of the selected option, or the placeholder.
    pub label: Option<String>,
    pub with_placeholder: bool,
    pub mobile: bool,
    /// Mobile only: the modal dialog is shown.
    pub dialog_open: bool,
    pub orientation_up: bool,
    /// Options in display order.
    pub options: Vec<OptionView>,
    pub select: SelectMirror,
}

#[derive(Debug, Default)]
struct SearchBuffer {
    text: String,
    last_input: Option<Instant>,
}

struct SelectorInner {
    core: ElementCore,
    placeholder: Property<Option<String>>,
    disabled: Property<bool>,
    name: Property<Option<String>>,
    form: Property<Option<String>>,
    value: Property<Option<String>>,
    orientation: Property<Orientation>,
    reverse_order: Property<bool>,
    scroll_into_view_on_open: Property<bool>,
    open: Property<bool>,
    options: Property<Vec<SelectorOption>>,
    options_revision: Property<u32>,
    forced_placement: Property<Option<Placement>>,
    focused: Property<Option<ElementId>>,
    label: Derived<Option<String>>,
    children: RwLock<Vec<SelectorOption>>,
    child_listeners: Scope,
    search: Mutex<SearchBuffer>,
    last_focus_change: Mutex<Option<Instant>>,
    outside_click: Mutex<Option<Subscription>>,
    scroll_into_view_at: Mutex<Option<Instant>>,
    scroll_request: Mutex<Option<OptionsScroll>>,
    view: RwLock<SelectorView>,
}

impl Controller for SelectorInner {
    type View = SelectorView;

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn view_cell(&self) -> &RwLock<SelectorView> {
        &self.view
    }

    fn render(&self) -> SelectorView {
        let open = self.open.get();
        let mobile = self.core.viewport().is_mobile;
        let value = self.value.get();
        let focused = self.focused.get();
        let placeholder = self.placeholder.get();
        let label = self.label.get();
        let disabled = self.disabled.get();

        let options = self.options.get();
        let selected = |option: &SelectorOption| option.is_equal_to(value.as_deref());

        let select = SelectMirror {
            name: self.name.get(),
            form: self.form.get(),
            disabled,
            options: options
                .iter()
                .map(|option| MirrorOption {
                    value: option.value(),
                    selected: selected(option),
                })
                .collect(),
        };

        let mut display: Vec<OptionView> = options
            .iter()
            .map(|option| {
                let inert = option.is_inert();
                OptionView {
                    id: option.id().uid(),
                    value: option.raw_value(),
                    label: option.label(),
                    role: if inert { "presentation" } else { "option" },
                    inert,
                    selected: !inert && selected(option),
                    focused: focused == Some(option.id()),
                }
            })
            .collect();
        if self.reverse_order.get() {
            display.reverse();
        }

        SelectorView {
            role: "combobox",
            open,
            disabled,
            aria_expanded: open,
            listbox_id: self.core.id().uid(),
            with_placeholder: label.is_none(),
            label: label.or_else(|| placeholder.clone()),
            placeholder,
            mobile,
            dialog_open: mobile && open,
            orientation_up: !mobile && self.is_top(),
            options: display,
            select,
        }
    }
}

impl SelectorInner {
    fn is_top(&self) -> bool {
        match self.orientation.get() {
            Orientation::Up => true,
            Orientation::Down => false,
            Orientation::Detect => self.forced_placement.get() == Some(Placement::Above),
        }
    }

    fn child(&self, id: ElementId) -> Option<SelectorOption> {
        self.children.read().iter().find(|c| c.id() == id).cloned()
    }

    fn selected_option(&self) -> Option<SelectorOption> {
        let value = self.value.get();
        self.options
            .with(|options| options.iter().find(|o| o.is_equal_to(value.as_deref())).cloned())
    }

    fn focused_option(&self) -> Option<SelectorOption> {
        let focused = self.focused.get()?;
        self.options
            .with(|options| options.iter().find(|o| o.id() == focused).cloned())
    }

    fn bump_revision(&self) {
        self.options_revision.update(|r| r.wrapping_add(1));
    }

    /// Mark the options matching `value` selected and unmark the rest.
    fn select_by_value(options: &[SelectorOption], value: &str) -> Option<SelectorOption> {
        let mut selected = None;
        for option in options {
            if option.is_equal_to(Some(value)) {
                selected = Some(option.clone());
            } else {
                option.set_selected(false);
            }
        }
        if let Some(option) = &selected {
            option.set_selected(true);
        }
        selected
    }

    /// Bring the bound value and the options' `selected` flags into
    /// agreement. `force` re-renders the options even if the list itself
    /// did not change.
    fn reconcile(&self, force: bool) {
        let children = self.children.read().clone();
        let current = self.value.get();
        let mut selected: Vec<&SelectorOption> = children
            .iter()
            .filter(|o| o.is_selected() && !o.is_inert())
            .collect();

        match (current.as_deref(), selected.is_empty()) {
            (None, true) => {}
            (Some(value), false)
                if selected.len() == 1 && selected[0].is_equal_to(Some(value)) => {}
            (Some(value), _) => {
                if Self::select_by_value(&children, value).is_none() {
                    debug!(element = ?self.core.id(), value, "no option matches, clearing value");
                    self.value.reset();
                }
            }
            (None, false) => {
                if let Some(last) = selected.pop() {
                    for other in selected {
                        other.set_selected(false);
                    }
                    self.value.set(last.raw_value());
                }
            }
        }

        if !self.options.set(children) && force {
            self.bump_revision();
        }
    }

    fn select(&self, value: &str) -> bool {
        let options = self.options.get();
        let mut success = false;
        for option in &options {
            if option.is_equal_to(Some(value)) {
                self.value.set(option.raw_value());
                option.set_selected(true);
                success = true;
            } else {
                option.set_selected(false);
            }
        }
        success
    }

    fn option_selected_changed(&self, id: ElementId, selected: bool) {
        let Some(option) = self.child(id) else {
            return;
        };
        if selected && option.has_value() {
            self.value.set(option.raw_value());
        }
    }

    fn option_value_changed(&self, id: ElementId) {
        if let Some(option) = self.child(id) {
            if option.is_selected() && !option.is_inert() {
                self.value.set(option.raw_value());
            }
        }
        self.reconcile(true);
    }

    fn option_inert_changed(&self, id: ElementId) {
        if let Some(option) = self.child(id) {
            if option.is_selected() && self.selected_option().as_ref() == Some(&option) {
                self.value.reset();
                option.set_selected(false);
            }
        }
        self.bump_revision();
    }

    /// Throttle keyboard focus moves so a held key does not outrun the
    /// scrolling.
    fn focus_change_allowed(&self) -> bool {
        let now = self.core.now();
        let throttle = self.core.config().focus_change_throttle();
        let mut last = self.last_focus_change.lock();
        let allowed = last.map_or(true, |at| now.saturating_duration_since(at) > throttle);
        if allowed {
            *last = Some(now);
        }
        allowed
    }

    /// Move keyboard focus `offset` options along the displayed list,
    /// skipping inert options and stopping at either end.
    fn focus_option(&self, offset: isize) {
        if !self.open.get() {
            return;
        }

        let mut display = self.options.get();
        if self.reverse_order.get() {
            display.reverse();
        }

        let value = self.value.get();
        let current = self
            .focused
            .get()
            .and_then(|id| display.iter().position(|o| o.id() == id))
            .or_else(|| {
                display
                    .iter()
                    .position(|o| !o.is_inert() && o.is_equal_to(value.as_deref()))
            });

        let Some(mut target) = current else {
            let first = if self.orientation.get() == Orientation::Up {
                display.iter().rposition(|o| !o.is_inert())
            } else {
                display.iter().position(|o| !o.is_inert())
            };
            self.focused.set(first.map(|i| display[i].id()));
            return;
        };

        'steps: for _ in 0..offset.unsigned_abs() {
            let mut next = target;
            loop {
                next = if offset > 0 {
                    next + 1
                } else {
                    match next.checked_sub(1) {
                        Some(n) => n,
                        None => break 'steps,
                    }
                };
                match display.get(next) {
                    None => break 'steps,
                    Some(option) if option.is_inert() => continue,
                    Some(_) => break,
                }
            }
            target = next;
        }

        trace!(offset, target, "focus option");
        self.focused.set(Some(display[target].id()));
    }

    /// Center the option with `value` in the list and focus it.
    fn scroll_to_option(&self, value: Option<String>, behavior: ScrollBehavior) {
        if !self.open.get() || !self.core.is_connected() {
            return;
        }
        let Some(value) = value else {
            return;
        };
        let option = self.options.with(|options| {
            options
                .iter()
                .find(|o| !o.is_inert() && o.is_equal_to(Some(value.as_str())))
                .cloned()
        });

        if let Some(option) = option {
            *self.scroll_request.lock() = Some(OptionsScroll {
                target: ScrollTarget::Option { value },
                behavior,
            });
            self.focused.set(Some(option.id()));
        }
    }

    /// Jump to the first option whose label starts with the typed text,
    /// falling back to the first one containing it.
    fn type_ahead(&self, c: char) {
        let now = self.core.now();
        let timeout = self.core.config().search_buffer_timeout();
        let query = {
            let mut search = self.search.lock();
            if search
                .last_input
                .is_some_and(|at| now.saturating_duration_since(at) >= timeout)
            {
                search.text.clear();
            }
            search.text.push(c);
            search.last_input = Some(now);
            search.text.to_lowercase()
        };

        let found = self.options.with(|options| {
            let labels: Vec<(String, &SelectorOption)> = options
                .iter()
                .filter(|o| !o.is_inert())
                .map(|o| (o.label().to_lowercase(), o))
                .collect();
            labels
                .iter()
                .find(|(label, _)| label.starts_with(&query))
                .or_else(|| labels.iter().find(|(label, _)| label.contains(&query)))
                .map(|(_, option)| option.raw_value())
        });

        trace!(%query, found = ?found, "type ahead");
        if let Some(value) = found {
            self.scroll_to_option(value, ScrollBehavior::Smooth);
        }
    }

    fn detect_placement(&self) {
        let Some(anchor) = self.core.layout() else {
            return;
        };
        let rows = self.options.with(Vec::len);
        let placement = self
            .core
            .viewport()
            .placement_for(anchor, rows, ROW_EM, MAX_PANEL_EM);
        self.forced_placement.set(Some(placement));
    }

    fn release_outside_click(&self) {
        let listener = self.outside_click.lock().take();
        drop(listener);
    }

    fn on_open_changed(self: &Arc<Self>) {
        self.release_outside_click();

        if !self.open.get() {
            self.focused.set(None);
            *self.scroll_into_view_at.lock() = None;
            return;
        }

        match self.value.get() {
            Some(value) => self.scroll_to_option(Some(value), ScrollBehavior::Instant),
            None => {
                let target = if self.orientation.get() == Orientation::Up {
                    ScrollTarget::Bottom
                } else {
                    ScrollTarget::Top
                };
                *self.scroll_request.lock() = Some(OptionsScroll {
                    target,
                    behavior: ScrollBehavior::Instant,
                });
            }
        }

        if self.core.viewport().is_mobile {
            return;
        }

        if let Some(document) = self.core.document() {
            let weak: Weak<SelectorInner> = Arc::downgrade(self);
            let own_id = self.core.id();
            let listener = document.listen(GlobalEventKind::Click, move |event| {
                let (Some(inner), GlobalEvent::Click { path }) = (weak.upgrade(), event) else {
                    return;
                };
                if !path.contains(&own_id) {
                    trace!(element = ?own_id, "click outside, closing");
                    inner.open.set(false);
                    inner.release_outside_click();
                }
            });
            *self.outside_click.lock() = Some(listener);
        }

        if self.scroll_into_view_on_open.get() {
            let delay = self.core.config().scroll_into_view_delay();
            *self.scroll_into_view_at.lock() = Some(self.core.now() + delay);
        }

        if self.orientation.get() == Orientation::Detect {
            self.detect_placement();
        }
    }

    fn run_timers(&self) {
        let now = self.core.now();
        let due = {
            let mut at = self.scroll_into_view_at.lock();
            let due = at.is_some_and(|deadline| now >= deadline);
            if due {
                *at = None;
            }
            due
        };

        if due && self.open.get() {
            if let Some(option) = self.selected_option().filter(|o| !o.is_inert()) {
                *self.scroll_request.lock() = Some(OptionsScroll {
                    target: ScrollTarget::Option {
                        value: option.value(),
                    },
                    behavior: ScrollBehavior::Smooth,
                });
            }
        }
    }

    fn option_click(&self, option: &SelectorOption) -> NativeAction {
        if option.is_inert() {
            return NativeAction::STOP;
        }

        let value = option.raw_value();
        let _ = self
            .core
            .emit(WidgetEvent::Click(ClickDetail::Option {
                option: value.clone(),
            }))
            .on_commit(|| {
                let Some(value) = value.as_deref() else {
                    return;
                };
                if self.disabled.get() {
                    return;
                }
                if self.select(value) {
                    let _ = self.core.emit(WidgetEvent::Change(ChangeDetail::Selector {
                        value: self.value.get(),
                    }));
                    self.open.set(false);
                    self.focused.set(None);
                }
            });
        NativeAction::CONSUME
    }
}

/// Single select dropdown.
#[derive(Clone)]
pub struct Selector {
    inner: Arc<SelectorInner>,
}

impl Selector {
    pub fn new(options: ElementOptions) -> Result<Self> {
        let mut core = ElementCore::new(PROPERTIES, options)?;
        let store = core.store_mut();
        let placeholder = store.attribute("placeholder", None)?;
        let disabled = store.attribute("disabled", false)?;
        let name = store.attribute("name", None)?;
        let form = store.attribute("form", None)?;
        let value: Property<Option<String>> = store.attribute("value", None)?;
        let orientation = store.attribute("orientation", Orientation::Down)?;
        let reverse_order = store.attribute("reverseOrder", false)?;
        let scroll_into_view_on_open = store.attribute("scrollIntoViewOnOpen", false)?;
        let open = store.state("open", false)?;
        let options: Property<Vec<SelectorOption>> = store.state("options", Vec::new())?;
        let options_revision: Property<u32> = store.state("optionsRevision", 0)?;
        let forced_placement = store.state("forcedPlacement", None)?;
        let focused = store.state("focused", None)?;

        let (opts, val) = (options.clone(), value.clone());
        let label = store.derive(
            "label",
            &[&options, &value, &options_revision],
            move || {
                let value = val.get();
                opts.with(|options| {
                    options
                        .iter()
                        .find(|o| !o.is_inert() && o.is_equal_to(value.as_deref()))
                        .map(SelectorOption::label)
                })
            },
        )?;

        let inner = Arc::new(SelectorInner {
            core,
            placeholder,
            disabled,
            name,
            form,
            value,
            orientation,
            reverse_order,
            scroll_into_view_on_open,
            open,
            options,
            options_revision,
            forced_placement,
            focused,
            label,
            children: RwLock::new(Vec::new()),
            child_listeners: Scope::new(),
            search: Mutex::new(SearchBuffer::default()),
            last_focus_change: Mutex::new(None),
            outside_click: Mutex::new(None),
            scroll_into_view_at: Mutex::new(None),
            scroll_request: Mutex::new(None),
            view: RwLock::default(),
        });
        install_render(&inner);

        Ok(Self { inner })
    }

    /// Replace the option children, as the host's markup changed.
    pub fn set_children(&self, children: Vec<SelectorOption>) {
        let inner = &self.inner;
        inner.child_listeners.dispose();

        for child in &children {
            let id = child.id();

            let weak = Arc::downgrade(inner);
            inner.child_listeners.add(child.on_selected_change(move |selected| {
                if let Some(inner) = weak.upgrade() {
                    inner.option_selected_changed(id, *selected);
                }
            }));

            let weak = Arc::downgrade(inner);
            inner.child_listeners.add(child.on_value_change(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.option_value_changed(id);
                }
            }));

            let weak = Arc::downgrade(inner);
            inner.child_listeners.add(child.on_inert_change(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.option_inert_changed(id);
                }
            }));

            let weak = Arc::downgrade(inner);
            inner.child_listeners.add(child.on_label_change(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.bump_revision();
                }
            }));
        }

        *inner.children.write() = children;
        inner.reconcile(false);
    }

    pub fn children(&self) -> Vec<SelectorOption> {
        self.inner.children.read().clone()
    }

    /// Re-run reconciliation of value and options.
    pub fn reconcile(&self) {
        self.inner.reconcile(false);
    }

    pub fn value(&self) -> Option<String> {
        self.inner.value.get()
    }

    /// Host side write of the bound value. Reconciled on the next update.
    pub fn set_value(&self, value: Option<String>) {
        self.inner.value.set(value);
    }

    /// Label of the selected option.
    pub fn label(&self) -> Option<String> {
        self.inner.label.get()
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Open or close the dropdown.
    pub fn toggle(&self) {
        self.inner.open.update(|open| !open);
    }

    /// Select the option with `value`. Returns whether one matched.
    pub fn select(&self, value: &str) -> bool {
        self.inner.select(value)
    }

    pub fn selected_option(&self) -> Option<SelectorOption> {
        self.inner.selected_option()
    }

    /// The option holding keyboard focus, if focus is inside the list.
    pub fn focused_option(&self) -> Option<SelectorOption> {
        self.inner.focused_option()
    }

    pub fn take_scroll_request(&self) -> Option<OptionsScroll> {
        self.inner.scroll_request.lock().take()
    }

    /// Fire delayed work that is due by now.
    pub fn run_timers(&self) {
        self.inner.run_timers();
    }

    /// Click on the selector box.
    pub fn click(&self) -> NativeAction {
        if self.inner.disabled.get() {
            return NativeAction::CONSUME;
        }
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::Click(ClickDetail::Selector))
            .on_commit(|| self.toggle());
        NativeAction::CONSUME
    }

    /// Click on an option button.
    pub fn option_click(&self, option: &SelectorOption) -> NativeAction {
        self.inner.option_click(option)
    }

    /// Mobile only: click inside the modal dialog. Clicks on the backdrop
    /// close it.
    pub fn dialog_click(&self, inside_list: bool) -> NativeAction {
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::Click(ClickDetail::Dialog { inside_list }))
            .on_commit(|| {
                if self.inner.open.get() && !inside_list {
                    self.inner.open.set(false);
                }
            });
        NativeAction::CONSUME
    }

    /// Mobile only: the modal dialog was cancelled (Escape, back gesture).
    pub fn modal_cancel(&self) {
        self.inner.open.set(false);
    }

    pub fn key_down(&self, key: Key) -> NativeAction {
        let inner = &self.inner;
        if inner.disabled.get() {
            return NativeAction::NONE;
        }

        let count = inner.options.with(Vec::len) as isize;
        let page = inner.core.config().selector_page_size as isize;
        let offset = match key {
            Key::ArrowUp => Some(-1),
            Key::ArrowDown => Some(1),
            Key::PageUp => Some(-page),
            Key::PageDown => Some(page),
            Key::Home => Some(-count),
            Key::End => Some(count),
            _ => None,
        };

        if let Some(offset) = offset {
            if inner.focus_change_allowed() {
                let _ = inner
                    .core
                    .emit(WidgetEvent::KeyDown { key })
                    .on_commit(|| inner.focus_option(offset));
            }
            return NativeAction::CONSUME;
        }

        match key {
            Key::Space | Key::Enter => {
                let is_enter = key == Key::Enter;
                let _ = inner
                    .core
                    .emit(WidgetEvent::KeyDown { key })
                    .on_commit(|| {
                        if !inner.open.get() {
                            inner.open.set(true);
                        } else if let Some(option) = inner.focused_option() {
                            if is_enter {
                                let _ = inner.option_click(&option);
                            }
                        } else {
                            inner.open.set(false);
                        }
                    });
                NativeAction::CONSUME
            }
            Key::Escape => {
                let _ = inner
                    .core
                    .emit(WidgetEvent::KeyDown { key })
                    .on_commit(|| {
                        if inner.open.get() {
                            inner.open.set(false);
                            inner.focused.set(None);
                        }
                    });
                NativeAction::CONSUME
            }
            Key::Char(c) if c.is_ascii_graphic() => {
                inner.type_ahead(c);
                NativeAction::NONE
            }
            _ => NativeAction::NONE,
        }
    }
}

impl Widget for Selector {
    type View = SelectorView;

    fn core(&self) -> &ElementCore {
        &self.inner.core
    }

    fn connect(&self, document: &Document) {
        let core = &self.inner.core;
        if core.is_connected() {
            debug!(element = ?core.id(), "already connected");
            return;
        }
        let store = core.store();

        // Adopt whatever the host set up before attaching.
        let weak = Arc::downgrade(&self.inner);
        core.hold(core.scheduler().effect(Deps::Mount, move || {
            if let Some(inner) = weak.upgrade() {
                inner.reconcile(false);
            }
        }));

        let weak = Arc::downgrade(&self.inner);
        core.hold_effect(store.effect(Some(&["value"]), move || {
            if let Some(inner) = weak.upgrade() {
                inner.reconcile(false);
            }
        }));

        let weak = Arc::downgrade(&self.inner);
        core.hold_effect(store.effect(Some(&["open"]), move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_open_changed();
            }
        }));

        core.attach(document);
    }

    fn disconnect(&self) {
        let inner = &self.inner;
        inner.release_outside_click();
        inner.open.set(false);
        inner.focused.set(None);
        *inner.scroll_into_view_at.lock() = None;
        inner.core.detach();
    }

    fn view(&self) -> SelectorView {
        self.inner.view.read().clone()
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("value", &self.value())
            .field("open", &self.is_open())
            .field("options", &self.inner.options.with(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{EventContext, ManualClock, Rect, Viewport};

    fn fruits() -> Vec<SelectorOption> {
        vec![
            SelectorOption::new("apple", "Apple"),
            SelectorOption::without_value("Citrus").inert(),
            SelectorOption::new("lemon", "Lemon"),
            SelectorOption::new("lime", "Lime"),
        ]
    }

    fn connected(options: ElementOptions, children: Vec<SelectorOption>) -> (Selector, Document) {
        let selector = Selector::new(options).unwrap();
        selector.set_children(children);
        let document = Document::new();
        selector.connect(&document);
        (selector, document)
    }

    fn selected_flags(selector: &Selector) -> Vec<bool> {
        selector.children().iter().map(SelectorOption::is_selected).collect()
    }

    #[test]
    fn selected_child_is_adopted() {
        let children = vec![
            SelectorOption::new("a", "A").selected(),
            SelectorOption::new("b", "B").selected(),
        ];
        let (selector, _doc) = connected(ElementOptions::default(), children);

        assert_eq!(selector.value().as_deref(), Some("b"));
        assert_eq!(selected_flags(&selector), vec![false, true]);
        assert_eq!(selector.label().as_deref(), Some("B"));
    }

    #[test]
    fn bound_value_wins_and_unmatched_value_clears() {
        let children = vec![
            SelectorOption::new("a", "A").selected(),
            SelectorOption::new("b", "B"),
        ];
        let (selector, _doc) = connected(ElementOptions::default(), children);
        assert_eq!(selector.value().as_deref(), Some("a"));

        selector.set_value(Some("b".into()));
        selector.flush();
        assert_eq!(selected_flags(&selector), vec![false, true]);

        selector.set_value(Some("zzz".into()));
        selector.flush();
        assert_eq!(selector.value(), None);
        assert_eq!(selected_flags(&selector), vec![false, false]);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let children = vec![
            SelectorOption::new("a", "A").selected(),
            SelectorOption::new("b", "B").selected(),
            SelectorOption::new("c", "C"),
        ];
        let (selector, _doc) = connected(ElementOptions::default(), children);

        selector.reconcile();
        let first = (selector.value(), selected_flags(&selector));
        selector.reconcile();
        let second = (selector.value(), selected_flags(&selector));
        assert_eq!(first, second);
    }

    #[test]
    fn selecting_a_child_directly_moves_the_value() {
        let (selector, _doc) = connected(ElementOptions::default(), fruits());
        selector.select("apple");
        selector.flush();

        let lime = selector.children()[3].clone();
        lime.set_attribute("selected", Some("")).unwrap();
        selector.flush();

        assert_eq!(selector.value().as_deref(), Some("lime"));
        assert_eq!(selected_flags(&selector), vec![false, false, false, true]);
    }

    #[test]
    fn inert_selected_option_is_dropped() {
        let (selector, _doc) = connected(ElementOptions::default(), fruits());
        selector.select("lemon");
        let lemon = selector.children()[2].clone();

        lemon.set_inert(true);
        selector.flush();
        assert_eq!(selector.value(), None);
        assert!(!lemon.is_selected());
    }

    #[test]
    fn label_falls_back_to_placeholder() {
        let (selector, _doc) = connected(ElementOptions::default(), fruits());
        selector.set_attribute("placeholder", Some("Pick one")).unwrap();
        selector.flush();
        let view = selector.view();
        assert!(view.with_placeholder);
        assert_eq!(view.label.as_deref(), Some("Pick one"));

        selector.select("lime");
        selector.flush();
        assert_eq!(selector.view().label.as_deref(), Some("Lime"));

        selector.children()[3].set_label("Key lime");
        selector.flush();
        assert_eq!(selector.view().label.as_deref(), Some("Key lime"));
    }

    #[test]
    fn keyboard_focus_skips_inert_and_stops_at_ends() {
        let clock = ManualClock::new();
        let (selector, _doc) = connected(ElementOptions::default().with_clock(clock.clone()), fruits());
        selector.key_down(Key::Enter);
        selector.flush();
        assert!(selector.is_open());

        let focus = |key: Key| {
            clock.advance_ms(100);
            selector.key_down(key);
            selector.focused_option().map(|o| o.value())
        };

        assert_eq!(focus(Key::ArrowDown).as_deref(), Some("apple"));
        assert_eq!(focus(Key::ArrowDown).as_deref(), Some("lemon"));
        assert_eq!(focus(Key::ArrowDown).as_deref(), Some("lime"));
        assert_eq!(focus(Key::ArrowDown).as_deref(), Some("lime"));
        assert_eq!(focus(Key::Home).as_deref(), Some("apple"));
        assert_eq!(focus(Key::ArrowUp).as_deref(), Some("apple"));
        assert_eq!(focus(Key::End).as_deref(), Some("lime"));
    }

    #[test]
    fn focus_moves_are_throttled() {
        let clock = ManualClock::new();
        let (selector, _doc) = connected(ElementOptions::default().with_clock(clock.clone()), fruits());
        selector.toggle();
        selector.flush();

        selector.key_down(Key::ArrowDown);
        selector.key_down(Key::ArrowDown);
        assert_eq!(selector.focused_option().map(|o| o.value()).as_deref(), Some("apple"));

        clock.advance_ms(61);
        selector.key_down(Key::ArrowDown);
        assert_eq!(selector.focused_option().map(|o| o.value()).as_deref(), Some("lemon"));
    }

    #[test]
    fn enter_on_focused_option_selects_and_closes() {
        let (selector, _doc) = connected(ElementOptions::default(), fruits());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        let _sub = selector.on_event(move |ctx: &mut EventContext<'_>| {
            if let WidgetEvent::Change(ChangeDetail::Selector { value }) = ctx.event() {
                changes_clone.lock().push(value.clone());
            }
        });

        selector.key_down(Key::Space);
        selector.flush();
        selector.key_down(Key::ArrowDown);
        selector.key_down(Key::Enter);
        selector.flush();

        assert!(!selector.is_open());
        assert_eq!(selector.value().as_deref(), Some("apple"));
        assert_eq!(*changes.lock(), vec![Some("apple".to_owned())]);
    }

    #[test]
    fn type_ahead_prefers_prefix_then_contains() {
        let clock = ManualClock::new();
        let (selector, _doc) = connected(ElementOptions::default().with_clock(clock.clone()), fruits());
        selector.toggle();
        selector.flush();
        selector.take_scroll_request();

        selector.key_down(Key::Char('l'));
        selector.key_down(Key::Char('i'));
        assert_eq!(selector.focused_option().map(|o| o.value()).as_deref(), Some("lime"));
        assert_eq!(
            selector.take_scroll_request().map(|r| r.target),
            Some(ScrollTarget::Option {
                value: "lime".into()
            })
        );

        clock.advance_ms(1000);
        selector.key_down(Key::Char('p'));
        assert_eq!(selector.focused_option().map(|o| o.value()).as_deref(), Some("apple"));
    }

    #[test]
    fn outside_click_closes_only_while_open() {
        let (selector, doc) = connected(ElementOptions::default(), fruits());
        assert_eq!(doc.listener_count(), 0);

        selector.click();
        selector.flush();
        assert!(selector.is_open());
        assert_eq!(doc.listener_count_of(GlobalEventKind::Click), 1);

        doc.click(vec![selector.id()]);
        assert!(selector.is_open());

        doc.click(vec![ElementId::new()]);
        selector.flush();
        assert!(!selector.is_open());
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn mobile_uses_the_dialog() {
        let viewport = Viewport {
            is_mobile: true,
            ..Viewport::default()
        };
        let (selector, doc) = connected(ElementOptions::default().with_viewport(viewport), fruits());

        selector.click();
        selector.flush();
        assert!(selector.view().dialog_open);
        assert_eq!(doc.listener_count(), 0);

        selector.dialog_click(true);
        assert!(selector.is_open());
        selector.dialog_click(false);
        assert!(!selector.is_open());
    }

    #[test]
    fn disabled_ignores_clicks_and_keys() {
        let (selector, _doc) = connected(ElementOptions::default(), fruits());
        selector.set_attribute("disabled", Some("")).unwrap();

        selector.click();
        assert_eq!(selector.key_down(Key::Enter), NativeAction::NONE);
        let apple = selector.children()[0].clone();
        selector.option_click(&apple);
        assert!(!selector.is_open());
        assert_eq!(selector.value(), None);
    }

    #[test]
    fn detect_opens_upward_near_the_bottom() {
        let viewport = Viewport {
            height: 300.0,
            em: 10.0,
            is_mobile: false,
        };
        let (selector, _doc) = connected(ElementOptions::default().with_viewport(viewport), fruits());
        selector.set_attribute("orientation", Some("detect")).unwrap();
        selector.set_layout(Some(Rect::new(0.0, 250.0, 100.0, 20.0)));

        selector.toggle();
        selector.flush();
        assert!(selector.view().orientation_up);
    }

    #[test]
    fn scroll_into_view_fires_after_the_delay() {
        let clock = ManualClock::new();
        let (selector, _doc) = connected(ElementOptions::default().with_clock(clock.clone()), fruits());
        selector.set_attribute("scrollintoview", Some("")).unwrap();
        selector.select("lime");
        selector.toggle();
        selector.flush();
        selector.take_scroll_request();

        clock.advance_ms(100);
        selector.run_timers();
        assert_eq!(selector.take_scroll_request(), None);

        clock.advance_ms(150);
        selector.run_timers();
        assert_eq!(
            selector.take_scroll_request(),
            Some(OptionsScroll {
                target: ScrollTarget::Option {
                    value: "lime".into()
                },
                behavior: ScrollBehavior::Smooth,
            })
        );
    }

    #[test]
    fn reverse_order_reverses_display_only() {
        let (selector, _doc) = connected(ElementOptions::default(), fruits());
        selector.set_attribute("reverseorder", Some("")).unwrap();
        selector.flush();

        let view = selector.view();
        let shown: Vec<_> = view.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(shown, vec!["Lime", "Lemon", "Citrus", "Apple"]);
        let mirrored: Vec<_> = view.select.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(mirrored, vec!["apple", "", "lemon", "lime"]);
    }
}
