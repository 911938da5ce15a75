//! Input
//!
//! Text input with a suggestions list.
//!
//! The list shows the suggestions matching the current value (prefix
//! match, or subsequence match with `fuzzy`), or all of them with
//! `suggestionsShowAll`. It opens on focus and Backspace and closes on
//! blur, Escape and selection. While open, the arrow, page, Home and End
//! keys move a highlight cursor that never leaves the list.
//!
//! A `change` event fires for a picked suggestion right away (tagged
//! `select`) and for typed text on Enter or blur, only if the text changed
//! while the input had focus (tagged `submit`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::element::{
    ChangeDetail, ChangeKind, ClipboardAction, Document, ElementCore, ElementOptions, Key,
    NativeAction, Widget, WidgetEvent,
};
use crate::error::Result;
use crate::reactive::{Derived, Orientation, Placement, Property, PropertyDescriptor};
use crate::util::{fuzzy_search, prefix_search};

use super::{install_render, Controller, ScrollBehavior};

/// Rows are estimated at this many em when measuring the list.
const ROW_EM: f64 = 1.75;
/// The list never grows past this many em.
const MAX_LIST_EM: f64 = 16.0;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::attribute("value", "value"),
    PropertyDescriptor::attribute("disabled", "disabled"),
    PropertyDescriptor::attribute("name", "name"),
    PropertyDescriptor::attribute("form", "form"),
    PropertyDescriptor::attribute("type", "type"),
    PropertyDescriptor::attribute("placeholder", "placeholder"),
    PropertyDescriptor::attribute("minLength", "minlength"),
    PropertyDescriptor::attribute("maxLength", "maxlength"),
    PropertyDescriptor::attribute("errorLabel", "errorlabel"),
    PropertyDescriptor::attribute("suggestions", "suggestions"),
    PropertyDescriptor::attribute("suggestionsShowAll", "suggestionsshowall"),
    PropertyDescriptor::attribute("suggestionsOrientation", "suggestionsorientation"),
    PropertyDescriptor::attribute("fuzzy", "fuzzy"),
    PropertyDescriptor::state("open"),
    PropertyDescriptor::state("highlighted"),
    PropertyDescriptor::state("forcedPlacement"),
    PropertyDescriptor::derived("options"),
];

/// Request to bring an option into view, `block: nearest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollRequest {
    pub index: usize,
    pub behavior: ScrollBehavior,
}

/// One rendered suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionView {
    pub index: usize,
    pub label: String,
    pub active: bool,
}

/// Render snapshot of an input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputView {
    pub value: String,
    pub disabled: bool,
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub form: Option<String>,
    pub placeholder: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub aria_invalid: bool,
    pub aria_expanded: bool,
    /// Id of the suggestions listbox, referenced by `aria-controls`.
    pub listbox_id: String,
    pub suggestions_hidden: bool,
    pub orientation_up: bool,
    pub suggestions: Vec<SuggestionView>,
}

#[derive(Debug, Clone, Copy)]
enum Highlight {
    By(isize),
    First,
    Last,
}

/// Inputs of the `options` computation.
#[derive(Clone)]
struct OptionSources {
    suggestions: Property<Vec<String>>,
    show_all: Property<bool>,
    orientation: Property<Orientation>,
    fuzzy: Property<bool>,
    value: Property<Option<String>>,
}

impl OptionSources {
    fn compute(&self) -> Vec<String> {
        let suggestions = self.suggestions.get();
        if suggestions.is_empty() {
            return Vec::new();
        }

        let mut result = if self.show_all.get() {
            suggestions
        } else {
            let query = self.value.get().unwrap_or_default();
            if self.fuzzy.get() {
                fuzzy_search(&suggestions, &query)
            } else {
                prefix_search(&suggestions, &query)
            }
        };

        if self.orientation.get() == Orientation::Up {
            result.reverse();
        }
        result
    }
}

struct InputInner {
    core: ElementCore,
    value: Property<Option<String>>,
    disabled: Property<bool>,
    name: Property<Option<String>>,
    form: Property<Option<String>>,
    input_type: Property<Option<String>>,
    placeholder: Property<Option<String>>,
    min_length: Property<Option<f64>>,
    max_length: Property<Option<f64>>,
    error_label: Property<Option<String>>,
    suggestions: Property<Vec<String>>,
    orientation: Property<Orientation>,
    open: Property<bool>,
    highlighted: Property<Option<usize>>,
    forced_placement: Property<Option<Placement>>,
    options: Derived<Vec<String>>,
    in_focus: AtomicBool,
    has_changed: AtomicBool,
    last_scroll: Mutex<Option<Instant>>,
    scroll_request: Mutex<Option<ScrollRequest>>,
    view: RwLock<InputView>,
}

fn length_markup(value: Option<f64>) -> Option<String> {
    value.map(|v| v.to_string())
}

impl Controller for InputInner {
    type View = InputView;

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn view_cell(&self) -> &RwLock<InputView> {
        &self.view
    }

    fn render(&self) -> InputView {
        let open = self.open.get();
        let options = self.options.get();
        let highlighted = self.highlighted.get();
        let hidden = !open || options.is_empty() || self.suggestions.with(Vec::is_empty);

        InputView {
            value: self.value.get().unwrap_or_default(),
            disabled: self.disabled.get(),
            input_type: self.input_type.get(),
            name: self.name.get(),
            form: self.form.get(),
            placeholder: self.placeholder.get(),
            min_length: length_markup(self.min_length.get()),
            max_length: length_markup(self.max_length.get()),
            aria_invalid: self
                .error_label
                .with(|label| label.as_deref().is_some_and(|l| !l.is_empty())),
            aria_expanded: open,
            listbox_id: self.core.id().uid(),
            suggestions_hidden: hidden,
            orientation_up: self.is_up(),
            suggestions: options
                .into_iter()
                .enumerate()
                .map(|(index, label)| SuggestionView {
                    index,
                    label,
                    active: highlighted == Some(index),
                })
                .collect(),
        }
    }
}

impl InputInner {
    fn current_value(&self) -> String {
        self.value.get().unwrap_or_default()
    }

    fn is_up(&self) -> bool {
        match self.orientation.get() {
            Orientation::Up => true,
            Orientation::Down => false,
            Orientation::Detect => self.forced_placement.get() == Some(Placement::Above),
        }
    }

    fn show_suggestions(&self) {
        self.open.set(true);
        self.highlighted.set(None);
        self.scroll_active_into_view(true);
    }

    fn hide_suggestions(&self) {
        self.highlighted.set(None);
        self.open.set(false);
    }

    /// Move the highlight, staying inside the list. Nothing highlighted
    /// counts as one before the first option.
    fn navigate(&self, to: Highlight) {
        let count = self.options.with(Vec::len) as isize;
        if count == 0 {
            self.highlighted.set(None);
            return;
        }

        let current = self.highlighted.get().map_or(-1, |i| i as isize);
        let next = match to {
            Highlight::By(offset) => (current + offset).clamp(0, count - 1),
            Highlight::First => 0,
            Highlight::Last => count - 1,
        };
        self.highlighted.set(Some(next as usize));
    }

    fn emit_change(&self, kind: ChangeKind) {
        self.has_changed.store(false, Ordering::SeqCst);
        let value = self.current_value();
        debug!(element = ?self.core.id(), ?kind, "input change");
        let _ = self
            .core
            .emit(WidgetEvent::Change(ChangeDetail::Input { value, kind }));
    }

    /// Pick the highlighted suggestion. Returns false when nothing usable
    /// is highlighted.
    fn select_highlighted(&self) -> bool {
        if !self.open.get() {
            return false;
        }
        let Some(index) = self.highlighted.get() else {
            return false;
        };
        let Some(option) = self.options.with(|o| o.get(index).cloned()) else {
            return false;
        };

        self.value.set(Some(option));
        self.hide_suggestions();
        self.emit_change(ChangeKind::Select);
        true
    }

    /// Ask the host to scroll the highlighted option into view. Requests
    /// arriving in quick succession (a held arrow key) scroll instantly so
    /// they are not swallowed by a running smooth scroll.
    fn scroll_active_into_view(&self, force_instant: bool) {
        let Some(index) = self.highlighted.get() else {
            return;
        };
        if index >= self.options.with(Vec::len) {
            return;
        }

        let now = self.core.now();
        let mut last = self.last_scroll.lock();
        let recent = last
            .map(|at| now.saturating_duration_since(at) <= self.core.config().scroll_instant_window())
            .unwrap_or(false);
        let behavior = if force_instant || recent {
            ScrollBehavior::Instant
        } else {
            ScrollBehavior::Smooth
        };
        *last = Some(now);
        drop(last);

        trace!(index, ?behavior, "scroll into view");
        *self.scroll_request.lock() = Some(ScrollRequest { index, behavior });
    }

    /// Measure the space below the input and flip the list above it when
    /// it does not fit.
    fn detect_placement(&self) {
        if !self.open.get() || self.orientation.get() != Orientation::Detect {
            return;
        }
        let Some(anchor) = self.core.layout() else {
            return;
        };
        let rows = self.options.with(Vec::len);
        let placement = self
            .core
            .viewport()
            .placement_for(anchor, rows, ROW_EM, MAX_LIST_EM);
        self.forced_placement.set(Some(placement));
    }

    /// Keep the highlight on the edge nearest the input when the list
    /// changes under it.
    fn reset_highlight(&self) {
        if self.highlighted.get().is_none() {
            return;
        }
        let count = self.options.with(Vec::len);
        let next = if self.orientation.get() == Orientation::Up {
            count.checked_sub(1)
        } else if count > 0 {
            Some(0)
        } else {
            None
        };
        self.highlighted.set(next);
    }
}

/// Text input with suggestions.
#[derive(Clone)]
pub struct Input {
    inner: Arc<InputInner>,
}

impl Input {
    pub fn new(options: ElementOptions) -> Result<Self> {
        let mut core = ElementCore::new(PROPERTIES, options)?;
        let store = core.store_mut();
        let value = store.attribute("value", None)?;
        let disabled = store.attribute("disabled", false)?;
        let name = store.attribute("name", None)?;
        let form = store.attribute("form", None)?;
        let input_type = store.attribute("type", None)?;
        let placeholder = store.attribute("placeholder", None)?;
        let min_length = store.attribute("minLength", None)?;
        let max_length = store.attribute("maxLength", None)?;
        let error_label = store.attribute("errorLabel", None)?;
        let suggestions = store.attribute("suggestions", Vec::new())?;
        let show_all = store.attribute("suggestionsShowAll", false)?;
        let orientation = store.attribute("suggestionsOrientation", Orientation::Down)?;
        let fuzzy = store.attribute("fuzzy", false)?;
        let open = store.state("open", false)?;
        let highlighted = store.state("highlighted", None)?;
        let forced_placement = store.state("forcedPlacement", None)?;

        let sources = OptionSources {
            suggestions: suggestions.clone(),
            show_all: show_all.clone(),
            orientation: orientation.clone(),
            fuzzy: fuzzy.clone(),
            value: value.clone(),
        };
        let options = store.derive(
            "options",
            &[&suggestions, &show_all, &orientation, &fuzzy, &value],
            move || sources.compute(),
        )?;

        let inner = Arc::new(InputInner {
            core,
            value,
            disabled,
            name,
            form,
            input_type,
            placeholder,
            min_length,
            max_length,
            error_label,
            suggestions,
            orientation,
            open,
            highlighted,
            forced_placement,
            options,
            in_focus: AtomicBool::new(false),
            has_changed: AtomicBool::new(false),
            last_scroll: Mutex::new(None),
            scroll_request: Mutex::new(None),
            view: RwLock::default(),
        });
        install_render(&inner);

        Ok(Self { inner })
    }

    pub fn value(&self) -> String {
        self.inner.current_value()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        self.inner.value.set(Some(value.into()));
    }

    /// The suggestions currently offered, in display order.
    pub fn options(&self) -> Vec<String> {
        self.inner.options.get()
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.inner.highlighted.get()
    }

    /// Whether the list currently opens above the input.
    pub fn is_up(&self) -> bool {
        self.inner.is_up()
    }

    pub fn has_changed(&self) -> bool {
        self.inner.has_changed.load(Ordering::SeqCst)
    }

    pub fn show_suggestions(&self) {
        self.inner.show_suggestions();
    }

    pub fn hide_suggestions(&self) {
        self.inner.hide_suggestions();
    }

    /// Take the pending scroll request, if any.
    pub fn take_scroll_request(&self) -> Option<ScrollRequest> {
        self.inner.scroll_request.lock().take()
    }

    /// The user typed: the native input now holds `text`.
    pub fn input(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.value.set(Some(text.clone()));
        let _ = self.inner.core.emit(WidgetEvent::Input { value: text });
    }

    /// Forward a native `cut`, `copy` or `paste`. A cancelled event asks
    /// the host to suppress the native operation.
    pub fn clipboard(&self, action: ClipboardAction) -> NativeAction {
        let dispatch = self.inner.core.emit(WidgetEvent::Clipboard(action));
        if dispatch.is_cancelled() {
            NativeAction::NONE.prevent()
        } else {
            NativeAction::NONE
        }
    }

    pub fn focus(&self) {
        self.inner.in_focus.store(true, Ordering::SeqCst);
        let _ = self.inner.core.emit(WidgetEvent::Focus);
        if self.inner.options.with(|o| !o.is_empty()) {
            self.inner.show_suggestions();
        }
    }

    pub fn blur(&self) {
        self.inner.in_focus.store(false, Ordering::SeqCst);
        let _ = self.inner.core.emit(WidgetEvent::Blur);
        self.inner.hide_suggestions();
        if self.inner.has_changed.load(Ordering::SeqCst) {
            self.inner.emit_change(ChangeKind::Submit);
        }
    }

    /// A suggestion was clicked.
    pub fn option_click(&self, index: usize) -> NativeAction {
        let option = self.inner.options.with(|o| o.get(index).cloned());
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::OptionClick {
                option: option.clone().unwrap_or_default(),
            })
            .on_commit(|| {
                if let Some(option) = option {
                    self.inner.value.set(Some(option));
                    self.inner.hide_suggestions();
                    self.inner.emit_change(ChangeKind::Select);
                }
            });
        NativeAction::CONSUME
    }

    pub fn key_down(&self, key: Key) -> NativeAction {
        let inner = &self.inner;
        let page = inner.core.config().input_page_size as isize;

        let navigation = match key {
            Key::ArrowUp => Some(Highlight::By(-1)),
            Key::ArrowDown => Some(Highlight::By(1)),
            Key::PageUp => Some(Highlight::By(-page)),
            Key::PageDown => Some(Highlight::By(page)),
            Key::Home => Some(Highlight::First),
            Key::End => Some(Highlight::Last),
            _ => None,
        };

        // Page scroll is suppressed even if a listener vetoes the move.
        if let Some(navigation) = navigation {
            let _ = inner.core.emit(WidgetEvent::KeyDown { key }).on_commit(|| {
                if inner.open.get() {
                    inner.navigate(navigation);
                }
            });
            return NativeAction::CONSUME;
        }

        match key {
            Key::Enter => {
                let mut action = NativeAction::STOP;
                let _ = inner
                    .core
                    .emit(WidgetEvent::KeyDown { key })
                    .on_commit(|| {
                        if inner.select_highlighted() {
                            action = action.prevent();
                        } else if inner.has_changed.load(Ordering::SeqCst) {
                            inner.emit_change(ChangeKind::Submit);
                        }
                    })
                    .on_cancel(|| action = action.prevent());
                action
            }
            Key::Backspace | Key::Escape => {
                let opens = key == Key::Backspace;
                let mut action = NativeAction::STOP;
                let _ = inner
                    .core
                    .emit(WidgetEvent::KeyDown { key })
                    .on_commit(|| {
                        if opens {
                            inner.show_suggestions();
                        } else {
                            inner.hide_suggestions();
                        }
                    })
                    .on_cancel(|| action = action.prevent());
                action
            }
            _ => NativeAction::NONE,
        }
    }
}

impl Widget for Input {
    type View = InputView;

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

        // Only edits made while focused count as user changes.
        let weak: Weak<InputInner> = Arc::downgrade(&self.inner);
        core.hold(self.inner.value.on_change(move |_| {
            if let Some(inner) = weak.upgrade() {
                if inner.in_focus.load(Ordering::SeqCst) {
                    inner.has_changed.store(true, Ordering::SeqCst);
                }
            }
        }));

        let weak: Weak<InputInner> = Arc::downgrade(&self.inner);
        core.hold_effect(store.immediate_effect(Some(&["value", "suggestions"]), move || {
            if let Some(inner) = weak.upgrade() {
                inner.reset_highlight();
            }
        }));

        let weak: Weak<InputInner> = Arc::downgrade(&self.inner);
        core.hold_effect(store.effect(Some(&["open"]), move || {
            if let Some(inner) = weak.upgrade() {
                inner.detect_placement();
            }
        }));

        let weak: Weak<InputInner> = Arc::downgrade(&self.inner);
        core.hold_effect(store.effect(Some(&["highlighted"]), move || {
            if let Some(inner) = weak.upgrade() {
                inner.scroll_active_into_view(false);
            }
        }));

        core.attach(document);
    }

    fn disconnect(&self) {
        self.inner.in_focus.store(false, Ordering::SeqCst);
        self.inner.core.detach();
    }

    fn view(&self) -> InputView {
        self.inner.view.read().clone()
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input")
            .field("value", &self.value())
            .field("open", &self.is_open())
            .field("highlighted", &self.highlighted())
            .finish()
    }
}
