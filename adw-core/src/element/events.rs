//! Widget events.
//!
//! Every event a widget emits is one variant of [`WidgetEvent`], dispatched
//! through a single [`Emitter`]. All events are cancelable: a host listener
//! calls [`EventContext::prevent_default`] to veto the widget's default
//! behaviour, which the controller expresses with [`Dispatch::on_commit`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::trace;

use super::input::{Key, PointerButton};
use crate::reactive::{ListenerId, Subscription};

/// How an input change was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A suggestion was picked.
    Select,
    /// Typed text was confirmed by Enter or blur.
    Submit,
}

/// Native clipboard operation on a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardAction {
    Cut,
    Copy,
    Paste,
}

impl ClipboardAction {
    /// DOM event name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Copy => "copy",
            Self::Paste => "paste",
        }
    }
}

/// Payload of a `change` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChangeDetail {
    Input { value: String, kind: ChangeKind },
    Selector { value: Option<String> },
    Slider { value: f64 },
    Switch { active: bool },
}

/// Payload of a `click` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum ClickDetail {
    /// The selector's own box.
    Selector,
    /// The modal dialog backdrop around the options list.
    Dialog { inside_list: bool },
    /// An option button.
    Option { option: Option<String> },
    /// The switch body; carries the value a commit would set.
    Switch { next_value: bool },
}

/// The closed set of events emitted by widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "lowercase")]
pub enum WidgetEvent {
    Change(ChangeDetail),
    OptionClick { option: String },
    KeyDown { key: Key },
    Click(ClickDetail),
    PointerDown { button: PointerButton, x: f64 },
    Input { value: String },
    /// `cut`, `copy` or `paste` forwarded from the native field.
    Clipboard(ClipboardAction),
    Focus,
    Blur,
}

impl WidgetEvent {
    /// DOM event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Change(_) => "change",
            Self::OptionClick { .. } => "optionclick",
            Self::KeyDown { .. } => "keydown",
            Self::Click(_) => "click",
            Self::PointerDown { .. } => "pointerdown",
            Self::Input { .. } => "input",
            Self::Clipboard(action) => action.name(),
            Self::Focus => "focus",
            Self::Blur => "blur",
        }
    }

    /// The event payload as JSON, for hosts that forward it as a
    /// `CustomEvent` detail.
    pub fn detail_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("detail").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }
}

/// What a listener sees while an event is being dispatched.
pub struct EventContext<'a> {
    event: &'a WidgetEvent,
    cancelled: bool,
}

impl EventContext<'_> {
    pub fn event(&self) -> &WidgetEvent {
        self.event
    }

    /// Veto the widget's default behaviour for this event.
    pub fn prevent_default(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Outcome of emitting an event.
#[derive(Debug)]
#[must_use]
pub struct Dispatch {
    event: WidgetEvent,
    cancelled: bool,
}

impl Dispatch {
    pub fn event(&self) -> &WidgetEvent {
        &self.event
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Run `f` unless a listener cancelled the event.
    pub fn on_commit(self, f: impl FnOnce()) -> Self {
        if !self.cancelled {
            f();
        }
        self
    }

    /// Run `f` only if a listener cancelled the event.
    pub fn on_cancel(self, f: impl FnOnce()) -> Self {
        if self.cancelled {
            f();
        }
        self
    }
}

type Handler = Arc<dyn Fn(&mut EventContext<'_>) + Send + Sync>;

/// Event listeners of one element. Clones share the listener list.
#[derive(Clone, Default)]
pub struct Emitter {
    listeners: Arc<RwLock<Vec<(ListenerId, Option<&'static str>, Handler)>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every event.
    pub fn listen<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&mut EventContext<'_>) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(handler))
    }

    /// Listen to events with the given DOM name.
    pub fn on<F>(&self, name: &'static str, handler: F) -> Subscription
    where
        F: Fn(&mut EventContext<'_>) + Send + Sync + 'static,
    {
        self.add(Some(name), Arc::new(handler))
    }

    fn add(&self, filter: Option<&'static str>, handler: Handler) -> Subscription {
        let id = ListenerId::new();
        self.listeners.write().push((id, filter, handler));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.write().retain(|(lid, _, _)| *lid != id);
            }
        })
    }

    /// Offer `event` to every listener in registration order.
    pub fn emit(&self, event: WidgetEvent) -> Dispatch {
        let name = event.name();
        let handlers: Vec<Handler> = self
            .listeners
            .read()
            .iter()
            .filter(|(_, filter, _)| filter.map_or(true, |f| f == name))
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        let mut ctx = EventContext {
            event: &event,
            cancelled: false,
        };
        for handler in handlers {
            handler(&mut ctx);
        }
        let cancelled = ctx.cancelled;
        trace!(event = name, cancelled, "emitted");

        Dispatch { event, cancelled }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
