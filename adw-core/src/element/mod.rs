//! Element Layer
//!
//! Everything a widget needs besides its own controller logic: identity,
//! the property store and scheduler, event emission, global listeners and
//! the environment it measures against.
//!
//! # Lifecycle
//!
//! A widget is created detached. `connect` attaches it to a [`Document`]:
//! the widget registers its effects and global listeners into the
//! element's attached [`Scope`] and the scheduler mounts, running the first
//! render. `disconnect` disposes the scope, so every effect, property
//! listener and document listener registered while attached is released.
//! A widget can be connected again afterwards.

mod document;
mod env;
mod events;
mod input;

pub use document::{Document, GlobalEvent, GlobalEventKind};
pub use env::{Clock, ManualClock, Rect, SystemClock, Viewport};
pub use events::{
    ChangeDetail, ChangeKind, ClickDetail, ClipboardAction, Dispatch, Emitter, EventContext,
    WidgetEvent,
};
pub use input::{Key, NativeAction, PointerButton, PointerInput};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::reactive::{
    EffectHandle, PropertyDescriptor, PropertyStore, Scheduler, Scope, Subscription,
};

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Id usable as a DOM id, e.g. for `aria-controls`.
    pub fn uid(&self) -> String {
        format!(":adw{}:", self.0)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Construction options shared by all widgets.
#[derive(Clone)]
pub struct ElementOptions {
    pub config: RuntimeConfig,
    pub clock: Arc<dyn Clock>,
    pub viewport: Viewport,
}

impl ElementOptions {
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for ElementOptions {
    fn default() -> Self {
        Self {
            config: RuntimeConfig::default(),
            clock: Arc::new(SystemClock),
            viewport: Viewport::default(),
        }
    }
}

impl std::fmt::Debug for ElementOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementOptions")
            .field("config", &self.config)
            .field("viewport", &self.viewport)
            .finish()
    }
}

/// State shared by every widget.
pub struct ElementCore {
    id: ElementId,
    store: PropertyStore,
    emitter: Emitter,
    attached: Scope,
    document: RwLock<Option<Document>>,
    layout: RwLock<Option<Rect>>,
    viewport: RwLock<Viewport>,
    clock: Arc<dyn Clock>,
    config: RuntimeConfig,
}

impl ElementCore {
    /// Create the core and its store. The caller creates the declared
    /// properties on the returned store before wrapping the core.
    pub fn new(descriptors: &'static [PropertyDescriptor], options: ElementOptions) -> Result<Self> {
        let scheduler = Scheduler::new(&options.config);
        Ok(Self {
            id: ElementId::new(),
            store: PropertyStore::new(scheduler, descriptors)?,
            emitter: Emitter::new(),
            attached: Scope::new(),
            document: RwLock::new(None),
            layout: RwLock::new(None),
            viewport: RwLock::new(options.viewport),
            clock: options.clock,
            config: options.config,
        })
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PropertyStore {
        &mut self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.store.scheduler()
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn emit(&self, event: WidgetEvent) -> Dispatch {
        self.emitter.emit(event)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Keep `subscription` until the element is disconnected.
    pub fn hold(&self, subscription: impl Into<Subscription>) {
        self.attached.add(subscription.into());
    }

    pub fn document(&self) -> Option<Document> {
        self.document.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.document.read().is_some()
    }

    /// Keep a freshly registered effect until the element is disconnected.
    /// Registration only fails for undeclared dependency names.
    pub fn hold_effect(&self, effect: Result<EffectHandle>) {
        match effect {
            Ok(handle) => self.hold(handle),
            Err(err) => warn!(element = ?self.id, %err, "effect not registered"),
        }
    }

    /// Record the document, then mount the scheduler. Call after the
    /// widget registered its effects.
    pub fn attach(&self, document: &Document) {
        *self.document.write() = Some(document.clone());
        debug!(element = ?self.id, "connected");
        self.scheduler().mount();
    }

    /// Release everything registered while attached.
    pub fn detach(&self) {
        self.scheduler().unmount();
        self.attached.dispose();
        *self.document.write() = None;
        debug!(element = ?self.id, "disconnected");
    }

    pub fn layout(&self) -> Option<Rect> {
        *self.layout.read()
    }

    pub fn set_layout(&self, rect: Option<Rect>) {
        *self.layout.write() = rect;
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.read()
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.write() = viewport;
    }
}

impl std::fmt::Debug for ElementCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementCore")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .field("store", &self.store)
            .finish()
    }
}

/// The host facing surface shared by all widgets.
pub trait Widget {
    /// Render snapshot type.
    type View: Clone;

    fn core(&self) -> &ElementCore;

    /// Attach to `document`, registering effects and global listeners.
    fn connect(&self, document: &Document);

    /// The snapshot produced by the most recent render.
    fn view(&self) -> Self::View;

    fn disconnect(&self) {
        self.core().detach();
    }

    fn is_connected(&self) -> bool {
        self.core().is_connected()
    }

    fn id(&self) -> ElementId {
        self.core().id()
    }

    /// Host attribute write; `None` removes the attribute.
    fn set_attribute(&self, name: &str, value: Option<&str>) -> Result<bool> {
        self.core().store().set_attribute(name, value)
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.core().store().attribute_markup(name)
    }

    fn observed_attributes(&self) -> Vec<&'static str> {
        self.core().store().observed_attributes()
    }

    /// Run pending effects and renders; the host calls this once its event
    /// handler returns.
    fn flush(&self) -> usize {
        self.core().scheduler().flush()
    }

    /// Listen to emitted events.
    fn on_event<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&mut EventContext<'_>) + Send + Sync + 'static,
        Self: Sized,
    {
        self.core().emitter().listen(handler)
    }

    /// Report the element's bounding rect; `None` while not laid out.
    fn set_layout(&self, rect: Option<Rect>) {
        self.core().set_layout(rect);
    }

    fn set_viewport(&self, viewport: Viewport) {
        self.core().set_viewport(viewport);
    }
}
