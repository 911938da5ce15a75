//! Document and window level listeners.
//!
//! Some controllers listen outside their own subtree: the slider follows
//! the pointer across the whole window while dragging and the selector
//! closes on clicks anywhere else in the document. Those registrations go
//! through a shared [`Document`] and come back as subscriptions that the
//! widget releases on disconnect.

use std::sync::Arc;

use parking_lot::RwLock;

use super::input::PointerInput;
use super::ElementId;
use crate::reactive::{ListenerId, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalEventKind {
    Click,
    PointerMove,
    PointerUp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalEvent {
    /// A click anywhere. `path` lists the elements from the target up to
    /// the root, like `Event.composedPath()`.
    Click { path: Vec<ElementId> },
    PointerMove(PointerInput),
    PointerUp(PointerInput),
}

impl GlobalEvent {
    pub fn kind(&self) -> GlobalEventKind {
        match self {
            Self::Click { .. } => GlobalEventKind::Click,
            Self::PointerMove(_) => GlobalEventKind::PointerMove,
            Self::PointerUp(_) => GlobalEventKind::PointerUp,
        }
    }
}

type Handler = Arc<dyn Fn(&GlobalEvent) + Send + Sync>;

/// Shared document/window event target. Clones share listeners.
#[derive(Clone, Default)]
pub struct Document {
    listeners: Arc<RwLock<Vec<(ListenerId, GlobalEventKind, Handler)>>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen<F>(&self, kind: GlobalEventKind, handler: F) -> Subscription
    where
        F: Fn(&GlobalEvent) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.listeners.write().push((id, kind, Arc::new(handler)));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.write().retain(|(lid, _, _)| *lid != id);
            }
        })
    }

    /// Deliver an event to every listener of its kind.
    pub fn dispatch(&self, event: &GlobalEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .listeners
            .read()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    pub fn click(&self, path: Vec<ElementId>) {
        self.dispatch(&GlobalEvent::Click { path });
    }

    pub fn pointer_move(&self, input: PointerInput) {
        self.dispatch(&GlobalEvent::PointerMove(input));
    }

    pub fn pointer_up(&self, input: PointerInput) {
        self.dispatch(&GlobalEvent::PointerUp(input));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn listener_count_of(&self, kind: GlobalEventKind) -> usize {
        self.listeners.read().iter().filter(|(_, k, _)| *k == kind).count()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_reaches_matching_kind_only() {
        let document = Document::new();
        let moves = Arc::new(AtomicUsize::new(0));
        let moves_clone = moves.clone();

        let _sub = document.listen(GlobalEventKind::PointerMove, move |_| {
            moves_clone.fetch_add(1, Ordering::SeqCst);
        });

        document.pointer_move(PointerInput::primary(1.0, 1.0));
        document.pointer_up(PointerInput::primary(1.0, 1.0));
        document.click(Vec::new());

        assert_eq!(moves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriptions_remove_listeners() {
        let document = Document::new();
        let a = document.listen(GlobalEventKind::Click, |_| {});
        let b = document.listen(GlobalEventKind::PointerUp, |_| {});
        assert_eq!(document.listener_count(), 2);

        a.cancel();
        assert_eq!(document.listener_count_of(GlobalEventKind::Click), 0);
        drop(b);
        assert_eq!(document.listener_count(), 0);
    }
}
