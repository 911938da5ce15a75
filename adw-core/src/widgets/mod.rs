//! Widgets
//!
//! The four controllers. Each widget is a cheap handle around an
//! `Arc`ed inner state holding its [`ElementCore`], its typed properties
//! and the last rendered view. Effects and listeners capture the inner
//! state weakly, so dropping the last handle frees the widget even while
//! it is still connected.

pub mod input;
pub mod selector;
pub mod slider;
pub mod switch;

pub use input::{Input, InputView, ScrollRequest};
pub use selector::{Selector, SelectorOption, SelectorView};
pub use slider::{Slider, SliderView};
pub use switch::{Switch, SwitchView};

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::element::ElementCore;

/// How the host should scroll an option into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

/// Inner state of a widget that renders into a view snapshot.
pub(crate) trait Controller: Send + Sync + 'static {
    type View: Send + Sync;

    fn core(&self) -> &ElementCore;

    fn view_cell(&self) -> &RwLock<Self::View>;

    fn render(&self) -> Self::View;
}

/// Hook the controller's render into its scheduler and take the initial
/// snapshot.
pub(crate) fn install_render<C: Controller>(inner: &Arc<C>) {
    let weak = Arc::downgrade(inner);
    inner.core().scheduler().set_render(move || {
        if let Some(inner) = weak.upgrade() {
            let view = inner.render();
            *inner.view_cell().write() = view;
        }
    });

    let view = inner.render();
    *inner.view_cell().write() = view;
}
