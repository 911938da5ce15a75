//! Environment the controllers measure against: time, layout, viewport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::reactive::Placement;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

/// An element's bounding client rect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

const MOBILE_AGENTS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// The visible viewport and the type scale used for popup measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub height: f64,
    /// Computed font size of the widget, in pixels.
    pub em: f64,
    /// Touch device: selectors present their options in a modal dialog.
    pub is_mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            height: 800.0,
            em: 16.0,
            is_mobile: false,
        }
    }
}

impl Viewport {
    /// Classify the device from its user agent string.
    pub fn from_user_agent(user_agent: &str, height: f64, em: f64) -> Self {
        let agent = user_agent.to_lowercase();
        Self {
            height,
            em,
            is_mobile: MOBILE_AGENTS.iter().any(|token| agent.contains(token)),
        }
    }

    /// Decide whether a popup of `rows` rows fits below `anchor`.
    ///
    /// The popup's estimated height is `rows * row_em` em, capped at
    /// `max_em` em or 80% of the viewport, whichever is smaller.
    pub fn placement_for(&self, anchor: Rect, rows: usize, row_em: f64, max_em: f64) -> Placement {
        let distance_to_bottom = self.height - anchor.bottom();
        let max_height = (max_em * self.em).min(0.8 * self.height);
        let target_height = max_height.min(rows as f64 * row_em * self.em);

        if distance_to_bottom < target_height {
            Placement::Above
        } else {
            Placement::Below
        }
    }
}
