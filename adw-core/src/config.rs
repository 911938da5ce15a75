//! Runtime configuration.
//!
//! Tunables that the widgets read at construction time. Everything has a
//! default matching the stock widget behaviour, so hosts only override what
//! they need:
//!
//! ```rust
//! use adw_core::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json_str(r#"{ "input_page_size": 5 }"#).unwrap();
//! assert_eq!(config.input_page_size, 5);
//! assert_eq!(config.selector_page_size, 10);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables shared by the scheduler and the interaction controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Maximum number of render passes one flush may run before pending
    /// work is dropped.
    pub max_update_passes: usize,

    /// Maximum number of immediate effect rounds folded into one render.
    pub max_immediate_rounds: usize,

    /// How long typed characters accumulate in the selector search buffer.
    pub search_buffer_timeout_ms: u64,

    /// Minimum time between two keyboard focus moves in the selector.
    pub focus_change_throttle_ms: u64,

    /// Scrolls requested within this window of the previous one are
    /// instant rather than smooth (a held arrow key).
    pub scroll_instant_window_ms: u64,

    /// Rows moved by PageUp/PageDown in the input suggestions.
    pub input_page_size: usize,

    /// Options moved by PageUp/PageDown in the selector.
    pub selector_page_size: usize,

    /// Delay before the selected option is scrolled into view after the
    /// selector opens (waits out the opening animation).
    pub scroll_into_view_delay_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_update_passes: 32,
            max_immediate_rounds: 64,
            search_buffer_timeout_ms: 1000,
            focus_change_throttle_ms: 60,
            scroll_instant_window_ms: 100,
            input_page_size: 8,
            selector_page_size: 10,
            scroll_into_view_delay_ms: 201,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults,
    /// unknown fields are rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn search_buffer_timeout(&self) -> Duration {
        Duration::from_millis(self.search_buffer_timeout_ms)
    }

    pub fn focus_change_throttle(&self) -> Duration {
        Duration::from_millis(self.focus_change_throttle_ms)
    }

    pub fn scroll_instant_window(&self) -> Duration {
        Duration::from_millis(self.scroll_instant_window_ms)
    }

    pub fn scroll_into_view_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_into_view_delay_ms)
    }
}
