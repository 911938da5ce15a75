//! Adw Core
//!
//! This crate provides the headless runtime behind the Adw widget set.
//! It implements:
//!
//! - Reactive primitives (properties, derived values, effects)
//! - An update scheduler that coalesces changes into one render per turn
//! - The element layer: identity, lifecycle, events and global listeners
//! - Interaction controllers for the input, selector, slider and switch
//!
//! Rendering is left to the host. Every widget exposes a serializable view
//! snapshot, refreshed after each update, that a host binds to its markup.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Properties, derived values and the effect scheduler
//! - `element`: Element core, events, document listeners and environment
//! - `widgets`: The four controllers
//! - `util`: Suggestion matching and numeric helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use adw_core::element::{Document, ElementOptions, Widget};
//! use adw_core::widgets::Switch;
//!
//! let document = Document::new();
//! let switch = Switch::new(ElementOptions::default())?;
//! switch.connect(&document);
//!
//! switch.click();
//! switch.flush();
//! assert!(switch.view().active);
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod reactive;
pub mod util;
pub mod widgets;

pub use config::RuntimeConfig;
pub use element::{Document, ElementOptions, Widget};
pub use error::{Error, Result};
pub use widgets::{Input, Selector, SelectorOption, Slider, Switch};
