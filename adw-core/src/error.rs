//! Error types.
//!
//! Errors only surface at definition time (building a property store,
//! registering effects, loading configuration). Interaction paths never
//! return them: malformed attribute input falls back to defaults and
//! missing layout is a no-op.

use thiserror::Error;

/// Crate level error.
#[derive(Debug, Error)]
pub enum Error {
    /// A lookup or dependency list named a property the store does not have.
    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    /// A typed lookup asked for a different value type than the property holds.
    #[error("property `{name}` does not hold a value of type {expected}")]
    PropertyType {
        name: String,
        expected: &'static str,
    },

    /// The host wrote an attribute this widget does not observe.
    #[error("attribute `{0}` is not observed by this element")]
    UnknownAttribute(String),

    /// A descriptor list declared the same property name twice.
    #[error("property `{0}` is declared more than once")]
    DuplicateProperty(String),

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to parse one attribute value from its markup form.
///
/// Recovered locally by the property store, which substitutes the declared
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("`{value}` is not one of {allowed:?}")]
    NotInEnum {
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("attribute is missing")]
    Missing,
}
