//! Attribute value parsing.
//!
//! Attributes reach a widget as markup: an optional string per attribute
//! name. Each value type knows how to read itself from that form and how
//! to reflect itself back. Parsing never fails outward; the store falls
//! back to the property's declared default when `from_markup` errors.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::AttributeError;

/// Delimiter for string list attributes such as `suggestions`.
pub const LIST_DELIMITER: char = ';';

/// A value that can live in a reactive property.
pub trait PropertyValue: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> PropertyValue for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// A property value with a markup representation.
pub trait AttributeValue: PropertyValue {
    /// Read the value from markup. `None` means the attribute is absent.
    fn from_markup(raw: Option<&str>) -> Result<Self, AttributeError>;

    /// Reflect the value to markup. `None` removes the attribute.
    fn to_markup(&self) -> Option<String>;
}

/// Plain string: passthrough, absent means unset.
impl AttributeValue for Option<String> {
    fn from_markup(raw: Option<&str>) -> Result<Self, AttributeError> {
        Ok(raw.map(str::to_owned))
    }

    fn to_markup(&self) -> Option<String> {
        self.clone()
    }
}

/// Boolean: presence check, whatever the attribute text says.
impl AttributeValue for bool {
    fn from_markup(raw: Option<&str>) -> Result<Self, AttributeError> {
        Ok(raw.is_some())
    }

    fn to_markup(&self) -> Option<String> {
        self.then(String::new)
    }
}

/// Number: absent means unset, anything non-numeric is an error.
impl AttributeValue for Option<f64> {
    fn from_markup(raw: Option<&str>) -> Result<Self, AttributeError> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(AttributeError::NotANumber(raw.to_owned())),
        }
    }

    fn to_markup(&self) -> Option<String> {
        self.map(|n| n.to_string())
    }
}

/// `;` delimited list. Empty segments are dropped.
impl AttributeValue for Vec<String> {
    fn from_markup(raw: Option<&str>) -> Result<Self, AttributeError> {
        Ok(raw
            .map(|raw| {
                raw.split(LIST_DELIMITER)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn to_markup(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.join(&LIST_DELIMITER.to_string()))
        }
    }
}

/// Where a popup (suggestions, options list) opens relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Up,
    #[default]
    Down,
    /// Measure the space below the anchor on open and pick `Up` or `Down`.
    Detect,
}

impl Orientation {
    pub const VALUES: &'static [&'static str] = &["up", "down", "detect"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Detect => "detect",
        }
    }
}

impl AttributeValue for Orientation {
    fn from_markup(raw: Option<&str>) -> Result<Self, AttributeError> {
        match raw {
            Some("up") => Ok(Self::Up),
            Some("down") => Ok(Self::Down),
            Some("detect") => Ok(Self::Detect),
            Some(other) => Err(AttributeError::NotInEnum {
                value: other.to_owned(),
                allowed: Self::VALUES,
            }),
            None => Err(AttributeError::Missing),
        }
    }

    fn to_markup(&self) -> Option<String> {
        Some(self.as_str().to_owned())
    }
}

/// Resolved popup direction once `Detect` has been measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Above,
    Below,
}
