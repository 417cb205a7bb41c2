use std::fmt;

use serde::Serialize;

/// A dimensioned value read from a `float`/`integer` element and the
/// `units` attribute of its parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl<T> Quantity<T> {
    pub fn new(value: T, units: Option<String>) -> Self {
        Self { value, units }
    }

    pub fn unitless(value: T) -> Self {
        Self { value, units: None }
    }
}

impl<T: fmt::Display> fmt::Display for Quantity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.units {
            Some(units) => write!(f, "{} {}", self.value, units),
            None => write!(f, "{}", self.value),
        }
    }
}
