//! Denomination catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A distinct face value of a note or coin.
///
/// The `value` is unique within a machine and serves as the stable identifier
/// of the denomination: plans, thresholds and stock configs are all keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Denomination {
    /// Face value in whole currency units. Always positive.
    pub value: u32,

    /// Human readable label, e.g. `$50`.
    pub description: String,
}

impl Denomination {
    /// Creates a denomination with the default `$<value>` description.
    pub fn new(value: u32) -> Self {
        Denomination {
            value,
            description: default_description(value),
        }
    }

    /// Creates a denomination with an explicit description.
    pub fn with_description(value: u32, description: impl Into<String>) -> Self {
        Denomination {
            value,
            description: description.into(),
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Label used when no description is configured.
pub fn default_description(value: u32) -> String {
    format!("${}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_description() {
        let d = Denomination::new(50);
        assert_eq!(d.value, 50);
        assert_eq!(d.description, "$50");
        assert_eq!(d.to_string(), "$50");
    }

    #[test]
    fn test_custom_description() {
        let d = Denomination::with_description(2, "two dollar coin");
        assert_eq!(d.to_string(), "two dollar coin");
    }
}
