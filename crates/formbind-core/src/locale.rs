//! # Numeric Locale
//!
//! Separator configuration for the numeric digit-format matcher. Only
//! the two separators matter at this layer; locale negotiation is a
//! collaborator concern.

use serde::{Deserialize, Serialize};

/// Decimal and grouping separators for numeric input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericLocale {
    /// Separator between integer and fraction parts.
    pub decimal_separator: char,
    /// Thousands-grouping separator.
    pub grouping_separator: char,
}

impl NumericLocale {
    /// Create a locale from explicit separators.
    pub const fn new(decimal_separator: char, grouping_separator: char) -> Self {
        Self {
            decimal_separator,
            grouping_separator,
        }
    }

    /// `1,234.56` style.
    pub const fn point_decimal() -> Self {
        Self::new('.', ',')
    }

    /// `1.234,56` style.
    pub const fn comma_decimal() -> Self {
        Self::new(',', '.')
    }
}

impl Default for NumericLocale {
    fn default() -> Self {
        Self::point_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_point_decimal() {
        let locale = NumericLocale::default();
        assert_eq!(locale.decimal_separator, '.');
        assert_eq!(locale.grouping_separator, ',');
    }

    #[test]
    fn comma_decimal_swaps_separators() {
        let locale = NumericLocale::comma_decimal();
        assert_eq!(locale.decimal_separator, ',');
        assert_eq!(locale.grouping_separator, '.');
    }
}
