//! Numeric rounding applied to designated table columns.
//!
//! Values up to and including 1 are shares and keep two decimals; larger
//! values are counts and are rounded to an integer. Ties round to even.

use std::collections::BTreeSet;

/// Set of 0-based column indices whose values are rounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundingSpec {
    columns: BTreeSet<usize>,
}

impl RoundingSpec {
    /// No rounding at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Round the given columns.
    pub fn columns(columns: impl IntoIterator<Item = usize>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    /// Whether column `col` is rounded.
    pub fn applies_to(&self, col: usize) -> bool {
        self.columns.contains(&col)
    }

    /// Whether no column is designated.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Round a numeric value according to the share/count rule.
pub fn round_value(value: f64) -> String {
    if value <= 1.0 {
        let rounded = (value * 100.0).round_ties_even() / 100.0;
        format!("{}", rounded)
    } else {
        format!("{:.0}", value.round_ties_even())
    }
}

/// Round a cell's text if it parses as a number, otherwise return it as is.
pub fn round_cell(text: &str) -> String {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => round_value(value),
        _ => {
            log::debug!("Leaving non-numeric value '{}' unrounded", text);
            text.to_string()
        }
    }
}
