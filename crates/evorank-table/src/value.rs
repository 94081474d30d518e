//! Observed values and weighted value multisets.

use serde::{Deserialize, Serialize};

/// Output type declared by a compressed table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    /// Boolean-valued outputs.
    #[display("boolean")]
    Boolean,
    /// Continuous (real-valued) outputs.
    #[display("continuous")]
    Continuous,
    /// Discrete (enumerated) outputs.
    #[display("discrete")]
    Discrete,
}

/// A single observed feature or output value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Continuous value.
    Contin(f64),
    /// Discrete value.
    Disc(i64),
}

impl Value {
    /// Returns the output type this value belongs to.
    #[must_use]
    pub fn output_type(self) -> OutputType {
        match self {
            Value::Bool(_) => OutputType::Boolean,
            Value::Contin(_) => OutputType::Continuous,
            Value::Disc(_) => OutputType::Discrete,
        }
    }

    /// Returns the continuous value, or `None` for non-continuous values.
    #[must_use]
    pub fn as_contin(self) -> Option<f64> {
        match self {
            Value::Contin(v) => Some(v),
            Value::Bool(_) | Value::Disc(_) => None,
        }
    }

    /// Returns `true` iff this is `Bool(true)`.
    ///
    /// A program's output is "classified true" exactly when this holds;
    /// continuous and discrete outputs never classify as true.
    #[must_use]
    pub fn is_true(self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

/// Weighted multiset of observed output values.
///
/// Adding a value that compares equal to an existing entry merges the weights;
/// otherwise the value is appended. Iteration yields entries in insertion
/// order, so consumers that need a canonical result must not depend on entry
/// order (the scoring core's tie-breaks are order-independent for exactly this
/// reason).
///
/// `Contin` values merge on exact (`==`) float equality; NaN never merges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueCounter {
    entries: Vec<(Value, f64)>,
}

impl ValueCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to `value`'s entry, creating the entry if absent.
    pub fn add(&mut self, value: Value, weight: f64) {
        if let Some((_, w)) = self.entries.iter_mut().find(|(v, _)| *v == value) {
            *w += weight;
        } else {
            self.entries.push((value, weight));
        }
    }

    /// Merges all entries of `other` into `self`.
    pub fn merge(&mut self, other: &ValueCounter) {
        for &(value, weight) in &other.entries {
            self.add(value, weight);
        }
    }

    /// Iterates over `(value, weight)` entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Value, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Sum of all entry weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the counter holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Value, f64)> for ValueCounter {
    fn from_iter<I: IntoIterator<Item = (Value, f64)>>(iter: I) -> Self {
        let mut counter = Self::new();
        for (value, weight) in iter {
            counter.add(value, weight);
        }
        counter
    }
}
