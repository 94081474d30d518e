//! The compressed table: distinct input rows mapped to weighted output multisets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value::{OutputType, Value, ValueCounter};

/// One distinct input row and the weighted multiset of outputs observed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    input: Vec<Value>,
    outputs: ValueCounter,
}

impl TableRow {
    /// The input feature values, one per surviving column.
    #[must_use]
    pub fn input(&self) -> &[Value] {
        &self.input
    }

    /// The weighted multiset of outputs observed for this input.
    #[must_use]
    pub fn outputs(&self) -> &ValueCounter {
        &self.outputs
    }

    /// Total observation weight of this row (sum of output weights).
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.outputs.total_weight()
    }
}

/// Borrowed view of one row's input that resolves column references from the
/// original (unprojected) index space.
///
/// Projection removes column *data* but not column *indices*: a surviving
/// column keeps the index it had in the original table. [`InputRow::get`]
/// accepts an original index and returns `None` when that column was
/// projected away.
#[derive(Debug, Clone, Copy)]
pub struct InputRow<'a> {
    columns: &'a [usize],
    values: &'a [Value],
}

impl InputRow<'_> {
    /// Looks up the value of the column with the given ORIGINAL index.
    #[must_use]
    pub fn get(&self, original_idx: usize) -> Option<Value> {
        let pos = self.columns.iter().position(|&c| c == original_idx)?;
        self.values.get(pos).copied()
    }

    /// The surviving values, in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        self.values
    }

    /// Original indices of the surviving columns, ascending.
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        self.columns
    }
}

/// A compressed table of labeled examples.
///
/// Maps each distinct input row to a [`ValueCounter`] of observed outputs.
/// Row-iteration order is stable: rows appear in first-observation order and
/// keep that order through projection and row removal, so row-aligned
/// consumers (behavioral scores) can index-align across repeated passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedTable {
    arity: usize,
    columns: Vec<usize>,
    output_type: OutputType,
    rows: Vec<TableRow>,
}

impl CompressedTable {
    /// Creates an empty table with `arity` input columns.
    #[must_use]
    pub fn new(arity: usize, output_type: OutputType) -> Self {
        Self {
            arity,
            columns: (0..arity).collect(),
            output_type,
            rows: Vec::new(),
        }
    }

    /// Records one `(input, output, weight)` observation.
    ///
    /// An input equal to an existing row merges into that row's output
    /// counter; a new input appends a new row.
    ///
    /// # Panics
    ///
    /// Panics if `input.len()` differs from the number of surviving columns,
    /// or if `value`'s type differs from the table's output type.
    pub fn add_observation(&mut self, input: Vec<Value>, value: Value, weight: f64) {
        assert_eq!(input.len(), self.columns.len());
        assert_eq!(value.output_type(), self.output_type);
        if let Some(row) = self.rows.iter_mut().find(|row| row.input == input) {
            row.outputs.add(value, weight);
        } else {
            let mut outputs = ValueCounter::new();
            outputs.add(value, weight);
            self.rows.push(TableRow { input, outputs });
        }
    }

    /// Number of distinct rows (compressed size).
    #[must_use]
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of all row weights (uncompressed size).
    #[must_use]
    pub fn uncompressed_size(&self) -> f64 {
        self.rows.iter().map(TableRow::total_weight).sum()
    }

    /// Arity of the ORIGINAL index space (unchanged by projection).
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The declared output type.
    #[must_use]
    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    /// Original indices of the surviving columns, ascending.
    #[must_use]
    pub fn column_indices(&self) -> &[usize] {
        &self.columns
    }

    /// All rows, in stable iteration order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Input view of row `i`, resolving original column indices.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[must_use]
    pub fn input_row(&self, i: usize) -> InputRow<'_> {
        InputRow {
            columns: &self.columns,
            values: &self.rows[i].input,
        }
    }

    /// Projects the table onto the columns whose ORIGINAL index is in `keep`.
    ///
    /// Rows that become identical after dropping columns merge, combining
    /// their output counters; total observation weight is preserved. Row
    /// order follows first occurrence.
    #[must_use]
    pub fn projected(&self, keep: &BTreeSet<usize>) -> Self {
        let kept_positions: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(pos, idx)| keep.contains(idx).then_some(pos))
            .collect();
        let columns: Vec<usize> = kept_positions.iter().map(|&pos| self.columns[pos]).collect();

        let mut projected = Self {
            arity: self.arity,
            columns,
            output_type: self.output_type,
            rows: Vec::new(),
        };
        for row in &self.rows {
            let input: Vec<Value> = kept_positions.iter().map(|&pos| row.input[pos]).collect();
            if let Some(existing) = projected.rows.iter_mut().find(|r| r.input == input) {
                existing.outputs.merge(&row.outputs);
            } else {
                projected.rows.push(TableRow {
                    input,
                    outputs: row.outputs.clone(),
                });
            }
        }
        projected
    }

    /// Returns a copy with the rows at the given positions removed.
    ///
    /// Positions index the current row order; out-of-range positions are
    /// ignored.
    #[must_use]
    pub fn with_rows_removed(&self, excluded: &BTreeSet<usize>) -> Self {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| (!excluded.contains(&i)).then(|| row.clone()))
            .collect();
        Self {
            arity: self.arity,
            columns: self.columns.clone(),
            output_type: self.output_type,
            rows,
        }
    }
}
