//! Two-level table filtering for repeated, search-driven evaluation.
//!
//! The search loop narrows the example table to speed up repeated scoring:
//! first by excluding feature columns, then by excluding rows. The two levels
//! are kept as distinct snapshots so that row exclusion is
//! history-independent: every [`WorkingTable::restrict_rows`] call re-derives
//! the working copy from the column-filtered snapshot, never from a previous
//! working copy, so results depend only on the latest call's argument.

use std::{collections::BTreeSet, sync::Arc};

use log::{debug, trace};

use evorank_table::CompressedTable;

/// Column- and row-filtered views of an immutable compressed table.
///
/// Invariants: `working`'s columns are a subset of `column_filtered`'s, which
/// are a subset of the original's; `working`'s rows are a subset of
/// `column_filtered`'s. The original is shared read-only and never mutated.
///
/// The mutators take `&mut self` while scoring reads take `&self`, so the
/// caller-serialized single-writer discipline is enforced by the borrow
/// checker.
#[derive(Debug, Clone)]
pub struct WorkingTable {
    original: Arc<CompressedTable>,
    column_filtered: CompressedTable,
    working: CompressedTable,
    compressed_size: usize,
    uncompressed_size: f64,
}

impl WorkingTable {
    /// Builds unfiltered views over `original`.
    #[must_use]
    pub fn new(original: Arc<CompressedTable>) -> Self {
        let column_filtered = (*original).clone();
        let working = column_filtered.clone();
        let compressed_size = working.size();
        let uncompressed_size = working.uncompressed_size();
        Self {
            original,
            column_filtered,
            working,
            compressed_size,
            uncompressed_size,
        }
    }

    /// Recomputes the column-filtered snapshot by projecting the original
    /// table onto the complement of `excluded`, and resets the working copy
    /// to it (clearing any prior row exclusion).
    ///
    /// Surviving columns keep their original indices, so downstream column
    /// references remain valid.
    pub fn restrict_columns(&mut self, excluded: &BTreeSet<usize>) {
        debug!("restricting table by excluding features: {excluded:?}");

        let keep: BTreeSet<usize> = self
            .original
            .column_indices()
            .iter()
            .copied()
            .filter(|idx| !excluded.contains(idx))
            .collect();
        self.column_filtered = self.original.projected(&keep);
        self.working = self.column_filtered.clone();
        self.refresh_sizes();

        debug!(
            "original table size = {}, working table size = {}",
            self.original.size(),
            self.working.size()
        );
        trace!("working table = {:?}", self.working);
    }

    /// Resets the working copy to the current column-filtered snapshot, then
    /// removes the rows at the given positions.
    ///
    /// Positions index rows of the column-filtered snapshot; out-of-range
    /// positions are ignored. Repeated calls always measure against the same
    /// snapshot, so the result depends only on this call's argument.
    pub fn restrict_rows(&mut self, excluded: &BTreeSet<usize>) {
        self.working = self.column_filtered.with_rows_removed(excluded);
        self.refresh_sizes();

        trace!(
            "working table compressed size = {}, uncompressed size = {}",
            self.compressed_size, self.uncompressed_size
        );
    }

    fn refresh_sizes(&mut self) {
        self.compressed_size = self.working.size();
        self.uncompressed_size = self.working.uncompressed_size();
    }

    /// The working (column- and row-filtered) table.
    #[must_use]
    pub fn working(&self) -> &CompressedTable {
        &self.working
    }

    /// The original, unfiltered table, for callers needing ground truth
    /// independent of current filtering.
    #[must_use]
    pub fn original(&self) -> &Arc<CompressedTable> {
        &self.original
    }

    /// Number of distinct rows in the working table.
    #[must_use]
    pub fn compressed_size(&self) -> usize {
        self.compressed_size
    }

    /// Sum of row weights in the working table.
    #[must_use]
    pub fn uncompressed_size(&self) -> f64 {
        self.uncompressed_size
    }
}
