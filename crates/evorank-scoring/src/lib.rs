//! Behavioral scoring for evolutionary program search.
//!
//! This crate computes a per-example fitness signal, the *behavioral score*,
//! used to rank candidate programs during an evolutionary search over program
//! space. Given a compressed table of labeled examples (see `evorank-table`)
//! and a candidate program or weighted ensemble of programs, it produces one
//! reward value per table row plus the derived scalars the outer search loop
//! combines into a fitness value.
//!
//! # Architecture
//!
//! ```text
//! Search loop (external): fitness = aggregate(score) - coef * complexity
//!     ↓ uses
//! SelectionScorer (score programs/ensembles against a selection band)
//!     ↓ uses
//! WorkingTable (column- and row-filtered views of the example table)
//! ```
//!
//! # Modules
//!
//! - [`complexity`] - Regularization coefficients penalizing program size
//! - [`score`] - The behavioral-score vector and scalar aggregation
//! - [`scorer`] - The scoring contract: [`scorer::Program`] seam,
//!   [`scorer::BehavioralScorer`] trait, weighted ensembles
//! - [`working_table`] - Two-level table filtering (columns, then rows) with
//!   history-independent row exclusion
//! - [`select`] - The concrete [`select::SelectionScorer`]: weighted-percentile
//!   band construction and in-band/out-of-band agreement scoring
//!
//! # Concurrency
//!
//! Scoring is synchronous, deterministic, and side-effect-free. Scorers are
//! `Send + Sync`; shared-reference scoring calls may run concurrently from
//! many worker threads. The table-filtering mutators take `&mut self`, so the
//! exclusive single-writer discipline the filtering views require is enforced
//! by the borrow checker rather than by documentation.
//!
//! # Diagnostics
//!
//! The crate emits leveled human-readable diagnostics through the [`log`]
//! facade (band construction at info, table filtering at debug/trace).
//! Nothing is consumed programmatically from the log output.

pub mod complexity;
pub mod score;
pub mod scorer;
pub mod select;
pub mod working_table;
