//! Compressed example tables for behavioral scoring.
//!
//! A compressed table maps each distinct input row to the weighted multiset of
//! output values observed for that input. Training data with repeated inputs
//! compresses into one row per distinct input, with per-output weights keeping
//! track of how often (or how strongly) each output was observed.
//!
//! # Modules
//!
//! - [`value`] - Observed values ([`Value`]), output type tags ([`OutputType`]),
//!   and weighted multisets of values ([`ValueCounter`])
//! - [`table`] - The compressed table itself ([`CompressedTable`]) with
//!   projection, row removal, and size queries
//!
//! # Column index preservation
//!
//! Projecting a table onto a subset of columns drops the data of the excluded
//! columns but keeps the *original* column indices of the survivors. A program
//! that references "column 7" keeps working against a projected table as long
//! as column 7 survived the projection; see [`InputRow::get`].

pub use self::{table::*, value::*};

pub mod table;
pub mod value;
