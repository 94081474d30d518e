//! Selection scoring: weighted-percentile bands over continuous outputs.
//!
//! The selection scorer turns a continuous-valued example table into a binary
//! selection task. At construction it computes a *selection band*: the range
//! of output values lying between two weighted percentiles of the per-row
//! weightiest outputs. A program is then rewarded per row for classifying
//! "true" exactly on the rows whose weightiest value falls inside the band.
//!
//! # Band construction
//!
//! Every distinct row contributes one `(value, weight)` observation: its
//! weightiest (highest-weighted) output value. Observations are sorted by
//! value and walked in ascending order, accumulating weight; each bound is
//! the value of the first observation at which the running weight strictly
//! exceeds the corresponding percentile scaled by the total weight.
//!
//! Rows sharing an identical weightiest value stay separate observations
//! during accumulation. Collapsing same-valued rows into one bucket (as a
//! value-keyed map would) silently drops weight and shifts the bounds.
//!
//! # Ensemble scoring
//!
//! Ensembles are scored in two row-aligned passes: first every member casts a
//! signed vote per row (`+weight` for "true", `-weight` for "false"), then
//! each row's accumulated vote sign goes through the same band-membership
//! reward rule as single-program scoring. Disagreeing members partially
//! cancel instead of being forced through an early discrete majority vote.

use std::{collections::BTreeSet, iter, sync::Arc};

use log::info;
use serde::{Deserialize, Serialize};

use evorank_table::{CompressedTable, OutputType, Value, ValueCounter};

use crate::{
    complexity::ComplexityCoef,
    score::BehavioralScore,
    scorer::{BehavioralScorer, EnsembleUnsupportedError, Program, WeightedProgram},
    working_table::WorkingTable,
};

/// A selection scorer was constructed with invalid arguments.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SelectionScorerError {
    /// The table's output type is not continuous.
    #[display("selection scoring requires a continuous-valued output table, got {output_type}")]
    NonContinuousOutput {
        /// The offending output type.
        output_type: OutputType,
    },
    /// Percentiles outside `0 <= lower < 1`, `0 < upper <= 1`.
    #[display("selection percentiles out of range: lower = {lower}, upper = {upper}")]
    InvalidPercentiles {
        /// The lower percentile passed in.
        lower: f64,
        /// The upper percentile passed in.
        upper: f64,
    },
    /// Hardness outside `[0, 1]`.
    #[display("selection hardness must lie within [0, 1], got {hardness}")]
    InvalidHardness {
        /// The hardness passed in.
        hardness: f64,
    },
}

/// The fixed decision boundary on sign-adjusted output values.
///
/// Computed once at scorer construction, immutable thereafter. Both bounds
/// are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionBand {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Inclusive upper bound.
    pub upper: f64,
}

impl SelectionBand {
    /// Whether `value` lies inside the band (bounds inclusive).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Highest-weighted output value of one row, as a sign-adjusted
/// `(value, weight)` pair.
///
/// Several output values may share the largest weight; ties prefer the
/// greater sign-adjusted value. The result depends only on the multiset's
/// `(value, weight)` pairs, never on its iteration order, so randomly
/// re-ordered tables extract identical pairs.
#[expect(clippy::float_cmp)]
fn weightiest(outputs: &ValueCounter, positive: bool) -> (f64, f64) {
    let mut weightiest_val = f64::NEG_INFINITY;
    let mut weightiest = 0.0;
    for (value, weight) in outputs.iter() {
        let mut val = contin(value);
        if !positive {
            val = -val;
        }
        if weightiest < weight || (weightiest == weight && weightiest_val < val) {
            weightiest = weight;
            weightiest_val = val;
        }
    }
    (weightiest_val, weightiest)
}

fn contin(value: Value) -> f64 {
    match value {
        Value::Contin(v) => v,
        // ruled out by the output-type check in SelectionScorer::new
        Value::Bool(_) | Value::Disc(_) => {
            unreachable!("non-continuous output in a continuous-valued table")
        }
    }
}

fn compute_band(
    table: &CompressedTable,
    lower_percentile: f64,
    upper_percentile: f64,
    positive: bool,
) -> SelectionBand {
    // One observation per row, sorted by value ascending. Rows sharing a
    // weightiest value stay separate so no weight is lost.
    let mut ranked: Vec<(f64, f64)> = table
        .rows()
        .iter()
        .map(|row| weightiest(row.outputs(), positive))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total_weight: f64 = ranked.iter().map(|(_, w)| w).sum();

    info!(
        "selection band: lower percentile = {lower_percentile}, \
         upper percentile = {upper_percentile}, total weight = {total_weight}"
    );

    let lower_target = lower_percentile * total_weight;
    let upper_target = upper_percentile * total_weight;
    let mut running_weight = 0.0;
    let mut lower = None;
    let mut upper = None;
    for &(value, weight) in &ranked {
        running_weight += weight;
        if lower.is_none() && lower_target < running_weight {
            lower = Some(value);
        }
        if upper.is_none() && upper_target < running_weight {
            upper = Some(value);
        }
    }

    // A percentile of exactly 1.0 (or accumulated rounding) can leave a bound
    // unset; the greatest observed value is the limit of "first row strictly
    // exceeding the target".
    let greatest = ranked.last().map_or(f64::NEG_INFINITY, |&(value, _)| value);
    let band = SelectionBand {
        lower: lower.unwrap_or(greatest),
        upper: upper.unwrap_or(greatest),
    };
    info!(
        "selection band: lower bound = {}, upper bound = {}",
        band.lower, band.upper
    );
    band
}

/// Scores programs by agreement between their boolean classification and
/// selection-band membership.
///
/// Per row, a program earns `+weightiest_weight` when it classifies the row
/// "true" and the row's sign-adjusted weightiest value lies in the band, or
/// classifies it "false" and the value lies outside; it earns
/// `-weightiest_weight` otherwise.
#[derive(Debug, Clone)]
pub struct SelectionScorer {
    table: WorkingTable,
    band: SelectionBand,
    hardness: f64,
    positive: bool,
    complexity_coef: ComplexityCoef,
}

impl SelectionScorer {
    /// Builds a scorer over `table`, computing the selection band from the
    /// weighted percentiles of the per-row weightiest outputs.
    ///
    /// `positive` selects whether high (`true`) or low (`false`) output
    /// values are the target of selection. `hardness` is carried through for
    /// the outer loop's use and does not alter the band computation.
    ///
    /// # Errors
    ///
    /// - [`SelectionScorerError::NonContinuousOutput`] unless the table's
    ///   output type is continuous
    /// - [`SelectionScorerError::InvalidPercentiles`] unless
    ///   `0 <= lower_percentile < 1` and `0 < upper_percentile <= 1`
    /// - [`SelectionScorerError::InvalidHardness`] unless
    ///   `0 <= hardness <= 1`
    pub fn new(
        table: Arc<CompressedTable>,
        lower_percentile: f64,
        upper_percentile: f64,
        hardness: f64,
        positive: bool,
    ) -> Result<Self, SelectionScorerError> {
        let output_type = table.output_type();
        if output_type != OutputType::Continuous {
            return Err(SelectionScorerError::NonContinuousOutput { output_type });
        }
        if !(0.0..1.0).contains(&lower_percentile)
            || upper_percentile <= 0.0
            || upper_percentile > 1.0
        {
            return Err(SelectionScorerError::InvalidPercentiles {
                lower: lower_percentile,
                upper: upper_percentile,
            });
        }
        if !(0.0..=1.0).contains(&hardness) {
            return Err(SelectionScorerError::InvalidHardness { hardness });
        }

        let band = compute_band(&table, lower_percentile, upper_percentile, positive);
        Ok(Self {
            table: WorkingTable::new(table),
            band,
            hardness,
            positive,
            complexity_coef: ComplexityCoef::disabled(),
        })
    }

    /// The selection band computed at construction.
    #[must_use]
    pub fn band(&self) -> SelectionBand {
        self.band
    }

    /// The hardness parameter, carried through for the outer loop.
    #[must_use]
    pub fn hardness(&self) -> f64 {
        self.hardness
    }

    /// Whether high output values are the selection target.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// The current complexity-regularization coefficient.
    #[must_use]
    pub fn complexity_coef(&self) -> ComplexityCoef {
        self.complexity_coef
    }

    /// Sets the complexity-regularization coefficient.
    pub fn set_complexity_coef(&mut self, coef: ComplexityCoef) {
        self.complexity_coef = coef;
    }

    /// The table views this scorer evaluates against.
    #[must_use]
    pub fn working_table(&self) -> &WorkingTable {
        &self.table
    }

    /// Excludes feature columns from evaluation; clears any row exclusion.
    ///
    /// See [`WorkingTable::restrict_columns`]. Exclusive with all scoring
    /// calls by `&mut self`.
    pub fn restrict_columns(&mut self, excluded: &BTreeSet<usize>) {
        self.table.restrict_columns(excluded);
    }

    /// Excludes rows from evaluation, measured against the column-filtered
    /// snapshot regardless of prior row exclusions.
    ///
    /// See [`WorkingTable::restrict_rows`].
    pub fn restrict_rows(&mut self, excluded: &BTreeSet<usize>) {
        self.table.restrict_rows(excluded);
    }

    fn row_reward(&self, outputs: &ValueCounter, selected: bool) -> f64 {
        let (value, weight) = weightiest(outputs, self.positive);
        if selected == self.band.contains(value) {
            weight
        } else {
            -weight
        }
    }
}

impl<P: Program> BehavioralScorer<P> for SelectionScorer {
    fn score_one(&self, program: &P) -> BehavioralScore {
        let working = self.table.working();
        let mut score = BehavioralScore::with_capacity(working.size());
        for (i, row) in working.rows().iter().enumerate() {
            let selected = program.evaluate(working.input_row(i)).is_true();
            score.push(self.row_reward(row.outputs(), selected));
        }
        score
    }

    fn supports_ensembles(&self) -> bool {
        true
    }

    fn score_ensemble(
        &self,
        ensemble: &[WeightedProgram<P>],
    ) -> Result<BehavioralScore, EnsembleUnsupportedError> {
        let working = self.table.working();

        // Pass 1: signed weighted vote per row, accumulated over all members.
        let mut votes = vec![0.0; working.size()];
        for member in ensemble {
            for (i, vote) in votes.iter_mut().enumerate() {
                let selected = member.program().evaluate(working.input_row(i)).is_true();
                *vote += if selected {
                    member.weight()
                } else {
                    -member.weight()
                };
            }
        }

        // Pass 2: the vote sign (positive predicts "true") goes through the
        // same band-membership reward rule as single-program scoring.
        let score = iter::zip(working.rows(), &votes)
            .map(|(row, &vote)| self.row_reward(row.outputs(), vote > 0.0))
            .collect();
        Ok(score)
    }

    fn best_possible_score(&self) -> BehavioralScore {
        self.table
            .working()
            .rows()
            .iter()
            .map(|row| weightiest(row.outputs(), self.positive).1)
            .collect()
    }

    fn min_significant_improvement(&self) -> f64 {
        1.0 / self.table.uncompressed_size()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::seq::SliceRandom;
    use rand_pcg::Pcg64Mcg;

    use evorank_table::InputRow;

    use crate::score::{ScoreAggregator, SimpleAggregator};

    use super::*;

    /// Classifies "true" when the value of one original column reaches a
    /// threshold.
    #[derive(Debug)]
    struct ThresholdProgram {
        column: usize,
        threshold: f64,
        size: u64,
    }

    impl Program for ThresholdProgram {
        fn evaluate(&self, input: InputRow<'_>) -> Value {
            let v = input
                .get(self.column)
                .and_then(Value::as_contin)
                .unwrap_or(0.0);
            Value::Bool(v >= self.threshold)
        }

        fn complexity(&self) -> u64 {
            self.size
        }
    }

    #[derive(Debug)]
    struct ConstProgram(bool);

    impl Program for ConstProgram {
        fn evaluate(&self, _input: InputRow<'_>) -> Value {
            Value::Bool(self.0)
        }

        fn complexity(&self) -> u64 {
            1
        }
    }

    /// Four rows with weightiest outputs {10, 20, 30, 40}, weight 1 each.
    fn four_row_table() -> Arc<CompressedTable> {
        let mut table = CompressedTable::new(1, OutputType::Continuous);
        for (x, out) in [(1.0, 10.0), (2.0, 20.0), (3.0, 30.0), (4.0, 40.0)] {
            table.add_observation(vec![Value::Contin(x)], Value::Contin(out), 1.0);
        }
        Arc::new(table)
    }

    fn scorer(lower: f64, upper: f64) -> SelectionScorer {
        SelectionScorer::new(four_row_table(), lower, upper, 0.5, true).unwrap()
    }

    #[test]
    fn test_band_worked_example() {
        // Scaled thresholds 1.0 and 3.0; running weights 1, 2, 3, 4.
        let band = scorer(0.25, 0.75).band();
        assert_eq!(band, SelectionBand { lower: 20.0, upper: 40.0 });
    }

    #[test]
    fn test_trivial_percentiles_band_spans_min_to_max() {
        let band = scorer(0.0, 1.0).band();
        assert_eq!(band, SelectionBand { lower: 10.0, upper: 40.0 });
    }

    #[test]
    fn test_band_bounds_are_inclusive() {
        let band = SelectionBand { lower: 20.0, upper: 40.0 };
        assert!(band.contains(20.0));
        assert!(band.contains(40.0));
        assert!(!band.contains(19.999));
        assert!(!band.contains(40.001));
    }

    #[test]
    fn test_negative_selection_adjusts_sign() {
        // With positive = false, values are negated: {-40,-30,-20,-10}.
        let scorer = SelectionScorer::new(four_row_table(), 0.0, 1.0, 0.5, false).unwrap();
        let band = scorer.band();
        assert_eq!(band, SelectionBand { lower: -40.0, upper: -10.0 });
    }

    #[test]
    fn test_same_valued_rows_stay_separate_observations() {
        // Three rows share weightiest value 10.0; a value-keyed accumulation
        // would collapse them to one observation of weight 1 and push the
        // lower bound up to 20.0.
        let mut table = CompressedTable::new(1, OutputType::Continuous);
        for (x, out) in [(1.0, 10.0), (2.0, 10.0), (3.0, 10.0), (4.0, 20.0)] {
            table.add_observation(vec![Value::Contin(x)], Value::Contin(out), 1.0);
        }
        let scorer = SelectionScorer::new(Arc::new(table), 0.25, 1.0, 0.5, true).unwrap();
        // Scaled lower threshold 1.0; the second 10.0-valued row already
        // accumulates weight 2 > 1.
        assert_eq!(scorer.band().lower, 10.0);
    }

    #[test]
    fn test_weightiest_tie_break_is_order_independent() {
        let forward: ValueCounter = [(Value::Contin(1.0), 2.0), (Value::Contin(5.0), 2.0)]
            .into_iter()
            .collect();
        let backward: ValueCounter = [(Value::Contin(5.0), 2.0), (Value::Contin(1.0), 2.0)]
            .into_iter()
            .collect();

        assert_eq!(weightiest(&forward, true), (5.0, 2.0));
        assert_eq!(weightiest(&backward, true), (5.0, 2.0));
        // Sign-adjusted: -1.0 beats -5.0.
        assert_eq!(weightiest(&forward, false), (-1.0, 2.0));
        assert_eq!(weightiest(&backward, false), (-1.0, 2.0));
    }

    #[test]
    fn test_band_is_independent_of_row_order() {
        let mut rows = vec![
            (1.0, 10.0, 1.0),
            (2.0, 20.0, 2.0),
            (3.0, 20.0, 1.0),
            (4.0, 30.0, 2.5),
            (5.0, 40.0, 1.0),
        ];
        let mut rng = Pcg64Mcg::new(0xcafe_f00d);
        let mut bands = Vec::new();
        for _ in 0..10 {
            rows.shuffle(&mut rng);
            let mut table = CompressedTable::new(1, OutputType::Continuous);
            for &(x, out, w) in &rows {
                table.add_observation(vec![Value::Contin(x)], Value::Contin(out), w);
            }
            let scorer = SelectionScorer::new(Arc::new(table), 0.2, 0.8, 0.0, true).unwrap();
            bands.push(scorer.band());
        }
        assert!(bands.iter().all(|b| *b == bands[0]));
    }

    #[test]
    fn test_score_one_rewards_band_agreement() {
        let scorer = scorer(0.25, 0.75);
        // Band [20, 40]: classify true iff x >= 2 agrees on every row.
        let agree = ThresholdProgram { column: 0, threshold: 2.0, size: 3 };
        assert_eq!(scorer.score_one(&agree), vec![1.0, 1.0, 1.0, 1.0]);

        // Classifying everything true misses only the out-of-band first row.
        let all = ConstProgram(true);
        assert_eq!(scorer.score_one(&all), vec![-1.0, 1.0, 1.0, 1.0]);

        // Classifying everything false inverts that.
        let none = ConstProgram(false);
        assert_eq!(scorer.score_one(&none), vec![1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_best_possible_score_dominates_any_program() {
        let scorer = scorer(0.25, 0.75);
        let aggregator = SimpleAggregator::new();
        let best = aggregator.aggregate(&BehavioralScorer::<ConstProgram>::best_possible_score(
            &scorer,
        ));
        for program in [ConstProgram(true), ConstProgram(false)] {
            assert!(best >= aggregator.aggregate(&scorer.score_one(&program)));
        }
        for threshold in [0.0, 1.5, 2.5, 10.0] {
            let program = ThresholdProgram { column: 0, threshold, size: 1 };
            assert!(best >= aggregator.aggregate(&scorer.score_one(&program)));
        }
    }

    #[test]
    fn test_singleton_ensemble_matches_score_one() {
        let scorer = scorer(0.25, 0.75);
        let program = ThresholdProgram { column: 0, threshold: 3.0, size: 2 };
        let single = scorer.score_one(&program);
        let ensemble = vec![WeightedProgram::new(program, 1.0)];
        assert_eq!(scorer.score_ensemble(&ensemble).unwrap(), single);
    }

    #[test]
    fn test_ensemble_votes_partially_cancel() {
        let scorer = scorer(0.25, 0.75);
        // A strong "always false" voter outweighs two weak "always true"
        // voters, so every row classifies false.
        let ensemble = vec![
            WeightedProgram::new(ConstProgram(true), 0.4),
            WeightedProgram::new(ConstProgram(true), 0.4),
            WeightedProgram::new(ConstProgram(false), 1.0),
        ];
        let expected = scorer.score_one(&ConstProgram(false));
        assert_eq!(scorer.score_ensemble(&ensemble).unwrap(), expected);
    }

    #[test]
    fn test_tied_ensemble_vote_classifies_false() {
        let scorer = scorer(0.25, 0.75);
        let ensemble = vec![
            WeightedProgram::new(ConstProgram(true), 1.0),
            WeightedProgram::new(ConstProgram(false), 1.0),
        ];
        // Non-positive accumulated vote predicts "false".
        let expected = scorer.score_one(&ConstProgram(false));
        assert_eq!(scorer.score_ensemble(&ensemble).unwrap(), expected);
    }

    #[test]
    fn test_supports_ensembles() {
        let scorer = scorer(0.25, 0.75);
        assert!(BehavioralScorer::<ConstProgram>::supports_ensembles(&scorer));
    }

    #[test]
    fn test_min_significant_improvement_shrinks_with_table_size() {
        let scorer = scorer(0.25, 0.75);
        let full = BehavioralScorer::<ConstProgram>::min_significant_improvement(&scorer);
        assert_relative_eq!(full, 0.25);

        let mut narrowed = scorer.clone();
        narrowed.restrict_rows(&[0, 1].into_iter().collect());
        let smaller_table =
            BehavioralScorer::<ConstProgram>::min_significant_improvement(&narrowed);
        assert_relative_eq!(smaller_table, 0.5);
        assert!(smaller_table > full);
    }

    #[test]
    fn test_scoring_follows_row_exclusion() {
        let mut scorer = scorer(0.25, 0.75);
        scorer.restrict_rows(&[0].into_iter().collect());
        assert_eq!(scorer.score_one(&ConstProgram(true)), vec![1.0, 1.0, 1.0]);
        assert_eq!(
            BehavioralScorer::<ConstProgram>::best_possible_score(&scorer),
            vec![1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_column_exclusion_keeps_references_valid() {
        let mut table = CompressedTable::new(2, OutputType::Continuous);
        for (a, b, out) in [
            (1.0, 1.0, 10.0),
            (2.0, 1.0, 20.0),
            (3.0, 1.0, 30.0),
            (4.0, 1.0, 40.0),
        ] {
            table.add_observation(
                vec![Value::Contin(a), Value::Contin(b)],
                Value::Contin(out),
                1.0,
            );
        }
        let mut scorer =
            SelectionScorer::new(Arc::new(table), 0.25, 0.75, 0.5, true).unwrap();
        // Dropping column 1 leaves references to column 0 valid.
        scorer.restrict_columns(&[1].into_iter().collect());
        let program = ThresholdProgram { column: 0, threshold: 2.0, size: 1 };
        assert_eq!(scorer.score_one(&program), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_non_continuous_table_is_rejected() {
        let table = Arc::new(CompressedTable::new(1, OutputType::Boolean));
        let err = SelectionScorer::new(table, 0.25, 0.75, 0.5, true).unwrap_err();
        assert!(matches!(
            err,
            SelectionScorerError::NonContinuousOutput {
                output_type: OutputType::Boolean
            }
        ));
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn test_out_of_range_percentiles_are_rejected() {
        for (lower, upper) in [(-0.1, 0.75), (1.0, 1.0), (0.25, 0.0), (0.25, 1.5)] {
            let err =
                SelectionScorer::new(four_row_table(), lower, upper, 0.5, true).unwrap_err();
            assert!(
                matches!(err, SelectionScorerError::InvalidPercentiles { .. }),
                "lower = {lower}, upper = {upper}"
            );
        }
    }

    #[test]
    fn test_out_of_range_hardness_is_rejected() {
        for hardness in [-0.1, 1.1] {
            let err =
                SelectionScorer::new(four_row_table(), 0.25, 0.75, hardness, true).unwrap_err();
            assert!(matches!(err, SelectionScorerError::InvalidHardness { .. }));
        }
    }

    #[test]
    fn test_weighted_rows_shift_the_band() {
        // Weights {4, 1, 1, 2}, total 8; thresholds 2.0 and 6.0.
        let mut table = CompressedTable::new(1, OutputType::Continuous);
        for (x, out, w) in [
            (1.0, 10.0, 4.0),
            (2.0, 20.0, 1.0),
            (3.0, 30.0, 1.0),
            (4.0, 40.0, 2.0),
        ] {
            table.add_observation(vec![Value::Contin(x)], Value::Contin(out), w);
        }
        let scorer = SelectionScorer::new(Arc::new(table), 0.25, 0.75, 0.5, true).unwrap();
        // Running weights 4, 5, 6, 8: lower found at the first row (4 > 2),
        // upper at the last (8 > 6).
        assert_eq!(scorer.band(), SelectionBand { lower: 10.0, upper: 40.0 });
    }

    #[test]
    fn test_weightiest_prefers_heavier_value_over_larger() {
        let outputs: ValueCounter = [(Value::Contin(100.0), 1.0), (Value::Contin(5.0), 3.0)]
            .into_iter()
            .collect();
        assert_eq!(weightiest(&outputs, true), (5.0, 3.0));
    }
}
