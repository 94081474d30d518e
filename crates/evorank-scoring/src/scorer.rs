//! The scoring contract: programs, ensembles, and the scorer trait.
//!
//! Candidate programs are opaque to this crate; the [`Program`] trait is the
//! seam through which the external interpreter evaluates one against an input
//! row. A scorer turns a program (or a weighted ensemble of programs) into a
//! [`BehavioralScore`].
//!
//! Ensemble scoring is an optional capability. Scorers declare it through
//! [`BehavioralScorer::supports_ensembles`]; callers check the flag before
//! invoking [`BehavioralScorer::score_ensemble`], and an unsupporting scorer
//! reports an [`EnsembleUnsupportedError`] naming its concrete type rather
//! than silently returning an empty score.

use std::{any, fmt};

use evorank_table::{InputRow, Value};

use crate::score::BehavioralScore;

/// An opaque evaluable unit: a candidate program plus its structural size.
///
/// Evaluation is assumed total and side-effect-free for valid inputs; the
/// program representation and its interpreter live outside this crate.
pub trait Program: fmt::Debug + Send + Sync {
    /// Interprets the program against one input row.
    fn evaluate(&self, input: InputRow<'_>) -> Value;

    /// Structural complexity of the program, used for regularization.
    fn complexity(&self) -> u64;
}

/// One member of an ensemble: a program and its non-negative vote weight.
#[derive(Debug, Clone)]
pub struct WeightedProgram<P> {
    program: P,
    weight: f64,
}

impl<P> WeightedProgram<P> {
    /// Pairs a program with a vote weight.
    ///
    /// # Panics
    ///
    /// Panics if `weight` is negative.
    pub fn new(program: P, weight: f64) -> Self {
        assert!(weight >= 0.0);
        Self { program, weight }
    }

    /// The wrapped program.
    pub fn program(&self) -> &P {
        &self.program
    }

    /// The vote weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Ensemble scoring was invoked on a scorer that does not support it.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("ensemble scoring is not supported by scorer type {scorer_type}")]
pub struct EnsembleUnsupportedError {
    /// Type name of the scorer at fault.
    pub scorer_type: &'static str,
}

impl EnsembleUnsupportedError {
    /// Builds the error naming scorer type `S`.
    #[must_use]
    pub fn of<S: ?Sized>() -> Self {
        Self {
            scorer_type: any::type_name::<S>(),
        }
    }
}

/// Scores candidate programs against the current working table.
///
/// All scoring operations are pure functions of (working-table state,
/// program, scorer parameters) and are safe to call concurrently through
/// shared references.
pub trait BehavioralScorer<P: Program>: fmt::Debug + Send + Sync {
    /// Scores a single program, one reward per working-table row.
    fn score_one(&self, program: &P) -> BehavioralScore;

    /// Whether this scorer implements [`score_ensemble`](Self::score_ensemble).
    ///
    /// Callers check this flag before invoking ensemble scoring.
    fn supports_ensembles(&self) -> bool {
        false
    }

    /// Scores a weighted ensemble of programs.
    ///
    /// # Errors
    ///
    /// Returns [`EnsembleUnsupportedError`] when
    /// [`supports_ensembles`](Self::supports_ensembles) is `false`.
    fn score_ensemble(
        &self,
        ensemble: &[WeightedProgram<P>],
    ) -> Result<BehavioralScore, EnsembleUnsupportedError>;

    /// Structural complexity of an ensemble: the weighted average of each
    /// member's complexity, rounded to the nearest integer; `0` for an empty
    /// ensemble.
    ///
    /// The aggregation rule is a provisional heuristic (there is no settled
    /// theory for the complexity of an ensemble); keep it as-is.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn ensemble_complexity(&self, ensemble: &[WeightedProgram<P>]) -> u64 {
        if ensemble.is_empty() {
            return 0;
        }
        let mut weighted = 0.0;
        let mut norm = 0.0;
        for member in ensemble {
            weighted += member.weight() * member.program().complexity() as f64;
            norm += member.weight();
        }
        (weighted / norm + 0.5).floor() as u64
    }

    /// Per-row upper bound on achievable reward, independent of any program.
    fn best_possible_score(&self) -> BehavioralScore;

    /// Smallest score delta the search loop should treat as significant.
    fn min_significant_improvement(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedSizeProgram(u64);

    impl Program for FixedSizeProgram {
        fn evaluate(&self, _input: InputRow<'_>) -> Value {
            Value::Bool(true)
        }

        fn complexity(&self) -> u64 {
            self.0
        }
    }

    /// Minimal scorer without ensemble support, for exercising defaults.
    #[derive(Debug)]
    struct SingleOnlyScorer;

    impl BehavioralScorer<FixedSizeProgram> for SingleOnlyScorer {
        fn score_one(&self, _program: &FixedSizeProgram) -> BehavioralScore {
            vec![0.0]
        }

        fn score_ensemble(
            &self,
            _ensemble: &[WeightedProgram<FixedSizeProgram>],
        ) -> Result<BehavioralScore, EnsembleUnsupportedError> {
            Err(EnsembleUnsupportedError::of::<Self>())
        }

        fn best_possible_score(&self) -> BehavioralScore {
            vec![0.0]
        }

        fn min_significant_improvement(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_unsupported_ensemble_error_names_scorer_type() {
        let err = SingleOnlyScorer.score_ensemble(&[]).unwrap_err();
        assert!(err.scorer_type.contains("SingleOnlyScorer"));
        assert!(err.to_string().contains("SingleOnlyScorer"));
        assert!(!SingleOnlyScorer.supports_ensembles());
    }

    #[test]
    fn test_ensemble_complexity_weighted_average_rounded() {
        let ensemble = vec![
            WeightedProgram::new(FixedSizeProgram(10), 1.0),
            WeightedProgram::new(FixedSizeProgram(20), 3.0),
        ];
        // (1*10 + 3*20) / 4 = 17.5, rounded to nearest
        assert_eq!(SingleOnlyScorer.ensemble_complexity(&ensemble), 18);
    }

    #[test]
    fn test_ensemble_complexity_empty_is_zero() {
        assert_eq!(SingleOnlyScorer.ensemble_complexity(&[]), 0);
    }

    #[test]
    #[should_panic(expected = "weight >= 0.0")]
    fn test_negative_member_weight_rejected() {
        let _ = WeightedProgram::new(FixedSizeProgram(1), -0.5);
    }
}
