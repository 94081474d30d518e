//! Complexity regularization coefficients.
//!
//! The search loop penalizes large programs by subtracting
//! `coefficient x program_complexity` from the aggregated score. The
//! coefficient is derived from either a discrete noise probability, a
//! continuous noise standard deviation, or a desired complexity ratio.
//!
//! A coefficient of `0.0` means regularization is disabled; it is a valid
//! state, not an error. In particular the discrete formula has singularities
//! at `p = 0` and `p = 0.5`, and both resolve to the disabled coefficient.

use log::info;

/// Discrete-noise coefficient: `-ln(alphabet_size) / ln(p / (1 - p))`.
///
/// Strictly positive for `p` in the open interval `(0, 0.5)`; `0.0`
/// (regularization disabled) for `p <= 0` or `p >= 0.5`.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn discrete_coef(alphabet_size: usize, p: f64) -> f64 {
    if p <= 0.0 || p >= 0.5 {
        return 0.0;
    }
    -(alphabet_size as f64).ln() / (p / (1.0 - p)).ln()
}

/// Continuous-noise coefficient: `ln(alphabet_size) * 2 * stdev^2`.
///
/// Monotone non-decreasing in both arguments; well-defined for any
/// non-negative `stdev` and `alphabet_size >= 1`.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn contin_coef(alphabet_size: usize, stdev: f64) -> f64 {
    (alphabet_size as f64).ln() * 2.0 * stdev * stdev
}

/// A non-negative regularization scalar penalizing program size.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComplexityCoef(f64);

impl ComplexityCoef {
    /// The disabled coefficient (`0.0`): no size penalty is applied.
    #[must_use]
    pub const fn disabled() -> Self {
        Self(0.0)
    }

    /// Coefficient from a discrete noise probability, via [`discrete_coef`].
    #[must_use]
    pub fn discrete(alphabet_size: usize, p: f64) -> Self {
        let coef = Self(discrete_coef(alphabet_size, p));
        info!(
            "complexity coef: noise = {p}, alphabet size = {alphabet_size}, \
             complexity ratio = {}",
            1.0 / coef.0
        );
        coef
    }

    /// Coefficient from a continuous noise stdev, via [`contin_coef`].
    #[must_use]
    pub fn continuous(alphabet_size: usize, stdev: f64) -> Self {
        let coef = Self(contin_coef(alphabet_size, stdev));
        info!(
            "complexity coef: stdev = {stdev}, alphabet size = {alphabet_size}, \
             complexity ratio = {}",
            1.0 / coef.0
        );
        coef
    }

    /// Coefficient from a desired complexity ratio: `1 / ratio` for
    /// `ratio > 0`, disabled otherwise.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        let coef = if ratio > 0.0 { Self(1.0 / ratio) } else { Self(0.0) };
        info!("complexity coef: complexity ratio = {ratio}");
        coef
    }

    /// The scalar value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether regularization is disabled.
    #[must_use]
    #[expect(clippy::float_cmp)]
    pub fn is_disabled(self) -> bool {
        self.0 == 0.0
    }
}
