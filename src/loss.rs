//! Loss functions.
//!
//! Each task pairs its output activation with a matching loss, so that the gradient
//! of the loss w.r.t. the output layer's net input is simply `estimated - true`:
//!
//! - classification: softmax output + cross-entropy
//! - regression: identity output + squared error
//!
//! Both return the per-example loss; the batch aggregator sums them without
//! averaging.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Task;

/// Lower clip applied to probabilities before taking logarithms.
pub const PROB_CLIP: f64 = 1e-10;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Supported loss functions.
pub enum Loss {
    /// Element-wise binary cross-entropy summed over output units.
    CrossEntropy,
    /// `0.5 * ‖estimated - true‖²` (a sum, not a mean).
    SquaredError,
}

impl Loss {
    /// Loss paired with a task's output activation.
    #[inline]
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Classification => Loss::CrossEntropy,
            Task::Regression => Loss::SquaredError,
        }
    }

    /// Shape contract: `y_true.len() == y_estimated.len()`.
    #[inline]
    pub fn forward(self, y_true: &[f64], y_estimated: &[f64]) -> f64 {
        match self {
            Loss::CrossEntropy => cross_entropy(y_true, y_estimated),
            Loss::SquaredError => squared_error(y_true, y_estimated),
        }
    }
}

/// Per-example loss for the given task flag.
#[inline]
pub fn loss(y_true: &[f64], y_estimated: &[f64], is_classification: bool) -> f64 {
    if is_classification {
        cross_entropy(y_true, y_estimated)
    } else {
        squared_error(y_true, y_estimated)
    }
}

/// Cross-entropy over probabilities `y_estimated`.
///
/// Each estimate is clipped to `[PROB_CLIP, 1 - PROB_CLIP]`, then
///
/// `L = -Σ [ y·ln(ŷ) + (1 - y)·ln(1 - ŷ) ]`
///
/// For one-hot targets the `(1 - y)` terms penalize probability mass on the wrong
/// classes as well; independent multi-label targets are also accepted.
#[inline]
pub fn cross_entropy(y_true: &[f64], y_estimated: &[f64]) -> f64 {
    assert_eq!(
        y_true.len(),
        y_estimated.len(),
        "true len {} does not match estimated len {}",
        y_true.len(),
        y_estimated.len()
    );

    let mut sum = 0.0_f64;
    for (&y, &p) in y_true.iter().zip(y_estimated) {
        let p = p.clamp(PROB_CLIP, 1.0 - PROB_CLIP);
        sum += y * p.ln() + (1.0 - y) * (1.0 - p).ln();
    }
    -sum
}

/// `0.5 * Σ (ŷ - y)²`.
#[inline]
pub fn squared_error(y_true: &[f64], y_estimated: &[f64]) -> f64 {
    assert_eq!(
        y_true.len(),
        y_estimated.len(),
        "true len {} does not match estimated len {}",
        y_true.len(),
        y_estimated.len()
    );

    let mut sum_sq = 0.0_f64;
    for (&y, &p) in y_true.iter().zip(y_estimated) {
        let diff = p - y;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    0.5 * sum_sq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_entropy_matches_the_formula_for_a_three_class_example() {
        let y = [0.0_f64, 1.0, 0.0];
        let p = [0.2_f64, 0.5, 0.3];
        let expected = -((1.0 - 0.2_f64).ln() + 0.5_f64.ln() + (1.0 - 0.3_f64).ln());

        let got = cross_entropy(&y, &p);
        assert!((got - expected).abs() < 1e-12, "{got} vs {expected}");
        // The true-class term alone is -ln(0.5); the cross terms add on top.
        assert!(got > -(0.5_f64.ln()));
    }

    #[test]
    fn cross_entropy_is_finite_at_the_clip_boundaries() {
        let y = [1.0_f64, 0.0];
        let loss = cross_entropy(&y, &[0.0, 1.0]);
        assert!(loss.is_finite());
        assert!(loss > 40.0);
    }

    #[test]
    fn cross_entropy_is_near_zero_for_a_perfect_prediction() {
        let y = [0.0_f64, 1.0, 0.0];
        let loss = cross_entropy(&y, &y);
        assert!(loss >= 0.0);
        assert!(loss < 1e-8);
    }

    #[test]
    fn squared_error_is_half_the_sum_of_squares() {
        let y = [2.0_f64, 1.0];
        let p = [1.0_f64, 3.0];
        assert_eq!(squared_error(&y, &p), 0.5 * (1.0 + 4.0));
        assert_eq!(squared_error(&p, &p), 0.0);
    }

    #[test]
    fn losses_are_non_negative() {
        let targets = [[0.0_f64, 1.0], [1.0, 0.0], [0.3, 0.7]];
        let estimates = [[0.9_f64, 0.1], [0.5, 0.5], [1e-12, 1.0 - 1e-12]];
        for y in &targets {
            for p in &estimates {
                assert!(cross_entropy(y, p) >= 0.0);
                assert!(squared_error(y, p) >= 0.0);
            }
        }
    }

    #[test]
    fn task_flag_selects_the_loss() {
        let y = [0.0_f64, 1.0];
        let p = [0.25_f64, 0.75];
        assert_eq!(loss(&y, &p, true), cross_entropy(&y, &p));
        assert_eq!(loss(&y, &p, false), squared_error(&y, &p));
        assert_eq!(Loss::for_task(Task::Classification), Loss::CrossEntropy);
        assert_eq!(
            Loss::for_task(Task::Regression).forward(&y, &p),
            squared_error(&y, &p)
        );
    }

    #[test]
    fn nan_propagates() {
        assert!(squared_error(&[0.0], &[f64::NAN]).is_nan());
        assert!(cross_entropy(&[1.0, 0.0], &[f64::NAN, 0.5]).is_nan());
    }
}
