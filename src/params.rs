//! Training configuration.

use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::{Result, SeqSvmError};
use crate::sequence::Label;

/// Norm used for the slack variables in the objective function.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlackNorm {
    /// L1-norm slack term `C/n · Σ ξᵢ`.
    L1,

    /// L2-norm slack term `C/(2n) · Σ ξᵢ²`.
    L2,
}

/// Loss rescaling method used when constraints are generated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rescaling {
    /// Slack rescaling.
    Slack,

    /// Margin rescaling.
    Margin,
}

/// Loss function between a true and a predicted label.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Loss {
    /// 0 for an exact match, 1 otherwise.
    ZeroOne,

    /// Number of positions whose tags differ.
    ///
    /// Required by any Viterbi-style decoder: the per-position terms keep
    /// loss-augmented inference decomposable over the sequence.
    Hamming,
}

impl Loss {
    /// Evaluates the loss of `predicted` against `truth`.
    ///
    /// For [`Loss::Hamming`], positions past the shorter of the two labels
    /// count as mismatches.
    #[must_use]
    pub fn evaluate(&self, truth: &Label, predicted: &Label) -> f64 {
        match self {
            Self::ZeroOne => {
                if truth == predicted {
                    0.0
                } else {
                    1.0
                }
            }
            Self::Hamming => {
                let common = truth.len().min(predicted.len());
                let mut mismatches = truth.len().max(predicted.len()) - common;
                for i in 0..common {
                    if truth.get_tag(i) != predicted.get_tag(i) {
                        mismatches += 1;
                    }
                }
                mismatches as f64
            }
        }
    }
}

/// Configuration of a cutting-plane training run.
///
/// Created once before training and read-only thereafter; the trainer
/// validates it with [`validate`](Self::validate) before the first pass and
/// rejects a malformed configuration as fatal.
#[derive(Clone, Debug)]
pub struct LearnParams {
    /// Precision to which the quadratic program is solved: a constraint is
    /// added only when it is violated by more than this tolerance.
    pub epsilon: f64,

    /// Number of new constraints to accumulate before recomputing the QP
    /// solution.
    pub newconst_retrain: usize,

    /// Maximum number of constraints cached per example; 0 disables
    /// caching, forcing every pass to re-derive its constraints.
    pub ccache_size: usize,

    /// Trade-off between margin size and training loss.
    pub c: f64,

    /// Norm of the slack term in the objective.
    pub slack_norm: SlackNorm,

    /// Loss rescaling method.
    pub rescaling: Rescaling,

    /// Loss function.
    pub loss: Loss,

    /// Free-form arguments forwarded to pluggable components.
    pub custom_args: Vec<String>,

    /// Number of features per token; emission feature IDs must stay below
    /// this bound.
    pub feature_space_size: u32,

    /// Maximum number of outer passes over the examples.
    pub max_iter: u64,
}

impl LearnParams {
    /// Creates a configuration with the default settings for the given
    /// per-token feature-space size.
    #[must_use]
    pub fn new(feature_space_size: u32) -> Self {
        Self {
            epsilon: 0.1,
            newconst_retrain: 100,
            ccache_size: 5,
            c: 1.0,
            slack_norm: SlackNorm::L1,
            rescaling: Rescaling::Margin,
            loss: Loss::Hamming,
            custom_args: vec![],
            feature_space_size,
            max_iter: 100,
        }
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when a field is out of
    /// range.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(SeqSvmError::invalid_argument(
                "epsilon",
                "must be finite and greater than 0.0",
            ));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(SeqSvmError::invalid_argument(
                "c",
                "must be finite and greater than 0.0",
            ));
        }
        if self.newconst_retrain == 0 {
            return Err(SeqSvmError::invalid_argument(
                "newconst_retrain",
                "must not be 0",
            ));
        }
        if self.feature_space_size == 0 {
            return Err(SeqSvmError::invalid_argument(
                "feature_space_size",
                "must not be 0",
            ));
        }
        if self.max_iter == 0 {
            return Err(SeqSvmError::invalid_argument("max_iter", "must not be 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LearnParams::new(8).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut params = LearnParams::new(8);
        params.epsilon = 0.0;
        assert!(params.validate().is_err());

        let mut params = LearnParams::new(8);
        params.epsilon = f64::NAN;
        assert!(params.validate().is_err());

        let mut params = LearnParams::new(8);
        params.c = -1.0;
        assert!(params.validate().is_err());

        let mut params = LearnParams::new(8);
        params.newconst_retrain = 0;
        assert!(params.validate().is_err());

        let mut params = LearnParams::new(8);
        params.max_iter = 0;
        assert!(params.validate().is_err());

        assert!(LearnParams::new(0).validate().is_err());
    }

    #[test]
    fn test_ccache_size_zero_is_valid() {
        let mut params = LearnParams::new(8);
        params.ccache_size = 0;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_hamming_loss() {
        let loss = Loss::Hamming;
        let truth = Label::from_tags(&[0, 1, 0, 1]);
        assert_eq!(0.0, loss.evaluate(&truth, &truth.clone()));
        assert_eq!(1.0, loss.evaluate(&truth, &Label::from_tags(&[0, 1, 1, 1])));
        assert_eq!(4.0, loss.evaluate(&truth, &Label::from_tags(&[1, 0, 1, 0])));
        // length mismatch counts the overhang
        assert_eq!(2.0, loss.evaluate(&truth, &Label::from_tags(&[0, 1])));
    }

    #[test]
    fn test_zero_one_loss() {
        let loss = Loss::ZeroOne;
        let truth = Label::from_tags(&[0, 1]);
        assert_eq!(0.0, loss.evaluate(&truth, &Label::from_tags(&[0, 1])));
        assert_eq!(1.0, loss.evaluate(&truth, &Label::from_tags(&[1, 1])));
        assert_eq!(1.0, loss.evaluate(&truth, &Label::new()));
    }
}
