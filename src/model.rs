//! The learned structural model.

use alloc::vec::Vec;

use bincode::{Decode, Encode};

use crate::decoder::Decoder;
use crate::errors::{Result, SeqSvmError};
use crate::sequence::{Label, Pattern};

/// Index layout of the joint feature map Ψ(x, y) for sequence labeling.
///
/// The weight space consists of an emission block followed by a transition
/// block:
///
/// - emission weight of token feature `f` under tag `t`: `t·F + f`,
/// - transition weight from tag `l` to tag `r`: `F·T + l·T + r`,
///
/// where `F` is the per-token feature-space size and `T` the number of
/// tags, giving `size_psi = F·T + T²`. The layout is fixed when training
/// is configured and is never grown afterwards; every token feature ID must
/// be smaller than `F` before the first dot product.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Decode, Encode)]
pub struct FeatureLayout {
    feature_space_size: u32,
    num_tags: u32,
}

impl FeatureLayout {
    /// Creates a layout for the given per-token feature-space size and tag
    /// count.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when either argument
    /// is 0.
    pub fn new(feature_space_size: u32, num_tags: u32) -> Result<Self> {
        if feature_space_size == 0 {
            return Err(SeqSvmError::invalid_argument(
                "feature_space_size",
                "must not be 0",
            ));
        }
        if num_tags == 0 {
            return Err(SeqSvmError::invalid_argument("num_tags", "must not be 0"));
        }
        let f = u64::from(feature_space_size);
        let t = u64::from(num_tags);
        if f * t + t * t > u64::from(u32::MAX) {
            return Err(SeqSvmError::invalid_argument(
                "feature_space_size",
                "joint feature map does not fit the 32-bit index space",
            ));
        }
        Ok(Self {
            feature_space_size,
            num_tags,
        })
    }

    /// Returns the per-token feature-space size.
    #[inline(always)]
    #[must_use]
    pub const fn feature_space_size(&self) -> u32 {
        self.feature_space_size
    }

    /// Returns the number of tags.
    #[inline(always)]
    #[must_use]
    pub const fn num_tags(&self) -> u32 {
        self.num_tags
    }

    /// Returns the start of the emission block of the given tag.
    #[inline(always)]
    #[must_use]
    pub const fn emission_offset(&self, tag: u32) -> usize {
        self.feature_space_size as usize * tag as usize
    }

    /// Returns the weight index of the transition from `left` to `right`.
    #[inline(always)]
    #[must_use]
    pub const fn transition_index(&self, left: u32, right: u32) -> usize {
        self.feature_space_size as usize * self.num_tags as usize
            + self.num_tags as usize * left as usize
            + right as usize
    }

    /// Returns the dimensionality of the joint feature map.
    #[inline(always)]
    #[must_use]
    pub const fn size_psi(&self) -> usize {
        let t = self.num_tags as usize;
        self.feature_space_size as usize * t + t * t
    }
}

/// Final state of the quadratic-program solver, kept with the model as the
/// trained base-model artifact.
///
/// The contents are opaque to the data-model layer; they are produced by
/// the [`QpSolver`](crate::QpSolver) that trained the model.
#[derive(Clone, Debug, Default, Decode, Encode)]
pub struct SolverState {
    pub(crate) alphas: Vec<f64>,
    pub(crate) dual_objective: f64,
}

impl SolverState {
    /// Returns the dual variables of the support constraints.
    #[must_use]
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Returns the final dual objective value.
    #[must_use]
    pub const fn dual_objective(&self) -> f64 {
        self.dual_objective
    }
}

/// The learned artifact of a training run: a dense weight vector over the
/// joint feature map, its layout, and the trained solver state.
///
/// A model is produced exactly once per training run and is read-only
/// afterwards. `weights().len() == layout().size_psi()` always holds.
#[derive(Debug, Decode, Encode)]
pub struct StructModel {
    weights: Vec<f64>,
    layout: FeatureLayout,
    state: SolverState,
}

impl StructModel {
    pub(crate) fn new(weights: Vec<f64>, layout: FeatureLayout, state: SolverState) -> Self {
        debug_assert_eq!(layout.size_psi(), weights.len());
        Self {
            weights,
            layout,
            state,
        }
    }

    /// Returns the dense weight vector.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Returns the joint feature-map layout.
    #[must_use]
    pub const fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Returns the dimensionality of the joint feature map.
    #[must_use]
    pub const fn size_psi(&self) -> usize {
        self.layout.size_psi()
    }

    /// Returns the trained solver state.
    #[must_use]
    pub const fn state(&self) -> &SolverState {
        &self.state
    }

    /// Decodes the highest-scoring label for the given pattern.
    #[must_use]
    pub fn predict<D>(&self, pattern: &Pattern, decoder: &D) -> Label
    where
        D: Decoder,
    {
        decoder.decode(pattern, self.layout, &self.weights)
    }
}
