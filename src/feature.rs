//! Sparse feature vectors.

use alloc::vec::Vec;

use bincode::{Decode, Encode};
use hashbrown::HashMap;

/// Represents a feature
#[derive(Clone, Copy, Debug, PartialEq, Decode, Encode)]
pub struct Feature {
    /// Feature ID
    pub feature_id: u32,

    /// Feature value
    pub value: f64,
}

impl Feature {
    /// Creates a new feature with its ID and value
    #[inline(always)]
    #[must_use]
    pub fn new(feature_id: u32, value: f64) -> Self {
        Self { feature_id, value }
    }
}

/// A sparse vector over a dense weight space.
///
/// Used both for per-token feature vectors and for the constraint vectors
/// `δΨ` cached by the trainer.
#[derive(Clone, Debug, Default, Decode, Encode)]
pub struct SparseVector {
    elements: Vec<Feature>,
}

impl SparseVector {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored features.
    #[inline(always)]
    #[must_use]
    pub fn elements(&self) -> &[Feature] {
        &self.elements
    }

    /// Returns `true` if the vector has no element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Appends a feature.
    #[inline(always)]
    pub fn push(&mut self, feature: Feature) {
        self.elements.push(feature);
    }

    /// Builds a vector from an accumulation map, dropping zero entries.
    ///
    /// Elements are sorted by feature ID so that repeated dot products walk
    /// the dense vector in order.
    #[must_use]
    pub fn from_map(map: HashMap<u32, f64>) -> Self {
        let mut elements: Vec<Feature> = map
            .into_iter()
            .filter(|(_, value)| *value != 0.0)
            .map(|(feature_id, value)| Feature { feature_id, value })
            .collect();
        elements.sort_unstable_by_key(|f| f.feature_id);
        Self { elements }
    }

    /// Computes the sparse-dense dot product.
    ///
    /// Feature IDs are not bounds-checked here; the caller keeps the weight
    /// vector length authoritative.
    #[inline(always)]
    #[must_use]
    pub fn dot(&self, weights: &[f64]) -> f64 {
        let mut score = 0.0;
        for feature in &self.elements {
            score += weights[feature.feature_id as usize] * feature.value;
        }
        score
    }

    /// Computes the squared Euclidean norm.
    #[inline(always)]
    #[must_use]
    pub fn squared_norm(&self) -> f64 {
        let mut norm2 = 0.0;
        for feature in &self.elements {
            norm2 += feature.value * feature.value;
        }
        norm2
    }

    /// Adds this vector, scaled, into a dense vector.
    #[inline(always)]
    pub fn add_into(&self, weights: &mut [f64], scale: f64) {
        for feature in &self.elements {
            weights[feature.feature_id as usize] += scale * feature.value;
        }
    }

    /// Computes the dot product with another sparse vector.
    ///
    /// Both vectors must be sorted by feature ID, which
    /// [`from_map`](Self::from_map) guarantees.
    #[must_use]
    pub fn dot_sparse(&self, other: &Self) -> f64 {
        let mut score = 0.0;
        let mut rhs = other.elements.iter().peekable();
        for lhs in &self.elements {
            while let Some(f) = rhs.peek() {
                if f.feature_id >= lhs.feature_id {
                    break;
                }
                rhs.next();
            }
            if let Some(f) = rhs.peek() {
                if f.feature_id == lhs.feature_id {
                    score += lhs.value * f.value;
                }
            }
        }
        score
    }

    /// Returns the largest feature ID, or `None` for an empty vector.
    #[must_use]
    pub fn max_feature_id(&self) -> Option<u32> {
        self.elements.iter().map(|f| f.feature_id).max()
    }
}
