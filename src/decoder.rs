//! Structured-output decoding.

use alloc::vec::Vec;

use crate::errors::{Result, SeqSvmError};
use crate::model::FeatureLayout;
use crate::params::{LearnParams, Loss, Rescaling};
use crate::sequence::{Label, Pattern};

/// Interface to the structured-output decoder.
///
/// During training, [`decode_augmented`](Self::decode_augmented) generates
/// the most violated constraint per example; at test time,
/// [`decode`](Self::decode) performs plain inference. Implementations
/// return freshly constructed labels and may mutate them in place while
/// decoding.
pub trait Decoder {
    /// Returns the highest-scoring label for the pattern under the given
    /// weight vector.
    fn decode(&self, pattern: &Pattern, layout: FeatureLayout, weights: &[f64]) -> Label;

    /// Returns the label maximizing `score + loss` against the true label,
    /// as configured by `params`.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when the implementation
    /// does not support the configured loss or rescaling method.
    fn decode_augmented(
        &self,
        pattern: &Pattern,
        truth: &Label,
        layout: FeatureLayout,
        weights: &[f64],
        params: &LearnParams,
    ) -> Result<Label>;
}

/// Exact first-order Viterbi decoder for the sequence-labeling joint map.
///
/// Scores a tag sequence as the sum of per-position emission products
/// (token features against the tag's emission block) and tag-pair
/// transition weights. Loss-augmented decoding adds the Hamming term per
/// position, which keeps the search exact; slack rescaling and non-Hamming
/// losses do not decompose over the lattice and are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViterbiDecoder;

impl ViterbiDecoder {
    /// Creates a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn search(
        &self,
        pattern: &Pattern,
        layout: FeatureLayout,
        weights: &[f64],
        augment: Option<&Label>,
    ) -> Label {
        let mut decoded = Label::new();
        let len = pattern.len();
        if len == 0 {
            return decoded;
        }
        let num_tags = layout.num_tags() as usize;
        let fss = layout.feature_space_size() as usize;

        let emission = |pos: usize, tag: usize| {
            let offset = layout.emission_offset(tag as u32);
            let mut score = pattern.get_token(pos).dot(&weights[offset..offset + fss]);
            if let Some(truth) = augment {
                if truth.get_tag(pos) != tag as u32 {
                    score += 1.0;
                }
            }
            score
        };

        let mut delta = Vec::with_capacity(num_tags);
        for tag in 0..num_tags {
            delta.push(emission(0, tag));
        }
        let mut backptrs = Vec::with_capacity(len);
        for pos in 1..len {
            let mut next_delta = Vec::with_capacity(num_tags);
            let mut back = Vec::with_capacity(num_tags);
            for tag in 0..num_tags {
                let mut best_score = f64::NEG_INFINITY;
                let mut best_prev = 0;
                for (prev, &prev_score) in delta.iter().enumerate() {
                    let score = prev_score
                        + weights[layout.transition_index(prev as u32, tag as u32)];
                    if score > best_score {
                        best_score = score;
                        best_prev = prev;
                    }
                }
                next_delta.push(best_score + emission(pos, tag));
                back.push(best_prev);
            }
            delta = next_delta;
            backptrs.push(back);
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best_tag = 0;
        for (tag, &score) in delta.iter().enumerate() {
            if score > best_score {
                best_score = score;
                best_tag = tag;
            }
        }

        decoded.set_len(len);
        decoded.set_tag(len - 1, best_tag as u32);
        for pos in (1..len).rev() {
            best_tag = backptrs[pos - 1][best_tag];
            decoded.set_tag(pos - 1, best_tag as u32);
        }
        decoded
    }
}

impl Decoder for ViterbiDecoder {
    fn decode(&self, pattern: &Pattern, layout: FeatureLayout, weights: &[f64]) -> Label {
        self.search(pattern, layout, weights, None)
    }

    fn decode_augmented(
        &self,
        pattern: &Pattern,
        truth: &Label,
        layout: FeatureLayout,
        weights: &[f64],
        params: &LearnParams,
    ) -> Result<Label> {
        if params.rescaling != Rescaling::Margin {
            return Err(SeqSvmError::invalid_argument(
                "rescaling",
                "the Viterbi decoder supports margin rescaling only",
            ));
        }
        if params.loss != Loss::Hamming {
            return Err(SeqSvmError::invalid_argument(
                "loss",
                "the Viterbi decoder supports Hamming loss only",
            ));
        }
        debug_assert_eq!(pattern.len(), truth.len());
        Ok(self.search(pattern, layout, weights, Some(truth)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::feature::Feature;
    use crate::token::Token;

    fn two_tag_layout() -> FeatureLayout {
        // emission: tag0 -> 0..2, tag1 -> 2..4; transition: 4 + 2*l + r
        FeatureLayout::new(2, 2).unwrap()
    }

    fn indicator_pattern(feature_ids: &[u32]) -> Pattern {
        let mut pattern = Pattern::new();
        for &fid in feature_ids {
            let token = Token::new("");
            token.features_mut().push(Feature::new(fid, 1.0));
            pattern.append_token(token);
        }
        pattern
    }

    #[test]
    fn test_decode_emissions_dominate() {
        let layout = two_tag_layout();
        let pattern = indicator_pattern(&[0, 1]);
        // feature 0 votes for tag 0, feature 1 for tag 1
        let mut weights = vec![0.0; layout.size_psi()];
        weights[0] = 1.0; // (tag 0, feature 0)
        weights[3] = 1.0; // (tag 1, feature 1)
        let decoded = ViterbiDecoder::new().decode(&pattern, layout, &weights);
        assert_eq!(Label::from_tags(&[0, 1]), decoded);
    }

    #[test]
    fn test_decode_transitions_decide() {
        let layout = two_tag_layout();
        let pattern = indicator_pattern(&[0, 0]);
        // all emissions are tied, only 1 -> 0 is rewarded
        let mut weights = vec![0.0; layout.size_psi()];
        weights[layout.transition_index(1, 0)] = 5.0;
        let decoded = ViterbiDecoder::new().decode(&pattern, layout, &weights);
        assert_eq!(Label::from_tags(&[1, 0]), decoded);
    }

    #[test]
    fn test_decode_transition_overrides_weak_emission() {
        let layout = two_tag_layout();
        let pattern = indicator_pattern(&[0, 1]);
        let mut weights = vec![0.0; layout.size_psi()];
        weights[0] = 1.0; // tag 0 slightly preferred at position 0
        weights[3] = 0.5; // tag 1 weakly preferred at position 1
        weights[layout.transition_index(0, 0)] = 2.0;
        let decoded = ViterbiDecoder::new().decode(&pattern, layout, &weights);
        assert_eq!(Label::from_tags(&[0, 0]), decoded);
    }

    #[test]
    fn test_decode_empty_pattern() {
        let layout = two_tag_layout();
        let decoded = ViterbiDecoder::new().decode(&Pattern::new(), layout, &[0.0; 8]);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_augmented_prefers_lossy_paths_at_zero_weights() {
        let layout = two_tag_layout();
        let pattern = indicator_pattern(&[0, 1]);
        let truth = Label::from_tags(&[0, 0]);
        let params = LearnParams::new(2);
        let weights = vec![0.0; layout.size_psi()];
        let decoded = ViterbiDecoder::new()
            .decode_augmented(&pattern, &truth, layout, &weights, &params)
            .unwrap();
        // with w = 0 the augmented score is the Hamming loss itself
        assert_eq!(Label::from_tags(&[1, 1]), decoded);
    }

    #[test]
    fn test_augmented_rejects_slack_rescaling() {
        let layout = two_tag_layout();
        let pattern = indicator_pattern(&[0]);
        let truth = Label::from_tags(&[0]);
        let mut params = LearnParams::new(2);
        params.rescaling = Rescaling::Slack;
        let result = ViterbiDecoder::new().decode_augmented(
            &pattern,
            &truth,
            layout,
            &[0.0; 8],
            &params,
        );
        assert!(matches!(
            result,
            Err(SeqSvmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_augmented_rejects_zero_one_loss() {
        let layout = two_tag_layout();
        let pattern = indicator_pattern(&[0]);
        let truth = Label::from_tags(&[0]);
        let mut params = LearnParams::new(2);
        params.loss = Loss::ZeroOne;
        let result = ViterbiDecoder::new().decode_augmented(
            &pattern,
            &truth,
            layout,
            &[0.0; 8],
            &params,
        );
        assert!(result.is_err());
    }
}
