use hashbrown::HashMap;

use seqsvm::{Feature, Token};

/// Word-identity feature extractor.
///
/// Training words are interned to dense feature IDs; words unseen during
/// training contribute no feature, so the decoder falls back to the
/// transition weights for them.
pub struct FeatureExtractor {
    word_ids: HashMap<String, u32>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            word_ids: HashMap::new(),
        }
    }

    /// Number of features seen so far.
    pub fn feature_space_size(&self) -> u32 {
        self.word_ids.len() as u32
    }

    /// Builds a token for a training word, interning its identity feature.
    pub fn train_token(&mut self, word: &str) -> Token {
        let next_id = self.word_ids.len() as u32;
        let id = *self.word_ids.entry(word.to_string()).or_insert(next_id);
        let token = Token::new(word);
        token.features_mut().push(Feature::new(id, 1.0));
        token
    }

    /// Builds a token for a test word without growing the feature space.
    pub fn test_token(&self, word: &str) -> Token {
        let token = Token::new(word);
        if let Some(&id) = self.word_ids.get(word) {
            token.features_mut().push(Feature::new(id, 1.0));
        }
        token
    }
}
