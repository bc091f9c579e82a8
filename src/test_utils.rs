use alloc::vec::Vec;

use crate::feature::Feature;
use crate::sequence::{Label, Pattern};
use crate::tags::TagRegistry;
use crate::token::Token;

pub fn toy_registry() -> TagRegistry {
    let mut registry = TagRegistry::new();
    registry.register_tag("N");
    registry.register_tag("V");
    registry
}

pub fn indicator_token(feature_id: u32) -> Token {
    let token = Token::new("");
    token.features_mut().push(Feature::new(feature_id, 1.0));
    token
}

// Two sentences over a two-word vocabulary (feature 0: noun-ish word,
// feature 1: verb-ish word), linearly separable:
//   "dog runs" -> N V
//   "dog"      -> N
pub fn toy_examples() -> Vec<(Pattern, Label)> {
    let mut first = Pattern::new();
    first.append_token(indicator_token(0));
    first.append_token(indicator_token(1));

    let mut second = Pattern::new();
    second.append_token(indicator_token(0));

    vec![
        (first, Label::from_tags(&[0, 1])),
        (second, Label::from_tags(&[0])),
    ]
}
