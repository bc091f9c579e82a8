//! # SeqSVM
//!
//! Structural support vector machines for sequence labeling implemented in pure Rust
#![cfg_attr(
    feature = "train",
    doc = "
## Examples

```rust
use seqsvm::{
    Feature, Label, LearnParams, Pattern, TagRegistry, Token, Trainer, ViterbiDecoder,
};

// Train:
// dog/N runs/V
// dog/N
//
// Test:
// dog runs
//
// Features (word identity):
// dog: 0, runs: 1
//
// Tags:
// N: 0, V: 1

let mut registry = TagRegistry::new();
let n = registry.register_tag(\"N\");
let v = registry.register_tag(\"V\");

let mut first = Pattern::new();
for (word, feature_id) in [(\"dog\", 0), (\"runs\", 1)] {
    let token = Token::new(word);
    token.features_mut().push(Feature::new(feature_id, 1.0));
    first.append_token(token);
}
let mut second = Pattern::new();
let token = Token::new(\"dog\");
token.features_mut().push(Feature::new(0, 1.0));
second.append_token(token);

let examples = vec![
    (first.clone(), Label::from_tags(&[n, v])),
    (second, Label::from_tags(&[n])),
];

// Generates a model
let trainer = Trainer::new(LearnParams::new(2)).unwrap();
let model = trainer.train(&examples, &registry).unwrap();
assert_eq!(model.size_psi(), model.weights().len());

// dog runs
let decoder = ViterbiDecoder::new();
let predicted = model.predict(&first, &decoder);

assert_eq!(Label::from_tags(&[n, v]), predicted);
assert_eq!(\"N\", registry.tag_by_id(predicted.get_tag(0)).unwrap());
```
"
)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "alloc"))]
compile_error!("`alloc` feature is currently required to build this crate");

#[macro_use]
extern crate alloc;

mod decoder;
mod errors;
mod eval;
mod feature;
mod model;
mod params;
mod sequence;
mod tags;
mod token;

#[cfg(feature = "train")]
mod solvers;
#[cfg(feature = "train")]
mod trainer;

#[cfg(test)]
mod test_utils;

pub use decoder::{Decoder, ViterbiDecoder};
pub use errors::{InvalidArgumentError, Result, SeqSvmError, SolverFailureError};
pub use eval::TestStats;
pub use feature::{Feature, SparseVector};
pub use model::{FeatureLayout, SolverState, StructModel};
pub use params::{LearnParams, Loss, Rescaling, SlackNorm};
pub use sequence::{Label, Pattern};
pub use tags::TagRegistry;
pub use token::Token;

#[cfg(feature = "train")]
pub use solvers::dual_ascent::DualAscentSolver;
#[cfg(feature = "train")]
pub use solvers::{QpSolver, QpStats};
#[cfg(feature = "train")]
pub use trainer::{Constraint, ConstraintCache, Trainer, WorkingSet};
