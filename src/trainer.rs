//! Cutting-plane training of structural SVMs.

use alloc::vec::Vec;

use hashbrown::HashMap;
use log::{debug, info, warn};

use crate::decoder::{Decoder, ViterbiDecoder};
use crate::errors::{Result, SeqSvmError};
use crate::feature::SparseVector;
use crate::model::{FeatureLayout, SolverState, StructModel};
use crate::params::{LearnParams, Rescaling};
use crate::sequence::{Label, Pattern};
use crate::solvers::dual_ascent::DualAscentSolver;
use crate::solvers::QpSolver;
use crate::tags::TagRegistry;

/// One cutting-plane constraint `w·δΨ ≥ Δ − ξ` together with its dual
/// variable.
#[derive(Debug)]
pub struct Constraint {
    dpsi: SparseVector,
    margin: f64,
    alpha: f64,
}

impl Constraint {
    pub(crate) fn new(dpsi: SparseVector, margin: f64) -> Self {
        Self {
            dpsi,
            margin,
            alpha: 0.0,
        }
    }

    /// Returns the constraint vector `δΨ`.
    #[must_use]
    pub fn dpsi(&self) -> &SparseVector {
        &self.dpsi
    }

    /// Returns the margin `Δ` the constraint demands.
    #[must_use]
    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// Returns the dual variable.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Overwrites the dual variable; called by the QP solver.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    /// Returns `Δ − w·δΨ`, the amount by which the constraint is violated
    /// at zero slack.
    #[must_use]
    pub fn violation(&self, weights: &[f64]) -> f64 {
        self.margin - self.dpsi.dot(weights)
    }
}

/// Bounded cache of the constraints generated for one example.
#[derive(Debug)]
pub struct ConstraintCache {
    items: Vec<Constraint>,
    capacity: usize,
}

impl ConstraintCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: vec![],
            capacity,
        }
    }

    /// Returns the cached constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.items
    }

    /// Returns the cached constraints for in-place dual updates.
    pub fn constraints_mut(&mut self) -> &mut [Constraint] {
        &mut self.items
    }

    /// Returns the number of cached constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the cache holds no constraint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the example's slack under the given weights:
    /// `max(0, max_c Δ_c − w·δΨ_c)`.
    #[must_use]
    pub fn slack(&self, weights: &[f64]) -> f64 {
        let mut slack = 0.0;
        for c in &self.items {
            let v = c.violation(weights);
            if v > slack {
                slack = v;
            }
        }
        slack
    }

    /// Adds a constraint, evicting the least-binding cached one (smallest
    /// dual variable, oldest first on ties) when the cache is full.
    ///
    /// A capacity of 0 leaves the cache unbounded; the trainer then clears
    /// it wholesale at every pass instead.
    pub(crate) fn push(&mut self, constraint: Constraint) {
        if self.capacity > 0 && self.items.len() >= self.capacity {
            let mut evict = 0;
            for (i, c) in self.items.iter().enumerate() {
                if c.alpha < self.items[evict].alpha {
                    evict = i;
                }
            }
            self.items.remove(evict);
        }
        self.items.push(constraint);
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// The per-example constraint caches a QP solve runs over.
#[derive(Debug)]
pub struct WorkingSet {
    caches: Vec<ConstraintCache>,
}

impl WorkingSet {
    pub(crate) fn new(num_examples: usize, capacity: usize) -> Self {
        let mut caches = Vec::with_capacity(num_examples);
        for _ in 0..num_examples {
            caches.push(ConstraintCache::new(capacity));
        }
        Self { caches }
    }

    /// Returns the number of examples.
    #[must_use]
    pub fn num_examples(&self) -> usize {
        self.caches.len()
    }

    /// Returns the cache of the given example.
    #[must_use]
    pub fn cache(&self, example: usize) -> &ConstraintCache {
        &self.caches[example]
    }

    /// Returns the cache of the given example for mutation.
    pub fn cache_mut(&mut self, example: usize) -> &mut ConstraintCache {
        &mut self.caches[example]
    }

    /// Returns the total number of cached constraints.
    #[must_use]
    pub fn total_constraints(&self) -> usize {
        self.caches.iter().map(ConstraintCache::len).sum()
    }

    fn clear_all(&mut self) {
        for cache in &mut self.caches {
            cache.clear();
        }
    }

    fn alphas(&self) -> Vec<f64> {
        self.caches
            .iter()
            .flat_map(|cache| cache.constraints().iter().map(Constraint::alpha))
            .collect()
    }
}

fn accumulate_psi(
    pattern: &Pattern,
    label: &Label,
    layout: FeatureLayout,
    sign: f64,
    map: &mut HashMap<u32, f64>,
) {
    for i in 0..pattern.len() {
        let tag = label.get_tag(i);
        let offset = u32::try_from(layout.emission_offset(tag)).unwrap();
        pattern.get_token(i).with_features(|features| {
            for f in features.elements() {
                *map.entry(offset + f.feature_id).or_insert(0.0) += sign * f.value;
            }
        });
        if i > 0 {
            let index =
                u32::try_from(layout.transition_index(label.get_tag(i - 1), tag)).unwrap();
            *map.entry(index).or_insert(0.0) += sign;
        }
    }
}

/// Builds the constraint `(δΨ, Δ)` separating the true label from a
/// violating one, under the configured rescaling method.
fn build_constraint(
    pattern: &Pattern,
    truth: &Label,
    violator: &Label,
    layout: FeatureLayout,
    params: &LearnParams,
) -> Constraint {
    let mut map = HashMap::new();
    accumulate_psi(pattern, truth, layout, 1.0, &mut map);
    accumulate_psi(pattern, violator, layout, -1.0, &mut map);
    let loss = params.loss.evaluate(truth, violator);
    if params.rescaling == Rescaling::Slack {
        for value in map.values_mut() {
            *value *= loss;
        }
    }
    Constraint::new(SparseVector::from_map(map), loss)
}

/// Cutting-plane trainer for structural SVMs over sequences.
///
/// The trainer never materializes the exponential constraint set: per pass
/// it asks the decoder for each example's most violated label, caches the
/// resulting constraint when the violation exceeds the example's slack by
/// more than `epsilon`, and periodically re-solves the quadratic program
/// over the cached constraints. A pass that adds no constraint means the
/// duality gap is below tolerance and training stops.
///
/// # Examples
///
/// ```
/// use seqsvm::{
///     Feature, Label, LearnParams, Pattern, TagRegistry, Token, Trainer,
/// };
///
/// let mut registry = TagRegistry::new();
/// let n = registry.register_tag("N");
/// let v = registry.register_tag("V");
///
/// // "dog runs": word identity features 0 and 1
/// let mut pattern = Pattern::new();
/// for fid in [0, 1] {
///     let token = Token::new("");
///     token.features_mut().push(Feature::new(fid, 1.0));
///     pattern.append_token(token);
/// }
/// let examples = vec![(pattern.clone(), Label::from_tags(&[n, v]))];
///
/// let trainer = Trainer::new(LearnParams::new(2)).unwrap();
/// let model = trainer.train(&examples, &registry).unwrap();
/// assert_eq!(model.size_psi(), model.weights().len());
///
/// let decoder = seqsvm::ViterbiDecoder::new();
/// assert_eq!(Label::from_tags(&[n, v]), model.predict(&pattern, &decoder));
/// ```
pub struct Trainer<D = ViterbiDecoder, S = DualAscentSolver> {
    params: LearnParams,
    decoder: D,
    solver: S,
}

impl Trainer {
    /// Creates a trainer with the bundled Viterbi decoder and dual-ascent
    /// QP solver.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when the configuration
    /// is malformed.
    pub fn new(params: LearnParams) -> Result<Self> {
        Self::with_components(params, ViterbiDecoder::new(), DualAscentSolver::new())
    }
}

impl<D, S> Trainer<D, S>
where
    D: Decoder,
    S: QpSolver,
{
    /// Creates a trainer with a custom decoder and QP solver.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when the configuration
    /// is malformed.
    pub fn with_components(params: LearnParams, decoder: D, solver: S) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            decoder,
            solver,
        })
    }

    /// Returns the training configuration.
    #[must_use]
    pub fn params(&self) -> &LearnParams {
        &self.params
    }

    fn validate_examples(
        &self,
        examples: &[(Pattern, Label)],
        layout: FeatureLayout,
    ) -> Result<Vec<(Pattern, Label)>> {
        let mut labeled = vec![];
        for (pattern, label) in examples {
            if label.is_empty() {
                // unlabeled example, not used for training
                continue;
            }
            if label.len() != pattern.len() {
                return Err(SeqSvmError::invalid_argument(
                    "examples",
                    format!(
                        "label length {} does not match pattern length {}",
                        label.len(),
                        pattern.len()
                    ),
                ));
            }
            for i in 0..pattern.len() {
                if let Some(max_fid) = pattern.get_token(i).max_feature_id() {
                    if max_fid >= layout.feature_space_size() {
                        return Err(SeqSvmError::invalid_argument(
                            "examples",
                            format!(
                                "feature ID {max_fid} exceeds the feature space size {}",
                                layout.feature_space_size()
                            ),
                        ));
                    }
                }
                if label.get_tag(i) >= layout.num_tags() {
                    return Err(SeqSvmError::invalid_argument(
                        "examples",
                        format!("unregistered tag ID {}", label.get_tag(i)),
                    ));
                }
            }
            labeled.push((pattern.clone(), label.clone()));
        }
        if labeled.is_empty() {
            return Err(SeqSvmError::invalid_argument(
                "examples",
                "no labeled example to train on",
            ));
        }
        Ok(labeled)
    }

    /// Trains a model on the given examples.
    ///
    /// Examples with an empty label are treated as unlabeled and skipped.
    /// The registry supplies the output alphabet and must stay untouched
    /// for the whole run.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when the registry is
    /// empty, a label length does not match its pattern, a tag ID is
    /// unregistered, or a token references a feature outside the
    /// configured feature space. [`SeqSvmError::SolverFailure`] is
    /// returned when the QP solver fails; no model is emitted then.
    pub fn train(
        &self,
        examples: &[(Pattern, Label)],
        registry: &TagRegistry,
    ) -> Result<StructModel> {
        let num_tags = u32::try_from(registry.num_tags())
            .map_err(|_| SeqSvmError::invalid_argument("registry", "too many tags"))?;
        let layout = FeatureLayout::new(self.params.feature_space_size, num_tags)?;
        let labeled = self.validate_examples(examples, layout)?;

        info!(
            "training on {} examples, size_psi = {}",
            labeled.len(),
            layout.size_psi()
        );

        let mut weights = vec![0.0; layout.size_psi()];
        let mut working_set = WorkingSet::new(labeled.len(), self.params.ccache_size);
        let mut dual_objective = 0.0;
        let mut pending = 0;
        let mut converged = false;

        for pass in 0..self.params.max_iter {
            if self.params.ccache_size == 0 {
                working_set.clear_all();
            }
            let mut added = 0;
            for (i, (pattern, truth)) in labeled.iter().enumerate() {
                let violator = self.decoder.decode_augmented(
                    pattern,
                    truth,
                    layout,
                    &weights,
                    &self.params,
                )?;
                let constraint = build_constraint(pattern, truth, &violator, layout, &self.params);
                let slack = working_set.cache(i).slack(&weights);
                if constraint.violation(&weights) > slack + self.params.epsilon {
                    working_set.cache_mut(i).push(constraint);
                    added += 1;
                    pending += 1;
                    if pending >= self.params.newconst_retrain {
                        let stats = self.solver.solve(&mut working_set, &self.params, &mut weights)?;
                        debug!(
                            "pass {pass}: intermediate solve, {} passes, max KKT violation {}",
                            stats.passes, stats.max_kkt_violation
                        );
                        dual_objective = stats.dual_objective;
                        pending = 0;
                    }
                }
            }
            if added == 0 {
                info!("converged after {pass} passes");
                converged = true;
                break;
            }
            if pending > 0 {
                let stats = self.solver.solve(&mut working_set, &self.params, &mut weights)?;
                dual_objective = stats.dual_objective;
                pending = 0;
            }
            info!(
                "pass {pass}: {added} new constraints, {} cached, dual objective {dual_objective}",
                working_set.total_constraints()
            );
        }
        if !converged {
            warn!(
                "stopped after {} passes without reaching tolerance {}",
                self.params.max_iter, self.params.epsilon
            );
        }

        let state = SolverState {
            alphas: working_set.alphas(),
            dual_objective,
        };
        Ok(StructModel::new(weights, layout, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::feature::Feature;
    use crate::params::SlackNorm;
    use crate::test_utils::{toy_examples, toy_registry};
    use crate::token::Token;

    fn feature_layout() -> FeatureLayout {
        FeatureLayout::new(2, 2).unwrap()
    }

    #[test]
    fn test_build_constraint_margin_rescaling() {
        let layout = feature_layout();
        let params = LearnParams::new(2);
        let mut pattern = Pattern::new();
        for fid in [0, 1] {
            let token = Token::new("");
            token.features_mut().push(Feature::new(fid, 1.0));
            pattern.append_token(token);
        }
        let truth = Label::from_tags(&[0, 1]);
        let violator = Label::from_tags(&[1, 0]);
        let c = build_constraint(&pattern, &truth, &violator, layout, &params);
        assert_eq!(2.0, c.margin());
        // truth: emission (0,0) (1,1), transition 0->1
        // violator: emission (1,0) (0,1), transition 1->0
        let mut expected = vec![0.0; layout.size_psi()];
        expected[0] = 1.0;
        expected[3] = 1.0;
        expected[layout.transition_index(0, 1)] = 1.0;
        expected[2] = -1.0;
        expected[1] = -1.0;
        expected[layout.transition_index(1, 0)] = -1.0;
        let mut actual = vec![0.0; layout.size_psi()];
        c.dpsi().add_into(&mut actual, 1.0);
        assert_eq!(expected, actual);
        // at w = 0 the violation equals the loss
        assert_eq!(2.0, c.violation(&vec![0.0; layout.size_psi()]));
    }

    #[test]
    fn test_build_constraint_for_exact_match_is_vacuous() {
        let layout = feature_layout();
        let params = LearnParams::new(2);
        let mut pattern = Pattern::new();
        let token = Token::new("");
        token.features_mut().push(Feature::new(0, 1.0));
        pattern.append_token(token);
        let truth = Label::from_tags(&[0]);
        let c = build_constraint(&pattern, &truth, &truth.clone(), layout, &params);
        assert_eq!(0.0, c.margin());
        assert!(c.dpsi().is_empty());
    }

    #[test]
    fn test_cache_eviction_drops_least_binding() {
        let mut cache = ConstraintCache::new(2);
        let mut c1 = Constraint::new(SparseVector::new(), 1.0);
        c1.set_alpha(0.5);
        let mut c2 = Constraint::new(SparseVector::new(), 2.0);
        c2.set_alpha(0.1);
        cache.push(c1);
        cache.push(c2);
        cache.push(Constraint::new(SparseVector::new(), 3.0));
        assert_eq!(2, cache.len());
        // the small-alpha constraint was evicted
        assert_eq!(1.0, cache.constraints()[0].margin());
        assert_eq!(3.0, cache.constraints()[1].margin());
    }

    #[test]
    fn test_cache_eviction_ties_to_oldest() {
        let mut cache = ConstraintCache::new(2);
        cache.push(Constraint::new(SparseVector::new(), 1.0));
        cache.push(Constraint::new(SparseVector::new(), 2.0));
        cache.push(Constraint::new(SparseVector::new(), 3.0));
        assert_eq!(2.0, cache.constraints()[0].margin());
    }

    #[test]
    fn test_training_converges_on_toy_corpus() {
        let registry = toy_registry();
        let examples = toy_examples();
        let trainer = Trainer::new(LearnParams::new(2)).unwrap();
        let model = trainer.train(&examples, &registry).unwrap();
        assert_eq!(model.size_psi(), model.weights().len());

        let decoder = ViterbiDecoder::new();
        for (pattern, truth) in &examples {
            assert_eq!(*truth, model.predict(pattern, &decoder));
        }
    }

    #[test]
    fn test_training_without_cache_does_not_crash() {
        let registry = toy_registry();
        let examples = toy_examples();
        let mut params = LearnParams::new(2);
        params.ccache_size = 0;
        let trainer = Trainer::new(params).unwrap();
        let model = trainer.train(&examples, &registry).unwrap();
        assert_eq!(model.size_psi(), model.weights().len());
    }

    #[test]
    fn test_training_with_frequent_resolves() {
        let registry = toy_registry();
        let examples = toy_examples();
        let mut params = LearnParams::new(2);
        params.newconst_retrain = 1;
        let trainer = Trainer::new(params).unwrap();
        let model = trainer.train(&examples, &registry).unwrap();
        let decoder = ViterbiDecoder::new();
        assert_eq!(examples[0].1, model.predict(&examples[0].0, &decoder));
    }

    #[test]
    fn test_training_with_l2_slack() {
        let registry = toy_registry();
        let examples = toy_examples();
        let mut params = LearnParams::new(2);
        params.slack_norm = SlackNorm::L2;
        let trainer = Trainer::new(params).unwrap();
        let model = trainer.train(&examples, &registry).unwrap();
        assert_eq!(model.size_psi(), model.weights().len());
    }

    #[test]
    fn test_training_skips_unlabeled_examples() {
        let registry = toy_registry();
        let mut examples = toy_examples();
        let mut unlabeled = Pattern::new();
        let token = Token::new("");
        token.features_mut().push(Feature::new(0, 1.0));
        unlabeled.append_token(token);
        examples.push((unlabeled, Label::new()));
        let trainer = Trainer::new(LearnParams::new(2)).unwrap();
        assert!(trainer.train(&examples, &registry).is_ok());
    }

    #[test]
    fn test_training_rejects_empty_registry() {
        let examples = toy_examples();
        let trainer = Trainer::new(LearnParams::new(2)).unwrap();
        assert!(trainer.train(&examples, &TagRegistry::new()).is_err());
    }

    #[test]
    fn test_training_rejects_length_mismatch() {
        let registry = toy_registry();
        let mut examples = toy_examples();
        let pattern = examples[0].0.clone();
        examples.push((pattern, Label::from_tags(&[0])));
        let trainer = Trainer::new(LearnParams::new(2)).unwrap();
        assert!(matches!(
            trainer.train(&examples, &registry),
            Err(SeqSvmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_training_rejects_out_of_space_features() {
        let registry = toy_registry();
        let mut pattern = Pattern::new();
        let token = Token::new("");
        token.features_mut().push(Feature::new(7, 1.0));
        pattern.append_token(token);
        let examples = vec![(pattern, Label::from_tags(&[0]))];
        // feature space of size 2 cannot hold feature ID 7
        let trainer = Trainer::new(LearnParams::new(2)).unwrap();
        assert!(trainer.train(&examples, &registry).is_err());
    }

    #[test]
    fn test_training_rejects_unregistered_tags() {
        let registry = toy_registry();
        let mut pattern = Pattern::new();
        let token = Token::new("");
        token.features_mut().push(Feature::new(0, 1.0));
        pattern.append_token(token);
        let examples = vec![(pattern, Label::from_tags(&[9]))];
        let trainer = Trainer::new(LearnParams::new(2)).unwrap();
        assert!(trainer.train(&examples, &registry).is_err());
    }
}
