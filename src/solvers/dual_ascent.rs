//! Module for the dual coordinate-ascent QP solver.

use log::debug;

use crate::errors::{Result, SeqSvmError};
use crate::params::{LearnParams, SlackNorm};
use crate::solvers::{QpSolver, QpStats};
use crate::trainer::WorkingSet;

const TINY: f64 = 1e-12;

/// Coordinate ascent on the dual of the n-slack cutting-plane program.
///
/// With L1 slack, each example's dual mass is boxed by `C/n`; when the box
/// is tight, mass is exchanged pairwise between the example's constraints
/// so the ascent cannot stall on the shared bound. With L2 slack the box
/// disappears and the kernel diagonal is augmented by `n/C` instead.
///
/// Dual variables are warm started from the values left in the working set
/// by the previous solve.
pub struct DualAscentSolver {
    max_passes: usize,
}

impl DualAscentSolver {
    /// Creates a solver with the default pass limit.
    #[must_use]
    pub fn new() -> Self {
        Self { max_passes: 1000 }
    }

    /// Sets the maximum number of passes over the working set.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::InvalidArgument`] is returned when `max_passes` is 0.
    pub fn max_passes(mut self, max_passes: usize) -> Result<Self> {
        if max_passes == 0 {
            return Err(SeqSvmError::invalid_argument(
                "max_passes",
                "must not be 0",
            ));
        }
        self.max_passes = max_passes;
        Ok(self)
    }

    /// Exchanges dual mass between the most and least violated constraints
    /// of an example whose box is tight. Returns the violated gap.
    fn exchange(
        working_set: &mut WorkingSet,
        example: usize,
        weights: &mut [f64],
    ) -> f64 {
        let cache = working_set.cache(example);
        let mut up = 0;
        let mut up_g = f64::NEG_INFINITY;
        let mut down = None;
        let mut down_g = f64::INFINITY;
        for (j, c) in cache.constraints().iter().enumerate() {
            let g = c.margin() - c.dpsi().dot(weights);
            if g > up_g {
                up_g = g;
                up = j;
            }
            if c.alpha() > TINY && g < down_g {
                down_g = g;
                down = Some(j);
            }
        }
        let Some(down) = down else {
            return 0.0;
        };
        if up == down || up_g - down_g <= TINY {
            return 0.0;
        }
        let gap = up_g - down_g;

        let cu = &cache.constraints()[up];
        let cd = &cache.constraints()[down];
        let eta = cu.dpsi().squared_norm() + cd.dpsi().squared_norm()
            - 2.0 * cu.dpsi().dot_sparse(cd.dpsi());
        if eta <= TINY {
            return gap;
        }
        let step = (gap / eta).min(cd.alpha());
        let (up_alpha, down_alpha) = (cu.alpha() + step, cd.alpha() - step);

        let cache = working_set.cache_mut(example);
        cache.constraints_mut()[up].set_alpha(up_alpha);
        cache.constraints_mut()[down].set_alpha(down_alpha);
        working_set.cache(example).constraints()[up]
            .dpsi()
            .add_into(weights, step);
        working_set.cache(example).constraints()[down]
            .dpsi()
            .add_into(weights, -step);
        gap
    }
}

impl Default for DualAscentSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for DualAscentSolver {
    fn solve(
        &self,
        working_set: &mut WorkingSet,
        params: &LearnParams,
        weights: &mut [f64],
    ) -> Result<QpStats> {
        let n = working_set.num_examples();
        weights.fill(0.0);
        if n == 0 || working_set.total_constraints() == 0 {
            return Ok(QpStats::default());
        }
        let nf = n as f64;
        let cap = params.c / nf;
        let l2_diag = match params.slack_norm {
            SlackNorm::L1 => 0.0,
            SlackNorm::L2 => nf / params.c,
        };
        let tol = 0.5 * params.epsilon;

        // rebuild w and the per-example dual mass from the warm-started
        // duals
        let mut sums = vec![0.0; n];
        for i in 0..n {
            for c in working_set.cache(i).constraints() {
                c.dpsi().add_into(weights, c.alpha());
                sums[i] += c.alpha();
            }
        }

        let mut passes = 0;
        let mut max_violation = f64::INFINITY;
        while passes < self.max_passes {
            passes += 1;
            let mut violation = 0.0f64;
            for i in 0..n {
                let num_constraints = working_set.cache(i).len();
                for j in 0..num_constraints {
                    let (gradient, eta, alpha) = {
                        let c = &working_set.cache(i).constraints()[j];
                        let mut g = c.margin() - c.dpsi().dot(weights);
                        if l2_diag > 0.0 {
                            g -= l2_diag * sums[i];
                        }
                        (g, c.dpsi().squared_norm() + l2_diag, c.alpha())
                    };
                    if !gradient.is_finite() {
                        return Err(SeqSvmError::solver_failure(
                            "non-finite gradient in the quadratic program",
                        ));
                    }
                    let room = if l2_diag > 0.0 {
                        f64::INFINITY
                    } else {
                        cap - sums[i]
                    };
                    // projected gradient: steps blocked by the bounds do
                    // not count as KKT violations
                    let projected = if gradient > 0.0 {
                        if room > TINY {
                            gradient
                        } else {
                            0.0
                        }
                    } else if alpha > TINY {
                        gradient
                    } else {
                        0.0
                    };
                    violation = violation.max(projected.abs());
                    if projected == 0.0 {
                        continue;
                    }
                    let mut next = alpha + gradient / eta.max(TINY);
                    if next < 0.0 {
                        next = 0.0;
                    }
                    if l2_diag == 0.0 && next > alpha + room {
                        next = alpha + room;
                    }
                    let delta = next - alpha;
                    if delta != 0.0 {
                        let c = &mut working_set.cache_mut(i).constraints_mut()[j];
                        c.set_alpha(next);
                        c.dpsi().add_into(weights, delta);
                        sums[i] += delta;
                    }
                }
                if l2_diag == 0.0 && num_constraints > 1 && cap - sums[i] <= TINY {
                    violation = violation.max(Self::exchange(working_set, i, weights));
                }
            }
            max_violation = violation;
            if max_violation <= tol {
                let mut dual_objective = 0.0;
                for (i, &sum) in sums.iter().enumerate() {
                    for c in working_set.cache(i).constraints() {
                        dual_objective += c.alpha() * c.margin();
                    }
                    dual_objective -= 0.5 * l2_diag * sum * sum;
                }
                for &w in weights.iter() {
                    dual_objective -= 0.5 * w * w;
                }
                debug!(
                    "QP solved: {passes} passes, max KKT violation {max_violation}, \
                     dual objective {dual_objective}"
                );
                return Ok(QpStats {
                    passes,
                    max_kkt_violation: max_violation,
                    dual_objective,
                });
            }
        }
        Err(SeqSvmError::solver_failure(format!(
            "KKT violation {max_violation} above tolerance {tol} after {} passes",
            self.max_passes
        )))
    }
}
