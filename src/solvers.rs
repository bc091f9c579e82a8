//! Quadratic-program solvers for the cutting-plane working set.

pub mod dual_ascent;

use crate::errors::Result;
use crate::params::LearnParams;
use crate::trainer::WorkingSet;

/// Outcome of one QP solve.
#[derive(Clone, Copy, Debug, Default)]
pub struct QpStats {
    /// Number of passes over the working set.
    pub passes: usize,

    /// Largest KKT violation observed in the final pass.
    pub max_kkt_violation: f64,

    /// Final dual objective value.
    pub dual_objective: f64,
}

/// Interface to the quadratic-program solver invoked by the trainer.
///
/// A solver receives the accumulated constraint working set and the
/// learning parameters, updates the dual variables stored with the
/// constraints, and rewrites `weights` to `Σ α·δΨ`. The dual variables
/// persist in the working set between invocations, so a solver may warm
/// start from the previous solution.
pub trait QpSolver {
    /// Solves the quadratic program over the cached constraints.
    ///
    /// # Errors
    ///
    /// [`SeqSvmError::SolverFailure`](crate::SeqSvmError::SolverFailure)
    /// is returned on numerical failure or non-convergence; the training
    /// run treats this as fatal.
    fn solve(
        &self,
        working_set: &mut WorkingSet,
        params: &LearnParams,
        weights: &mut [f64],
    ) -> Result<QpStats>;
}
