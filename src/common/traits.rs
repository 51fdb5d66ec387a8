//! Common traits defining the seams of the MPC loop

use crate::common::error::MpcResult;
use crate::optim::{QpSolution, QuadraticProgram};

/// Trait for quadratic-program backends (interior point, ADMM, ...)
///
/// Implementations solve `min ½zᵀPz + qᵀz + c` subject to `l ≤ Az ≤ u`,
/// and report an empty feasible set as [`MpcError::Infeasible`] and any
/// other failure as [`MpcError::Solver`].
///
/// [`MpcError::Infeasible`]: crate::common::MpcError::Infeasible
/// [`MpcError::Solver`]: crate::common::MpcError::Solver
pub trait QpSolver {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Solve one problem instance
    fn solve(&mut self, problem: &QuadraticProgram) -> MpcResult<QpSolution>;

    /// Seed the next solve with a primal guess. Backends that cannot warm
    /// start ignore it.
    fn warm_start(&mut self, _primal: &[f64]) {}
}

impl<S: QpSolver + ?Sized> QpSolver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&mut self, problem: &QuadraticProgram) -> MpcResult<QpSolution> {
        (**self).solve(problem)
    }

    fn warm_start(&mut self, primal: &[f64]) {
        (**self).warm_start(primal)
    }
}

/// Trait for feedback controllers
pub trait Controller {
    /// State type
    type State;
    /// Reference/target type
    type Reference: ?Sized;
    /// Output type
    type Output;

    /// Compute one control step
    fn compute(&mut self, state: &Self::State, reference: &Self::Reference) -> MpcResult<Self::Output>;

    /// Reset controller state
    fn reset(&mut self);
}
