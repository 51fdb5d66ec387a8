//! Interior-point backend on the Clarabel conic solver
//!
//! Equality rows go to the zero cone, every finite side of an inequality row
//! becomes one nonnegative-cone row (`A z + s = b`, `s ≥ 0`).

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
    SupportedConeT::{NonnegativeConeT, ZeroConeT},
};
use log::debug;

use crate::common::{MpcError, MpcResult, QpSolver};
use crate::optim::qp::{QpSolution, QuadraticProgram, SolverSettings};

/// QP backend wrapping `clarabel::solver::DefaultSolver`
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    settings: SolverSettings,
}

impl ClarabelSolver {
    pub fn new(settings: SolverSettings) -> Self {
        ClarabelSolver { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    fn build_settings(&self) -> MpcResult<DefaultSettings<f64>> {
        let time_limit = self.settings.time_limit.unwrap_or(f64::INFINITY);
        DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(self.settings.max_iterations)
            .time_limit(time_limit)
            .tol_feas(self.settings.tolerance)
            .tol_gap_abs(self.settings.tolerance)
            .tol_gap_rel(self.settings.tolerance)
            .build()
            .map_err(|e| MpcError::Solver(format!("invalid Clarabel settings: {}", e)))
    }
}

/// Conic data in Clarabel's layout
struct ConicData {
    p: CscMatrix<f64>,
    q: Vec<f64>,
    a: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

fn to_conic_form(problem: &QuadraticProgram) -> ConicData {
    let n = problem.num_variables();

    // Upper triangle of P, column by column
    let hessian = problem.hessian();
    let mut p_colptr = vec![0];
    let mut p_rowval = Vec::new();
    let mut p_nzval = Vec::new();
    for j in 0..n {
        for i in 0..=j {
            let v = hessian[(i, j)];
            if v != 0.0 {
                p_rowval.push(i);
                p_nzval.push(v);
            }
        }
        p_colptr.push(p_rowval.len());
    }
    let p = CscMatrix::new(n, n, p_colptr, p_rowval, p_nzval);

    // Equalities first (zero cone), then one-sided inequalities
    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    let mut b = Vec::new();
    let mut row = 0;
    for c in problem.constraints().iter().filter(|c| c.is_equality()) {
        for &(col, coeff) in &c.terms {
            triplets.push((row, col, coeff));
        }
        b.push(c.upper);
        row += 1;
    }
    let n_eq = row;
    for c in problem.constraints().iter().filter(|c| !c.is_equality()) {
        if c.upper.is_finite() {
            for &(col, coeff) in &c.terms {
                triplets.push((row, col, coeff));
            }
            b.push(c.upper);
            row += 1;
        }
        if c.lower.is_finite() {
            for &(col, coeff) in &c.terms {
                triplets.push((row, col, -coeff));
            }
            b.push(-c.lower);
            row += 1;
        }
    }
    let n_ineq = row - n_eq;

    triplets.sort_by(|x, y| (x.1, x.0).cmp(&(y.1, y.0)));
    let mut a_colptr = vec![0; n + 1];
    let mut a_rowval = Vec::with_capacity(triplets.len());
    let mut a_nzval = Vec::with_capacity(triplets.len());
    for &(r, c, v) in &triplets {
        a_colptr[c + 1] += 1;
        a_rowval.push(r);
        a_nzval.push(v);
    }
    for j in 0..n {
        a_colptr[j + 1] += a_colptr[j];
    }
    let a = CscMatrix::new(row, n, a_colptr, a_rowval, a_nzval);

    let mut cones = Vec::new();
    if n_eq > 0 {
        cones.push(ZeroConeT(n_eq));
    }
    if n_ineq > 0 {
        cones.push(NonnegativeConeT(n_ineq));
    }

    ConicData {
        p,
        q: problem.gradient().iter().copied().collect(),
        a,
        b,
        cones,
    }
}

fn setup_solver(data: &ConicData, settings: DefaultSettings<f64>) -> MpcResult<DefaultSolver<f64>> {
    DefaultSolver::new(&data.p, &data.q, &data.a, &data.b, &data.cones, settings)
        .map_err(|e| MpcError::Solver(format!("clarabel rejected the problem data: {}", e)))
}

impl QpSolver for ClarabelSolver {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn solve(&mut self, problem: &QuadraticProgram) -> MpcResult<QpSolution> {
        if let Some((index, c)) = problem.find_empty_row() {
            return Err(MpcError::Infeasible(format!(
                "constraint row {} has empty interval [{}, {}]",
                index, c.lower, c.upper
            )));
        }

        let data = to_conic_form(problem);
        let settings = self.build_settings()?;
        let mut solver = setup_solver(&data, settings)?;
        solver.solve();

        let status = &solver.solution.status;
        let iterations = solver.solution.iterations as usize;
        debug!("clarabel finished with {:?} after {} iterations", status, iterations);

        match status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                let primal = solver.solution.x.clone();
                let objective = problem.objective_value(&primal);
                Ok(QpSolution { primal, objective, iterations })
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Err(MpcError::Infeasible(format!("clarabel reported {:?}", status)))
            }
            other => Err(MpcError::Solver(format!(
                "clarabel reported {:?} after {} iterations",
                other, iterations
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_box_constrained_minimum() {
        // min (z0 - 2)^2 + (z1 + 1)^2, 0 <= z <= 1  ->  (1, 0)
        let mut qp = QuadraticProgram::new(2);
        qp.add_squared_error(0, 1.0, 2.0);
        qp.add_squared_error(1, 1.0, -1.0);
        qp.add_bounds(0, 0.0, 1.0);
        qp.add_bounds(1, 0.0, 1.0);

        let sol = ClarabelSolver::default().solve(&qp).unwrap();
        assert_abs_diff_eq!(sol.primal[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sol.primal[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sol.objective, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_equality_constrained_minimum() {
        // min z0^2 + z1^2 s.t. z0 + z1 = 1  ->  (0.5, 0.5)
        let mut qp = QuadraticProgram::new(2);
        qp.add_squared_error(0, 1.0, 0.0);
        qp.add_squared_error(1, 1.0, 0.0);
        qp.add_equality(vec![(0, 1.0), (1, 1.0)], 1.0);

        let sol = ClarabelSolver::default().solve(&qp).unwrap();
        assert_abs_diff_eq!(sol.primal[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(sol.primal[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_conflicting_constraints_are_infeasible() {
        let mut qp = QuadraticProgram::new(2);
        qp.add_squared_error(0, 1.0, 0.0);
        qp.add_squared_error(1, 1.0, 0.0);
        qp.add_equality(vec![(0, 1.0), (1, 1.0)], 1.0);
        qp.add_bounds(0, 0.0, 0.2);
        qp.add_bounds(1, 0.0, 0.2);

        let result = ClarabelSolver::default().solve(&qp);
        assert!(matches!(result, Err(MpcError::Infeasible(_))), "got {:?}", result);
    }

    #[test]
    fn test_inverted_bounds_are_infeasible() {
        let mut qp = QuadraticProgram::new(1);
        qp.add_squared_error(0, 1.0, 0.0);
        qp.add_bounds(0, 1.0, 0.0);
        let result = ClarabelSolver::default().solve(&qp);
        assert!(matches!(result, Err(MpcError::Infeasible(_))));
    }

    #[test]
    fn test_mismatched_conic_data_is_solver_error() {
        let mut qp = QuadraticProgram::new(2);
        qp.add_squared_error(0, 1.0, 0.0);
        qp.add_bounds(0, 0.0, 1.0);
        let mut data = to_conic_form(&qp);
        data.b.push(1.0);
        let settings = ClarabelSolver::default().build_settings().unwrap();
        assert!(matches!(setup_solver(&data, settings), Err(MpcError::Solver(_))));
    }

    #[test]
    fn test_conic_layout() {
        let mut qp = QuadraticProgram::new(2);
        qp.add_squared_error(0, 1.0, 0.0);
        qp.add_bounds(0, 0.0, f64::INFINITY);
        qp.add_equality(vec![(1, 1.0)], 3.0);
        let data = to_conic_form(&qp);
        // one equality row, one finite inequality side
        assert_eq!(data.b, vec![3.0, -0.0]);
        assert_eq!(data.cones.len(), 2);
        assert_eq!(data.a.m, 2);
        assert_eq!(data.a.n, 2);
    }
}
