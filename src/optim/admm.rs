//! Dense ADMM (operator splitting) QP backend
//!
//! Iterates on the splitting `x ∈ ℝⁿ, z = Ax ∈ [l, u]`:
//!
//!   x̃ ← (P + σI + AᵀRA)⁻¹ (σx − q + Aᵀ(Rz − y))
//!   x ← αx̃ + (1−α)x
//!   z ← Π[l,u](αAx̃ + (1−α)z + R⁻¹y)
//!   y ← y + R(αAx̃ + (1−α)z_prev − z)
//!
//! with a diagonal step size R (equality rows stiffer than inequalities).
//! The KKT matrix is factored once with Cholesky and refactored only when
//! the step size is rebalanced.

use std::time::{Duration, Instant};

use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::common::{MpcError, MpcResult, QpSolver};
use crate::optim::qp::{QpSolution, QuadraticProgram, SolverSettings};

/// Step size factor for rows with l = u
const EQUALITY_RHO_SCALE: f64 = 1e3;

/// ADMM iterations granted per interior-point iteration of `SolverSettings`
const ADMM_ITERATIONS_PER_IPM_ITERATION: usize = 100;

/// ADMM tuning parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AdmmSettings {
    pub rho: f64,
    pub sigma: f64,
    /// Over-relaxation in (0, 2)
    pub alpha: f64,
    pub eps_abs: f64,
    pub eps_rel: f64,
    pub eps_prim_inf: f64,
    pub max_iter: usize,
    /// Rebalance rho when one residual exceeds the other by this ratio
    pub mu: f64,
    pub tau: f64,
    pub rho_min: f64,
    pub rho_max: f64,
    /// Iterations between rho rebalancing checks; 0 disables it
    pub adapt_interval: usize,
    pub time_limit: Option<Duration>,
}

impl Default for AdmmSettings {
    fn default() -> Self {
        AdmmSettings {
            rho: 0.1,
            sigma: 1e-6,
            alpha: 1.6,
            eps_abs: 1e-9,
            eps_rel: 1e-9,
            eps_prim_inf: 1e-6,
            max_iter: 20_000,
            mu: 10.0,
            tau: 5.0,
            rho_min: 1e-6,
            rho_max: 1e6,
            adapt_interval: 25,
            time_limit: None,
        }
    }
}

impl From<&SolverSettings> for AdmmSettings {
    /// Limits and tolerance from the shared solver section
    fn from(settings: &SolverSettings) -> Self {
        AdmmSettings {
            eps_abs: settings.tolerance,
            eps_rel: settings.tolerance,
            max_iter: settings.max_iterations as usize * ADMM_ITERATIONS_PER_IPM_ITERATION,
            time_limit: settings.time_limit.and_then(|t| Duration::try_from_secs_f64(t).ok()),
            ..AdmmSettings::default()
        }
    }
}

/// QP backend running ADMM on dense nalgebra matrices
#[derive(Debug, Clone, Default)]
pub struct AdmmSolver {
    pub settings: AdmmSettings,
    warm_start: Option<Vec<f64>>,
}

fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

impl AdmmSolver {
    pub fn new(settings: AdmmSettings) -> Self {
        AdmmSolver { settings, warm_start: None }
    }

    fn factor(
        p: &DMatrix<f64>,
        a: &DMatrix<f64>,
        rho: &DVector<f64>,
        sigma: f64,
    ) -> MpcResult<Cholesky<f64, Dyn>> {
        let n = p.nrows();
        let mut kkt = p + DMatrix::<f64>::identity(n, n) * sigma;
        let mut ra = a.clone();
        for (i, mut row) in ra.row_iter_mut().enumerate() {
            row *= rho[i];
        }
        kkt += a.transpose() * ra;
        Cholesky::new(kkt)
            .ok_or_else(|| MpcError::Solver("ADMM KKT matrix is not positive definite".to_string()))
    }

    fn row_rho(&self, problem: &QuadraticProgram, scale: f64) -> DVector<f64> {
        let rho = (self.settings.rho * scale).clamp(self.settings.rho_min, self.settings.rho_max);
        DVector::from_iterator(
            problem.num_constraints(),
            problem.constraints().iter().map(|c| {
                if c.is_equality() {
                    rho * EQUALITY_RHO_SCALE
                } else if c.lower.is_infinite() && c.upper.is_infinite() {
                    self.settings.rho_min
                } else {
                    rho
                }
            }),
        )
    }
}

/// Support function test of the primal infeasibility certificate:
/// uᵀmax(δy, 0) + lᵀmin(δy, 0) < -eps·‖δy‖
fn certifies_infeasibility(
    dy: &DVector<f64>,
    a_t_dy: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    eps: f64,
) -> bool {
    let norm_dy = inf_norm(dy);
    if norm_dy <= eps || inf_norm(a_t_dy) > eps * norm_dy {
        return false;
    }
    let mut support = 0.0;
    for i in 0..dy.len() {
        if dy[i] > 0.0 {
            if upper[i].is_infinite() {
                return false;
            }
            support += upper[i] * dy[i];
        } else if dy[i] < 0.0 {
            if lower[i].is_infinite() {
                return false;
            }
            support += lower[i] * dy[i];
        }
    }
    support < -eps * norm_dy
}

impl QpSolver for AdmmSolver {
    fn name(&self) -> &str {
        "admm"
    }

    fn warm_start(&mut self, primal: &[f64]) {
        self.warm_start = Some(primal.to_vec());
    }

    fn solve(&mut self, problem: &QuadraticProgram) -> MpcResult<QpSolution> {
        if let Some((index, c)) = problem.find_empty_row() {
            return Err(MpcError::Infeasible(format!(
                "constraint row {} has empty interval [{}, {}]",
                index, c.lower, c.upper
            )));
        }

        let started = Instant::now();
        let s = self.settings.clone();
        let n = problem.num_variables();
        let p = problem.hessian();
        let q = problem.gradient();
        let a = problem.constraint_matrix();
        let a_t = a.transpose();
        let lower = problem.lower_bounds();
        let upper = problem.upper_bounds();

        let mut x = match self.warm_start.take() {
            Some(seed) if seed.len() == n => DVector::from_vec(seed),
            Some(seed) => {
                warn!("ignoring warm start of length {} for {} variables", seed.len(), n);
                DVector::zeros(n)
            }
            None => DVector::zeros(n),
        };
        let mut z = (&a * &x).zip_zip_map(&lower, &upper, |v, l, u| v.max(l).min(u));
        let mut y = DVector::<f64>::zeros(a.nrows());

        let mut rho_scale = 1.0;
        let mut rho = self.row_rho(problem, rho_scale);
        let mut kkt = Self::factor(p, &a, &rho, s.sigma)?;

        for iter in 1..=s.max_iter {
            let rhs = &x * s.sigma - q + &a_t * (rho.component_mul(&z) - &y);
            let x_tilde = kkt.solve(&rhs);
            let z_tilde = &a * &x_tilde;

            let x_next = &x_tilde * s.alpha + &x * (1.0 - s.alpha);
            let z_relaxed = &z_tilde * s.alpha + &z * (1.0 - s.alpha);
            let z_next = (&z_relaxed + y.component_div(&rho))
                .zip_zip_map(&lower, &upper, |v, l, u| v.max(l).min(u));
            let dy = rho.component_mul(&(&z_relaxed - &z_next));

            y += &dy;
            x = x_next;
            z = z_next;

            let ax = &a * &x;
            let px = p * &x;
            let a_t_y = &a_t * &y;
            let r_prim = inf_norm(&(&ax - &z));
            let r_dual = inf_norm(&(&px + q + &a_t_y));
            let eps_prim = s.eps_abs + s.eps_rel * inf_norm(&ax).max(inf_norm(&z));
            let eps_dual = s.eps_abs
                + s.eps_rel * inf_norm(&px).max(inf_norm(&a_t_y)).max(inf_norm(q));

            if r_prim <= eps_prim && r_dual <= eps_dual {
                debug!("admm converged after {} iterations", iter);
                let primal: Vec<f64> = x.iter().copied().collect();
                let objective = problem.objective_value(&primal);
                return Ok(QpSolution { primal, objective, iterations: iter });
            }

            if certifies_infeasibility(&dy, &(&a_t * &dy), &lower, &upper, s.eps_prim_inf) {
                return Err(MpcError::Infeasible(format!(
                    "admm found a primal infeasibility certificate after {} iterations",
                    iter
                )));
            }

            if let Some(limit) = s.time_limit {
                if started.elapsed() > limit {
                    return Err(MpcError::Solver(format!(
                        "admm exceeded its time limit after {} iterations",
                        iter
                    )));
                }
            }

            if s.adapt_interval > 0 && iter % s.adapt_interval == 0 {
                let factor = if r_prim > s.mu * r_dual {
                    s.tau
                } else if r_dual > s.mu * r_prim {
                    1.0 / s.tau
                } else {
                    1.0
                };
                let scaled = (s.rho * rho_scale * factor).clamp(s.rho_min, s.rho_max);
                if factor != 1.0 && scaled != s.rho * rho_scale {
                    rho_scale = scaled / s.rho;
                    rho = self.row_rho(problem, rho_scale);
                    kkt = Self::factor(p, &a, &rho, s.sigma)?;
                }
            }
        }

        Err(MpcError::Solver(format!(
            "admm reached the iteration limit ({})",
            s.max_iter
        )))
    }
}
