//! Quadratic program representation shared by all backends
//!
//! minimize    ½ zᵀ P z + qᵀ z + c
//! subject to  l_i ≤ a_iᵀ z ≤ u_i   for every constraint row i
//!
//! Equalities are rows with `l_i == u_i`; single-variable rows express box
//! bounds. P is kept dense and symmetric, rows are kept sparse.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// One linear constraint row `lower ≤ Σ coeff·z[index] ≤ upper`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(usize, f64)>,
    pub lower: f64,
    pub upper: f64,
}

impl LinearConstraint {
    pub fn new(terms: Vec<(usize, f64)>, lower: f64, upper: f64) -> Self {
        Self { terms, lower, upper }
    }

    pub fn equality(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { terms, lower: rhs, upper: rhs }
    }

    pub fn bounds(index: usize, lower: f64, upper: f64) -> Self {
        Self { terms: vec![(index, 1.0)], lower, upper }
    }

    pub fn is_equality(&self) -> bool {
        self.lower == self.upper
    }

    /// Row value `a_iᵀ z`
    pub fn evaluate(&self, z: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, a)| a * z[i]).sum()
    }

    /// Distance of the row value from `[lower, upper]`; infinite when the
    /// interval itself is empty.
    pub fn violation(&self, z: &[f64]) -> f64 {
        if self.lower > self.upper {
            return f64::INFINITY;
        }
        let v = self.evaluate(z);
        (self.lower - v).max(v - self.upper).max(0.0)
    }
}

/// Dense-cost, sparse-row convex QP
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticProgram {
    hessian: DMatrix<f64>,
    gradient: DVector<f64>,
    constant: f64,
    constraints: Vec<LinearConstraint>,
}

impl QuadraticProgram {
    /// Empty problem over `n` free variables with zero cost
    pub fn new(n: usize) -> Self {
        QuadraticProgram {
            hessian: DMatrix::zeros(n, n),
            gradient: DVector::zeros(n),
            constant: 0.0,
            constraints: Vec::new(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.gradient.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn hessian(&self) -> &DMatrix<f64> {
        &self.hessian
    }

    pub fn gradient(&self) -> &DVector<f64> {
        &self.gradient
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Add `weight * (z[index] - target)²` to the cost
    pub fn add_squared_error(&mut self, index: usize, weight: f64, target: f64) {
        assert!(index < self.num_variables(), "variable index {} out of range", index);
        self.hessian[(index, index)] += 2.0 * weight;
        self.gradient[index] -= 2.0 * weight * target;
        self.constant += weight * target * target;
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        let n = self.num_variables();
        assert!(
            constraint.terms.iter().all(|&(i, _)| i < n),
            "constraint references a variable outside 0..{}",
            n
        );
        self.constraints.push(constraint);
    }

    pub fn add_equality(&mut self, terms: Vec<(usize, f64)>, rhs: f64) {
        self.add_constraint(LinearConstraint::equality(terms, rhs));
    }

    pub fn add_bounds(&mut self, index: usize, lower: f64, upper: f64) {
        self.add_constraint(LinearConstraint::bounds(index, lower, upper));
    }

    pub fn num_equalities(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_equality()).count()
    }

    /// Cost at `z`, constant term included
    pub fn objective_value(&self, z: &[f64]) -> f64 {
        let zv = DVector::from_column_slice(z);
        0.5 * zv.dot(&(&self.hessian * &zv)) + self.gradient.dot(&zv) + self.constant
    }

    /// Largest constraint violation at `z`
    pub fn max_violation(&self, z: &[f64]) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.violation(z))
            .fold(0.0, f64::max)
    }

    /// First row whose interval is empty, if any
    pub fn find_empty_row(&self) -> Option<(usize, &LinearConstraint)> {
        self.constraints
            .iter()
            .enumerate()
            .find(|(_, c)| c.lower > c.upper || c.lower.is_nan() || c.upper.is_nan())
    }

    /// Dense constraint matrix with one row per constraint
    pub fn constraint_matrix(&self) -> DMatrix<f64> {
        let mut a = DMatrix::zeros(self.constraints.len(), self.num_variables());
        for (row, c) in self.constraints.iter().enumerate() {
            for &(col, coeff) in &c.terms {
                a[(row, col)] += coeff;
            }
        }
        a
    }

    pub fn lower_bounds(&self) -> DVector<f64> {
        DVector::from_iterator(self.constraints.len(), self.constraints.iter().map(|c| c.lower))
    }

    pub fn upper_bounds(&self) -> DVector<f64> {
        DVector::from_iterator(self.constraints.len(), self.constraints.iter().map(|c| c.upper))
    }
}

/// Optimal point returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    pub primal: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

fn default_max_iterations() -> u32 {
    200
}

fn default_tolerance() -> f64 {
    1e-8
}

/// Limits handed to a backend so a solve cannot hang
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Wall-clock budget per solve in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Feasibility and optimality-gap tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            time_limit: None,
            tolerance: default_tolerance(),
        }
    }
}
