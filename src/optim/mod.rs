//! Quadratic programming layer
//!
//! `QuadraticProgram` is the solver-agnostic problem description; the
//! backends implement `common::QpSolver` on top of it.

pub mod admm;
pub mod clarabel_backend;
pub mod qp;

pub use admm::{AdmmSettings, AdmmSolver};
pub use clarabel_backend::ClarabelSolver;
pub use qp::{LinearConstraint, QpSolution, QuadraticProgram, SolverSettings};
