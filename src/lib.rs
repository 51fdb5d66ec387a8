//! opera_mpc - receding-horizon model predictive control
//!
//! This crate runs a constrained MPC loop on a two-state, two-input linear
//! plant whose extended state carries a recursively filtered objective.
//! Every step solves a finite-horizon quadratic program through a pluggable
//! backend, applies the first control and advances the plant.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod model;
pub mod reference;
pub mod optim;
pub mod control;
pub mod simulation;

// Re-export common types for convenience
pub use common::{Control, PlantState, ReferencePoint, State};
pub use common::{ControlBounds, DynamicsCoefficients, Interval, StateBounds, Weights};
pub use common::{Controller, QpSolver};
pub use common::{MpcError, MpcResult};
pub use control::{MpcConfig, RecedingHorizonController};
pub use optim::{AdmmSolver, ClarabelSolver};
pub use simulation::{History, Simulation, SimulationReport};
