//! Receding-horizon control
//!
//! Run configuration, the horizon problem builder and the MPC controller
//! that ties them to a QP backend.

pub mod config;
pub mod horizon;
pub mod mpc_control;

pub use config::MpcConfig;
pub use horizon::{HorizonLayout, HorizonProblem, HorizonProblemBuilder};
pub use mpc_control::{ControllerPhase, RecedingHorizonController, StepOutcome};
