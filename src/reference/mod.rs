//! Reference trajectory generation

pub mod signal;
pub mod trajectory;

pub use signal::ReferenceSignal;
pub use trajectory::{ReferenceConfig, ReferenceTrajectory};
