//! Plant model: linear dynamics and the filtered objective recurrence

pub mod dynamics;
pub mod objective;

pub use dynamics::LinearDynamics;
pub use objective::{
    filtered_objective_update, steady_state_objective, OBJECTIVE_INPUT_GAIN, OBJECTIVE_SMOOTHING,
};
