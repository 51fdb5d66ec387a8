//! Closed-loop simulation: the step driver, its history, run metrics and
//! parallel sweeps

pub mod driver;
pub mod history;
pub mod metrics;
pub mod sweep;

pub use driver::{CancelToken, RunStatus, Simulation, SimulationReport};
pub use history::History;
pub use metrics::{is_non_increasing, max_bound_violation, tracking_errors, RunMetrics};
pub use sweep::{monte_carlo_configs, run_sweep, sample_initial_states};
