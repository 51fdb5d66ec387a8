//! Run configuration for the receding-horizon controller
//!
//! Every field has a default, so a TOML file only needs to name what it
//! changes. `validate` is called once before any step is simulated.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{
    ControlBounds, DynamicsCoefficients, Interval, MpcError, MpcResult, State, StateBounds, Weights,
};
use crate::optim::SolverSettings;
use crate::reference::ReferenceConfig;

fn default_horizon() -> usize {
    10
}

fn default_sim_steps() -> usize {
    50
}

fn default_initial_state() -> State {
    State::new(0.5, 0.3)
}

/// Configuration of one closed-loop run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcConfig {
    /// Prediction horizon N
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Number of closed-loop steps
    #[serde(default = "default_sim_steps")]
    pub sim_steps: usize,
    #[serde(default)]
    pub state_bounds: StateBounds,
    #[serde(default)]
    pub control_bounds: ControlBounds,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub dynamics: DynamicsCoefficients,
    #[serde(default = "default_initial_state")]
    pub initial_state: State,
    #[serde(default)]
    pub initial_objective: f64,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub solver: SolverSettings,
    /// Seed each solve with the previous solution shifted by one step
    #[serde(default)]
    pub warm_start: bool,
}

impl Default for MpcConfig {
    fn default() -> Self {
        MpcConfig {
            horizon: default_horizon(),
            sim_steps: default_sim_steps(),
            state_bounds: StateBounds::default(),
            control_bounds: ControlBounds::default(),
            weights: Weights::default(),
            dynamics: DynamicsCoefficients::default(),
            initial_state: default_initial_state(),
            initial_objective: 0.0,
            reference: ReferenceConfig::default(),
            solver: SolverSettings::default(),
            warm_start: false,
        }
    }
}

fn check_interval(name: &str, interval: &Interval) -> MpcResult<()> {
    if interval.is_valid() {
        Ok(())
    } else {
        Err(MpcError::Configuration(format!(
            "{} bounds [{}, {}] must be finite with min <= max",
            name, interval.min, interval.max
        )))
    }
}

impl MpcConfig {
    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(text: &str) -> MpcResult<Self> {
        let config: MpcConfig = toml::from_str(text)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> MpcResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reference points needed to cover every horizon window of the run
    pub fn reference_len(&self) -> usize {
        self.sim_steps + self.horizon + 1
    }

    pub fn validate(&self) -> MpcResult<()> {
        if self.horizon == 0 {
            return Err(MpcError::Configuration("horizon must be at least 1".to_string()));
        }
        if self.sim_steps == 0 {
            return Err(MpcError::Configuration("sim_steps must be at least 1".to_string()));
        }

        check_interval("x1", &self.state_bounds.x1)?;
        check_interval("x2", &self.state_bounds.x2)?;
        check_interval("u1", &self.control_bounds.u1)?;
        check_interval("u2", &self.control_bounds.u2)?;

        for (name, w) in ["q1", "q2", "r1", "r2"].iter().zip(self.weights.as_array()) {
            if !(w.is_finite() && w > 0.0) {
                return Err(MpcError::Configuration(format!(
                    "weight {} must be positive and finite, got {}",
                    name, w
                )));
            }
        }

        if self.dynamics.as_array().iter().any(|c| !c.is_finite()) {
            return Err(MpcError::Configuration(
                "dynamics coefficients must be finite".to_string(),
            ));
        }
        if !self.initial_state.is_finite() || !self.initial_objective.is_finite() {
            return Err(MpcError::Configuration(
                "initial state and objective must be finite".to_string(),
            ));
        }
        if !self.reference.x1.is_finite() || !self.reference.x2.is_finite() {
            return Err(MpcError::Configuration(
                "reference signal parameters must be finite".to_string(),
            ));
        }
        if let Some(limit) = self.solver.time_limit {
            if limit.is_nan() || limit <= 0.0 {
                return Err(MpcError::Configuration(format!(
                    "solver time limit must be positive, got {}",
                    limit
                )));
            }
        }
        if self.solver.max_iterations == 0 {
            return Err(MpcError::Configuration(
                "solver max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
