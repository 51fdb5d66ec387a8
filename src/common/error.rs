//! Error types for opera_mpc

use thiserror::Error;

/// Main error type for the MPC loop and its collaborators
#[derive(Debug, Error)]
pub enum MpcError {
    /// Rejected configuration (inverted bounds, zero horizon, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The optimizer proved the constraint set empty
    #[error("Infeasible problem: {0}")]
    Infeasible(String),
    /// Numerical failure, iteration/time limit or unboundedness
    #[error("Solver error: {0}")]
    Solver(String),
    /// Invalid parameter passed to an API
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed TOML configuration
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    /// Visualization error
    #[error("Visualization error: {0}")]
    Visualization(String),
}

impl MpcError {
    /// True for the per-step failures the optimizer can report
    pub fn is_solve_failure(&self) -> bool {
        matches!(self, MpcError::Infeasible(_) | MpcError::Solver(_))
    }
}

/// Result type alias for MPC operations
pub type MpcResult<T> = Result<T, MpcError>;
