//! Common types, traits, and error definitions for opera_mpc
//!
//! This module provides the foundational building blocks shared by the
//! model, the optimizer backends, the controller and the simulation driver.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
