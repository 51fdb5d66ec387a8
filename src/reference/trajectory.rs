//! Precomputed reference trajectory with a rolling look-ahead window

use serde::{Deserialize, Serialize};

use crate::common::{MpcError, MpcResult, ReferencePoint};
use crate::reference::signal::ReferenceSignal;

/// Reference signal per state channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub x1: ReferenceSignal,
    pub x2: ReferenceSignal,
}

impl ReferenceConfig {
    pub fn constant(x1: f64, x2: f64) -> Self {
        Self {
            x1: ReferenceSignal::constant(x1),
            x2: ReferenceSignal::constant(x2),
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            x1: ReferenceSignal::sine(1.0, 0.5, 0.1),
            x2: ReferenceSignal::cosine(0.8, 0.3, 0.1),
        }
    }
}

/// Finite reference sequence, generated once and read-only afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTrajectory {
    points: Vec<ReferencePoint>,
}

impl ReferenceTrajectory {
    /// Sample both signals over `0..len`
    pub fn generate(config: &ReferenceConfig, len: usize) -> Self {
        let points = (0..len)
            .map(|k| ReferencePoint::new(config.x1.sample(k), config.x2.sample(k)))
            .collect();
        ReferenceTrajectory { points }
    }

    pub fn from_points(points: Vec<ReferencePoint>) -> Self {
        ReferenceTrajectory { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, k: usize) -> Option<&ReferencePoint> {
        self.points.get(k)
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// The `horizon + 1` points `[t, t + horizon]` seen by the optimizer at step `t`
    pub fn window(&self, t: usize, horizon: usize) -> MpcResult<&[ReferencePoint]> {
        let end = t + horizon + 1;
        if end > self.points.len() {
            return Err(MpcError::InvalidParameter(format!(
                "reference window [{}, {}] exceeds trajectory length {}",
                t,
                t + horizon,
                self.points.len()
            )));
        }
        Ok(&self.points[t..end])
    }

    pub fn x1_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x1).collect()
    }

    pub fn x2_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x2).collect()
    }
}
