//! Common types used throughout opera_mpc

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Plant measurement (x1, x2) at one time step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub x1: f64,
    pub x2: f64,
}

impl State {
    pub fn new(x1: f64, x2: f64) -> Self {
        Self { x1, x2 }
    }

    pub fn origin() -> Self {
        Self { x1: 0.0, x2: 0.0 }
    }

    /// Sum of both components, the state's share of the filtered objective input
    pub fn sum(&self) -> f64 {
        self.x1 + self.x2
    }

    pub fn distance(&self, other: &State) -> f64 {
        ((self.x1 - other.x1).powi(2) + (self.x2 - other.x2).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.x2.is_finite()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x1, self.x2)
    }
}

impl From<(f64, f64)> for State {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x1: tuple.0, x2: tuple.1 }
    }
}

impl From<Vector2<f64>> for State {
    fn from(v: Vector2<f64>) -> Self {
        Self { x1: v[0], x2: v[1] }
    }
}

/// Plant input (u1, u2) applied for one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub u1: f64,
    pub u2: f64,
}

impl Control {
    pub fn new(u1: f64, u2: f64) -> Self {
        Self { u1, u2 }
    }

    pub fn zero() -> Self {
        Self { u1: 0.0, u2: 0.0 }
    }

    pub fn sum(&self) -> f64 {
        self.u1 + self.u2
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.u1, self.u2)
    }
}

impl From<Vector2<f64>> for Control {
    fn from(v: Vector2<f64>) -> Self {
        Self { u1: v[0], u2: v[1] }
    }
}

/// Extended plant state: the measured state plus the filtered objective,
/// which has memory and therefore travels with the state between steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantState {
    pub state: State,
    pub objective: f64,
}

impl PlantState {
    pub fn new(state: State, objective: f64) -> Self {
        Self { state, objective }
    }
}

/// Target values for both states at one absolute step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub x1: f64,
    pub x2: f64,
}

impl ReferencePoint {
    pub fn new(x1: f64, x2: f64) -> Self {
        Self { x1, x2 }
    }

    /// Euclidean tracking error of `state` against this point
    pub fn tracking_error(&self, state: &State) -> f64 {
        ((state.x1 - self.x1).powi(2) + (state.x2 - self.x2).powi(2)).sqrt()
    }
}

/// Closed interval [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// min <= max and both ends are finite
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.min - tolerance && value <= self.max + tolerance
    }

    /// Distance by which `value` lies outside the interval (0 inside)
    pub fn violation(&self, value: f64) -> f64 {
        (self.min - value).max(value - self.max).max(0.0)
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }
}

/// Box bounds on both states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateBounds {
    pub x1: Interval,
    pub x2: Interval,
}

impl StateBounds {
    pub fn new(x1: Interval, x2: Interval) -> Self {
        Self { x1, x2 }
    }

    pub fn contains(&self, state: &State, tolerance: f64) -> bool {
        self.x1.contains(state.x1, tolerance) && self.x2.contains(state.x2, tolerance)
    }

    pub fn violation(&self, state: &State) -> f64 {
        self.x1.violation(state.x1).max(self.x2.violation(state.x2))
    }
}

impl Default for StateBounds {
    fn default() -> Self {
        Self {
            x1: Interval::new(0.0, 2.0),
            x2: Interval::new(0.0, 1.5),
        }
    }
}

/// Box bounds on both controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBounds {
    pub u1: Interval,
    pub u2: Interval,
}

impl ControlBounds {
    pub fn new(u1: Interval, u2: Interval) -> Self {
        Self { u1, u2 }
    }

    pub fn contains(&self, control: &Control, tolerance: f64) -> bool {
        self.u1.contains(control.u1, tolerance) && self.u2.contains(control.u2, tolerance)
    }

    pub fn violation(&self, control: &Control) -> f64 {
        self.u1.violation(control.u1).max(self.u2.violation(control.u2))
    }
}

impl Default for ControlBounds {
    fn default() -> Self {
        Self {
            u1: Interval::new(0.0, 1.0),
            u2: Interval::new(0.0, 0.5),
        }
    }
}

/// Cost weights: Q on tracking error, R on control effort.
/// The filtered objective carries an implicit unit weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub q1: f64,
    pub q2: f64,
    pub r1: f64,
    pub r2: f64,
}

impl Weights {
    pub fn new(q1: f64, q2: f64, r1: f64, r2: f64) -> Self {
        Self { q1, q2, r1, r2 }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.q1, self.q2, self.r1, self.r2]
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Coefficients of the linear plant
///
/// x1' = a1*x1 + a2*x2 + b1*u1 + b2*u2
/// x2' = c1*x1 + c2*x2 + d1*u1 + d2*u2
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsCoefficients {
    pub a1: f64,
    pub a2: f64,
    pub b1: f64,
    pub b2: f64,
    pub c1: f64,
    pub c2: f64,
    pub d1: f64,
    pub d2: f64,
}

impl DynamicsCoefficients {
    pub fn as_array(&self) -> [f64; 8] {
        [self.a1, self.a2, self.b1, self.b2, self.c1, self.c2, self.d1, self.d2]
    }
}

impl Default for DynamicsCoefficients {
    fn default() -> Self {
        Self {
            a1: 0.8,
            a2: 0.1,
            b1: 0.5,
            b2: 0.2,
            c1: 0.1,
            c2: 0.7,
            d1: 0.3,
            d2: 0.4,
        }
    }
}
