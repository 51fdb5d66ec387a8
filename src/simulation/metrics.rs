//! Summary statistics of a recorded run

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::common::{ControlBounds, ReferencePoint, StateBounds};
use crate::simulation::history::History;

/// Euclidean tracking error per recorded state, aligned with `reference`
pub fn tracking_errors(history: &History, reference: &[ReferencePoint]) -> Vec<f64> {
    history
        .states()
        .iter()
        .zip(reference)
        .map(|(x, r)| r.tracking_error(x))
        .collect()
}

/// Largest distance of any recorded state or control outside its bounds
pub fn max_bound_violation(history: &History, states: &StateBounds, controls: &ControlBounds) -> f64 {
    let state_violation = history.states().iter().map(|x| OrderedFloat(states.violation(x)));
    let control_violation = history.controls().iter().map(|u| OrderedFloat(controls.violation(u)));
    state_violation
        .chain(control_violation)
        .max()
        .map_or(0.0, |v| v.into_inner())
}

/// True when no element exceeds its predecessor by more than `tolerance`
pub fn is_non_increasing(values: &[f64], tolerance: f64) -> bool {
    values.iter().tuple_windows().all(|(a, b)| *b <= *a + tolerance)
}

/// Per-run aggregates reported by the demo and by sweeps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    pub steps: usize,
    pub mean_tracking_error: f64,
    pub max_tracking_error: f64,
    pub final_tracking_error: f64,
    pub max_violation: f64,
    /// Σ (u1² + u2²) over the applied controls
    pub control_effort: f64,
}

impl RunMetrics {
    pub fn compute(
        history: &History,
        reference: &[ReferencePoint],
        states: &StateBounds,
        controls: &ControlBounds,
    ) -> Self {
        let errors = tracking_errors(history, reference);
        let mean_tracking_error = if errors.is_empty() {
            0.0
        } else {
            errors.iter().sum::<f64>() / errors.len() as f64
        };
        let max_tracking_error = errors
            .iter()
            .copied()
            .map(OrderedFloat)
            .max()
            .map_or(0.0, |v| v.into_inner());
        RunMetrics {
            steps: history.steps(),
            mean_tracking_error,
            max_tracking_error,
            final_tracking_error: errors.last().copied().unwrap_or(0.0),
            max_violation: max_bound_violation(history, states, controls),
            control_effort: history.controls().iter().map(|u| u.u1 * u.u1 + u.u2 * u.u2).sum(),
        }
    }
}
