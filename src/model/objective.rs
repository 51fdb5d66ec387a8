//! Filtered objective recurrence
//!
//! `o' = 0.9 * o + 0.1 * (x1 + x2 + u1 + u2)`. The horizon problem and the
//! real plant update share these constants.

use crate::common::{Control, State};

/// Weight on the previous filtered value
pub const OBJECTIVE_SMOOTHING: f64 = 0.9;
/// Weight on the current state-plus-control sum
pub const OBJECTIVE_INPUT_GAIN: f64 = 0.1;

/// One step of the exponential filter
pub fn filtered_objective_update(previous: f64, state: &State, control: &Control) -> f64 {
    OBJECTIVE_SMOOTHING * previous + OBJECTIVE_INPUT_GAIN * (state.x1 + state.x2 + control.u1 + control.u2)
}

/// Fixed point of the filter for a constant state and control
pub fn steady_state_objective(state: &State, control: &Control) -> f64 {
    OBJECTIVE_INPUT_GAIN * (state.sum() + control.sum()) / (1.0 - OBJECTIVE_SMOOTHING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_blends_previous_and_input() {
        let o = filtered_objective_update(1.0, &State::new(0.5, 0.5), &Control::new(0.5, 0.5));
        assert!((o - (0.9 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_filter_converges_to_fixed_point() {
        let x = State::new(0.4, 0.2);
        let u = Control::new(0.1, 0.0);
        let mut o = 0.0;
        for _ in 0..400 {
            o = filtered_objective_update(o, &x, &u);
        }
        assert!((o - steady_state_objective(&x, &u)).abs() < 1e-9);
    }
}
