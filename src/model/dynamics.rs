//
// Two-state, two-input linear plant
//

use nalgebra::{Matrix2, Vector2};

use crate::common::{Control, DynamicsCoefficients, State};

/// Discrete linear plant `x' = A x + B u`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDynamics {
    coeffs: DynamicsCoefficients,
}

impl LinearDynamics {
    pub fn new(coeffs: DynamicsCoefficients) -> Self {
        LinearDynamics { coeffs }
    }

    pub fn coefficients(&self) -> &DynamicsCoefficients {
        &self.coeffs
    }

    /// Advance the plant by one step
    pub fn step(&self, state: &State, control: &Control) -> State {
        let c = &self.coeffs;
        State::new(
            c.a1 * state.x1 + c.a2 * state.x2 + c.b1 * control.u1 + c.b2 * control.u2,
            c.c1 * state.x1 + c.c2 * state.x2 + c.d1 * control.u1 + c.d2 * control.u2,
        )
    }

    /// Open-loop rollout of a control sequence, initial state included
    pub fn rollout(&self, initial: &State, controls: &[Control]) -> Vec<State> {
        let mut states = Vec::with_capacity(controls.len() + 1);
        let mut x = *initial;
        states.push(x);
        for u in controls {
            x = self.step(&x, u);
            states.push(x);
        }
        states
    }

    pub fn get_model_matrix(&self) -> (Matrix2<f64>, Matrix2<f64>) {
        let c = &self.coeffs;
        let a = Matrix2::new(
            c.a1, c.a2,
            c.c1, c.c2,
        );
        let b = Matrix2::new(
            c.b1, c.b2,
            c.d1, c.d2,
        );
        (a, b)
    }

    /// Largest eigenvalue magnitude of A; below 1 means open-loop stable
    pub fn spectral_radius(&self) -> f64 {
        let (a, _) = self.get_model_matrix();
        // Eigenvalues of a 2x2 from trace and determinant
        let tr = a.trace();
        let det = a.determinant();
        let disc = tr * tr / 4.0 - det;
        if disc >= 0.0 {
            let root = disc.sqrt();
            (tr / 2.0 + root).abs().max((tr / 2.0 - root).abs())
        } else {
            det.abs().sqrt()
        }
    }

    /// Constant input holding the plant at `target`, i.e. solves
    /// `(I - A) x = B u`. None when B is singular.
    pub fn steady_state_input(&self, target: &State) -> Option<Control> {
        let (a, b) = self.get_model_matrix();
        let rhs = (Matrix2::identity() - a) * target.to_vector();
        let b_inv = b.try_inverse()?;
        let u: Vector2<f64> = b_inv * rhs;
        Some(Control::from(u))
    }
}

impl Default for LinearDynamics {
    fn default() -> Self {
        Self::new(DynamicsCoefficients::default())
    }
}
