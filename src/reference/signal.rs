//! Closed-form reference signals indexed by absolute step

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Target signal for one state channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceSignal {
    /// Same value at every step
    Constant { value: f64 },
    /// `offset + amplitude * sin(frequency * k + phase)`
    Sinusoid {
        offset: f64,
        amplitude: f64,
        frequency: f64,
        #[serde(default)]
        phase: f64,
    },
}

impl ReferenceSignal {
    pub fn constant(value: f64) -> Self {
        ReferenceSignal::Constant { value }
    }

    pub fn sine(offset: f64, amplitude: f64, frequency: f64) -> Self {
        ReferenceSignal::Sinusoid { offset, amplitude, frequency, phase: 0.0 }
    }

    pub fn cosine(offset: f64, amplitude: f64, frequency: f64) -> Self {
        ReferenceSignal::Sinusoid { offset, amplitude, frequency, phase: FRAC_PI_2 }
    }

    /// Value at absolute step `k`
    pub fn sample(&self, k: usize) -> f64 {
        match *self {
            ReferenceSignal::Constant { value } => value,
            ReferenceSignal::Sinusoid { offset, amplitude, frequency, phase } => {
                offset + amplitude * (frequency * k as f64 + phase).sin()
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            ReferenceSignal::Constant { value } => value.is_finite(),
            ReferenceSignal::Sinusoid { offset, amplitude, frequency, phase } => {
                offset.is_finite() && amplitude.is_finite() && frequency.is_finite() && phase.is_finite()
            }
        }
    }
}
