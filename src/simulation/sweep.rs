//! Independent runs executed in parallel
//!
//! Each run owns its controller, solver and history; only the
//! configurations are shared, read-only.

use log::info;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;

use crate::common::{MpcError, MpcResult, QpSolver, State};
use crate::control::MpcConfig;
use crate::simulation::driver::{Simulation, SimulationReport};

/// Run every configuration on the rayon pool, one fresh solver per run.
///
/// Results keep the order of `configs`. A configuration rejected by
/// validation yields `Err` without affecting the other runs.
pub fn run_sweep<S, F>(configs: &[MpcConfig], make_solver: F) -> Vec<MpcResult<SimulationReport>>
where
    S: QpSolver,
    F: Fn() -> S + Sync,
{
    info!("sweeping {} configurations", configs.len());
    configs
        .par_iter()
        .map(|config| -> MpcResult<SimulationReport> {
            let mut sim = Simulation::new(config.clone(), make_solver())?;
            Ok(sim.run())
        })
        .collect()
}

/// Initial states drawn uniformly from the configured state box
pub fn sample_initial_states<R: Rng + ?Sized>(
    config: &MpcConfig,
    count: usize,
    rng: &mut R,
) -> MpcResult<Vec<State>> {
    let b = &config.state_bounds;
    if !b.x1.is_valid() || !b.x2.is_valid() {
        return Err(MpcError::InvalidParameter(
            "cannot sample from an empty or unbounded state box".to_string(),
        ));
    }
    let x1 = Uniform::new_inclusive(b.x1.min, b.x1.max);
    let x2 = Uniform::new_inclusive(b.x2.min, b.x2.max);
    Ok((0..count)
        .map(|_| State::new(x1.sample(rng), x2.sample(rng)))
        .collect())
}

/// One configuration per sampled initial state
pub fn monte_carlo_configs<R: Rng + ?Sized>(
    base: &MpcConfig,
    count: usize,
    rng: &mut R,
) -> MpcResult<Vec<MpcConfig>> {
    Ok(sample_initial_states(base, count, rng)?
        .into_iter()
        .map(|initial_state| MpcConfig { initial_state, ..base.clone() })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Interval;
    use crate::optim::ClarabelSolver;
    use crate::simulation::driver::RunStatus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_samples_stay_in_bounds() {
        let config = MpcConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let states = sample_initial_states(&config, 200, &mut rng).unwrap();
        assert_eq!(states.len(), 200);
        for s in &states {
            assert!(config.state_bounds.contains(s, 0.0), "{:?}", s);
        }
    }

    #[test]
    fn test_sampling_is_seeded() {
        let config = MpcConfig::default();
        let a = sample_initial_states(&config, 5, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = sample_initial_states(&config, 5, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sampling_rejects_empty_box() {
        let mut config = MpcConfig::default();
        config.state_bounds.x1 = Interval::new(1.0, 0.0);
        let result = sample_initial_states(&config, 3, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(MpcError::InvalidParameter(_))));
    }

    #[test]
    fn test_sweep_matches_sequential_runs() {
        let base = MpcConfig { sim_steps: 5, ..MpcConfig::default() };
        let configs = monte_carlo_configs(&base, 4, &mut StdRng::seed_from_u64(3)).unwrap();

        let reports = run_sweep(&configs, ClarabelSolver::default);
        assert_eq!(reports.len(), 4);
        for (config, report) in configs.iter().zip(reports) {
            let report = report.unwrap();
            assert!(report.is_completed());
            assert_eq!(report.history.states()[0], config.initial_state);

            let mut sim = Simulation::new(config.clone(), ClarabelSolver::default()).unwrap();
            let sequential = sim.run().into_result().unwrap();
            assert_eq!(report.history, sequential);
        }
    }

    #[test]
    fn test_invalid_config_does_not_stop_sweep() {
        let mut bad = MpcConfig { sim_steps: 3, ..MpcConfig::default() };
        bad.control_bounds.u1 = Interval::new(1.0, 0.0);
        let good = MpcConfig { sim_steps: 3, ..MpcConfig::default() };

        let reports = run_sweep(&[bad, good], ClarabelSolver::default);
        assert!(reports[0].is_err());
        let report = reports[1].as_ref().unwrap();
        assert!(matches!(report.status, RunStatus::Completed));
    }
}
