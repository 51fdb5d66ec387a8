//
// Receding-horizon MPC demo
//
// usage: opera_mpc [config.toml] [--admm]
//
// Runs the closed loop with the configured (or default) parameters, logs a
// summary and writes state, control and objective charts to img/opera_mpc/.
//

use std::env;
use std::path::Path;
use std::process;

use log::{error, info, warn};

use opera_mpc::optim::AdmmSettings;
use opera_mpc::simulation::{RunMetrics, RunStatus};
use opera_mpc::utils::save_history_charts;
use opera_mpc::{AdmmSolver, ClarabelSolver, MpcConfig, MpcResult, QpSolver, Simulation};

const IMG_DIR: &str = "img/opera_mpc";

fn run_with<S: QpSolver>(config: MpcConfig, solver: S) -> MpcResult<()> {
    let mut sim = Simulation::new(config, solver)?;
    let report = sim.run();
    let config = sim.config();

    let metrics = RunMetrics::compute(
        &report.history,
        &report.reference,
        &config.state_bounds,
        &config.control_bounds,
    );
    info!(
        "{} steps, tracking error mean {:.4} / final {:.4}, max bound violation {:.2e}",
        metrics.steps, metrics.mean_tracking_error, metrics.final_tracking_error, metrics.max_violation
    );
    let last = report.history.last();
    println!(
        "final state: x1={:.4}, x2={:.4}, objective={:.4}",
        last.state.x1, last.state.x2, last.objective
    );

    if let Err(e) = save_history_charts(
        Path::new(IMG_DIR),
        &report.history,
        &report.reference,
        &config.state_bounds,
        &config.control_bounds,
    ) {
        warn!("could not write charts: {}", e);
    } else {
        info!("charts written to {}", IMG_DIR);
    }

    match report.status {
        RunStatus::Failed { at_step, error } => {
            error!("run failed at step {}", at_step);
            Err(error)
        }
        RunStatus::Cancelled { at_step } => {
            warn!("run cancelled at step {}", at_step);
            Ok(())
        }
        RunStatus::Completed => Ok(()),
    }
}

fn run() -> MpcResult<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let use_admm = args.iter().any(|a| a == "--admm");
    let config = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => {
            info!("loading configuration from {}", path);
            MpcConfig::from_file(path)?
        }
        None => MpcConfig::default(),
    };

    if use_admm {
        let solver = AdmmSolver::new(AdmmSettings::from(&config.solver));
        run_with(config, solver)
    } else {
        let solver = ClarabelSolver::new(config.solver);
        run_with(config, solver)
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
