#![allow(non_snake_case)]
//! Interactive dataset generation run: prompt for the data split, solve the
//! configured number of BVP samples and persist the converged trajectories.

use RustedPMPGen::Utils::console::int_input;
use RustedPMPGen::Utils::csv_export::{buffer_headers, save_trajectory_csv};
use RustedPMPGen::Utils::logging::init_logging;
use RustedPMPGen::generator::config::GenConfig;
use RustedPMPGen::generator::dataset::{SaveOutcome, Split, dataset_path, save_dataset};
use RustedPMPGen::generator::multistart::DatasetGenerator;
use RustedPMPGen::problem::narrow_road::NarrowRoadProblem;
use RustedPMPGen::problem::problem_traits::OCProblem;
use log::{error, info, warn};
use nalgebra::DMatrix;

fn main() {
    let config = GenConfig::load_or_default("datagen.toml");
    init_logging(&config.loglevel);

    let problem = NarrowRoadProblem::default();
    info!(
        "problem: {}, time horizon {} s, alpha {}",
        problem.name(),
        problem.t1,
        problem.alpha
    );

    let choice = int_input("What kind of data? Enter 0 for validation, 1 for training:");
    let split = Split::from_choice(choice);
    let path = dataset_path(&config.data_dir, problem.name(), split);
    info!("dataset path: {}", path.display());

    let ns = config.ns_for(split);
    let mut generator = DatasetGenerator::new(&problem, config.random_seed);
    generator.tol = config.tol;
    generator.max_nodes = config.max_nodes;
    generator.run(ns);
    generator.print_statistics();

    if generator.samples_generated() == 0 {
        warn!("no sample converged, nothing to save");
        return;
    }
    let buffers = generator.assemble();
    info!("total data generated: {}", buffers.n_samples());

    let confirm = || int_input("Overwrite existing data? Enter 0 for no, 1 for yes:") != 0;
    match save_dataset(&path, &problem, &buffers, confirm) {
        Ok((outcome, total)) => {
            let verb = match outcome {
                SaveOutcome::Created => "created",
                SaveOutcome::Overwritten => "overwritten",
                SaveOutcome::Merged => "merged",
            };
            info!("dataset {} ({} mesh points on disk)", verb, total);
        }
        Err(e) => {
            error!("saving dataset failed: {}", e);
            std::process::exit(1);
        }
    }

    if config.export_csv {
        let mut stacked = DMatrix::zeros(26, buffers.n_samples());
        stacked.rows_mut(0, 8).copy_from(&buffers.X);
        stacked.rows_mut(8, 16).copy_from(&buffers.A);
        stacked.rows_mut(24, 2).copy_from(&buffers.V);
        let csv_path = path.with_extension("csv");
        let headers = buffer_headers(problem.n_states());
        match save_trajectory_csv(&buffers.t, &stacked, &headers, &csv_path.to_string_lossy()) {
            Ok(()) => info!("trajectories exported to {}", csv_path.display()),
            Err(e) => warn!("csv export failed: {}", e),
        }
    }
}
