//! Multi-start solution of the per-sample two-point BVP.
//!
//! One collocation solve per bang-bang action pair; candidates whose maximum
//! RMS residual stays below the tolerance count as converged, and the
//! converged candidate with the largest value at the initial node is kept.
//! Samples where no candidate converges are dropped without a retry, and the
//! requested sample count is consumed either way, so the dataset size is a
//! direct function of the convergence rate.

use crate::generator::dataset::TrajectoryBuffers;
use crate::generator::guess::{ACTION_PAIRS, bang_bang_guess, guess_mesh};
use crate::numerical::BVP_colloc::{ArithmeticGuard, CollocOptions, CollocResult, solve_collocation};
use crate::problem::problem_traits::OCProblem;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};
use tabled::{builder::Builder, settings::Style};

/// The trajectory retained for one sample.
#[derive(Debug, Clone)]
pub struct SelectedSolution {
    pub t: DVector<f64>,
    pub y: DMatrix<f64>,
    pub value: f64,
    pub max_rms: f64,
}

/// Sequential generation pipeline. Owns the growing output buffers; one
/// instance per run.
pub struct DatasetGenerator<'a, P: OCProblem> {
    problem: &'a P,
    /// residual tolerance of a converged candidate
    pub tol: f64,
    /// node budget per collocation solve
    pub max_nodes: usize,
    /// forwarded to the solver (0 silent, 2 iteration tables)
    pub verbose: u8,
    rng: StdRng,
    t_out: Vec<f64>,
    x_cols: Vec<DVector<f64>>,
    a_cols: Vec<DVector<f64>>,
    v_cols: Vec<DVector<f64>>,
    /// samples with at least one converged candidate
    pub n_converged: usize,
    /// solution attempts, converged or not
    pub step: usize,
    sol_times: Vec<Duration>,
}

impl<'a, P: OCProblem> DatasetGenerator<'a, P> {
    pub fn new(problem: &'a P, seed: u64) -> DatasetGenerator<'a, P> {
        DatasetGenerator {
            problem,
            tol: 5e-3,
            max_nodes: 1500,
            verbose: 0,
            rng: StdRng::seed_from_u64(seed),
            t_out: Vec::new(),
            x_cols: Vec::new(),
            a_cols: Vec::new(),
            v_cols: Vec::new(),
            n_converged: 0,
            step: 0,
            sol_times: Vec::new(),
        }
    }

    /// Draw `ns` initial states and solve them in order. Wall-clock time is
    /// recorded for samples that produce a solution.
    pub fn run(&mut self, ns: usize) {
        let x0_pool = self.problem.sample_x0(ns, &mut self.rng);
        for k in 0..ns {
            info!("Solving BVP #{} of {} ...", k + 1, ns);
            self.step += 1;
            let x0 = x0_pool.column(k).into_owned();
            debug!("X0 = {:?}", x0.as_slice());

            let started = Instant::now();
            match self.solve_sample(&x0) {
                Some(sol) => {
                    self.sol_times.push(started.elapsed());
                    info!(
                        "converged, value {:.4}, {} mesh nodes, max rms {:.2e}",
                        sol.value,
                        sol.t.len(),
                        sol.max_rms
                    );
                    self.append_solution(&sol);
                    self.n_converged += 1;
                }
                None => info!("no candidate converged, sample dropped"),
            }
        }
    }

    /// Solve one sample: a collocation solve per action pair, residual
    /// filter, best-value selection. A solver error discards that candidate
    /// only.
    pub fn solve_sample(&self, x0: &DVector<f64>) -> Option<SelectedSolution> {
        let problem = self.problem;
        let n = problem.n_states();
        let dim = problem.aug_dim();
        let fun =
            |t: &DVector<f64>, y: &DMatrix<f64>| problem.aug_dynamics(t, y);
        let bc =
            |ya: &DVector<f64>, yb: &DVector<f64>| problem.bc_residual(x0, ya, yb);
        let mesh = guess_mesh(problem.t1());
        let options = CollocOptions {
            tol: self.tol,
            max_nodes: self.max_nodes,
            bc_tol: None,
            verbose: self.verbose,
            guard: ArithmeticGuard::Strict,
        };

        let mut values: Vec<f64> = Vec::new();
        let mut solved: Vec<CollocResult> = Vec::new();
        for action in ACTION_PAIRS {
            let guess = bang_bang_guess(x0, n, problem.alpha(), problem.t1(), action);
            match solve_collocation(&fun, &bc, mesh.clone(), guess, &options) {
                Ok(res) => {
                    let max_rms = res.rms_residuals.iter().cloned().fold(0.0, f64::max);
                    if max_rms < self.tol {
                        // value of the candidate at the initial node
                        let value = -res.y[(dim - 2, 0)] - res.y[(dim - 1, 0)];
                        values.push(value);
                        solved.push(res);
                    }
                }
                Err(e) => warn!(
                    "candidate ({}, {}) discarded: {}",
                    action.0, action.1, e
                ),
            }
        }

        let index = Self::select_best(&values)?;
        let chosen = &solved[index];
        let max_rms = chosen.rms_residuals.iter().cloned().fold(0.0, f64::max);
        Some(SelectedSolution {
            t: chosen.x.clone(),
            y: chosen.y.clone(),
            value: values[index],
            max_rms,
        })
    }

    /// Index of the largest value; a later candidate must be strictly
    /// greater to displace an earlier one, so exact ties keep the first
    /// occurrence.
    pub fn select_best(values: &[f64]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &v) in values.iter().enumerate() {
            match best {
                Some(b) if values[b] >= v => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Append the full mesh of a selected trajectory onto the output
    /// buffers.
    fn append_solution(&mut self, sol: &SelectedSolution) {
        let n = self.problem.n_states();
        let dim = self.problem.aug_dim();
        for j in 0..sol.t.len() {
            self.t_out.push(sol.t[j]);
            self.x_cols
                .push(sol.y.column(j).rows(0, 2 * n).into_owned());
            self.a_cols
                .push(sol.y.column(j).rows(2 * n, 4 * n).into_owned());
            self.v_cols.push(DVector::from_vec(vec![
                -sol.y[(dim - 2, j)],
                -sol.y[(dim - 1, j)],
            ]));
        }
    }

    /// Total mesh points accumulated across all retained trajectories.
    pub fn samples_generated(&self) -> usize {
        self.t_out.len()
    }

    /// Copy the buffers into the matrix form the dataset writer consumes.
    pub fn assemble(&self) -> TrajectoryBuffers {
        let n = self.problem.n_states();
        let to_matrix = |cols: &Vec<DVector<f64>>, rows: usize| {
            if cols.is_empty() {
                DMatrix::zeros(rows, 0)
            } else {
                DMatrix::from_columns(cols)
            }
        };
        TrajectoryBuffers {
            t: DVector::from_vec(self.t_out.clone()),
            X: to_matrix(&self.x_cols, 2 * n),
            A: to_matrix(&self.a_cols, 4 * n),
            V: to_matrix(&self.v_cols, 2),
        }
    }

    /// End-of-run summary in the house table style.
    pub fn print_statistics(&self) {
        let total: Duration = self.sol_times.iter().sum();
        let total_s = total.as_secs_f64();
        let avg_s = if self.step > 0 {
            total_s / self.step as f64
        } else {
            0.0
        };

        let mut builder = Builder::default();
        builder.push_record(["solution attempts".to_string(), self.step.to_string()]);
        builder.push_record(["converged samples".to_string(), self.n_converged.to_string()]);
        builder.push_record([
            "data points generated".to_string(),
            self.samples_generated().to_string(),
        ]);
        builder.push_record(["average solve time, s".to_string(), format!("{:.1}", avg_s)]);
        builder.push_record(["total solve time, s".to_string(), format!("{:.1}", total_s)]);
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        info!("\n \n SOLVE STATISTICS \n \n {}", table);
    }
}
