//! Dataset archive: the on-disk container the generated trajectories end up
//! in, keyed by named channels plus per-channel normalization bounds for the
//! downstream value-network training.
//!
//! A fresh archive recovers the control signals from the state/costate pairs
//! and computes min/max bounds per channel block. Appending to an existing
//! archive extends t/X/A/V only; U and the stored bounds keep the values of
//! the first write, so consumers normalize every batch the same way.

use crate::problem::problem_traits::OCProblem;
use itertools::Itertools;
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
    /// prompt convention: 0 selects validation, anything else training
    pub fn from_choice(choice: i64) -> Split {
        if choice != 0 { Split::Train } else { Split::Val }
    }
}

/// Accumulated output buffers of a generation run, one column per mesh
/// point across all retained trajectories.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffers {
    pub t: DVector<f64>,
    pub X: DMatrix<f64>,
    pub A: DMatrix<f64>,
    pub V: DMatrix<f64>,
}

impl TrajectoryBuffers {
    pub fn n_samples(&self) -> usize {
        self.t.len()
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("malformed dataset archive {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },
    #[error("could not encode dataset archive: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no converged samples to save")]
    Empty,
}

/// All channels of the archive. Arrays are row-major: one inner vector per
/// channel row, one entry per mesh point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetArchive {
    pub t: Vec<f64>,
    pub X: Vec<Vec<f64>>,
    pub A: Vec<Vec<f64>>,
    pub V: Vec<Vec<f64>>,
    pub U: Vec<Vec<f64>>,
    pub lb_1: Vec<f64>,
    pub ub_1: Vec<f64>,
    pub lb_2: Vec<f64>,
    pub ub_2: Vec<f64>,
    pub A_lb_11: Vec<f64>,
    pub A_ub_11: Vec<f64>,
    pub A_lb_12: Vec<f64>,
    pub A_ub_12: Vec<f64>,
    pub A_lb_21: Vec<f64>,
    pub A_ub_21: Vec<f64>,
    pub A_lb_22: Vec<f64>,
    pub A_ub_22: Vec<f64>,
    pub U_lb_1: Vec<f64>,
    pub U_ub_1: Vec<f64>,
    pub U_lb_2: Vec<f64>,
    pub U_ub_2: Vec<f64>,
    pub V_min_1: f64,
    pub V_max_1: f64,
    pub V_min_2: f64,
    pub V_max_2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Overwritten,
    Merged,
}

/// `<data_dir>/data_<split>_<problem>.json`
pub fn dataset_path(data_dir: &str, problem_name: &str, split: Split) -> PathBuf {
    Path::new(data_dir).join(format!("data_{}_{}.json", split.as_str(), problem_name))
}

fn rows_of(m: &DMatrix<f64>, r0: usize, nrows: usize) -> Vec<Vec<f64>> {
    (r0..r0 + nrows)
        .map(|r| m.row(r).iter().cloned().collect())
        .collect()
}

/// Per-row (min, max) over a block of rows; the buffers are known nonempty.
fn block_bounds(m: &DMatrix<f64>, r0: usize, nrows: usize) -> (Vec<f64>, Vec<f64>) {
    let mut lb = Vec::with_capacity(nrows);
    let mut ub = Vec::with_capacity(nrows);
    for r in r0..r0 + nrows {
        let (min, max) = m.row(r).iter().cloned().minmax().into_option().unwrap();
        lb.push(min);
        ub.push(max);
    }
    (lb, ub)
}

fn vector_bounds(v: &DVector<f64>) -> (f64, f64) {
    v.iter().cloned().minmax().into_option().unwrap()
}

/// Build a fresh archive from the run buffers: control recovery, channel
/// copies and bounds. Requires at least one sample.
pub fn fresh_archive<P: OCProblem>(problem: &P, buffers: &TrajectoryBuffers) -> DatasetArchive {
    let n = problem.n_states();
    let (u1, u2) = problem.u_star(&buffers.X, &buffers.A);

    let (lb_1, ub_1) = block_bounds(&buffers.X, 0, n);
    let (lb_2, ub_2) = block_bounds(&buffers.X, n, n);
    let (A_lb_11, A_ub_11) = block_bounds(&buffers.A, 0, n);
    let (A_lb_12, A_ub_12) = block_bounds(&buffers.A, n, n);
    let (A_lb_21, A_ub_21) = block_bounds(&buffers.A, 2 * n, n);
    let (A_lb_22, A_ub_22) = block_bounds(&buffers.A, 3 * n, n);
    let (u1_min, u1_max) = vector_bounds(&u1);
    let (u2_min, u2_max) = vector_bounds(&u2);
    let (V_min_1, V_max_1) = block_bounds(&buffers.V, 0, 1);
    let (V_min_2, V_max_2) = block_bounds(&buffers.V, 1, 1);

    DatasetArchive {
        t: buffers.t.iter().cloned().collect(),
        X: rows_of(&buffers.X, 0, 2 * n),
        A: rows_of(&buffers.A, 0, 4 * n),
        V: rows_of(&buffers.V, 0, 2),
        U: vec![
            u1.iter().cloned().collect(),
            u2.iter().cloned().collect(),
        ],
        lb_1,
        ub_1,
        lb_2,
        ub_2,
        A_lb_11,
        A_ub_11,
        A_lb_12,
        A_ub_12,
        A_lb_21,
        A_ub_21,
        A_lb_22,
        A_ub_22,
        U_lb_1: vec![u1_min],
        U_ub_1: vec![u1_max],
        U_lb_2: vec![u2_min],
        U_ub_2: vec![u2_max],
        V_min_1: V_min_1[0],
        V_max_1: V_max_1[0],
        V_min_2: V_min_2[0],
        V_max_2: V_max_2[0],
    }
}

/// Append the run buffers to an existing archive. Only t/X/A/V grow; U and
/// the stored bounds deliberately stay as they were written.
pub fn merge_into(existing: &mut DatasetArchive, buffers: &TrajectoryBuffers) {
    existing.t.extend(buffers.t.iter());
    for (r, row) in existing.X.iter_mut().enumerate() {
        row.extend(buffers.X.row(r).iter());
    }
    for (r, row) in existing.A.iter_mut().enumerate() {
        row.extend(buffers.A.row(r).iter());
    }
    for (r, row) in existing.V.iter_mut().enumerate() {
        row.extend(buffers.V.row(r).iter());
    }
}

/// Load the archive if present. A missing file is `None` (a fresh dataset
/// will be written); an unreadable or unparsable file is an error rather
/// than a silent fresh start.
pub fn load_archive(path: &Path) -> Result<Option<DatasetArchive>, DatasetError> {
    match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(archive) => Ok(Some(archive)),
            Err(source) => Err(DatasetError::Malformed {
                path: path.display().to_string(),
                source,
            }),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn write_archive(path: &Path, archive: &DatasetArchive) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string(archive)?;
    fs::write(path, text)?;
    Ok(())
}

/// Save the run buffers at `path`, merging with or overwriting an existing
/// archive. `confirm_overwrite` is consulted only when a valid archive is
/// already present. Returns the outcome and the total sample count on disk.
pub fn save_dataset<P: OCProblem>(
    path: &Path,
    problem: &P,
    buffers: &TrajectoryBuffers,
    mut confirm_overwrite: impl FnMut() -> bool,
) -> Result<(SaveOutcome, usize), DatasetError> {
    if buffers.n_samples() == 0 {
        return Err(DatasetError::Empty);
    }
    match load_archive(path)? {
        Some(mut existing) => {
            if confirm_overwrite() {
                let archive = fresh_archive(problem, buffers);
                write_archive(path, &archive)?;
                info!("overwrote dataset at {}", path.display());
                Ok((SaveOutcome::Overwritten, archive.t.len()))
            } else {
                merge_into(&mut existing, buffers);
                write_archive(path, &existing)?;
                info!("appended to dataset at {}", path.display());
                Ok((SaveOutcome::Merged, existing.t.len()))
            }
        }
        None => {
            let archive = fresh_archive(problem, buffers);
            write_archive(path, &archive)?;
            info!("created dataset at {}", path.display());
            Ok((SaveOutcome::Created, archive.t.len()))
        }
    }
}
