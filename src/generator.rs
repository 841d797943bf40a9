//! The dataset generation pipeline: sample initial states, build bang-bang
//! candidate guesses, run the multi-start collocation solves, accumulate the
//! converged trajectories and persist them with normalization bounds.
pub mod config;
/// dataset archive: channel layout, bounds, read/merge/write
pub mod dataset;
mod dataset_tests;
/// bang-bang candidate guess construction
pub mod guess;
/// multi-start BVP solving, best-value selection, accumulation
pub mod multistart;
