//! Run configuration: generation seed, sample counts per split, solver
//! budget and output locations. Loaded from an optional `datagen.toml` next
//! to the binary; every field has a compiled-in default so the file is not
//! required.

use crate::generator::dataset::Split;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// seed of the initial-state sampler
    pub random_seed: u64,
    pub ns_train: usize,
    pub ns_val: usize,
    /// residual tolerance of the collocation solves
    pub tol: f64,
    /// node budget per collocation solve
    pub max_nodes: usize,
    pub data_dir: String,
    pub loglevel: String,
    /// also dump the accumulated trajectories as CSV next to the archive
    pub export_csv: bool,
}

impl Default for GenConfig {
    fn default() -> GenConfig {
        GenConfig {
            random_seed: 42,
            ns_train: 120,
            ns_val: 30,
            tol: 5e-3,
            max_nodes: 1500,
            data_dir: "data".to_string(),
            loglevel: "info".to_string(),
            export_csv: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl GenConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<GenConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Config file if present, defaults otherwise. A present-but-broken
    /// file is reported and ignored.
    pub fn load_or_default(path: impl AsRef<Path>) -> GenConfig {
        match GenConfig::from_toml_file(&path) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                GenConfig::default()
            }
            Err(e) => {
                warn!("{e}; falling back to defaults");
                GenConfig::default()
            }
        }
    }

    pub fn ns_for(&self, split: Split) -> usize {
        match split {
            Split::Train => self.ns_train,
            Split::Val => self.ns_val,
        }
    }
}
