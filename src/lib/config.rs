use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

use crate::catalog::InputCatalog;
use crate::errors::*;
use crate::stats::IntervalKind;
use crate::util::{read_data_from_file, read_data_from_stdin};

/// Run configuration shared by the simulation binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Drawn from entropy when absent.
    pub rng_seed: Option<u64>,
    pub output_path: Option<String>,
    pub write_to_stdout: Option<bool>,
    pub log_level: Option<String>,

    pub population_size: usize,
    pub horizon: f64,
    /// Number of parameter draws; used by multi-cohort runs only.
    pub n_cohorts: Option<usize>,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Interval reported for single-cohort statistics; multi-cohort runs
    /// always report prediction intervals across draws.
    #[serde(default = "default_interval")]
    pub interval: IntervalKind,

    pub group: String,
    pub intervention: String,
    pub inputs: InputSource,
}

/// The input catalog, given inline or as a path relative to the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputSource {
    Path(String),
    Inline(InputCatalog),
}

fn default_alpha() -> f64 { 0.05 }
fn default_interval() -> IntervalKind { IntervalKind::Confidence }

impl RunConfig {
    pub fn from_json(json_data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.horizon >= 0.0) || !self.horizon.is_finite() {
            return Err(Error::InvalidConfig(format!("horizon must be finite and non-negative, got {}", self.horizon)));
        }
        if self.population_size == 0 {
            return Err(Error::InvalidConfig("population_size must be positive".into()));
        }
        if self.n_cohorts == Some(0) {
            return Err(Error::InvalidConfig("n_cohorts must be positive".into()));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidConfig(format!("alpha must be in (0, 1), got {}", self.alpha)));
        }
        Ok(())
    }

    /// Loads the catalog, reading it from disk if the config names a file.
    /// Relative paths are taken relative to `base_dir`.
    pub fn load_catalog(&self, base_dir: Option<&Path>) -> Result<InputCatalog> {
        match &self.inputs {
            InputSource::Inline(catalog) => Ok(catalog.clone()),
            InputSource::Path(path_str) => {
                let path = resolve_path(path_str, base_dir);
                let json_data = read_data_from_file(&path.to_string_lossy())?;
                InputCatalog::from_json(&json_data)
            },
        }
    }

    /// The output database path, if any, resolved like the catalog path.
    pub fn output_path(&self, base_dir: Option<&Path>) -> Option<PathBuf> {
        self.output_path.as_ref().map(|p| resolve_path(p, base_dir))
    }

    pub fn write_to_stdout(&self) -> bool {
        self.write_to_stdout.unwrap_or(false)
    }
}

/// Reads the config from the file at `path_str`, or from stdin without one.
/// Also returns the directory relative paths in the config are taken from:
/// the config file's directory, or none for stdin.
pub fn read_run_config(path_str: Option<&str>) -> Result<(RunConfig, Option<PathBuf>)> {
    match path_str {
        Some(path_str) => {
            let json_data = read_data_from_file(path_str)?;
            let base_dir = Path::new(path_str).canonicalize().ok()
                .and_then(|p| p.parent().map(Path::to_path_buf));
            Ok((RunConfig::from_json(&json_data)?, base_dir))
        },
        None => {
            let json_data = read_data_from_stdin()?;
            Ok((RunConfig::from_json(&json_data)?, None))
        }
    }
}

fn resolve_path(path_str: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(path_str);
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}
