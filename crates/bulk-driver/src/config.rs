//! Configuration types for bulk parameter sweeps.
//!
//! A sweep file is an ordinary job file (`[geometry]`, `[solver]`,
//! `[metrics]`) plus a `[sweep]` table naming the swept geometry parameter.
//!
//! ```toml
//! [geometry]
//! x_step = 0.02
//! y_step = 0.02
//!
//! [solver]
//! kind = "full"
//! n_modes = 2
//!
//! [sweep]
//! parameter = "width"
//! range = { min = 0.3, max = 0.7, step = 0.1 }
//! threads = 4
//! on_failure = "skip"
//! output = "width_sweep.csv"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use wgmode_core::error::ConfigurationError;
use wgmode_core::io::{GeometryConfig, JobConfig, SolverConfig};
use wgmode_core::metrics::MetricsConfig;
use wgmode_core::sweep::FailurePolicy;

// ============================================================================
// Swept Parameter
// ============================================================================

/// Geometry parameter varied across the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    /// Every core width.
    Width,
    CoreThickness,
    SlabThickness,
    Wavelength,
    /// Every gap between neighbouring cores.
    Gap,
    SidewallAngle,
}

impl SweepParameter {
    pub fn name(self) -> &'static str {
        match self {
            SweepParameter::Width => "width",
            SweepParameter::CoreThickness => "core_thickness",
            SweepParameter::SlabThickness => "slab_thickness",
            SweepParameter::Wavelength => "wavelength",
            SweepParameter::Gap => "gap",
            SweepParameter::SidewallAngle => "sidewall_angle",
        }
    }

    /// Copy of `base` with this parameter set to `value`.
    pub fn apply(self, base: &GeometryConfig, value: f64) -> GeometryConfig {
        let mut geometry = base.clone();
        match self {
            SweepParameter::Width => geometry.widths.iter_mut().for_each(|w| *w = value),
            SweepParameter::CoreThickness => geometry.core_thickness = value,
            SweepParameter::SlabThickness => geometry.slab_thickness = value,
            SweepParameter::Wavelength => geometry.wavelength = value,
            SweepParameter::Gap => {
                geometry.gaps = vec![value; geometry.widths.len().saturating_sub(1)]
            }
            SweepParameter::SidewallAngle => geometry.sidewall_angle = value,
        }
        geometry
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Range Specification
// ============================================================================

/// Inclusive `min..=max` in steps of `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl RangeSpec {
    pub fn values(&self) -> Vec<f64> {
        (0..self.count())
            .map(|i| self.min + i as f64 * self.step)
            .collect()
    }

    pub fn count(&self) -> usize {
        if !(self.step > 0.0) || self.max < self.min {
            return 0;
        }
        ((self.max - self.min) / self.step + 1e-9).floor() as usize + 1
    }
}

// ============================================================================
// Sweep Section
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSection {
    pub parameter: SweepParameter,

    /// Explicit values; exclusive with `range`.
    #[serde(default)]
    pub values: Option<Vec<f64>>,

    #[serde(default)]
    pub range: Option<RangeSpec>,

    /// Worker threads; all logical CPUs when unset.
    #[serde(default)]
    pub threads: Option<usize>,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_output() -> PathBuf {
    PathBuf::from("./sweep_results.csv")
}

// ============================================================================
// Complete Sweep Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub sweep: SweepSection,

    #[serde(default)]
    pub geometry: GeometryConfig,

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SweepConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        if !Self::is_sweep_document(s)? {
            return Err(ConfigError::NotSweepConfig);
        }
        let config: SweepConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether the TOML document has a top-level `sweep` table.
    pub fn is_sweep_document(s: &str) -> Result<bool, ConfigError> {
        let table: toml::Table = s.parse()?;
        Ok(table.get("sweep").is_some_and(toml::Value::is_table))
    }

    /// The base job every sweep entry starts from.
    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            geometry: self.geometry.clone(),
            solver: self.solver.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Swept values in sweep order.
    pub fn values(&self) -> Vec<f64> {
        match (&self.sweep.values, &self.sweep.range) {
            (Some(values), _) => values.clone(),
            (None, Some(range)) => range.values(),
            (None, None) => Vec::new(),
        }
    }

    pub fn effective_threads(&self) -> usize {
        self.sweep.threads.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sweep = &self.sweep;
        match (&sweep.values, &sweep.range) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidSweep(
                    "give either 'values' or 'range', not both".into(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::InvalidSweep(
                    "sweep needs 'values' or 'range'".into(),
                ))
            }
            (Some(values), None) => {
                if values.is_empty() {
                    return Err(ConfigError::InvalidSweep("'values' is empty".into()));
                }
                if let Some(v) = values.iter().find(|v| !v.is_finite()) {
                    return Err(ConfigError::InvalidSweep(format!("non-finite value {v}")));
                }
            }
            (None, Some(range)) => {
                if !(range.step > 0.0) {
                    return Err(ConfigError::InvalidRange(format!(
                        "{} step must be positive",
                        sweep.parameter
                    )));
                }
                if range.min > range.max {
                    return Err(ConfigError::InvalidRange(format!(
                        "{} min > max",
                        sweep.parameter
                    )));
                }
            }
        }

        if sweep.threads == Some(0) {
            return Err(ConfigError::InvalidSweep("threads must be at least 1".into()));
        }
        if sweep.parameter == SweepParameter::Gap && self.geometry.widths.len() < 2 {
            return Err(ConfigError::InvalidSweep(
                "a gap sweep needs at least two cores".into(),
            ));
        }
        self.solver.options()?;
        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML file does not contain [sweep] section - not a sweep configuration")]
    NotSweepConfig,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid parameter range: {0}")]
    InvalidRange(String),

    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    #[error(transparent)]
    Job(#[from] ConfigurationError),
}

// ============================================================================
// Tests
// ============================================================================
