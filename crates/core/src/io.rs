//! Job configuration files (TOML).
//!
//! # File Format
//!
//! ```toml
//! [geometry]
//! wavelength = 1.55
//! x_step = 0.02
//! y_step = 0.02
//! widths = [0.5]
//! core_thickness = 0.22
//! slab_thickness = 0.0
//! n_core = 3.476
//! n_sub = 1.444
//! n_clads = [1.444]
//! clad_thicknesses = [0.5]
//!
//! [solver]
//! kind = "full"
//! n_modes = 2
//! tol = 1e-9
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::eigensolver::EigenOptions;
use crate::error::{ConfigurationError, ModeSolverError};
use crate::geometry::{self, CladdingLayer, WaveguideGeometry};
use crate::material::{Material, Medium};
use crate::metrics::MetricsConfig;
use crate::mode::SolverKind;
use crate::solver::SolveOptions;

// ============================================================================
// Geometry
// ============================================================================

/// Per-axis core indices for an anisotropic core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnisotropicIndex {
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    #[serde(default = "default_wavelength")]
    pub wavelength: f64,
    #[serde(default = "default_step")]
    pub x_step: f64,
    #[serde(default = "default_step")]
    pub y_step: f64,
    #[serde(default = "default_widths")]
    pub widths: Vec<f64>,
    #[serde(default)]
    pub gaps: Vec<f64>,
    #[serde(default = "default_core_thickness")]
    pub core_thickness: f64,
    #[serde(default)]
    pub slab_thickness: f64,
    #[serde(default = "default_substrate_thickness")]
    pub substrate_thickness: f64,
    #[serde(default = "default_domain_width")]
    pub domain_width: f64,
    #[serde(default)]
    pub sidewall_angle: f64,
    #[serde(default = "default_n_sub")]
    pub n_sub: f64,
    #[serde(default = "default_n_core")]
    pub n_core: f64,
    #[serde(default = "default_n_clads")]
    pub n_clads: Vec<f64>,
    #[serde(default = "default_clad_thicknesses")]
    pub clad_thicknesses: Vec<f64>,
    /// Overrides `n_core` with per-axis indices.
    #[serde(default)]
    pub core_anisotropic: Option<AnisotropicIndex>,
}

fn default_wavelength() -> f64 {
    geometry::DEFAULT_WAVELENGTH
}

fn default_step() -> f64 {
    geometry::DEFAULT_STEP
}

fn default_widths() -> Vec<f64> {
    vec![geometry::DEFAULT_WIDTH]
}

fn default_core_thickness() -> f64 {
    geometry::DEFAULT_CORE_THICKNESS
}

fn default_substrate_thickness() -> f64 {
    geometry::DEFAULT_SUBSTRATE_THICKNESS
}

fn default_domain_width() -> f64 {
    geometry::DEFAULT_DOMAIN_WIDTH
}

fn default_n_sub() -> f64 {
    geometry::N_SILICA
}

fn default_n_core() -> f64 {
    geometry::N_SILICON
}

fn default_n_clads() -> Vec<f64> {
    vec![geometry::N_SILICA]
}

fn default_clad_thicknesses() -> Vec<f64> {
    vec![geometry::DEFAULT_CLADDING_THICKNESS]
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            wavelength: default_wavelength(),
            x_step: default_step(),
            y_step: default_step(),
            widths: default_widths(),
            gaps: Vec::new(),
            core_thickness: default_core_thickness(),
            slab_thickness: 0.0,
            substrate_thickness: default_substrate_thickness(),
            domain_width: default_domain_width(),
            sidewall_angle: 0.0,
            n_sub: default_n_sub(),
            n_core: default_n_core(),
            n_clads: default_n_clads(),
            clad_thicknesses: default_clad_thicknesses(),
            core_anisotropic: None,
        }
    }
}

impl GeometryConfig {
    /// Validated geometry for this configuration.
    pub fn build(&self) -> Result<WaveguideGeometry, ConfigurationError> {
        if self.n_clads.len() != self.clad_thicknesses.len() {
            return Err(ConfigurationError::CladdingMismatch {
                count: self.clad_thicknesses.len(),
                materials: self.n_clads.len(),
            });
        }
        let core: Medium = match self.core_anisotropic {
            Some(a) => Medium::Anisotropic {
                xx: Material::constant(a.xx),
                yy: Material::constant(a.yy),
                zz: Material::constant(a.zz),
            },
            None => self.n_core.into(),
        };
        let claddings = self
            .clad_thicknesses
            .iter()
            .zip(&self.n_clads)
            .map(|(&t, &n)| CladdingLayer::new(t, n))
            .collect();
        WaveguideGeometry::builder()
            .wavelength(self.wavelength)
            .steps(self.x_step, self.y_step)
            .array(self.widths.clone(), self.gaps.clone())
            .core_thickness(self.core_thickness)
            .slab_thickness(self.slab_thickness)
            .substrate_thickness(self.substrate_thickness)
            .domain_width(self.domain_width)
            .sidewall_angle(self.sidewall_angle)
            .substrate(self.n_sub)
            .core(core)
            .claddings(claddings)
            .build()
    }
}

// ============================================================================
// Solver
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_kind")]
    pub kind: SolverKind,
    #[serde(default = "default_n_modes")]
    pub n_modes: usize,
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,
    #[serde(default)]
    pub krylov_dim: Option<usize>,
    #[serde(default)]
    pub shift_index: Option<f64>,
}

fn default_kind() -> SolverKind {
    SolverKind::SemiTe
}

fn default_n_modes() -> usize {
    1
}

fn default_tol() -> f64 {
    EigenOptions::default().tol
}

fn default_max_restarts() -> usize {
    EigenOptions::default().max_restarts
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            n_modes: default_n_modes(),
            tol: default_tol(),
            max_restarts: default_max_restarts(),
            krylov_dim: None,
            shift_index: None,
        }
    }
}

impl SolverConfig {
    pub fn options(&self) -> Result<SolveOptions, ConfigurationError> {
        if self.n_modes == 0 {
            return Err(ConfigurationError::NoModesRequested);
        }
        ConfigurationError::positive("tol", self.tol)?;
        if let Some(n) = self.shift_index {
            ConfigurationError::positive("shift_index", n)?;
        }
        Ok(SolveOptions {
            eigen: EigenOptions {
                tol: self.tol,
                max_restarts: self.max_restarts,
                krylov_dim: self.krylov_dim,
            },
            shift_index: self.shift_index,
        })
    }
}

// ============================================================================
// Job Configuration
// ============================================================================

/// A single solve job (loadable from TOML).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A job with its geometry built and options checked.
#[derive(Debug, Clone)]
pub struct SolveJob {
    pub geometry: WaveguideGeometry,
    pub kind: SolverKind,
    pub n_modes: usize,
    pub options: SolveOptions,
}

impl JobConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(text).map_err(|e| ConfigurationError::Invalid(format!("invalid job file: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModeSolverError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    pub fn job(&self) -> Result<SolveJob, ConfigurationError> {
        Ok(SolveJob {
            geometry: self.geometry.build()?,
            kind: self.solver.kind,
            n_modes: self.solver.n_modes,
            options: self.solver.options()?,
        })
    }
}
