//! Waveguide cross-section description.
//!
//! A [`WaveguideGeometry`] is immutable and validated once, when
//! [`GeometryBuilder::build`] runs. Lengths are in micrometres and the
//! sidewall angle is in degrees measured from the vertical.
//!
//! ```text
//!        cladding[n-1]
//!        ...
//!        cladding[0]                 <- also fills the core layer around cores
//!     ┌──┐   ┌──┐                    core layer: core_thickness - slab_thickness
//! ════╧══╧═══╧══╧════                slab (core material, optional)
//!        substrate
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::material::{Medium, Permittivity};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_WAVELENGTH: f64 = 1.55;
pub const DEFAULT_STEP: f64 = 0.02;
pub const DEFAULT_CORE_THICKNESS: f64 = 0.22;
pub const DEFAULT_WIDTH: f64 = 0.5;
pub const DEFAULT_SUBSTRATE_THICKNESS: f64 = 0.5;
pub const DEFAULT_DOMAIN_WIDTH: f64 = 2.0;
pub const DEFAULT_CLADDING_THICKNESS: f64 = 0.5;
/// Silicon at 1.55 µm.
pub const N_SILICON: f64 = 3.476;
/// Thermal oxide at 1.55 µm.
pub const N_SILICA: f64 = 1.444;

// ============================================================================
// Layers and kinds
// ============================================================================

/// One cladding layer above the core layer.
#[derive(Debug, Clone)]
pub struct CladdingLayer {
    pub thickness: f64,
    pub medium: Medium,
}

impl CladdingLayer {
    pub fn new(thickness: f64, medium: impl Into<Medium>) -> Self {
        Self {
            thickness,
            medium: medium.into(),
        }
    }
}

/// Structural family of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    Strip,
    Rib,
    Array,
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone)]
pub struct WaveguideGeometry {
    wavelength: f64,
    x_step: f64,
    y_step: f64,
    core_thickness: f64,
    slab_thickness: f64,
    substrate_thickness: f64,
    domain_width: f64,
    widths: Vec<f64>,
    gaps: Vec<f64>,
    sidewall_angle: f64,
    substrate: Medium,
    core: Medium,
    claddings: Vec<CladdingLayer>,
}

impl WaveguideGeometry {
    pub fn builder() -> GeometryBuilder {
        GeometryBuilder::default()
    }

    /// Builder pre-filled with this geometry, for overrides.
    pub fn to_builder(&self) -> GeometryBuilder {
        GeometryBuilder {
            inner: self.clone(),
        }
    }

    /// Same structure at a different wavelength.
    pub fn with_wavelength(&self, wavelength: f64) -> Result<Self, ConfigurationError> {
        self.to_builder().wavelength(wavelength).build()
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Free-space wavenumber 2π/λ.
    pub fn k0(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.wavelength
    }

    pub fn x_step(&self) -> f64 {
        self.x_step
    }

    pub fn y_step(&self) -> f64 {
        self.y_step
    }

    pub fn core_thickness(&self) -> f64 {
        self.core_thickness
    }

    pub fn slab_thickness(&self) -> f64 {
        self.slab_thickness
    }

    pub fn substrate_thickness(&self) -> f64 {
        self.substrate_thickness
    }

    pub fn domain_width(&self) -> f64 {
        self.domain_width
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn gaps(&self) -> &[f64] {
        &self.gaps
    }

    pub fn sidewall_angle(&self) -> f64 {
        self.sidewall_angle
    }

    pub fn substrate(&self) -> &Medium {
        &self.substrate
    }

    pub fn core(&self) -> &Medium {
        &self.core
    }

    pub fn claddings(&self) -> &[CladdingLayer] {
        &self.claddings
    }

    pub fn kind(&self) -> StructureKind {
        if self.widths.len() > 1 {
            StructureKind::Array
        } else if self.slab_thickness > 0.0 {
            StructureKind::Rib
        } else {
            StructureKind::Strip
        }
    }

    pub fn is_anisotropic(&self) -> bool {
        self.substrate.is_anisotropic()
            || self.core.is_anisotropic()
            || self.claddings.iter().any(|c| c.medium.is_anisotropic())
    }

    /// Total height of the computational domain.
    pub fn domain_height(&self) -> f64 {
        self.substrate_thickness
            + self.core_thickness
            + self.claddings.iter().map(|c| c.thickness).sum::<f64>()
    }

    /// Number of cells along x and y (partial trailing cells are dropped).
    pub fn cell_counts(&self) -> (usize, usize) {
        (
            cell_count(self.domain_width, self.x_step),
            cell_count(self.domain_height(), self.y_step),
        )
    }

    /// Left edge of every core, cores centred as a group.
    pub fn core_offsets(&self) -> Vec<f64> {
        let span = self.core_span();
        let mut x = 0.5 * (self.domain_width - span);
        let mut offsets = Vec::with_capacity(self.widths.len());
        for (i, w) in self.widths.iter().enumerate() {
            offsets.push(x);
            x += w;
            if let Some(gap) = self.gaps.get(i) {
                x += gap;
            }
        }
        offsets
    }

    fn core_span(&self) -> f64 {
        self.widths.iter().sum::<f64>() + self.gaps.iter().sum::<f64>()
    }

    /// Serializable snapshot with all materials evaluated at the wavelength.
    pub fn canonical(&self) -> Result<CanonicalGeometry, ConfigurationError> {
        let wl = self.wavelength;
        Ok(CanonicalGeometry {
            wavelength: wl,
            x_step: self.x_step,
            y_step: self.y_step,
            core_thickness: self.core_thickness,
            slab_thickness: self.slab_thickness,
            substrate_thickness: self.substrate_thickness,
            domain_width: self.domain_width,
            widths: self.widths.clone(),
            gaps: self.gaps.clone(),
            sidewall_angle: self.sidewall_angle,
            substrate: self.substrate.permittivity(wl)?,
            core: self.core.permittivity(wl)?,
            claddings: self
                .claddings
                .iter()
                .map(|c| Ok((c.thickness, c.medium.permittivity(wl)?)))
                .collect::<Result<Vec<_>, ConfigurationError>>()?,
        })
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        ConfigurationError::positive("wavelength", self.wavelength)?;
        ConfigurationError::positive("x_step", self.x_step)?;
        ConfigurationError::positive("y_step", self.y_step)?;
        ConfigurationError::positive("core_thickness", self.core_thickness)?;
        ConfigurationError::non_negative("slab_thickness", self.slab_thickness)?;
        ConfigurationError::positive("substrate_thickness", self.substrate_thickness)?;
        ConfigurationError::positive("domain_width", self.domain_width)?;

        if self.slab_thickness >= self.core_thickness {
            return Err(ConfigurationError::SlabTooThick {
                slab: self.slab_thickness,
                core: self.core_thickness,
            });
        }
        if !self.sidewall_angle.is_finite() || !(0.0..90.0).contains(&self.sidewall_angle) {
            return Err(ConfigurationError::AngleOutOfRange(self.sidewall_angle));
        }

        if self.widths.is_empty() {
            return Err(ConfigurationError::NoCores);
        }
        if self.gaps.len() + 1 != self.widths.len() {
            return Err(ConfigurationError::GapCount {
                cores: self.widths.len(),
                expected: self.widths.len() - 1,
                got: self.gaps.len(),
            });
        }
        for &w in &self.widths {
            ConfigurationError::positive("width", w)?;
        }
        for &g in &self.gaps {
            ConfigurationError::positive("gap", g)?;
        }
        let span = self.core_span();
        if span > self.domain_width {
            return Err(ConfigurationError::CoresExceedDomain {
                span,
                domain: self.domain_width,
            });
        }

        if self.claddings.is_empty() {
            return Err(ConfigurationError::CladdingMismatch {
                count: 0,
                materials: 0,
            });
        }
        for c in &self.claddings {
            ConfigurationError::non_negative("cladding thickness", c.thickness)?;
        }

        let (nx, ny) = self.cell_counts();
        if nx < 2 || ny < 2 {
            return Err(ConfigurationError::GridTooSmall { nx, ny });
        }

        // Surface bad material lookups before any solve.
        self.canonical()?;
        Ok(())
    }
}

fn cell_count(length: f64, step: f64) -> usize {
    (length / step + 1e-9).floor() as usize
}

/// Geometry with resolved permittivities; the input to cache keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGeometry {
    pub wavelength: f64,
    pub x_step: f64,
    pub y_step: f64,
    pub core_thickness: f64,
    pub slab_thickness: f64,
    pub substrate_thickness: f64,
    pub domain_width: f64,
    pub widths: Vec<f64>,
    pub gaps: Vec<f64>,
    pub sidewall_angle: f64,
    pub substrate: Permittivity,
    pub core: Permittivity,
    pub claddings: Vec<(f64, Permittivity)>,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`WaveguideGeometry`]; defaults describe a 500x220 nm silicon
/// strip on oxide at 1.55 µm.
#[derive(Debug, Clone)]
pub struct GeometryBuilder {
    inner: WaveguideGeometry,
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self {
            inner: WaveguideGeometry {
                wavelength: DEFAULT_WAVELENGTH,
                x_step: DEFAULT_STEP,
                y_step: DEFAULT_STEP,
                core_thickness: DEFAULT_CORE_THICKNESS,
                slab_thickness: 0.0,
                substrate_thickness: DEFAULT_SUBSTRATE_THICKNESS,
                domain_width: DEFAULT_DOMAIN_WIDTH,
                widths: vec![DEFAULT_WIDTH],
                gaps: Vec::new(),
                sidewall_angle: 0.0,
                substrate: N_SILICA.into(),
                core: N_SILICON.into(),
                claddings: vec![CladdingLayer::new(DEFAULT_CLADDING_THICKNESS, N_SILICA)],
            },
        }
    }
}

impl GeometryBuilder {
    pub fn wavelength(mut self, wavelength: f64) -> Self {
        self.inner.wavelength = wavelength;
        self
    }

    pub fn x_step(mut self, step: f64) -> Self {
        self.inner.x_step = step;
        self
    }

    pub fn y_step(mut self, step: f64) -> Self {
        self.inner.y_step = step;
        self
    }

    pub fn steps(self, x_step: f64, y_step: f64) -> Self {
        self.x_step(x_step).y_step(y_step)
    }

    pub fn core_thickness(mut self, thickness: f64) -> Self {
        self.inner.core_thickness = thickness;
        self
    }

    pub fn slab_thickness(mut self, thickness: f64) -> Self {
        self.inner.slab_thickness = thickness;
        self
    }

    pub fn substrate_thickness(mut self, thickness: f64) -> Self {
        self.inner.substrate_thickness = thickness;
        self
    }

    pub fn domain_width(mut self, width: f64) -> Self {
        self.inner.domain_width = width;
        self
    }

    /// Single core of the given width.
    pub fn width(mut self, width: f64) -> Self {
        self.inner.widths = vec![width];
        self.inner.gaps.clear();
        self
    }

    /// Array of cores separated by `gaps` (one fewer than `widths`).
    pub fn array(mut self, widths: Vec<f64>, gaps: Vec<f64>) -> Self {
        self.inner.widths = widths;
        self.inner.gaps = gaps;
        self
    }

    /// Sets every gap of an existing array to `gap`.
    pub fn uniform_gap(mut self, gap: f64) -> Self {
        let n = self.inner.widths.len().saturating_sub(1);
        self.inner.gaps = vec![gap; n];
        self
    }

    pub fn sidewall_angle(mut self, degrees: f64) -> Self {
        self.inner.sidewall_angle = degrees;
        self
    }

    pub fn substrate(mut self, medium: impl Into<Medium>) -> Self {
        self.inner.substrate = medium.into();
        self
    }

    pub fn core(mut self, medium: impl Into<Medium>) -> Self {
        self.inner.core = medium.into();
        self
    }

    /// Replaces the cladding stack with a single layer.
    pub fn cladding(mut self, thickness: f64, medium: impl Into<Medium>) -> Self {
        self.inner.claddings = vec![CladdingLayer::new(thickness, medium)];
        self
    }

    /// Replaces the cladding stack, bottom layer first.
    pub fn claddings(mut self, layers: Vec<CladdingLayer>) -> Self {
        self.inner.claddings = layers;
        self
    }

    pub fn build(self) -> Result<WaveguideGeometry, ConfigurationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
