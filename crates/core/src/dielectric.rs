//! Rasterized permittivity on a uniform grid.

use crate::error::ConfigurationError;
use crate::grid::Grid2D;
use crate::material::Permittivity;

/// Relative permittivity sampled at every cell centre.
///
/// Isotropic structures keep `xx == yy == zz`; anisotropic ones carry three
/// co-registered arrays. All arrays share the layout of [`Grid2D::idx`].
#[derive(Debug, Clone)]
pub struct Dielectric2D {
    pub grid: Grid2D,
    wavelength: f64,
    eps_xx: Vec<f64>,
    eps_yy: Vec<f64>,
    eps_zz: Vec<f64>,
    anisotropic: bool,
}

impl Dielectric2D {
    /// Isotropic permittivity map.
    pub fn isotropic(
        grid: Grid2D,
        wavelength: f64,
        eps: Vec<f64>,
    ) -> Result<Self, ConfigurationError> {
        ConfigurationError::grid_length("permittivity", grid.len(), eps.len())?;
        Ok(Self {
            grid,
            wavelength,
            eps_xx: eps.clone(),
            eps_yy: eps.clone(),
            eps_zz: eps,
            anisotropic: false,
        })
    }

    pub fn from_tensors(
        grid: Grid2D,
        wavelength: f64,
        samples: &[Permittivity],
        anisotropic: bool,
    ) -> Result<Self, ConfigurationError> {
        ConfigurationError::grid_length("permittivity", grid.len(), samples.len())?;
        Ok(Self {
            grid,
            wavelength,
            eps_xx: samples.iter().map(|p| p.xx).collect(),
            eps_yy: samples.iter().map(|p| p.yy).collect(),
            eps_zz: samples.iter().map(|p| p.zz).collect(),
            anisotropic,
        })
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn k0(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.wavelength
    }

    pub fn is_anisotropic(&self) -> bool {
        self.anisotropic
    }

    pub fn eps_xx(&self) -> &[f64] {
        &self.eps_xx
    }

    pub fn eps_yy(&self) -> &[f64] {
        &self.eps_yy
    }

    pub fn eps_zz(&self) -> &[f64] {
        &self.eps_zz
    }

    /// Refractive index map from the xx component.
    pub fn index(&self) -> Vec<f64> {
        self.eps_xx.iter().map(|e| e.sqrt()).collect()
    }

    pub fn x(&self) -> Vec<f64> {
        self.grid.x()
    }

    pub fn y(&self) -> Vec<f64> {
        self.grid.y()
    }

    /// Smallest and largest refractive index over every tensor component.
    pub fn index_bounds(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for eps in [&self.eps_xx, &self.eps_yy, &self.eps_zz] {
            for &e in eps.iter() {
                lo = lo.min(e);
                hi = hi.max(e);
            }
        }
        (lo.sqrt(), hi.sqrt())
    }
}
