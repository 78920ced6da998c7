//! Material index capabilities supplied by the caller.
//!
//! The solver never owns a material database. A [`Material`] is either a
//! constant refractive index or a caller-provided lookup
//! `wavelength (µm) -> n`, evaluated once per grid build.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Wavelength-dependent refractive index lookup.
pub trait RefractiveIndex: Send + Sync {
    /// Short label used in logs and cache keys.
    fn name(&self) -> &str;

    /// Real refractive index at `wavelength` (µm).
    fn index(&self, wavelength: f64) -> f64;
}

/// Adapter turning a closure into a [`RefractiveIndex`].
pub struct IndexFn<F> {
    name: String,
    func: F,
}

impl<F> IndexFn<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> RefractiveIndex for IndexFn<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self, wavelength: f64) -> f64 {
        (self.func)(wavelength)
    }
}

/// An isotropic material: constant index or a dispersive lookup.
#[derive(Clone)]
pub enum Material {
    Constant(f64),
    Dispersive(Arc<dyn RefractiveIndex>),
}

impl Material {
    pub fn constant(n: f64) -> Self {
        Material::Constant(n)
    }

    pub fn dispersive<R: RefractiveIndex + 'static>(lookup: R) -> Self {
        Material::Dispersive(Arc::new(lookup))
    }

    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Material::dispersive(IndexFn::new(name, func))
    }

    pub fn label(&self) -> String {
        match self {
            Material::Constant(n) => format!("n={n}"),
            Material::Dispersive(lookup) => lookup.name().to_string(),
        }
    }

    /// Evaluates and validates the index at `wavelength`.
    pub fn index_at(&self, wavelength: f64) -> Result<f64, ConfigurationError> {
        let n = match self {
            Material::Constant(n) => *n,
            Material::Dispersive(lookup) => lookup.index(wavelength),
        };
        if !n.is_finite() || n <= 0.0 {
            return Err(ConfigurationError::InvalidIndex {
                name: self.label(),
                index: n,
                wavelength,
            });
        }
        Ok(n)
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Constant(n) => f.debug_tuple("Constant").field(n).finish(),
            Material::Dispersive(lookup) => f.debug_tuple("Dispersive").field(&lookup.name()).finish(),
        }
    }
}

impl From<f64> for Material {
    fn from(n: f64) -> Self {
        Material::Constant(n)
    }
}

/// A medium filling a region: isotropic, or diagonal-anisotropic with
/// separate xx/yy/zz indices.
#[derive(Debug, Clone)]
pub enum Medium {
    Isotropic(Material),
    Anisotropic {
        xx: Material,
        yy: Material,
        zz: Material,
    },
}

impl Medium {
    pub fn is_anisotropic(&self) -> bool {
        matches!(self, Medium::Anisotropic { .. })
    }

    /// Diagonal relative permittivity `[εxx, εyy, εzz]` at `wavelength`.
    pub fn permittivity(&self, wavelength: f64) -> Result<Permittivity, ConfigurationError> {
        match self {
            Medium::Isotropic(m) => {
                let n = m.index_at(wavelength)?;
                Ok(Permittivity::isotropic(n * n))
            }
            Medium::Anisotropic { xx, yy, zz } => {
                let nx = xx.index_at(wavelength)?;
                let ny = yy.index_at(wavelength)?;
                let nz = zz.index_at(wavelength)?;
                Ok(Permittivity {
                    xx: nx * nx,
                    yy: ny * ny,
                    zz: nz * nz,
                })
            }
        }
    }
}

impl From<f64> for Medium {
    fn from(n: f64) -> Self {
        Medium::Isotropic(Material::Constant(n))
    }
}

impl From<Material> for Medium {
    fn from(m: Material) -> Self {
        Medium::Isotropic(m)
    }
}

/// Diagonal permittivity tensor at a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Permittivity {
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
}

impl Permittivity {
    pub fn isotropic(eps: f64) -> Self {
        Self {
            xx: eps,
            yy: eps,
            zz: eps,
        }
    }

    pub fn min_index(&self) -> f64 {
        self.xx.min(self.yy).min(self.zz).sqrt()
    }

    pub fn max_index(&self) -> f64 {
        self.xx.max(self.yy).max(self.zz).sqrt()
    }
}
