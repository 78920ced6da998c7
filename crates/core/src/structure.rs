//! Structure kinds and rasterization onto a grid.
//!
//! Every kind shares the same layer stack (substrate, optional slab, core
//! layer, cladding layers) and differs only in how cores are placed inside
//! the core layer.

use crate::dielectric::Dielectric2D;
use crate::error::ConfigurationError;
use crate::geometry::{StructureKind, WaveguideGeometry};
use crate::grid::Grid2D;
use crate::material::{Medium, Permittivity};

/// Which part of the layer stack a point falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Substrate,
    Core,
    Cladding(usize),
}

/// Capabilities shared by all structure kinds.
pub trait CrossSection {
    fn geometry(&self) -> &WaveguideGeometry;

    /// Whether `x` lies inside a core at height `h` above the core layer bottom.
    fn in_core(&self, x: f64, h: f64) -> bool;

    fn region_at(&self, x: f64, y: f64) -> Region {
        let geom = self.geometry();
        let mut top = geom.substrate_thickness();
        if y < top {
            return Region::Substrate;
        }
        let slab_top = top + geom.slab_thickness();
        if y < slab_top {
            return Region::Core;
        }
        top += geom.core_thickness();
        if y < top {
            return if self.in_core(x, y - slab_top) {
                Region::Core
            } else {
                Region::Cladding(0)
            };
        }
        let claddings = geom.claddings();
        for (k, layer) in claddings.iter().enumerate() {
            top += layer.thickness;
            if y < top {
                return Region::Cladding(k);
            }
        }
        Region::Cladding(claddings.len() - 1)
    }

    fn material_at(&self, x: f64, y: f64) -> &Medium {
        let geom = self.geometry();
        match self.region_at(x, y) {
            Region::Substrate => geom.substrate(),
            Region::Core => geom.core(),
            Region::Cladding(k) => &geom.claddings()[k].medium,
        }
    }

    /// Samples the structure at every cell centre of `grid`. Materials are
    /// evaluated once, at the geometry wavelength.
    fn rasterize(&self, grid: Grid2D) -> Result<Dielectric2D, ConfigurationError> {
        let geom = self.geometry();
        let wl = geom.wavelength();
        let substrate = geom.substrate().permittivity(wl)?;
        let core = geom.core().permittivity(wl)?;
        let claddings = geom
            .claddings()
            .iter()
            .map(|c| c.medium.permittivity(wl))
            .collect::<Result<Vec<Permittivity>, _>>()?;

        let mut eps = Vec::with_capacity(grid.len());
        for ix in 0..grid.nx {
            let x = grid.x_at(ix);
            for iy in 0..grid.ny {
                let p = match self.region_at(x, grid.y_at(iy)) {
                    Region::Substrate => substrate,
                    Region::Core => core,
                    Region::Cladding(k) => claddings[k],
                };
                eps.push(p);
            }
        }
        Dielectric2D::from_tensors(grid, wl, &eps, geom.is_anisotropic())
    }
}

/// Inward shift of a sidewall at height `h` for an angle from the vertical.
fn sidewall_inset(angle_deg: f64, h: f64) -> f64 {
    if angle_deg == 0.0 {
        0.0
    } else {
        h * angle_deg.to_radians().tan()
    }
}

fn inside_trapezoid(x: f64, left: f64, width: f64, inset: f64) -> bool {
    let lo = left + inset;
    let hi = left + width - inset;
    lo < hi && x >= lo && x < hi
}

// ============================================================================
// Kinds
// ============================================================================

/// Single strip or rib waveguide.
#[derive(Debug, Clone)]
pub struct RidgeWaveguide {
    geometry: WaveguideGeometry,
    left: f64,
    width: f64,
}

impl RidgeWaveguide {
    pub fn new(geometry: &WaveguideGeometry) -> Self {
        let width = geometry.widths()[0];
        let left = 0.5 * (geometry.domain_width() - width);
        Self {
            geometry: geometry.clone(),
            left,
            width,
        }
    }

    pub fn is_rib(&self) -> bool {
        self.geometry.slab_thickness() > 0.0
    }
}

impl CrossSection for RidgeWaveguide {
    fn geometry(&self) -> &WaveguideGeometry {
        &self.geometry
    }

    fn in_core(&self, x: f64, h: f64) -> bool {
        let inset = sidewall_inset(self.geometry.sidewall_angle(), h);
        inside_trapezoid(x, self.left, self.width, inset)
    }
}

/// Several cores sharing one substrate, slab and cladding.
#[derive(Debug, Clone)]
pub struct WaveguideArray {
    geometry: WaveguideGeometry,
    cores: Vec<(f64, f64)>,
}

impl WaveguideArray {
    pub fn new(geometry: &WaveguideGeometry) -> Self {
        let cores = geometry
            .core_offsets()
            .into_iter()
            .zip(geometry.widths().iter().copied())
            .collect();
        Self {
            geometry: geometry.clone(),
            cores,
        }
    }

    /// `(left edge, bottom width)` of each core.
    pub fn cores(&self) -> &[(f64, f64)] {
        &self.cores
    }
}

impl CrossSection for WaveguideArray {
    fn geometry(&self) -> &WaveguideGeometry {
        &self.geometry
    }

    fn in_core(&self, x: f64, h: f64) -> bool {
        let inset = sidewall_inset(self.geometry.sidewall_angle(), h);
        self.cores
            .iter()
            .any(|&(left, width)| inside_trapezoid(x, left, width, inset))
    }
}

/// Tagged variant over the structure kinds.
#[derive(Debug, Clone)]
pub enum Structure {
    Ridge(RidgeWaveguide),
    Array(WaveguideArray),
}

impl Structure {
    pub fn from_geometry(geometry: &WaveguideGeometry) -> Self {
        match geometry.kind() {
            StructureKind::Strip | StructureKind::Rib => {
                Structure::Ridge(RidgeWaveguide::new(geometry))
            }
            StructureKind::Array => Structure::Array(WaveguideArray::new(geometry)),
        }
    }

    pub fn kind(&self) -> StructureKind {
        self.geometry().kind()
    }

    /// Grid covering the whole domain at the geometry's steps.
    pub fn grid(&self) -> Grid2D {
        let geom = self.geometry();
        let (nx, ny) = geom.cell_counts();
        Grid2D::new(nx, ny, geom.x_step(), geom.y_step())
    }

    pub fn build(&self) -> Result<Dielectric2D, ConfigurationError> {
        self.rasterize(self.grid())
    }
}

impl CrossSection for Structure {
    fn geometry(&self) -> &WaveguideGeometry {
        match self {
            Structure::Ridge(s) => s.geometry(),
            Structure::Array(s) => s.geometry(),
        }
    }

    fn in_core(&self, x: f64, h: f64) -> bool {
        match self {
            Structure::Ridge(s) => s.in_core(x, h),
            Structure::Array(s) => s.in_core(x, h),
        }
    }
}

/// Rasterizes `geometry` onto its own grid.
pub fn build(geometry: &WaveguideGeometry) -> Result<Dielectric2D, ConfigurationError> {
    Structure::from_geometry(geometry).build()
}
