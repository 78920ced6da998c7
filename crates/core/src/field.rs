//! Complex field component sampled on a uniform 2D grid.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::grid::Grid2D;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field2D {
    grid: Grid2D,
    data: Vec<Complex64>,
}

impl Field2D {
    pub fn zeros(grid: Grid2D) -> Self {
        Self {
            data: vec![Complex64::default(); grid.len()],
            grid,
        }
    }

    pub fn from_vec(grid: Grid2D, data: Vec<Complex64>) -> Result<Self, ConfigurationError> {
        ConfigurationError::grid_length("field", grid.len(), data.len())?;
        Ok(Self { grid, data })
    }

    /// Samples `f(x, y)` at every cell centre.
    pub fn from_fn(grid: Grid2D, f: impl Fn(f64, f64) -> Complex64) -> Self {
        let mut data = Vec::with_capacity(grid.len());
        for ix in 0..grid.nx {
            let x = grid.x_at(ix);
            for iy in 0..grid.ny {
                data.push(f(x, grid.y_at(iy)));
            }
        }
        Self { grid, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn grid(&self) -> Grid2D {
        self.grid
    }

    pub fn idx(&self, ix: usize, iy: usize) -> usize {
        self.grid.idx(ix, iy)
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    pub fn get(&self, ix: usize, iy: usize) -> &Complex64 {
        let idx = self.idx(ix, iy);
        &self.data[idx]
    }

    pub fn get_mut(&mut self, ix: usize, iy: usize) -> &mut Complex64 {
        let idx = self.idx(ix, iy);
        &mut self.data[idx]
    }

    /// `|f|²` at every sample.
    pub fn intensity(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.norm_sqr()).collect()
    }

    /// `Σ|f|²` (no area weight).
    pub fn norm_sqr(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum()
    }

    /// `∫|f|² dA` over the grid.
    pub fn energy(&self) -> f64 {
        self.norm_sqr() * self.grid.cell_area()
    }

    /// `Σ conj(self)·other`; zero when the grids differ.
    pub fn inner(&self, other: &Field2D) -> Complex64 {
        if self.grid.nx != other.grid.nx || self.grid.ny != other.grid.ny {
            return Complex64::default();
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.conj() * *b)
            .sum()
    }

    pub fn scale(&mut self, factor: Complex64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    pub fn scaled(&self, factor: Complex64) -> Self {
        let mut out = self.clone();
        out.scale(factor);
        out
    }

    /// Sample with the largest magnitude.
    pub fn peak(&self) -> Complex64 {
        self.data
            .iter()
            .copied()
            .fold(Complex64::default(), |best, v| {
                if v.norm_sqr() > best.norm_sqr() {
                    v
                } else {
                    best
                }
            })
    }

    /// Bilinear interpolation between cell centres. The field falls to zero
    /// one cell beyond the boundary and is zero outside.
    pub fn sample(&self, x: f64, y: f64) -> Complex64 {
        let g = self.grid;
        let fx = x / g.dx - 0.5;
        let fy = y / g.dy - 0.5;
        if !(fx > -1.0 && fx < g.nx as f64 && fy > -1.0 && fy < g.ny as f64) {
            return Complex64::default();
        }
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (ix, iy) = (x0 as isize, y0 as isize);
        let at = |i: isize, j: isize| -> Complex64 {
            if i < 0 || j < 0 || i as usize >= g.nx || j as usize >= g.ny {
                Complex64::default()
            } else {
                self.data[g.idx(i as usize, j as usize)]
            }
        };
        at(ix, iy) * ((1.0 - tx) * (1.0 - ty))
            + at(ix + 1, iy) * (tx * (1.0 - ty))
            + at(ix, iy + 1) * ((1.0 - tx) * ty)
            + at(ix + 1, iy + 1) * (tx * ty)
    }

    /// This field interpolated onto the cell centres of `grid`.
    pub fn resample(&self, grid: Grid2D) -> Self {
        if grid == self.grid {
            return self.clone();
        }
        Self::from_fn(grid, |x, y| self.sample(x, y))
    }
}

impl From<Field2D> for Vec<Complex64> {
    fn from(field: Field2D) -> Self {
        field.data
    }
}
