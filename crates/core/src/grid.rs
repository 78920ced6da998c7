//! Uniform cell-centred grid helpers.

use serde::{Deserialize, Serialize};

/// `nx` x `ny` cells of size `dx` x `dy`, sampled at cell centres.
///
/// Storage is row-major over `(x, y)` with y fastest, so a 2-D array of shape
/// `(len(x), len(y))` maps onto a flat slice via [`Grid2D::idx`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid2D {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
}

impl Grid2D {
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Self {
        Self { nx, ny, dx, dy }
    }

    #[inline]
    pub fn idx(&self, ix: usize, iy: usize) -> usize {
        ix * self.ny + iy
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn x_at(&self, ix: usize) -> f64 {
        (ix as f64 + 0.5) * self.dx
    }

    #[inline]
    pub fn y_at(&self, iy: usize) -> f64 {
        (iy as f64 + 0.5) * self.dy
    }

    /// Strictly increasing x coordinates of the cell centres.
    pub fn x(&self) -> Vec<f64> {
        (0..self.nx).map(|i| self.x_at(i)).collect()
    }

    /// Strictly increasing y coordinates of the cell centres.
    pub fn y(&self) -> Vec<f64> {
        (0..self.ny).map(|j| self.y_at(j)).collect()
    }

    pub fn cell_area(&self) -> f64 {
        self.dx * self.dy
    }

    pub fn width(&self) -> f64 {
        self.nx as f64 * self.dx
    }

    pub fn height(&self) -> f64 {
        self.ny as f64 * self.dy
    }
}
