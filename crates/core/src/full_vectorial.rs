//! Fully-vectorial finite-difference solver on a Yee-staggered grid.
//!
//! Unknowns are the transverse magnetic fields, `Hx` at `(i, j+½)` and `Hy`
//! at `(i+½, j)`, interleaved per node (`2·idx`, `2·idx + 1`). With
//!
//! ```text
//! Q = Dx⁺Hx + Dy⁺Hy              (∝ Hz at (i+½, j+½))
//! R = Dy⁻Hx − Dx⁻Hy              (∝ Ez at (i, j))
//! ```
//!
//! the eigenproblem reads
//!
//! ```text
//! β² Hx = k0² εy Hx + Dx⁻Q + εy Dy⁺(R / εz)
//! β² Hy = k0² εx Hy + Dy⁻Q − εx Dx⁺(R / εz)
//! ```
//!
//! Every quantity is zero outside the domain, which places a perfect
//! conductor just beyond the outermost samples. Margins must be wide enough
//! for the guided field to decay before reaching it.

use log::debug;
use num_complex::Complex64;

use crate::dielectric::Dielectric2D;
use crate::eigensolver::banded::BandMatrix;
use crate::eigensolver::shift_invert_eigs;
use crate::error::{ConfigurationError, ModeSolverError};
use crate::field::Field2D;
use crate::grid::Grid2D;
use crate::mode::{Mode, ModeFields, ModeSet, SolveDiagnostics, SolverKind};
use crate::solver::{self, SolveOptions};

// ============================================================================
// Staggered permittivity
// ============================================================================

fn harmonic(a: f64, b: f64) -> f64 {
    2.0 / (1.0 / a + 1.0 / b)
}

/// Permittivity components resolved onto their Yee positions.
struct StaggeredEps {
    /// εx at the Hy/Ex site (i+½, j).
    x: Vec<f64>,
    /// εy at the Hx/Ey site (i, j+½).
    y: Vec<f64>,
    /// εz at the Ez site (i, j).
    z: Vec<f64>,
}

impl StaggeredEps {
    fn new(dielectric: &Dielectric2D) -> Self {
        let grid = dielectric.grid;
        let (exx, eyy) = (dielectric.eps_xx(), dielectric.eps_yy());
        let mut x = Vec::with_capacity(grid.len());
        let mut y = Vec::with_capacity(grid.len());
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                let here = grid.idx(i, j);
                let right = if i + 1 < grid.nx { grid.idx(i + 1, j) } else { here };
                let up = if j + 1 < grid.ny { grid.idx(i, j + 1) } else { here };
                x.push(harmonic(exx[here], exx[right]));
                y.push(harmonic(eyy[here], eyy[up]));
            }
        }
        Self {
            x,
            y,
            z: dielectric.eps_zz().to_vec(),
        }
    }
}

// ============================================================================
// Stencils
// ============================================================================

#[inline]
fn hx(grid: &Grid2D, i: usize, j: usize) -> usize {
    2 * grid.idx(i, j)
}

#[inline]
fn hy(grid: &Grid2D, i: usize, j: usize) -> usize {
    2 * grid.idx(i, j) + 1
}

/// `Q(i, j)` as `(unknown, weight)` terms.
fn q_terms(grid: &Grid2D, i: usize, j: usize) -> Vec<(usize, f64)> {
    let mut t = Vec::with_capacity(4);
    if i + 1 < grid.nx {
        t.push((hx(grid, i + 1, j), 1.0 / grid.dx));
    }
    t.push((hx(grid, i, j), -1.0 / grid.dx));
    if j + 1 < grid.ny {
        t.push((hy(grid, i, j + 1), 1.0 / grid.dy));
    }
    t.push((hy(grid, i, j), -1.0 / grid.dy));
    t
}

/// `R(i, j)` as `(unknown, weight)` terms.
fn r_terms(grid: &Grid2D, i: usize, j: usize) -> Vec<(usize, f64)> {
    let mut t = Vec::with_capacity(4);
    t.push((hx(grid, i, j), 1.0 / grid.dy));
    if j > 0 {
        t.push((hx(grid, i, j - 1), -1.0 / grid.dy));
    }
    t.push((hy(grid, i, j), -1.0 / grid.dx));
    if i > 0 {
        t.push((hy(grid, i - 1, j), 1.0 / grid.dx));
    }
    t
}

fn add_terms(a: &mut BandMatrix, row: usize, terms: &[(usize, f64)], scale: f64) {
    for &(col, w) in terms {
        a.add_real(row, col, w * scale);
    }
}

/// Coupled Hx/Hy operator of size `2·Nx·Ny`.
pub fn assemble(dielectric: &Dielectric2D) -> BandMatrix {
    let grid = dielectric.grid;
    let eps = StaggeredEps::new(dielectric);
    let k0sq = dielectric.k0().powi(2);
    let band = 2 * grid.ny + 1;
    let mut a = BandMatrix::zeros(2 * grid.len(), band, band);
    let (dx, dy) = (grid.dx, grid.dy);

    for i in 0..grid.nx {
        for j in 0..grid.ny {
            let n = grid.idx(i, j);

            let row = hx(&grid, i, j);
            let ey = eps.y[n];
            a.add_real(row, row, k0sq * ey);
            add_terms(&mut a, row, &q_terms(&grid, i, j), 1.0 / dx);
            if i > 0 {
                add_terms(&mut a, row, &q_terms(&grid, i - 1, j), -1.0 / dx);
            }
            if j + 1 < grid.ny {
                let up = grid.idx(i, j + 1);
                add_terms(&mut a, row, &r_terms(&grid, i, j + 1), ey / (eps.z[up] * dy));
            }
            add_terms(&mut a, row, &r_terms(&grid, i, j), -ey / (eps.z[n] * dy));

            let row = hy(&grid, i, j);
            let ex = eps.x[n];
            a.add_real(row, row, k0sq * ex);
            add_terms(&mut a, row, &q_terms(&grid, i, j), 1.0 / dy);
            if j > 0 {
                add_terms(&mut a, row, &q_terms(&grid, i, j - 1), -1.0 / dy);
            }
            if i + 1 < grid.nx {
                let right = grid.idx(i + 1, j);
                add_terms(&mut a, row, &r_terms(&grid, i + 1, j), -ex / (eps.z[right] * dx));
            }
            add_terms(&mut a, row, &r_terms(&grid, i, j), ex / (eps.z[n] * dx));
        }
    }
    a
}

// ============================================================================
// Field reconstruction
// ============================================================================

fn eval(terms: &[(usize, f64)], u: &[Complex64]) -> Complex64 {
    terms.iter().map(|&(c, w)| u[c] * w).sum()
}

/// Back-derives E and Hz from the solved `[Hx, Hy]` interleaved vector.
///
/// Magnetic fields are in units of `Z0·H`.
fn reconstruct(
    grid: Grid2D,
    eps: &StaggeredEps,
    k0: f64,
    beta: Complex64,
    u: &[Complex64],
) -> Result<ModeFields, ConfigurationError> {
    let j = Complex64::i();
    let n = grid.len();
    let mut hx_f = Vec::with_capacity(n);
    let mut hy_f = Vec::with_capacity(n);
    let mut hz_f = Vec::with_capacity(n);
    let mut ez_f = Vec::with_capacity(n);
    for ix in 0..grid.nx {
        for iy in 0..grid.ny {
            hx_f.push(u[hx(&grid, ix, iy)]);
            hy_f.push(u[hy(&grid, ix, iy)]);
            let q = eval(&q_terms(&grid, ix, iy), u);
            let r = eval(&r_terms(&grid, ix, iy), u);
            hz_f.push(q / (j * beta));
            ez_f.push(j * r / (k0 * eps.z[grid.idx(ix, iy)]));
        }
    }

    let mut ex_f = Vec::with_capacity(n);
    let mut ey_f = Vec::with_capacity(n);
    for ix in 0..grid.nx {
        for iy in 0..grid.ny {
            let idx = grid.idx(ix, iy);
            let hz_here = hz_f[idx];
            let hz_down = if iy > 0 { hz_f[grid.idx(ix, iy - 1)] } else { Complex64::default() };
            let hz_left = if ix > 0 { hz_f[grid.idx(ix - 1, iy)] } else { Complex64::default() };
            let dy_hz = (hz_here - hz_down) / grid.dy;
            let dx_hz = (hz_here - hz_left) / grid.dx;
            ex_f.push((dy_hz + j * beta * hy_f[idx]) / (j * k0 * eps.x[idx]));
            ey_f.push((-j * beta * hx_f[idx] - dx_hz) / (j * k0 * eps.y[idx]));
        }
    }

    Ok(ModeFields {
        ex: Some(Field2D::from_vec(grid, ex_f)?),
        ey: Some(Field2D::from_vec(grid, ey_f)?),
        ez: Some(Field2D::from_vec(grid, ez_f)?),
        hx: Some(Field2D::from_vec(grid, hx_f)?),
        hy: Some(Field2D::from_vec(grid, hy_f)?),
        hz: Some(Field2D::from_vec(grid, hz_f)?),
    })
}

// ============================================================================
// Solve
// ============================================================================

/// Solves for up to `n_modes` hybrid modes.
pub fn solve(
    dielectric: &Dielectric2D,
    n_modes: usize,
    opts: &SolveOptions,
) -> Result<ModeSet, ModeSolverError> {
    if n_modes == 0 {
        return Err(ConfigurationError::NoModesRequested.into());
    }
    let grid = dielectric.grid;
    let k0 = dielectric.k0();
    let bounds = dielectric.index_bounds();
    let shift_index = opts.shift_index.unwrap_or(bounds.1);
    let shift = Complex64::new((k0 * shift_index).powi(2), 0.0);

    debug!(
        "[full] grid={}x{} unknowns={} n_modes={n_modes} shift_index={shift_index:.4} anisotropic={}",
        grid.nx,
        grid.ny,
        2 * grid.len(),
        dielectric.is_anisotropic()
    );
    let matrix = assemble(dielectric);
    let pairs = shift_invert_eigs(&matrix, shift, n_modes, &opts.eigen)?;

    let eps = StaggeredEps::new(dielectric);
    let mut discarded = 0;
    let mut modes = Vec::with_capacity(pairs.values.len());
    for (lambda, vector) in pairs.values.iter().zip(pairs.vectors) {
        let neff = solver::neff_from_eigenvalue(*lambda, k0);
        if !solver::is_physical(neff, bounds) {
            discarded += 1;
            continue;
        }
        let u = solver::fix_phase(vector);
        let fields = reconstruct(grid, &eps, k0, neff * k0, &u)?;
        modes.push(Mode::new(neff, dielectric.wavelength(), SolverKind::Full, fields));
    }
    if discarded > 0 {
        debug!("[full] discarded {discarded} non-physical eigenpair(s)");
    }

    Ok(ModeSet::new(
        modes,
        n_modes,
        SolveDiagnostics {
            discarded,
            restarts: pairs.restarts,
            applications: pairs.applications,
            shift_index,
        },
    ))
}
