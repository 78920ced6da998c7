//! Semi-vectorial finite-difference solver.
//!
//! Solves the scalar wave equation for the dominant transverse E component
//! (Ex for TE, Ey for TM):
//!
//! ```text
//! ∂p[(1/ε) ∂p(ε E)] + ∂q² E + k0² ε E = β² E
//! ```
//!
//! where `p` is the polarization axis and `q` the other one. The `ε` at each
//! half-node along `p` is the arithmetic mean of its neighbours for TE and the
//! harmonic mean for TM. Fields vanish outside the domain.

use log::debug;
use num_complex::Complex64;

use crate::dielectric::Dielectric2D;
use crate::eigensolver::banded::BandMatrix;
use crate::eigensolver::shift_invert_eigs;
use crate::error::{ConfigurationError, ModeSolverError};
use crate::field::Field2D;
use crate::mode::{Mode, ModeFields, ModeSet, SolveDiagnostics, SolverKind};
use crate::polarization::Polarization;
use crate::solver::{self, SolveOptions};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

fn polarization_axis(polarization: Polarization) -> Axis {
    match polarization {
        Polarization::TE => Axis::X,
        Polarization::TM => Axis::Y,
    }
}

fn interface_eps(polarization: Polarization, a: f64, b: f64) -> f64 {
    match polarization {
        Polarization::TE => 0.5 * (a + b),
        Polarization::TM => 2.0 / (1.0 / a + 1.0 / b),
    }
}

/// Scalar operator of size `Nx·Ny`, ordered like [`crate::grid::Grid2D::idx`].
pub fn assemble(dielectric: &Dielectric2D, polarization: Polarization) -> BandMatrix {
    let grid = dielectric.grid;
    let (nx, ny) = (grid.nx, grid.ny);
    let eps = match polarization {
        Polarization::TE => dielectric.eps_xx(),
        Polarization::TM => dielectric.eps_yy(),
    };
    let k0sq = dielectric.k0().powi(2);
    let mut a = BandMatrix::zeros(grid.len(), ny, ny);

    // Along the polarization axis the step is dp, across it dq.
    let (dp, dq) = match polarization {
        Polarization::TE => (grid.dx, grid.dy),
        Polarization::TM => (grid.dy, grid.dx),
    };
    let inv_dp2 = 1.0 / (dp * dp);
    let inv_dq2 = 1.0 / (dq * dq);
    let pol_axis = polarization_axis(polarization);

    for ix in 0..nx {
        for iy in 0..ny {
            let r = grid.idx(ix, iy);
            let e = eps[r];
            a.add_real(r, r, k0sq * e);

            let neighbours = [
                (ix.checked_sub(1).map(|i| grid.idx(i, iy)), Axis::X),
                ((ix + 1 < nx).then(|| grid.idx(ix + 1, iy)), Axis::X),
                (iy.checked_sub(1).map(|j| grid.idx(ix, j)), Axis::Y),
                ((iy + 1 < ny).then(|| grid.idx(ix, iy + 1)), Axis::Y),
            ];
            for (neighbour, axis) in neighbours {
                if axis == pol_axis {
                    // Flux through the half-node towards the neighbour; outside
                    // the domain the mirror value keeps ε continuous.
                    let e_n = neighbour.map_or(e, |c| eps[c]);
                    let e_half = interface_eps(polarization, e, e_n);
                    a.add_real(r, r, -e / e_half * inv_dp2);
                    if let Some(c) = neighbour {
                        a.add_real(r, c, e_n / e_half * inv_dp2);
                    }
                } else {
                    a.add_real(r, r, -inv_dq2);
                    if let Some(c) = neighbour {
                        a.add_real(r, c, inv_dq2);
                    }
                }
            }
        }
    }
    a
}

/// Solves for up to `n_modes` modes of one polarization.
pub fn solve(
    dielectric: &Dielectric2D,
    n_modes: usize,
    polarization: Polarization,
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
        "[semi] pol={polarization} grid={}x{} n_modes={n_modes} shift_index={shift_index:.4}",
        grid.nx, grid.ny
    );
    let matrix = assemble(dielectric, polarization);
    let pairs = shift_invert_eigs(&matrix, shift, n_modes, &opts.eigen)?;

    let kind = SolverKind::semi(polarization);
    let mut discarded = 0;
    let mut modes = Vec::with_capacity(pairs.values.len());
    for (lambda, vector) in pairs.values.iter().zip(pairs.vectors) {
        let neff = solver::neff_from_eigenvalue(*lambda, k0);
        if !solver::is_physical(neff, bounds) {
            discarded += 1;
            continue;
        }
        let field = Field2D::from_vec(grid, solver::fix_phase(vector))?;
        let fields = match polarization {
            Polarization::TE => ModeFields {
                ex: Some(field),
                ..ModeFields::default()
            },
            Polarization::TM => ModeFields {
                ey: Some(field),
                ..ModeFields::default()
            },
        };
        modes.push(Mode::new(neff, dielectric.wavelength(), kind, fields));
    }
    if discarded > 0 {
        debug!("[semi] discarded {discarded} non-physical eigenpair(s)");
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
