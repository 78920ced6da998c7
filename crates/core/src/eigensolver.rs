//! Shift-invert Arnoldi eigensolver for banded finite-difference operators.
//!
//! # Algorithm
//!
//! 1. Factor `A - σI = LU` once (banded, partial pivoting).
//! 2. Build a Krylov basis of `(A - σI)⁻¹` with modified Gram-Schmidt and one
//!    re-orthogonalization pass.
//! 3. Solve the projected Hessenberg problem densely; the Ritz values `θ` of
//!    largest magnitude map back to the eigenvalues `λ = σ + 1/θ` nearest σ.
//! 4. Restart explicitly from the sum of the wanted Ritz vectors until every
//!    wanted residual `|h_{m+1,m}|·|y_m| ≤ tol·|θ|`, or the restart budget runs out.

pub mod banded;
pub mod hessenberg;

use log::{debug, trace};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::SolverConvergenceError;

use banded::BandMatrix;
use hessenberg::hessenberg_eigen;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenOptions {
    /// Relative Ritz residual required for convergence.
    pub tol: f64,
    /// Restart budget; exhausting it is a convergence failure.
    pub max_restarts: usize,
    /// Krylov subspace dimension; `None` picks `max(2·nev + 20, 40)`.
    pub krylov_dim: Option<usize>,
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self {
            tol: 1e-9,
            max_restarts: 50,
            krylov_dim: None,
        }
    }
}

impl EigenOptions {
    fn subspace_dim(&self, nev: usize, n: usize) -> usize {
        let m = self.krylov_dim.unwrap_or((2 * nev + 20).max(40));
        m.max(nev + 2).min(n)
    }
}

/// Converged eigenpairs, ordered by distance from the shift (nearest first).
#[derive(Debug, Clone)]
pub struct EigenPairs {
    pub values: Vec<Complex64>,
    pub vectors: Vec<Vec<Complex64>>,
    pub shift: Complex64,
    pub restarts: usize,
    pub applications: usize,
}

/// The `nev` eigenpairs of `matrix` nearest to `shift`.
pub fn shift_invert_eigs(
    matrix: &BandMatrix,
    shift: Complex64,
    nev: usize,
    opts: &EigenOptions,
) -> Result<EigenPairs, SolverConvergenceError> {
    let n = matrix.dim();
    let nev = nev.min(n);
    if nev == 0 {
        return Ok(EigenPairs {
            values: Vec::new(),
            vectors: Vec::new(),
            shift,
            restarts: 0,
            applications: 0,
        });
    }

    // A shift sitting exactly on an eigenvalue makes the factor singular;
    // nudge it a few times before giving up.
    let mut sigma = shift;
    let mut lu = None;
    for attempt in 0..4 {
        match matrix.shifted(sigma).factor() {
            Ok(f) => {
                lu = Some(f);
                break;
            }
            Err(pivot) => {
                debug!(
                    "[eigen] singular pivot at row {} for shift {sigma}, retry {attempt}",
                    pivot.row
                );
                sigma *= 1.0 + 1e-7;
            }
        }
    }
    let lu = lu.ok_or(SolverConvergenceError {
        requested: nev,
        converged: 0,
        restarts: 0,
        residual: f64::INFINITY,
    })?;

    let mut pairs = arnoldi(|x| lu.solve(x), n, nev, opts)?;
    for v in pairs.values.iter_mut() {
        *v = sigma + Complex64::new(1.0, 0.0) / *v;
    }
    pairs.shift = sigma;
    Ok(pairs)
}

/// Restarted Arnoldi for the `nev` largest-magnitude eigenvalues of `op`.
pub fn arnoldi<F>(
    op: F,
    n: usize,
    nev: usize,
    opts: &EigenOptions,
) -> Result<EigenPairs, SolverConvergenceError>
where
    F: Fn(&[Complex64]) -> Vec<Complex64>,
{
    let m = opts.subspace_dim(nev, n);
    let mut start = initial_vector(n);
    let mut applications = 0usize;
    let mut worst = f64::INFINITY;
    let mut converged = 0usize;

    for restart in 0..=opts.max_restarts {
        let mut basis: Vec<Vec<Complex64>> = Vec::with_capacity(m + 1);
        basis.push(start.clone());
        let mut h = vec![Complex64::default(); (m + 1) * m];
        let mut size = m;
        let mut breakdown = false;

        for j in 0..m {
            let mut w = op(&basis[j]);
            applications += 1;
            let w_norm0 = norm(&w);
            for _pass in 0..2 {
                for (i, v) in basis.iter().enumerate() {
                    let coeff = dot(v, &w);
                    h[i * m + j] += coeff;
                    axpy(-coeff, v, &mut w);
                }
            }
            let beta = norm(&w);
            h[(j + 1) * m + j] = Complex64::new(beta, 0.0);
            if beta <= 1e-13 * w_norm0.max(f64::MIN_POSITIVE) {
                size = j + 1;
                breakdown = true;
                break;
            }
            w.iter_mut().for_each(|x| *x /= beta);
            basis.push(w);
        }

        let mut projected = vec![Complex64::default(); size * size];
        for i in 0..size {
            for j in 0..size {
                projected[i * size + j] = h[i * m + j];
            }
        }
        let Some((theta, ritz)) = hessenberg_eigen(&projected, size) else {
            debug!("[eigen] projected QR stalled at restart {restart}");
            start = perturb(&start, restart);
            continue;
        };

        let mut order: Vec<usize> = (0..size).collect();
        order.sort_by(|&a, &b| theta[b].norm().total_cmp(&theta[a].norm()));
        let wanted: Vec<usize> = order.into_iter().take(nev.min(size)).collect();

        let beta = if breakdown {
            0.0
        } else {
            h[size * m + size - 1].norm()
        };
        let residuals: Vec<f64> = wanted
            .iter()
            .map(|&k| {
                let y_last = ritz[k * size + size - 1].norm();
                beta * y_last / theta[k].norm().max(f64::MIN_POSITIVE)
            })
            .collect();
        worst = residuals.iter().copied().fold(0.0, f64::max);
        converged = residuals.iter().filter(|&&r| r <= opts.tol).count();
        trace!(
            "[eigen] restart={restart} dim={size} converged={converged}/{} worst={worst:.3e}",
            wanted.len()
        );

        let vectors: Vec<Vec<Complex64>> = wanted
            .iter()
            .map(|&k| {
                let y = &ritz[k * size..(k + 1) * size];
                let mut x = vec![Complex64::default(); n];
                for (l, v) in basis.iter().take(size).enumerate() {
                    axpy(y[l], v, &mut x);
                }
                let nx = norm(&x);
                if nx > 0.0 {
                    x.iter_mut().for_each(|e| *e /= nx);
                }
                x
            })
            .collect();

        if converged == wanted.len() && wanted.len() == nev {
            debug!(
                "[eigen] converged {nev} eigenpairs after {restart} restart(s), {applications} applications"
            );
            return Ok(EigenPairs {
                values: wanted.iter().map(|&k| theta[k]).collect(),
                vectors,
                shift: Complex64::default(),
                restarts: restart,
                applications,
            });
        }

        let mut next = vec![Complex64::default(); n];
        for x in &vectors {
            axpy(Complex64::new(1.0, 0.0), x, &mut next);
        }
        let nn = norm(&next);
        start = if nn > 0.0 && !breakdown {
            next.iter().map(|e| *e / nn).collect()
        } else {
            perturb(&start, restart)
        };
    }

    Err(SolverConvergenceError {
        requested: nev,
        converged,
        restarts: opts.max_restarts,
        residual: worst,
    })
}

// ============================================================================
// Vector helpers
// ============================================================================

/// `Σ conj(a)·b`.
pub fn dot(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * *y).sum()
}

pub fn norm(a: &[Complex64]) -> f64 {
    a.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// `y += alpha·x`.
pub fn axpy(alpha: Complex64, x: &[Complex64], y: &mut [Complex64]) {
    for (yi, xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * *xi;
    }
}

/// Deterministic start vector with no special symmetry.
fn initial_vector(n: usize) -> Vec<Complex64> {
    let mut v: Vec<Complex64> = (0..n)
        .map(|i| {
            let t = i as f64;
            Complex64::new(1.0 + 0.25 * (0.37 * t).sin(), 0.1 * (0.11 * t).cos())
        })
        .collect();
    let nv = norm(&v);
    v.iter_mut().for_each(|x| *x /= nv);
    v
}

fn perturb(v: &[Complex64], salt: usize) -> Vec<Complex64> {
    let mut out: Vec<Complex64> = v
        .iter()
        .enumerate()
        .map(|(i, x)| *x + Complex64::new(0.05 * ((i + salt) as f64 * 0.73).sin(), 0.0))
        .collect();
    let n = norm(&out);
    out.iter_mut().for_each(|x| *x /= n);
    out
}
