//! Dense eigen-decomposition of the small upper-Hessenberg matrices produced
//! by Arnoldi iteration.
//!
//! Shifted QR with Givens rotations reduces `H` to complex Schur form
//! `H = Z T Zᴴ`; eigenvectors of `T` follow by back substitution and are
//! mapped back through `Z`.

use num_complex::Complex64;

const MAX_SWEEPS_PER_EIGENVALUE: usize = 60;

/// Eigenvalues and unit eigenvectors of an `m x m` upper-Hessenberg matrix
/// stored row-major. Vector `k` occupies `vectors[k * m..(k + 1) * m]`.
///
/// Returns `None` if the QR iteration stalls.
pub fn hessenberg_eigen(h: &[Complex64], m: usize) -> Option<(Vec<Complex64>, Vec<Complex64>)> {
    assert_eq!(h.len(), m * m, "matrix storage must be m x m");
    if m == 0 {
        return Some((Vec::new(), Vec::new()));
    }

    let mut t = h.to_vec();
    let mut z = vec![Complex64::default(); m * m];
    for i in 0..m {
        z[i * m + i] = Complex64::new(1.0, 0.0);
    }
    schur_reduce(&mut t, &mut z, m)?;

    let values: Vec<Complex64> = (0..m).map(|i| t[i * m + i]).collect();
    let scale = frobenius(&t).max(f64::MIN_POSITIVE);

    let mut vectors = vec![Complex64::default(); m * m];
    let mut v = vec![Complex64::default(); m];
    for k in 0..m {
        let lambda = values[k];
        v.iter_mut().for_each(|x| *x = Complex64::default());
        v[k] = Complex64::new(1.0, 0.0);
        for j in (0..k).rev() {
            let mut acc = Complex64::default();
            for l in j + 1..=k {
                acc += t[j * m + l] * v[l];
            }
            let mut denom = t[j * m + j] - lambda;
            if denom.norm() < f64::EPSILON * scale {
                denom = Complex64::new(f64::EPSILON * scale, 0.0);
            }
            v[j] = -acc / denom;
        }

        let out = &mut vectors[k * m..(k + 1) * m];
        for (i, o) in out.iter_mut().enumerate() {
            let mut acc = Complex64::default();
            for l in 0..=k {
                acc += z[i * m + l] * v[l];
            }
            *o = acc;
        }
        let norm = out.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|x| *x /= norm);
        }
    }

    Some((values, vectors))
}

fn frobenius(a: &[Complex64]) -> f64 {
    a.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// In-place reduction of Hessenberg `t` to upper-triangular Schur form,
/// accumulating the unitary similarity into `z`.
fn schur_reduce(t: &mut [Complex64], z: &mut [Complex64], m: usize) -> Option<()> {
    let norm = frobenius(t).max(f64::MIN_POSITIVE);
    let mut hi = m - 1;
    let mut sweeps = 0usize;
    let mut total = 0usize;

    while hi > 0 {
        // Deflate at the lowest negligible subdiagonal.
        let mut lo = hi;
        while lo > 0 {
            let sub = t[lo * m + lo - 1].norm();
            let mut diag = t[lo * m + lo].norm() + t[(lo - 1) * m + lo - 1].norm();
            if diag == 0.0 {
                diag = norm;
            }
            if sub <= f64::EPSILON * diag {
                t[lo * m + lo - 1] = Complex64::default();
                break;
            }
            lo -= 1;
        }
        if lo == hi {
            hi -= 1;
            sweeps = 0;
            continue;
        }

        sweeps += 1;
        total += 1;
        if sweeps > MAX_SWEEPS_PER_EIGENVALUE || total > MAX_SWEEPS_PER_EIGENVALUE * m {
            return None;
        }

        let mu = if sweeps % 11 == 0 {
            // Exceptional shift to break cycles.
            t[hi * m + hi] + Complex64::new(t[hi * m + hi - 1].norm(), 0.0)
        } else {
            wilkinson_shift(
                t[(hi - 1) * m + hi - 1],
                t[(hi - 1) * m + hi],
                t[hi * m + hi - 1],
                t[hi * m + hi],
            )
        };

        for k in lo..hi {
            let (x, y) = if k == lo {
                (t[lo * m + lo] - mu, t[(lo + 1) * m + lo])
            } else {
                (t[k * m + k - 1], t[(k + 1) * m + k - 1])
            };
            let r = (x.norm_sqr() + y.norm_sqr()).sqrt();
            if r == 0.0 {
                continue;
            }
            let c = x / r;
            let s = y / r;

            // Rows k, k+1 from the left.
            let first_col = if k == lo { lo } else { k - 1 };
            for j in first_col..m {
                let a = t[k * m + j];
                let b = t[(k + 1) * m + j];
                t[k * m + j] = c.conj() * a + s.conj() * b;
                t[(k + 1) * m + j] = -s * a + c * b;
            }
            if k > lo {
                t[(k + 1) * m + k - 1] = Complex64::default();
            }

            // Columns k, k+1 from the right.
            let last_row = (k + 2).min(hi);
            for i in 0..=last_row {
                let a = t[i * m + k];
                let b = t[i * m + k + 1];
                t[i * m + k] = a * c + b * s;
                t[i * m + k + 1] = -a * s.conj() + b * c.conj();
            }
            for i in 0..m {
                let a = z[i * m + k];
                let b = z[i * m + k + 1];
                z[i * m + k] = a * c + b * s;
                z[i * m + k + 1] = -a * s.conj() + b * c.conj();
            }
        }
    }
    Some(())
}

/// Eigenvalue of the trailing 2x2 block closest to its last diagonal entry.
fn wilkinson_shift(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Complex64 {
    let half_tr = (a + d) * 0.5;
    let disc = ((a - d) * 0.5 * ((a - d) * 0.5) + b * c).sqrt();
    let mu1 = half_tr + disc;
    let mu2 = half_tr - disc;
    if (mu1 - d).norm() <= (mu2 - d).norm() {
        mu1
    } else {
        mu2
    }
}
