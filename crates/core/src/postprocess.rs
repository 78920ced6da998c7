//! Mode post-processing: power normalization, Gaussian fits, effective areas,
//! overlaps and fiber coupling.

use log::trace;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::field::Field2D;
use crate::mode::Mode;
use crate::polarization::Polarization;

// ============================================================================
// Normalization
// ============================================================================

/// Power carried by the mode.
///
/// Vectorial modes integrate `½·Re(E×H*)·ẑ`; semi-vectorial modes, which carry
/// no magnetic field, integrate `|E|²`.
pub fn power(mode: &Mode) -> f64 {
    let fields = mode.fields();
    match (&fields.ex, &fields.ey, &fields.hx, &fields.hy) {
        (Some(ex), Some(ey), Some(hx), Some(hy)) => {
            let area = ex.grid().cell_area();
            let sz: f64 = ex
                .as_slice()
                .iter()
                .zip(hy.as_slice())
                .zip(ey.as_slice().iter().zip(hx.as_slice()))
                .map(|((ex, hy), (ey, hx))| (*ex * hy.conj() - *ey * hx.conj()).re)
                .sum();
            0.5 * sz * area
        }
        _ => [mode.ex(), mode.ey()]
            .into_iter()
            .flatten()
            .map(Field2D::energy)
            .sum(),
    }
}

/// Rescales every field so that [`power`] equals 1. Normalizing a normalized
/// mode leaves it unchanged.
pub fn normalize(mode: &Mode) -> Result<Mode, ConfigurationError> {
    let p = power(mode);
    if !p.is_finite() || p.abs() <= f64::MIN_POSITIVE {
        return Err(ConfigurationError::Invalid(format!(
            "mode carries no power to normalize (P = {p:e})"
        )));
    }
    let factor = 1.0 / p.abs().sqrt();
    Ok(mode.rescaled(Complex64::new(factor, 0.0)))
}

// ============================================================================
// Gaussian fit
// ============================================================================

/// `A·exp(−(x−x0)²/2σx² − (y−y0)²/2σy²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub center: (f64, f64),
    /// `(σx², σy²)`.
    pub variances: (f64, f64),
}

impl GaussianFit {
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.center.0;
        let dy = y - self.center.1;
        self.amplitude
            * (-(dx * dx) / (2.0 * self.variances.0) - (dy * dy) / (2.0 * self.variances.1)).exp()
    }

    pub fn effective_area(&self) -> f64 {
        gaussian_effective_area(self)
    }
}

/// `(∫I)²/∫I²` of the fitted Gaussian, `4π·σx·σy`.
pub fn gaussian_effective_area(fit: &GaussianFit) -> f64 {
    4.0 * std::f64::consts::PI * (fit.variances.0 * fit.variances.1).sqrt()
}

const FIT_MAX_ITER: usize = 200;

/// Least-squares fit of a 2D Gaussian to `intensity`, sampled at `x × y` with
/// y fastest. Starts from the intensity moments and refines with
/// Levenberg-Marquardt.
pub fn fit_gaussian(x: &[f64], y: &[f64], intensity: &[f64]) -> Result<GaussianFit, ConfigurationError> {
    if x.len() * y.len() != intensity.len() || intensity.is_empty() {
        return Err(ConfigurationError::Invalid(format!(
            "intensity has {} samples, expected {}x{}",
            intensity.len(),
            x.len(),
            y.len()
        )));
    }
    let points: Vec<((f64, f64), f64)> = x
        .iter()
        .flat_map(|&xi| y.iter().map(move |&yi| (xi, yi)))
        .zip(intensity.iter().copied())
        .collect();
    let samples = || points.iter().copied();

    // Moments of the clipped intensity.
    let total: f64 = intensity.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(ConfigurationError::Invalid(
            "intensity has no positive samples to fit".into(),
        ));
    }
    let (mut mx, mut my) = (0.0, 0.0);
    for ((xi, yi), v) in samples() {
        mx += v.max(0.0) * xi;
        my += v.max(0.0) * yi;
    }
    mx /= total;
    my /= total;
    let (mut vx, mut vy) = (0.0, 0.0);
    for ((xi, yi), v) in samples() {
        vx += v.max(0.0) * (xi - mx).powi(2);
        vy += v.max(0.0) * (yi - my).powi(2);
    }
    let floor = |axis: &[f64]| {
        let step = if axis.len() > 1 { (axis[1] - axis[0]).abs() } else { 1.0 };
        (0.25 * step * step).max(f64::MIN_POSITIVE)
    };
    let mut p = [
        intensity.iter().copied().fold(f64::MIN, f64::max),
        mx,
        my,
        (vx / total).max(floor(x)),
        (vy / total).max(floor(y)),
    ];

    let sse = |p: &[f64; 5]| -> f64 {
        let fit = to_fit(p);
        samples().map(|((xi, yi), v)| (v - fit.eval(xi, yi)).powi(2)).sum()
    };

    let mut err = sse(&p);
    let mut mu = 1e-3;
    for iter in 0..FIT_MAX_ITER {
        let mut jtj = [[0.0; 5]; 5];
        let mut jtr = [0.0; 5];
        for ((xi, yi), v) in samples() {
            let dx = xi - p[1];
            let dy = yi - p[2];
            let g = (-(dx * dx) / (2.0 * p[3]) - (dy * dy) / (2.0 * p[4])).exp();
            let f = p[0] * g;
            let jac = [
                g,
                f * dx / p[3],
                f * dy / p[4],
                f * dx * dx / (2.0 * p[3] * p[3]),
                f * dy * dy / (2.0 * p[4] * p[4]),
            ];
            let r = v - f;
            for a in 0..5 {
                jtr[a] += jac[a] * r;
                for b in 0..5 {
                    jtj[a][b] += jac[a] * jac[b];
                }
            }
        }

        let mut improved = false;
        while mu < 1e12 {
            let mut damped = jtj;
            for (a, row) in damped.iter_mut().enumerate() {
                row[a] += mu * jtj[a][a].max(f64::MIN_POSITIVE);
            }
            let Some(delta) = solve5(damped, jtr) else {
                mu *= 10.0;
                continue;
            };
            let mut trial = p;
            for (t, d) in trial.iter_mut().zip(delta) {
                *t += d;
            }
            if trial[3] <= 0.0 || trial[4] <= 0.0 {
                mu *= 10.0;
                continue;
            }
            let trial_err = sse(&trial);
            if trial_err <= err {
                let change = err - trial_err;
                p = trial;
                err = trial_err;
                mu = (mu / 3.0).max(1e-12);
                improved = change > 1e-15 * err.max(f64::MIN_POSITIVE);
                break;
            }
            mu *= 3.0;
        }
        if !improved {
            trace!("[fit] converged after {iter} iteration(s), sse={err:.3e}");
            break;
        }
    }

    Ok(to_fit(&p))
}

fn to_fit(p: &[f64; 5]) -> GaussianFit {
    GaussianFit {
        amplitude: p[0],
        center: (p[1], p[2]),
        variances: (p[3], p[4]),
    }
}

/// Gaussian elimination with partial pivoting on a 5×5 system.
fn solve5(mut a: [[f64; 5]; 5], mut b: [f64; 5]) -> Option<[f64; 5]> {
    for col in 0..5 {
        let pivot = (col..5).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..5 {
            let factor = a[row][col] / a[col][col];
            for k in col..5 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0; 5];
    for row in (0..5).rev() {
        let mut acc = b[row];
        for k in row + 1..5 {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

// ============================================================================
// Areas, overlaps and energy split
// ============================================================================

/// `(∫I dA)² / ∫I² dA` of the transverse-E intensity.
pub fn effective_area(mode: &Mode) -> f64 {
    let (Some(grid), Some(intensity)) = (mode.grid(), mode.transverse_intensity()) else {
        return 0.0;
    };
    let da = grid.cell_area();
    let first: f64 = intensity.iter().sum::<f64>() * da;
    let second: f64 = intensity.iter().map(|v| v * v).sum::<f64>() * da;
    if second > 0.0 {
        first * first / second
    } else {
        0.0
    }
}

/// `|⟨a, b⟩| / (‖a‖·‖b‖)` over the transverse E components. When the grids
/// differ, `b` is interpolated onto the grid of `a` first.
pub fn overlap(a: &Mode, b: &Mode) -> f64 {
    let (Some(grid), Some(other)) = (a.grid(), b.grid()) else {
        return 0.0;
    };
    let resampled;
    let b = if other == grid {
        b
    } else {
        resampled = b.resampled(grid);
        &resampled
    };
    let mut inner = Complex64::default();
    for (fa, fb) in [(a.ex(), b.ex()), (a.ey(), b.ey())] {
        if let (Some(fa), Some(fb)) = (fa, fb) {
            inner += fa.inner(fb);
        }
    }
    let norm = |m: &Mode| -> f64 {
        [m.ex(), m.ey()]
            .into_iter()
            .flatten()
            .map(Field2D::norm_sqr)
            .sum::<f64>()
            .sqrt()
    };
    let denom = norm(a) * norm(b);
    if denom > 0.0 {
        (inner.norm() / denom).min(1.0)
    } else {
        0.0
    }
}

/// Share of `Σ|E|²` and `Σ|H|²` in each component, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyFractions {
    /// `[x, y, z]`.
    pub electric: [f64; 3],
    pub magnetic: [f64; 3],
}

pub fn field_energy_fractions(mode: &Mode) -> EnergyFractions {
    fn split(parts: [Option<&Field2D>; 3]) -> [f64; 3] {
        let energies = parts.map(|f| f.map_or(0.0, Field2D::norm_sqr));
        let total: f64 = energies.iter().sum();
        if total > 0.0 {
            energies.map(|e| 100.0 * e / total)
        } else {
            [0.0; 3]
        }
    }
    EnergyFractions {
        electric: split([mode.ex(), mode.ey(), mode.ez()]),
        magnetic: split([mode.hx(), mode.hy(), mode.hz()]),
    }
}

// ============================================================================
// Fiber coupling
// ============================================================================

/// Coupling efficiency into a Gaussian fiber mode centred on the mode's
/// intensity centroid.
pub fn coupling_efficiency(mode: &Mode, fiber_mfd: f64) -> Result<f64, ConfigurationError> {
    ConfigurationError::positive("fiber_mfd", fiber_mfd)?;
    let center = intensity_centroid(mode).ok_or_else(|| {
        ConfigurationError::Invalid("mode has no transverse field to couple".into())
    })?;
    coupling_efficiency_at(mode, fiber_mfd, center)
}

/// Coupling efficiency into a Gaussian fiber mode of diameter `fiber_mfd`
/// centred at `center`.
///
/// The fiber is polarized along the mode's dominant axis: only that E
/// component enters the overlap, while the full transverse energy enters the
/// normalization.
pub fn coupling_efficiency_at(
    mode: &Mode,
    fiber_mfd: f64,
    center: (f64, f64),
) -> Result<f64, ConfigurationError> {
    ConfigurationError::positive("fiber_mfd", fiber_mfd)?;
    let matching = match mode.polarization() {
        Polarization::TE => mode.ex(),
        Polarization::TM => mode.ey(),
    };
    let Some(matching) = matching else {
        return Ok(0.0);
    };
    let grid = matching.grid();
    let w = 0.5 * fiber_mfd;
    let fiber = Field2D::from_fn(grid, |x, y| {
        let r2 = (x - center.0).powi(2) + (y - center.1).powi(2);
        Complex64::new((-r2 / (w * w)).exp(), 0.0)
    });

    let mode_energy: f64 = [mode.ex(), mode.ey()]
        .into_iter()
        .flatten()
        .map(Field2D::norm_sqr)
        .sum();
    let fiber_energy = fiber.norm_sqr();
    if mode_energy <= 0.0 || fiber_energy <= 0.0 {
        return Ok(0.0);
    }
    let eta = fiber.inner(matching).norm_sqr() / (mode_energy * fiber_energy);
    Ok(eta.clamp(0.0, 1.0))
}

fn intensity_centroid(mode: &Mode) -> Option<(f64, f64)> {
    let grid = mode.grid()?;
    let intensity = mode.transverse_intensity()?;
    let total: f64 = intensity.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let (mut cx, mut cy) = (0.0, 0.0);
    for ix in 0..grid.nx {
        for iy in 0..grid.ny {
            let v = intensity[grid.idx(ix, iy)];
            cx += v * grid.x_at(ix);
            cy += v * grid.y_at(iy);
        }
    }
    Some((cx / total, cy / total))
}
