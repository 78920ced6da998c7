//! Quantities derived from solved effective indices.

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ModeSolverError};
use crate::geometry::WaveguideGeometry;
use crate::mode::SolverKind;
use crate::mode_tracking;
use crate::polarization::Polarization;
use crate::solver::{self, SolveOptions};

/// Half-width of the centred wavelength difference, in µm.
pub const DEFAULT_WAVELENGTH_DELTA: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupIndex {
    /// Mean of the two side solves.
    pub neff: f64,
    pub group_index: f64,
    pub polarization: Polarization,
}

/// Group index `ng = neff − λ·dneff/dλ` of each mode of `geometry`.
///
/// Solves at `λ ± delta` (material indices re-evaluated at each side),
/// tracks the modes of the upper solve onto those of the lower one and
/// differentiates per tracked pair. Modes guided on only one side are dropped.
pub fn group_index(
    geometry: &WaveguideGeometry,
    n_modes: usize,
    kind: SolverKind,
    delta: f64,
    opts: &SolveOptions,
) -> Result<Vec<GroupIndex>, ModeSolverError> {
    ConfigurationError::positive("wavelength delta", delta)?;
    let wavelength = geometry.wavelength();
    if delta >= wavelength {
        return Err(ConfigurationError::Invalid(format!(
            "wavelength delta {delta} must be smaller than the wavelength {wavelength}"
        ))
        .into());
    }

    let lower = solver::solve(&geometry.with_wavelength(wavelength - delta)?, n_modes, kind, opts)?;
    let upper = solver::solve(&geometry.with_wavelength(wavelength + delta)?, n_modes, kind, opts)?;

    let prev: Vec<_> = lower.iter().map(Some).collect();
    let tracked = mode_tracking::track_modes(&prev, upper.modes());

    let mut out = Vec::with_capacity(lower.len());
    for (slot, low) in lower.iter().enumerate() {
        let Some(high) = tracked.slots.get(slot).copied().flatten().and_then(|j| upper.get(j)) else {
            continue;
        };
        if high.polarization() != low.polarization() {
            continue;
        }
        let n_lo = low.neff().re;
        let n_hi = high.neff().re;
        let neff = 0.5 * (n_lo + n_hi);
        let slope = (n_hi - n_lo) / (2.0 * delta);
        out.push(GroupIndex {
            neff,
            group_index: neff - wavelength * slope,
            polarization: low.polarization(),
        });
    }
    debug!(
        "[derived] group index at {wavelength} um: {:?}",
        out.iter().map(|g| g.group_index).collect::<Vec<_>>()
    );
    Ok(out)
}

/// Grating coupler period `order·λ / (neff − n_clad·sin θ)`.
pub fn grating_coupler_period(
    wavelength: f64,
    neff: f64,
    n_clad: f64,
    incidence_angle_deg: f64,
    diffraction_order: u32,
) -> Result<f64, ConfigurationError> {
    ConfigurationError::positive("wavelength", wavelength)?;
    if diffraction_order == 0 {
        return Err(ConfigurationError::Invalid(
            "diffraction order must be at least 1".into(),
        ));
    }
    let denominator = neff - n_clad * incidence_angle_deg.to_radians().sin();
    if !(denominator > 0.0) {
        return Err(ConfigurationError::Invalid(format!(
            "grating equation has no solution: neff - n_clad*sin(theta) = {denominator}"
        )));
    }
    Ok(diffraction_order as f64 * wavelength / denominator)
}

/// First-order Bragg reflector period `λ / (2·neff)`.
pub fn dbr_period(wavelength: f64, neff: f64) -> Result<f64, ConfigurationError> {
    ConfigurationError::positive("wavelength", wavelength)?;
    ConfigurationError::positive("neff", neff)?;
    Ok(wavelength / (2.0 * neff))
}

// ============================================================================
// Bragg reflector spectrum
// ============================================================================

/// A periodic waveguide grating: `n_periods` repetitions of a section of
/// effective index `n1` and length `length1` followed by one of `n2`,
/// `length2`. The waveguide on both sides has index `n1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BraggGrating {
    pub n1: f64,
    pub n2: f64,
    pub length1: f64,
    pub length2: f64,
    pub n_periods: usize,
}

impl BraggGrating {
    /// Equal-length halves of `period`.
    pub fn new(n1: f64, n2: f64, period: f64, n_periods: usize) -> Result<Self, ConfigurationError> {
        let grating = Self {
            n1,
            n2,
            length1: 0.5 * period,
            length2: 0.5 * period,
            n_periods,
        };
        grating.validate()?;
        Ok(grating)
    }

    /// Quarter-wave sections at `wavelength`: `length_i = λ / (4·n_i)`.
    pub fn quarter_wave(
        n1: f64,
        n2: f64,
        wavelength: f64,
        n_periods: usize,
    ) -> Result<Self, ConfigurationError> {
        ConfigurationError::positive("wavelength", wavelength)?;
        ConfigurationError::positive("n1", n1)?;
        ConfigurationError::positive("n2", n2)?;
        let grating = Self {
            n1,
            n2,
            length1: wavelength / (4.0 * n1),
            length2: wavelength / (4.0 * n2),
            n_periods,
        };
        grating.validate()?;
        Ok(grating)
    }

    pub fn period(&self) -> f64 {
        self.length1 + self.length2
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        ConfigurationError::positive("n1", self.n1)?;
        ConfigurationError::positive("n2", self.n2)?;
        ConfigurationError::positive("grating section length", self.length1)?;
        ConfigurationError::positive("grating section length", self.length2)?;
        if self.n_periods == 0 {
            return Err(ConfigurationError::Invalid(
                "a Bragg grating needs at least one period".into(),
            ));
        }
        Ok(())
    }

    /// Normal-incidence reflectance and transmittance at `wavelength`.
    pub fn response(&self, wavelength: f64) -> Result<DbrResponse, ConfigurationError> {
        ConfigurationError::positive("wavelength", wavelength)?;
        let period = mat_mul(
            section_matrix(self.n1, self.length1, wavelength),
            section_matrix(self.n2, self.length2, wavelength),
        );
        let mut total = identity();
        for _ in 0..self.n_periods {
            total = mat_mul(total, period);
        }

        // [B, C] = M·[1, n_out] with the same waveguide on both sides.
        let n0 = Complex64::new(self.n1, 0.0);
        let b = total[0][0] + total[0][1] * n0;
        let c = total[1][0] + total[1][1] * n0;
        let denom = n0 * b + c;
        let r = (n0 * b - c) / denom;
        let t = 2.0 * n0 / denom;
        Ok(DbrResponse {
            wavelength,
            reflectance: r.norm_sqr(),
            transmittance: t.norm_sqr(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbrResponse {
    pub wavelength: f64,
    pub reflectance: f64,
    pub transmittance: f64,
}

/// Reflection and transmission of `grating` at every wavelength, by the
/// characteristic-matrix (transfer-matrix) method.
pub fn dbr_spectrum(
    grating: &BraggGrating,
    wavelengths: &[f64],
) -> Result<Vec<DbrResponse>, ConfigurationError> {
    grating.validate()?;
    let spectrum = wavelengths
        .iter()
        .map(|&wl| grating.response(wl))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "[derived] DBR spectrum: {} periods of {:.4} um over {} wavelength(s)",
        grating.n_periods,
        grating.period(),
        spectrum.len()
    );
    Ok(spectrum)
}

type Matrix2 = [[Complex64; 2]; 2];

fn identity() -> Matrix2 {
    let one = Complex64::new(1.0, 0.0);
    let zero = Complex64::default();
    [[one, zero], [zero, one]]
}

fn mat_mul(a: Matrix2, b: Matrix2) -> Matrix2 {
    let mut out = [[Complex64::default(); 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

/// `[[cos δ, i·sin δ / n], [i·n·sin δ, cos δ]]` with `δ = 2π·n·d/λ`.
fn section_matrix(n: f64, length: f64, wavelength: f64) -> Matrix2 {
    let delta = 2.0 * std::f64::consts::PI * n * length / wavelength;
    let (sin, cos) = delta.sin_cos();
    let i = Complex64::i();
    [
        [Complex64::new(cos, 0.0), i * (sin / n)],
        [i * (n * sin), Complex64::new(cos, 0.0)],
    ]
}
