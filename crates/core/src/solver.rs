//! Solve entry point: geometry in, ordered mode set out.

use std::time::Instant;

use log::{debug, info};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::dielectric::Dielectric2D;
use crate::eigensolver::EigenOptions;
use crate::error::{ConfigurationError, ModeSolverError};
use crate::full_vectorial;
use crate::geometry::WaveguideGeometry;
use crate::metrics::{MetricsEvent, MetricsRecorder};
use crate::mode::{ModeSet, SolverKind};
use crate::semi_vectorial;
use crate::structure;

/// Eigensolver settings plus where to place the shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    #[serde(flatten)]
    pub eigen: EigenOptions,
    /// Effective index the shift sits at; `None` uses the largest material index.
    pub shift_index: Option<f64>,
}

impl SolveOptions {
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.eigen.tol = tol;
        self
    }

    pub fn with_shift_index(mut self, n: f64) -> Self {
        self.shift_index = Some(n);
        self
    }
}

/// Solves `geometry` for up to `n_modes` modes with the chosen solver.
pub fn solve(
    geometry: &WaveguideGeometry,
    n_modes: usize,
    kind: SolverKind,
    opts: &SolveOptions,
) -> Result<ModeSet, ModeSolverError> {
    solve_with_metrics(geometry, n_modes, kind, opts, None)
}

pub fn solve_with_metrics(
    geometry: &WaveguideGeometry,
    n_modes: usize,
    kind: SolverKind,
    opts: &SolveOptions,
    metrics: Option<&MetricsRecorder>,
) -> Result<ModeSet, ModeSolverError> {
    if n_modes == 0 {
        return Err(ConfigurationError::NoModesRequested.into());
    }
    let start = Instant::now();
    let (nx, ny) = geometry.cell_counts();
    if let Some(recorder) = metrics {
        recorder.emit(MetricsEvent::SolveStart {
            solver: kind,
            grid_nx: nx,
            grid_ny: ny,
            n_modes,
            wavelength: geometry.wavelength(),
            tol: opts.eigen.tol,
            max_restarts: opts.eigen.max_restarts,
        });
    }

    let dielectric = structure::build(geometry)?;
    if let Some(recorder) = metrics {
        recorder.emit(MetricsEvent::DielectricBuilt {
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            grid_points: dielectric.grid.len(),
            anisotropic: dielectric.is_anisotropic(),
        });
    }

    let modes = solve_dielectric(&dielectric, n_modes, kind, opts)?;
    let elapsed = start.elapsed();
    info!(
        "[solve] {kind} {}x{} wl={:.4} -> {} mode(s) in {:.2?}",
        nx,
        ny,
        geometry.wavelength(),
        modes.len(),
        elapsed
    );
    if let Some(recorder) = metrics {
        let diag = modes.diagnostics();
        recorder.emit(MetricsEvent::SolveDone {
            modes: modes.len(),
            discarded: diag.discarded,
            restarts: diag.restarts,
            applications: diag.applications,
            shift_index: diag.shift_index,
            leading_neff: modes.get(0).map(|m| m.neff().re),
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        });
    }
    Ok(modes)
}

/// Solves an already rasterized cross-section.
pub fn solve_dielectric(
    dielectric: &Dielectric2D,
    n_modes: usize,
    kind: SolverKind,
    opts: &SolveOptions,
) -> Result<ModeSet, ModeSolverError> {
    let modes = match kind.polarization() {
        Some(pol) => semi_vectorial::solve(dielectric, n_modes, pol, opts)?,
        None => full_vectorial::solve(dielectric, n_modes, opts)?,
    };
    debug_assert!(modes.is_consistent());
    if modes.len() < n_modes {
        debug!(
            "[solve] {} of {n_modes} requested mode(s) are guided",
            modes.len()
        );
    }
    Ok(modes)
}

// ============================================================================
// Shared eigenpair post-processing
// ============================================================================

/// `neff = sqrt(β²)/k0`, on the branch with non-negative real part.
pub(crate) fn neff_from_eigenvalue(lambda: Complex64, k0: f64) -> Complex64 {
    let root = lambda.sqrt();
    let root = if root.re < 0.0 { -root } else { root };
    root / k0
}

/// A guided mode has real(neff) within the material-index range.
pub(crate) fn is_physical(neff: Complex64, bounds: (f64, f64)) -> bool {
    let slack = 1e-9;
    neff.re.is_finite()
        && neff.im.is_finite()
        && neff.re >= bounds.0 - slack
        && neff.re <= bounds.1 + slack
}

/// Rotates the vector so that its largest entry is real and positive.
pub(crate) fn fix_phase(mut vector: Vec<Complex64>) -> Vec<Complex64> {
    let peak = vector
        .iter()
        .copied()
        .fold(Complex64::default(), |best, v| {
            if v.norm_sqr() > best.norm_sqr() {
                v
            } else {
                best
            }
        });
    let magnitude = peak.norm();
    if magnitude > 0.0 {
        let rotation = peak.conj() / magnitude;
        for v in &mut vector {
            *v *= rotation;
        }
    }
    vector
}
