//! Guided modes and ordered mode sets.

use std::fmt;
use std::ops::Index;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::field::Field2D;
use crate::grid::Grid2D;
use crate::polarization::Polarization;

// ============================================================================
// Solver kind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverKind {
    /// Scalar solve for the dominant Ex component.
    #[serde(rename = "semi-te")]
    SemiTe,
    /// Scalar solve for the dominant Ey component.
    #[serde(rename = "semi-tm")]
    SemiTm,
    /// Coupled Hx/Hy solve.
    #[serde(rename = "full")]
    Full,
}

impl SolverKind {
    pub fn semi(polarization: Polarization) -> Self {
        match polarization {
            Polarization::TE => SolverKind::SemiTe,
            Polarization::TM => SolverKind::SemiTm,
        }
    }

    /// The solved polarization for semi-vectorial kinds.
    pub fn polarization(self) -> Option<Polarization> {
        match self {
            SolverKind::SemiTe => Some(Polarization::TE),
            SolverKind::SemiTm => Some(Polarization::TM),
            SolverKind::Full => None,
        }
    }

    pub fn is_vectorial(self) -> bool {
        matches!(self, SolverKind::Full)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::SemiTe => f.write_str("semi-te"),
            SolverKind::SemiTm => f.write_str("semi-tm"),
            SolverKind::Full => f.write_str("full"),
        }
    }
}

// ============================================================================
// Mode
// ============================================================================

/// Field components of a mode. Semi-vectorial modes only carry the solved
/// E component; fully-vectorial modes carry all six on their Yee positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeFields {
    pub ex: Option<Field2D>,
    pub ey: Option<Field2D>,
    pub ez: Option<Field2D>,
    pub hx: Option<Field2D>,
    pub hy: Option<Field2D>,
    pub hz: Option<Field2D>,
}

impl ModeFields {
    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Field2D> {
        [
            &mut self.ex,
            &mut self.ey,
            &mut self.ez,
            &mut self.hx,
            &mut self.hy,
            &mut self.hz,
        ]
        .into_iter()
        .flatten()
    }

    fn iter(&self) -> impl Iterator<Item = &Field2D> {
        [&self.ex, &self.ey, &self.ez, &self.hx, &self.hy, &self.hz]
            .into_iter()
            .flatten()
    }

    pub fn has_magnetic(&self) -> bool {
        self.hx.is_some() && self.hy.is_some()
    }
}

fn energy(field: &Option<Field2D>) -> f64 {
    field.as_ref().map_or(0.0, Field2D::norm_sqr)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    neff: Complex64,
    wavelength: f64,
    solver: SolverKind,
    polarization: Polarization,
    te_fraction: f64,
    normalized: bool,
    fields: ModeFields,
}

impl Mode {
    /// Builds a mode; the TE fraction and label come from the Ex/Ey energies.
    pub fn new(neff: Complex64, wavelength: f64, solver: SolverKind, fields: ModeFields) -> Self {
        let ex = energy(&fields.ex);
        let ey = energy(&fields.ey);
        let te_fraction = if ex + ey > 0.0 {
            ex / (ex + ey)
        } else {
            match solver.polarization() {
                Some(Polarization::TM) => 0.0,
                _ => 1.0,
            }
        };
        Self {
            neff,
            wavelength,
            solver,
            polarization: Polarization::from_te_fraction(te_fraction),
            te_fraction,
            normalized: false,
            fields,
        }
    }

    pub fn neff(&self) -> Complex64 {
        self.neff
    }

    /// Propagation constant `neff·k0`.
    pub fn beta(&self) -> Complex64 {
        self.neff * (2.0 * std::f64::consts::PI / self.wavelength)
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn solver(&self) -> SolverKind {
        self.solver
    }

    pub fn polarization(&self) -> Polarization {
        self.polarization
    }

    pub fn te_fraction(&self) -> f64 {
        self.te_fraction
    }

    pub fn tm_fraction(&self) -> f64 {
        1.0 - self.te_fraction
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn fields(&self) -> &ModeFields {
        &self.fields
    }

    pub fn ex(&self) -> Option<&Field2D> {
        self.fields.ex.as_ref()
    }

    pub fn ey(&self) -> Option<&Field2D> {
        self.fields.ey.as_ref()
    }

    pub fn ez(&self) -> Option<&Field2D> {
        self.fields.ez.as_ref()
    }

    pub fn hx(&self) -> Option<&Field2D> {
        self.fields.hx.as_ref()
    }

    pub fn hy(&self) -> Option<&Field2D> {
        self.fields.hy.as_ref()
    }

    pub fn hz(&self) -> Option<&Field2D> {
        self.fields.hz.as_ref()
    }

    pub fn grid(&self) -> Option<Grid2D> {
        self.fields.iter().next().map(Field2D::grid)
    }

    /// Transverse E component matching the polarization label.
    pub fn dominant_e(&self) -> Option<&Field2D> {
        match self.polarization {
            Polarization::TE => self.ex().or(self.ey()),
            Polarization::TM => self.ey().or(self.ex()),
        }
    }

    /// Per-sample `|Ex|² + |Ey|²`.
    pub fn transverse_intensity(&self) -> Option<Vec<f64>> {
        let grid = self.grid()?;
        let mut out = vec![0.0; grid.len()];
        for field in [self.ex(), self.ey()].into_iter().flatten() {
            for (o, v) in out.iter_mut().zip(field.as_slice()) {
                *o += v.norm_sqr();
            }
        }
        Some(out)
    }

    /// Copy with every field interpolated onto `grid`.
    pub fn resampled(&self, grid: Grid2D) -> Self {
        let mut out = self.clone();
        for field in out.fields.iter_mut() {
            *field = field.resample(grid);
        }
        out
    }

    /// Copy with every field multiplied by `factor`, flagged as normalized.
    pub(crate) fn rescaled(&self, factor: Complex64) -> Self {
        let mut out = self.clone();
        for field in out.fields.iter_mut() {
            field.scale(factor);
        }
        out.normalized = true;
        out
    }

    /// Field storage is consistent: every component shares one grid.
    pub(crate) fn is_consistent(&self) -> bool {
        let Some(grid) = self.grid() else {
            return false;
        };
        self.fields
            .iter()
            .all(|f| f.grid() == grid && f.len() == grid.len())
            && self.neff.re.is_finite()
            && self.neff.im.is_finite()
    }
}

// ============================================================================
// ModeSet
// ============================================================================

/// Counters describing one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveDiagnostics {
    /// Eigenpairs dropped because real(neff) left the material-index range.
    pub discarded: usize,
    pub restarts: usize,
    pub applications: usize,
    /// Index the shift was placed at.
    pub shift_index: f64,
}

/// Modes sorted by non-increasing real(neff), at most `requested` long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSet {
    modes: Vec<Mode>,
    requested: usize,
    diagnostics: SolveDiagnostics,
}

impl ModeSet {
    pub fn new(mut modes: Vec<Mode>, requested: usize, diagnostics: SolveDiagnostics) -> Self {
        modes.sort_by(|a, b| b.neff.re.total_cmp(&a.neff.re));
        modes.truncate(requested);
        Self {
            modes,
            requested,
            diagnostics,
        }
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn get(&self, index: usize) -> Option<&Mode> {
        self.modes.get(index)
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mode> {
        self.modes.iter()
    }

    pub fn into_modes(self) -> Vec<Mode> {
        self.modes
    }

    pub fn neffs(&self) -> Vec<Complex64> {
        self.modes.iter().map(Mode::neff).collect()
    }

    pub fn discarded(&self) -> usize {
        self.diagnostics.discarded
    }

    pub fn diagnostics(&self) -> &SolveDiagnostics {
        &self.diagnostics
    }

    /// Applies `f` to every mode, keeping order and diagnostics.
    pub fn map_modes(&self, f: impl FnMut(&Mode) -> Mode) -> Self {
        Self {
            modes: self.modes.iter().map(f).collect(),
            requested: self.requested,
            diagnostics: self.diagnostics,
        }
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.modes.len() <= self.requested
            && self.modes.iter().all(Mode::is_consistent)
            && self
                .modes
                .windows(2)
                .all(|w| w[0].neff.re >= w[1].neff.re)
    }
}

impl Index<usize> for ModeSet {
    type Output = Mode;

    fn index(&self, index: usize) -> &Mode {
        &self.modes[index]
    }
}

impl<'a> IntoIterator for &'a ModeSet {
    type Item = &'a Mode;
    type IntoIter = std::slice::Iter<'a, Mode>;

    fn into_iter(self) -> Self::IntoIter {
        self.modes.iter()
    }
}
