//! Error taxonomy for geometry validation, eigen-solves and the result cache.

use std::path::PathBuf;

/// Invalid geometry, grid or solver parameters. Raised before any solve starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{name} must be positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be finite (got {value})")]
    NotFinite { name: &'static str, value: f64 },

    #[error("sidewall angle must lie in [0, 90) degrees (got {0})")]
    AngleOutOfRange(f64),

    #[error("waveguide array needs at least one core")]
    NoCores,

    #[error("expected {expected} gap(s) between {cores} core(s), got {got}")]
    GapCount {
        cores: usize,
        expected: usize,
        got: usize,
    },

    #[error("{count} cladding thickness(es) but {materials} cladding material(s)")]
    CladdingMismatch { count: usize, materials: usize },

    #[error("cores span {span} but the domain is only {domain} wide")]
    CoresExceedDomain { span: f64, domain: f64 },

    #[error("slab thickness {slab} must be smaller than the core thickness {core}")]
    SlabTooThick { slab: f64, core: f64 },

    #[error("grid needs at least 2x2 cells (got {nx}x{ny})")]
    GridTooSmall { nx: usize, ny: usize },

    #[error("{what} has {got} sample(s) but the grid has {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("n_modes must be at least 1")]
    NoModesRequested,

    #[error("material {name} has a non-physical index {index} at wavelength {wavelength}")]
    InvalidIndex {
        name: String,
        index: f64,
        wavelength: f64,
    },

    #[error("{0}")]
    Invalid(String),
}

impl ConfigurationError {
    pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite { name, value });
        }
        if value <= 0.0 {
            return Err(Self::NonPositive { name, value });
        }
        Ok(())
    }

    pub(crate) fn grid_length(what: &'static str, expected: usize, got: usize) -> Result<(), Self> {
        if expected != got {
            return Err(Self::LengthMismatch { what, expected, got });
        }
        Ok(())
    }

    pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<(), Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite { name, value });
        }
        if value < 0.0 {
            return Err(Self::Negative { name, value });
        }
        Ok(())
    }
}

/// The eigensolver ran out of restarts before the requested eigenpairs converged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "eigensolver did not converge: {converged}/{requested} eigenpairs after {restarts} restarts (worst residual {residual:.3e})"
)]
pub struct SolverConvergenceError {
    pub requested: usize,
    pub converged: usize,
    pub restarts: usize,
    pub residual: f64,
}

/// A cache file that could not be read back as the entry it claims to be.
#[derive(Debug, thiserror::Error)]
#[error("cache entry {} is corrupt: {reason}", path.display())]
pub struct CacheCorruptionError {
    pub path: PathBuf,
    pub reason: String,
}

/// Top-level error for solve-level operations.
#[derive(Debug, thiserror::Error)]
pub enum ModeSolverError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Convergence(#[from] SolverConvergenceError),

    #[error(transparent)]
    Cache(#[from] CacheCorruptionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A sweep aborted under the fail-fast policy.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("sweep entry {index} ({parameter} = {value}) failed: {source}")]
    Entry {
        index: usize,
        parameter: String,
        value: f64,
        #[source]
        source: ModeSolverError,
    },
}
