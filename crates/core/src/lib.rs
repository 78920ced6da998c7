//! Core geometry, solvers and post-processing for the finite-difference
//! waveguide mode solver.

pub mod cache;
pub mod derived;
pub mod dielectric;
pub mod eigensolver;
pub mod error;
pub mod field;
pub mod full_vectorial;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod material;
pub mod metrics;
pub mod mode;
pub mod mode_tracking;
pub mod polarization;
pub mod postprocess;
pub mod semi_vectorial;
pub mod solver;
pub mod structure;
pub mod sweep;

pub use error::{
    CacheCorruptionError, ConfigurationError, ModeSolverError, SolverConvergenceError, SweepError,
};
pub use geometry::{GeometryBuilder, WaveguideGeometry};
pub use mode::{Mode, ModeSet, SolverKind};
pub use polarization::Polarization;
pub use solver::{solve, SolveOptions};

#[cfg(test)]
mod _tests_derived;
#[cfg(test)]
mod _tests_full_vectorial;
#[cfg(test)]
mod _tests_geometry;
#[cfg(test)]
mod _tests_io;
#[cfg(test)]
mod _tests_postprocess;
#[cfg(test)]
mod _tests_semi_vectorial;
#[cfg(test)]
mod _tests_sweep;
