#![cfg(test)]

use approx::assert_relative_eq;
use num_complex::Complex64;

use super::dielectric::Dielectric2D;
use super::eigensolver::{shift_invert_eigs, EigenOptions};
use super::error::{ConfigurationError, ModeSolverError};
use super::geometry::{WaveguideGeometry, N_SILICA, N_SILICON};
use super::grid::Grid2D;
use super::mode::SolverKind;
use super::polarization::Polarization;
use super::semi_vectorial;
use super::solver::{solve, SolveOptions};

fn strip(step: f64) -> WaveguideGeometry {
    WaveguideGeometry::builder().steps(step, step).build().unwrap()
}

#[test]
fn homogeneous_operator_has_the_discrete_dirichlet_spectrum() {
    let (nx, ny, h) = (12, 9, 0.1);
    let grid = Grid2D::new(nx, ny, h, h);
    let eps = 2.25;
    let dielectric = Dielectric2D::isotropic(grid, 1.55, vec![eps; grid.len()]).unwrap();
    let k0sq = dielectric.k0().powi(2);
    let expected = |n: usize| 4.0 / (h * h) * (std::f64::consts::PI / (2.0 * (n + 1) as f64)).sin().powi(2);
    let top = k0sq * eps - expected(nx) - expected(ny);

    for pol in [Polarization::TE, Polarization::TM] {
        let a = semi_vectorial::assemble(&dielectric, pol);
        let pairs = shift_invert_eigs(&a, Complex64::new(k0sq * eps, 0.0), 1, &EigenOptions::default())
            .unwrap();
        assert_relative_eq!(pairs.values[0].re, top, max_relative = 1e-9);
    }
}

#[test]
fn symmetric_slab_neff_lies_between_cladding_and_core() {
    let geom = WaveguideGeometry::builder()
        .steps(0.04, 0.02)
        .domain_width(1.6)
        .width(1.6)
        .build()
        .unwrap();
    let modes = solve(&geom, 1, SolverKind::SemiTe, &SolveOptions::default()).unwrap();
    assert_eq!(modes.len(), 1);
    let n = modes[0].neff().re;
    assert!(n > N_SILICA && n < N_SILICON, "neff {n}");
    assert!(modes[0].neff().im.abs() < 1e-9);
}

#[test]
fn strip_returns_two_descending_te_modes() {
    let modes = solve(&strip(0.02), 2, SolverKind::SemiTe, &SolveOptions::default()).unwrap();
    assert_eq!(modes.len(), 2);
    assert!(modes[0].neff().re >= modes[1].neff().re);
    assert_eq!(modes[0].polarization(), Polarization::TE);
    assert_eq!(modes[0].solver(), SolverKind::SemiTe);
    assert!(modes[0].ex().is_some() && modes[0].ey().is_none());
    let n0 = modes[0].neff().re;
    assert!(n0 > 2.3 && n0 < 2.7, "fundamental TE neff {n0}");
}

#[test]
fn tm_fundamental_sits_below_te_for_a_wide_strip() {
    let geom = strip(0.04);
    let opts = SolveOptions::default();
    let te = solve(&geom, 1, SolverKind::SemiTe, &opts).unwrap();
    let tm = solve(&geom, 1, SolverKind::SemiTm, &opts).unwrap();
    assert_eq!(tm[0].polarization(), Polarization::TM);
    assert!(tm[0].ey().is_some());
    assert!(te[0].neff().re > tm[0].neff().re);
}

#[test]
fn mode_set_never_exceeds_the_request() {
    let modes = solve(&strip(0.04), 3, SolverKind::SemiTe, &SolveOptions::default()).unwrap();
    assert!(modes.len() <= 3);
    assert_eq!(modes.requested(), 3);
    let neffs: Vec<f64> = modes.neffs().iter().map(|n| n.re).collect();
    assert!(neffs.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn field_phase_puts_the_peak_on_the_positive_real_axis() {
    let modes = solve(&strip(0.04), 1, SolverKind::SemiTe, &SolveOptions::default()).unwrap();
    let peak = modes[0].ex().unwrap().peak();
    assert!(peak.re > 0.0);
    assert!(peak.im.abs() < 1e-12);
}

#[test]
fn refinement_shrinks_successive_neff_differences() {
    // Interfaces sit on cell faces at every step.
    let neff = |step: f64| {
        let geom = WaveguideGeometry::builder()
            .steps(step, step)
            .domain_width(1.2)
            .width(0.48)
            .core_thickness(0.24)
            .substrate_thickness(0.4)
            .cladding(0.4, N_SILICA)
            .build()
            .unwrap();
        solve(&geom, 1, SolverKind::SemiTe, &SolveOptions::default()).unwrap()[0]
            .neff()
            .re
    };
    let coarse = neff(0.04);
    let medium = neff(0.02);
    let fine = neff(0.01);
    assert!(
        (fine - medium).abs() < (medium - coarse).abs(),
        "{coarse} {medium} {fine}"
    );
}

#[test]
fn zero_modes_is_a_configuration_error() {
    let err = solve(&strip(0.04), 0, SolverKind::SemiTe, &SolveOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ModeSolverError::Configuration(ConfigurationError::NoModesRequested)
    ));
}

#[test]
fn explicit_shift_index_is_recorded() {
    let opts = SolveOptions::default().with_shift_index(3.0);
    let modes = solve(&strip(0.04), 1, SolverKind::SemiTe, &opts).unwrap();
    assert_relative_eq!(modes.diagnostics().shift_index, 3.0);
    assert_eq!(modes.discarded(), modes.diagnostics().discarded);
}
