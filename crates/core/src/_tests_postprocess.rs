#![cfg(test)]

use approx::assert_relative_eq;
use num_complex::Complex64;

use super::error::ConfigurationError;
use super::field::Field2D;
use super::geometry::WaveguideGeometry;
use super::grid::Grid2D;
use super::mode::{Mode, ModeFields, SolverKind};
use super::polarization::Polarization;
use super::postprocess::{
    coupling_efficiency, coupling_efficiency_at, effective_area, field_energy_fractions,
    fit_gaussian, gaussian_effective_area, normalize, overlap, power, GaussianFit,
};
use super::solver::{solve, SolveOptions};

fn grid() -> Grid2D {
    Grid2D::new(80, 60, 0.05, 0.05)
}

/// `exp(-r²/w²)` centred in the grid.
fn gaussian_field(grid: Grid2D, w: f64) -> Field2D {
    let (cx, cy) = (0.5 * grid.width(), 0.5 * grid.height());
    Field2D::from_fn(grid, |x, y| {
        let r2 = (x - cx).powi(2) + (y - cy).powi(2);
        Complex64::new((-r2 / (w * w)).exp(), 0.0)
    })
}

fn te_mode(ex: Field2D) -> Mode {
    Mode::new(
        Complex64::new(2.0, 0.0),
        1.55,
        SolverKind::SemiTe,
        ModeFields {
            ex: Some(ex),
            ..ModeFields::default()
        },
    )
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn normalize_sets_unit_power_and_is_idempotent() {
    let geom = WaveguideGeometry::builder().steps(0.04, 0.04).build().unwrap();
    let modes = solve(&geom, 1, SolverKind::SemiTe, &SolveOptions::default()).unwrap();
    let once = normalize(&modes[0]).unwrap();
    assert!(once.is_normalized());
    assert_relative_eq!(power(&once), 1.0, max_relative = 1e-6);

    let twice = normalize(&once).unwrap();
    for (a, b) in once.ex().unwrap().as_slice().iter().zip(twice.ex().unwrap().as_slice()) {
        assert!((*a - *b).norm() < 1e-12);
    }
}

#[test]
fn zero_field_cannot_be_normalized() {
    let mode = te_mode(Field2D::zeros(grid()));
    assert!(matches!(normalize(&mode), Err(ConfigurationError::Invalid(_))));
}

// ============================================================================
// Gaussian fit and areas
// ============================================================================

#[test]
fn fit_recovers_a_sampled_gaussian() {
    let truth = GaussianFit {
        amplitude: 2.0,
        center: (0.3, -0.1),
        variances: (0.04, 0.09),
    };
    let x: Vec<f64> = (0..81).map(|i| -1.0 + 0.025 * i as f64).collect();
    let y: Vec<f64> = (0..61).map(|i| -1.2 + 0.04 * i as f64).collect();
    let intensity: Vec<f64> = x
        .iter()
        .flat_map(|&xi| y.iter().map(move |&yi| (xi, yi)))
        .map(|(xi, yi)| truth.eval(xi, yi))
        .collect();

    let fit = fit_gaussian(&x, &y, &intensity).unwrap();
    assert_relative_eq!(fit.amplitude, 2.0, max_relative = 1e-6);
    assert_relative_eq!(fit.center.0, 0.3, epsilon = 1e-6);
    assert_relative_eq!(fit.center.1, -0.1, epsilon = 1e-6);
    assert_relative_eq!(fit.variances.0, 0.04, max_relative = 1e-6);
    assert_relative_eq!(fit.variances.1, 0.09, max_relative = 1e-6);
}

#[test]
fn fit_rejects_mismatched_shapes() {
    let err = fit_gaussian(&[0.0, 1.0], &[0.0, 1.0], &[1.0; 3]).unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(_)));
}

#[test]
fn gaussian_area_is_four_pi_sigma_x_sigma_y() {
    let fit = GaussianFit {
        amplitude: 1.0,
        center: (0.0, 0.0),
        variances: (0.04, 0.09),
    };
    assert_relative_eq!(
        gaussian_effective_area(&fit),
        4.0 * std::f64::consts::PI * 0.2 * 0.3,
        max_relative = 1e-12
    );
    assert_relative_eq!(fit.effective_area(), gaussian_effective_area(&fit));
}

#[test]
fn direct_effective_area_matches_the_gaussian_formula() {
    let w = 0.6;
    let mode = te_mode(gaussian_field(grid(), w));
    // |E|² = exp(-2r²/w²) has σ² = w²/4, so the area is π·w².
    assert_relative_eq!(effective_area(&mode), std::f64::consts::PI * w * w, max_relative = 1e-3);
}

// ============================================================================
// Overlap and energy split
// ============================================================================

#[test]
fn overlap_is_one_for_identical_and_zero_for_orthogonal_modes() {
    let g = gaussian_field(grid(), 0.5);
    let te = te_mode(g.clone());
    assert_relative_eq!(overlap(&te, &te), 1.0, epsilon = 1e-12);

    let tm = Mode::new(
        Complex64::new(1.8, 0.0),
        1.55,
        SolverKind::SemiTm,
        ModeFields {
            ey: Some(g),
            ..ModeFields::default()
        },
    );
    assert_eq!(tm.polarization(), Polarization::TM);
    assert_relative_eq!(overlap(&te, &tm), 0.0);
}

#[test]
fn overlap_interpolates_modes_from_another_grid() {
    let fine = te_mode(gaussian_field(grid(), 0.6));
    let coarse_grid = Grid2D::new(40, 30, 0.1, 0.1);
    let coarse = te_mode(gaussian_field(coarse_grid, 0.6));
    assert_ne!(fine.grid(), coarse.grid());
    assert!(overlap(&fine, &coarse) > 0.999, "{}", overlap(&fine, &coarse));
    assert!(overlap(&coarse, &fine) > 0.999, "{}", overlap(&coarse, &fine));

    // A spot displaced by d keeps exp(-d²/2w²) of the overlap.
    let shifted = te_mode(Field2D::from_fn(coarse_grid, |x, y| {
        let r2 = (x - 2.6).powi(2) + (y - 1.5).powi(2);
        Complex64::new((-r2 / 0.36).exp(), 0.0)
    }));
    assert_relative_eq!(overlap(&fine, &shifted), (-0.5f64).exp(), max_relative = 2e-2);

    let resampled = coarse.resampled(grid());
    assert_eq!(resampled.grid(), Some(grid()));
    assert_eq!(resampled.neff(), coarse.neff());
}

#[test]
fn energy_fractions_are_percentages() {
    let g = gaussian_field(grid(), 0.5);
    let mode = Mode::new(
        Complex64::new(2.0, 0.0),
        1.55,
        SolverKind::Full,
        ModeFields {
            ex: Some(g.scaled(Complex64::new(3.0, 0.0))),
            ey: Some(g.clone()),
            ..ModeFields::default()
        },
    );
    let split = field_energy_fractions(&mode);
    assert_relative_eq!(split.electric[0], 90.0, epsilon = 1e-9);
    assert_relative_eq!(split.electric[1], 10.0, epsilon = 1e-9);
    assert_relative_eq!(split.electric[2], 0.0);
    assert_eq!(split.magnetic, [0.0; 3]);
    assert_relative_eq!(mode.te_fraction(), 0.9, epsilon = 1e-12);
}

// ============================================================================
// Fiber coupling
// ============================================================================

#[test]
fn matching_gaussian_couples_completely() {
    let w = 0.5;
    let mode = te_mode(gaussian_field(grid(), w));
    let eta = coupling_efficiency(&mode, 2.0 * w).unwrap();
    assert_relative_eq!(eta, 1.0, epsilon = 1e-3);
}

#[test]
fn coupling_stays_within_unit_interval() {
    let mode = te_mode(gaussian_field(grid(), 0.3));
    for mfd in [0.2, 0.6, 1.0, 2.5] {
        let eta = coupling_efficiency(&mode, mfd).unwrap();
        assert!((0.0..=1.0).contains(&eta), "eta {eta} for mfd {mfd}");
    }
    let off = coupling_efficiency_at(&mode, 0.6, (0.5, 0.5)).unwrap();
    let on = coupling_efficiency(&mode, 0.6).unwrap();
    assert!(off < on);
}

#[test]
fn only_the_matching_component_couples() {
    let g = gaussian_field(grid(), 0.5);
    let hybrid = Mode::new(
        Complex64::new(2.0, 0.0),
        1.55,
        SolverKind::Full,
        ModeFields {
            ex: Some(g.clone()),
            ey: Some(g),
            ..ModeFields::default()
        },
    );
    assert_eq!(hybrid.polarization(), Polarization::TE);
    let eta = coupling_efficiency(&hybrid, 1.0).unwrap();
    assert_relative_eq!(eta, 0.5, epsilon = 1e-3);
}

#[test]
fn non_positive_mfd_is_rejected() {
    let mode = te_mode(gaussian_field(grid(), 0.5));
    assert!(matches!(
        coupling_efficiency(&mode, 0.0),
        Err(ConfigurationError::NonPositive { .. })
    ));
}
