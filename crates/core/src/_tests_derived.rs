#![cfg(test)]

use approx::assert_relative_eq;

use super::derived::{
    dbr_period, dbr_spectrum, grating_coupler_period, group_index, BraggGrating,
    DEFAULT_WAVELENGTH_DELTA,
};
use super::error::{ConfigurationError, ModeSolverError};
use super::geometry::WaveguideGeometry;
use super::mode::SolverKind;
use super::polarization::Polarization;
use super::solver::SolveOptions;

#[test]
fn grating_period_follows_the_phase_matching_condition() {
    let period = grating_coupler_period(1.55, 2.8, 1.444, 10.0, 1).unwrap();
    let expected = 1.55 / (2.8 - 1.444 * 10f64.to_radians().sin());
    assert_relative_eq!(period, expected, max_relative = 1e-12);

    let second = grating_coupler_period(1.55, 2.8, 1.444, 10.0, 2).unwrap();
    assert_relative_eq!(second, 2.0 * period, max_relative = 1e-12);

    let normal = grating_coupler_period(1.55, 2.5, 1.0, 0.0, 1).unwrap();
    assert_relative_eq!(normal, 0.62, max_relative = 1e-12);
}

#[test]
fn grating_without_a_solution_is_rejected() {
    let err = grating_coupler_period(1.55, 1.0, 1.0, 90.0, 1).unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(_)));
    let err = grating_coupler_period(1.55, 2.8, 1.444, 10.0, 0).unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(_)));
}

#[test]
fn dbr_period_is_half_the_guided_wavelength() {
    assert_relative_eq!(dbr_period(1.55, 2.5).unwrap(), 0.31, max_relative = 1e-12);
    assert!(dbr_period(1.55, 0.0).is_err());
    assert!(dbr_period(-1.0, 2.5).is_err());
}

#[test]
fn strip_group_index_exceeds_its_effective_index() {
    let geom = WaveguideGeometry::builder().steps(0.04, 0.04).build().unwrap();
    let result = group_index(
        &geom,
        1,
        SolverKind::SemiTe,
        DEFAULT_WAVELENGTH_DELTA,
        &SolveOptions::default(),
    )
    .unwrap();
    assert_eq!(result.len(), 1);
    let g = result[0];
    assert_eq!(g.polarization, Polarization::TE);
    assert!(g.group_index > g.neff, "ng {} neff {}", g.group_index, g.neff);
    assert!(g.group_index < 5.5, "ng {}", g.group_index);
}

#[test]
fn wavelength_delta_must_be_positive_and_small() {
    let geom = WaveguideGeometry::builder().steps(0.04, 0.04).build().unwrap();
    let opts = SolveOptions::default();
    for delta in [0.0, -0.01, 2.0] {
        let err = group_index(&geom, 1, SolverKind::SemiTe, delta, &opts).unwrap_err();
        assert!(matches!(err, ModeSolverError::Configuration(_)), "delta {delta}");
    }
}

#[test]
fn quarter_wave_stack_matches_the_closed_form_peak() {
    let (n1, n2, periods) = (2.4, 2.5, 20);
    let grating = BraggGrating::quarter_wave(n1, n2, 1.55, periods).unwrap();
    let at_bragg = grating.response(1.55).unwrap();
    let q = (n1 / n2).powi(2 * periods as i32);
    let expected = ((1.0 - q) / (1.0 + q)).powi(2);
    assert_relative_eq!(at_bragg.reflectance, expected, max_relative = 1e-9);
    assert_relative_eq!(at_bragg.reflectance + at_bragg.transmittance, 1.0, epsilon = 1e-9);
}

#[test]
fn dbr_spectrum_has_its_stop_band_at_the_design_wavelength() {
    let period = dbr_period(1.55, 2.45).unwrap();
    let grating = BraggGrating::new(2.4, 2.5, period, 100).unwrap();
    assert_relative_eq!(grating.period(), period, max_relative = 1e-12);

    let spectrum = dbr_spectrum(&grating, &[1.40, 1.55, 1.70]).unwrap();
    assert_eq!(spectrum.len(), 3);
    assert!(spectrum[1].reflectance > 0.9, "{:?}", spectrum[1]);
    assert!(spectrum[0].reflectance < 0.1, "{:?}", spectrum[0]);
    assert!(spectrum[2].reflectance < 0.1, "{:?}", spectrum[2]);
    for point in &spectrum {
        assert_relative_eq!(point.reflectance + point.transmittance, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn uniform_grating_is_transparent() {
    let grating = BraggGrating::new(2.4, 2.4, 0.3, 50).unwrap();
    let point = grating.response(1.55).unwrap();
    assert!(point.reflectance < 1e-20, "{point:?}");
    assert_relative_eq!(point.transmittance, 1.0, epsilon = 1e-12);
}

#[test]
fn invalid_gratings_are_rejected() {
    assert!(BraggGrating::new(2.4, 2.5, 0.3, 0).is_err());
    assert!(BraggGrating::new(2.4, 2.5, -0.3, 10).is_err());
    assert!(BraggGrating::quarter_wave(0.0, 2.5, 1.55, 10).is_err());
    let grating = BraggGrating::new(2.4, 2.5, 0.3, 10).unwrap();
    assert!(dbr_spectrum(&grating, &[1.55, 0.0]).is_err());
}
