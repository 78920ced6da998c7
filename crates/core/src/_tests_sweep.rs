#![cfg(test)]

use num_complex::Complex64;

use super::error::{ConfigurationError, ModeSolverError, SolverConvergenceError, SweepError};
use super::field::Field2D;
use super::geometry::WaveguideGeometry;
use super::grid::Grid2D;
use super::mode::{Mode, ModeFields, ModeSet, SolveDiagnostics, SolverKind};
use super::polarization::Polarization;
use super::sweep::{sweep, FailurePolicy, SweepOptions, SweepResult};

fn spot(cx: f64) -> Field2D {
    Field2D::from_fn(Grid2D::new(30, 20, 0.1, 0.1), |x, y| {
        let r2 = (x - cx).powi(2) + (y - 1.0).powi(2);
        Complex64::new((-r2 / 0.09).exp(), 0.0)
    })
}

fn set(modes: Vec<(f64, Polarization)>) -> ModeSet {
    let n = modes.len();
    let modes = modes
        .into_iter()
        .map(|(neff, pol)| {
            let fields = match pol {
                Polarization::TE => ModeFields {
                    ex: Some(spot(1.5)),
                    ..ModeFields::default()
                },
                Polarization::TM => ModeFields {
                    ey: Some(spot(1.5)),
                    ..ModeFields::default()
                },
            };
            Mode::new(Complex64::new(neff, 0.0), 1.55, SolverKind::Full, fields)
        })
        .collect();
    ModeSet::new(modes, n, SolveDiagnostics::default())
}

fn diverged() -> ModeSolverError {
    SolverConvergenceError {
        requested: 2,
        converged: 0,
        restarts: 50,
        residual: 1.0,
    }
    .into()
}

#[test]
fn fail_fast_reports_the_failing_entry() {
    let outcomes = vec![
        Ok(set(vec![(2.0, Polarization::TE)])),
        Err(diverged()),
        Ok(set(vec![(2.1, Polarization::TE)])),
    ];
    let err = SweepResult::from_solves("width", &[0.4, 0.5, 0.6], 1, outcomes, FailurePolicy::FailFast)
        .unwrap_err();
    match err {
        SweepError::Entry {
            index,
            parameter,
            value,
            source,
        } => {
            assert_eq!(index, 1);
            assert_eq!(parameter, "width");
            assert_eq!(value, 0.5);
            assert!(matches!(source, ModeSolverError::Convergence(_)));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn skip_leaves_a_hole_and_keeps_tracking() {
    let outcomes = vec![
        Ok(set(vec![(2.0, Polarization::TE), (1.9, Polarization::TM)])),
        Err(diverged()),
        Ok(set(vec![(1.96, Polarization::TM), (1.94, Polarization::TE)])),
    ];
    let result =
        SweepResult::from_solves("width", &[0.4, 0.5, 0.6], 2, outcomes, FailurePolicy::Skip)
            .unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.absent(), 1);
    assert!(result.entries()[1].is_absent());
    assert_eq!(result.entries()[1].slots(), &[None, None]);

    // The TE mode stays in slot 0 across the gap even though it is now
    // second in native order.
    let te = result.slot_neffs(0);
    assert_eq!(te[0].map(|n| n.re), Some(2.0));
    assert_eq!(te[1], None);
    assert_eq!(te[2].map(|n| n.re), Some(1.94));
    assert_eq!(
        result.entries()[2].tracked(1).map(Mode::polarization),
        Some(Polarization::TM)
    );
    assert_eq!(result.values(), vec![0.4, 0.5, 0.6]);
}

#[test]
fn a_track_never_changes_polarization() {
    let outcomes = vec![
        Ok(set(vec![(2.0, Polarization::TE)])),
        Ok(set(vec![(1.9, Polarization::TM)])),
        Ok(set(vec![(2.05, Polarization::TE)])),
    ];
    let result =
        SweepResult::from_solves("width", &[0.4, 0.5, 0.6], 1, outcomes, FailurePolicy::Skip)
            .unwrap();
    assert_eq!(result.slot_count(), 2);

    let te: Vec<Option<f64>> = result.slot_neffs(0).into_iter().map(|n| n.map(|n| n.re)).collect();
    assert_eq!(te, vec![Some(2.0), None, Some(2.05)]);
    let tm: Vec<Option<f64>> = result.slot_neffs(1).into_iter().map(|n| n.map(|n| n.re)).collect();
    assert_eq!(tm, vec![None, Some(1.9), None]);
}

#[test]
fn leading_failure_under_skip_defers_the_baseline() {
    let outcomes = vec![Err(diverged()), Ok(set(vec![(2.0, Polarization::TE)]))];
    let result =
        SweepResult::from_solves("gap", &[0.1, 0.2], 1, outcomes, FailurePolicy::Skip).unwrap();
    assert_eq!(result.entries()[1].slots(), &[Some(0)]);
}

#[test]
fn outcome_count_must_match_values() {
    let err = SweepResult::from_solves(
        "width",
        &[0.4, 0.5],
        1,
        vec![Ok(set(vec![(2.0, Polarization::TE)]))],
        FailurePolicy::Skip,
    )
    .unwrap_err();
    assert!(matches!(err, SweepError::Configuration(ConfigurationError::Invalid(_))));
}

#[test]
fn geometry_count_must_match_values() {
    let geom = WaveguideGeometry::builder().steps(0.05, 0.05).build().unwrap();
    let err = sweep(&[geom], &[0.5, 0.6], 1, SolverKind::SemiTe, &SweepOptions::default())
        .unwrap_err();
    assert!(matches!(err, SweepError::Configuration(_)));
}

#[test]
fn width_sweep_tracks_the_vectorial_te_mode() {
    let widths = [0.3, 0.5, 0.7];
    let geometries: Vec<_> = widths
        .iter()
        .map(|&w| {
            WaveguideGeometry::builder()
                .steps(0.05, 0.05)
                .width(w)
                .build()
                .unwrap()
        })
        .collect();
    let opts = SweepOptions {
        legend: "width".into(),
        ..SweepOptions::default()
    };
    let result = sweep(&geometries, &widths, 2, SolverKind::Full, &opts).unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.parameter(), "width");
    assert_eq!(result.absent(), 0);

    let te: Vec<f64> = result
        .slot_neffs(0)
        .into_iter()
        .map(|n| n.expect("slot 0 filled").re)
        .collect();
    assert!(te.windows(2).all(|w| w[1] > w[0]), "TE neff {te:?}");
    for entry in result.entries() {
        assert_eq!(entry.tracked(0).map(Mode::polarization), Some(Polarization::TE));
    }
}
