#![cfg(test)]

use approx::assert_relative_eq;

use super::error::{ConfigurationError, ModeSolverError};
use super::geometry::{StructureKind, N_SILICA, N_SILICON};
use super::io::{AnisotropicIndex, JobConfig};
use super::metrics::MetricsFormat;
use super::mode::SolverKind;

#[test]
fn empty_file_uses_defaults() {
    let config = JobConfig::from_toml_str("").unwrap();
    assert_eq!(config, JobConfig::default());
    let job = config.job().unwrap();
    assert_eq!(job.kind, SolverKind::SemiTe);
    assert_eq!(job.n_modes, 1);
    assert_eq!(job.geometry.kind(), StructureKind::Strip);
    assert_eq!(job.geometry.cell_counts(), (100, 61));
    assert_relative_eq!(job.options.eigen.tol, 1e-9);
    assert!(!config.metrics.enabled);
}

#[test]
fn full_job_file_is_parsed() {
    let text = r#"
        [geometry]
        wavelength = 1.31
        x_step = 0.05
        y_step = 0.04
        widths = [0.4, 0.4]
        gaps = [0.2]
        core_thickness = 0.3
        slab_thickness = 0.1
        n_sub = 1.45
        n_clads = [1.45, 1.0]
        clad_thicknesses = [0.3, 0.2]

        [geometry.core_anisotropic]
        xx = 2.21
        yy = 2.21
        zz = 2.14

        [solver]
        kind = "full"
        n_modes = 4
        tol = 1e-8
        max_restarts = 20
        shift_index = 2.2

        [metrics]
        enabled = true
        output = "out/metrics.jsonl"
    "#;
    let config = JobConfig::from_toml_str(text).unwrap();
    assert_eq!(
        config.geometry.core_anisotropic,
        Some(AnisotropicIndex {
            xx: 2.21,
            yy: 2.21,
            zz: 2.14
        })
    );
    assert_eq!(config.metrics.format, MetricsFormat::JsonLines);

    let job = config.job().unwrap();
    assert_eq!(job.kind, SolverKind::Full);
    assert_eq!(job.n_modes, 4);
    assert_eq!(job.options.eigen.max_restarts, 20);
    assert_eq!(job.options.shift_index, Some(2.2));
    assert_relative_eq!(job.geometry.wavelength(), 1.31);
    assert_eq!(job.geometry.kind(), StructureKind::Array);
    assert_relative_eq!(job.geometry.slab_thickness(), 0.1);
    assert_eq!(job.geometry.widths().len(), 2);
    assert_eq!(job.geometry.claddings().len(), 2);
    assert!(job.geometry.is_anisotropic());
}

#[test]
fn cladding_lists_must_have_equal_length() {
    let config = JobConfig::from_toml_str(
        r#"
        [geometry]
        n_clads = [1.444, 1.0]
        clad_thicknesses = [0.5]
        "#,
    )
    .unwrap();
    assert_eq!(
        config.job().unwrap_err(),
        ConfigurationError::CladdingMismatch {
            count: 1,
            materials: 2
        }
    );
}

#[test]
fn unknown_solver_kind_is_a_configuration_error() {
    let err = JobConfig::from_toml_str("[solver]\nkind = \"magic\"\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(_)));
}

#[test]
fn zero_modes_is_rejected_when_building_the_job() {
    let config = JobConfig::from_toml_str("[solver]\nn_modes = 0\n").unwrap();
    assert_eq!(config.job().unwrap_err(), ConfigurationError::NoModesRequested);
}

#[test]
fn job_file_survives_a_toml_round_trip() {
    let mut config = JobConfig::default();
    config.geometry.widths = vec![0.45];
    config.geometry.n_core = N_SILICON;
    config.geometry.n_sub = N_SILICA;
    config.solver.kind = SolverKind::SemiTm;
    config.solver.n_modes = 3;
    let text = config.to_toml_string().unwrap();
    assert!(text.contains("semi-tm"));
    assert_eq!(JobConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = JobConfig::from_file("/nonexistent/wgmode/job.toml").unwrap_err();
    assert!(matches!(err, ModeSolverError::Io(_)));
}
