#![cfg(test)]

use approx::assert_relative_eq;

use super::error::ConfigurationError;
use super::geometry::{CladdingLayer, StructureKind, WaveguideGeometry, N_SILICA, N_SILICON};
use super::material::{Material, Medium};
use super::structure::{self, CrossSection, Region, Structure};

#[test]
fn default_builder_is_a_silicon_strip() {
    let geom = WaveguideGeometry::builder().build().unwrap();
    assert_eq!(geom.kind(), StructureKind::Strip);
    assert_eq!(geom.widths(), &[0.5]);
    assert_relative_eq!(geom.core_thickness(), 0.22);
    assert_relative_eq!(geom.domain_height(), 1.22, epsilon = 1e-12);
    assert_eq!(geom.cell_counts(), (100, 61));
}

#[test]
fn partial_trailing_cells_are_truncated() {
    let geom = WaveguideGeometry::builder()
        .domain_width(2.05)
        .steps(0.1, 0.1)
        .build()
        .unwrap();
    assert_eq!(geom.cell_counts().0, 20);
}

#[test]
fn non_positive_dimensions_are_rejected() {
    let err = WaveguideGeometry::builder().width(-0.1).build().unwrap_err();
    assert!(matches!(err, ConfigurationError::NonPositive { name: "width", .. }));

    let err = WaveguideGeometry::builder().x_step(0.0).build().unwrap_err();
    assert!(matches!(err, ConfigurationError::NonPositive { name: "x_step", .. }));

    let err = WaveguideGeometry::builder()
        .slab_thickness(-0.01)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::Negative { .. }));
}

#[test]
fn sidewall_angle_must_be_below_ninety_degrees() {
    let err = WaveguideGeometry::builder()
        .sidewall_angle(90.0)
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::AngleOutOfRange(90.0));
    assert!(WaveguideGeometry::builder().sidewall_angle(10.0).build().is_ok());
}

#[test]
fn slab_must_be_thinner_than_core() {
    let err = WaveguideGeometry::builder()
        .slab_thickness(0.22)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::SlabTooThick { .. }));
}

#[test]
fn array_requires_one_gap_per_neighbour_pair() {
    let err = WaveguideGeometry::builder()
        .array(vec![0.4, 0.4, 0.4], vec![0.2])
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::GapCount {
            cores: 3,
            expected: 2,
            got: 1
        }
    );
}

#[test]
fn cores_must_fit_in_the_domain() {
    let err = WaveguideGeometry::builder().width(2.5).build().unwrap_err();
    assert!(matches!(err, ConfigurationError::CoresExceedDomain { .. }));
}

#[test]
fn tiny_domain_is_rejected() {
    let err = WaveguideGeometry::builder()
        .domain_width(0.03)
        .width(0.01)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::GridTooSmall { nx: 1, .. }));
}

#[test]
fn bad_material_lookup_fails_at_build() {
    let err = WaveguideGeometry::builder()
        .core(Material::from_fn("broken", |_| -1.0))
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidIndex { .. }));
}

#[test]
fn array_cores_are_centred_as_a_group() {
    let geom = WaveguideGeometry::builder()
        .array(vec![0.4, 0.4], vec![0.2])
        .build()
        .unwrap();
    assert_eq!(geom.kind(), StructureKind::Array);
    let offsets = geom.core_offsets();
    assert_relative_eq!(offsets[0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(offsets[1], 1.1, epsilon = 1e-12);
}

#[test]
fn uniform_gap_fills_every_gap() {
    let geom = WaveguideGeometry::builder()
        .array(vec![0.3, 0.3, 0.3], Vec::new())
        .uniform_gap(0.15)
        .build()
        .unwrap();
    assert_eq!(geom.gaps(), &[0.15, 0.15]);
}

#[test]
fn dispersive_materials_follow_the_wavelength() {
    let geom = WaveguideGeometry::builder()
        .core(Material::from_fn("linear", |wl| 3.0 + 0.1 * wl))
        .build()
        .unwrap();
    let a = geom.canonical().unwrap();
    let b = geom.with_wavelength(1.31).unwrap().canonical().unwrap();
    assert_relative_eq!(a.core.xx, (3.0f64 + 0.155).powi(2), epsilon = 1e-12);
    assert_relative_eq!(b.core.xx, (3.0f64 + 0.131).powi(2), epsilon = 1e-12);
    assert_ne!(a, b);
}

#[test]
fn regions_follow_the_layer_stack() {
    let geom = WaveguideGeometry::builder()
        .claddings(vec![
            CladdingLayer::new(0.3, N_SILICA),
            CladdingLayer::new(0.2, 1.0),
        ])
        .build()
        .unwrap();
    let s = Structure::from_geometry(&geom);
    assert_eq!(s.region_at(1.0, 0.1), Region::Substrate);
    assert_eq!(s.region_at(1.0, 0.6), Region::Core);
    assert_eq!(s.region_at(0.2, 0.6), Region::Cladding(0));
    assert_eq!(s.region_at(1.0, 0.9), Region::Cladding(0));
    assert_eq!(s.region_at(1.0, 1.15), Region::Cladding(1));
}

#[test]
fn rib_slab_spans_the_full_width() {
    let geom = WaveguideGeometry::builder()
        .slab_thickness(0.09)
        .build()
        .unwrap();
    assert_eq!(geom.kind(), StructureKind::Rib);
    let s = Structure::from_geometry(&geom);
    assert_eq!(s.region_at(0.05, 0.55), Region::Core);
    assert_eq!(s.region_at(0.05, 0.65), Region::Cladding(0));
}

#[test]
fn sidewall_angle_narrows_the_top_of_the_core() {
    let geom = WaveguideGeometry::builder()
        .sidewall_angle(20.0)
        .build()
        .unwrap();
    let s = Structure::from_geometry(&geom);
    // Bottom edge sits at x = 0.75; near the top the edge has moved inwards.
    assert_eq!(s.region_at(0.76, 0.505), Region::Core);
    assert_eq!(s.region_at(0.76, 0.715), Region::Cladding(0));
}

#[test]
fn rasterized_index_matches_materials() {
    let geom = WaveguideGeometry::builder().steps(0.05, 0.05).build().unwrap();
    let dielectric = structure::build(&geom).unwrap();
    let grid = dielectric.grid;
    assert_eq!((grid.nx, grid.ny), (40, 24));
    let n = dielectric.index();
    // Cell (20, 12) is centred at (1.025, 0.625), inside the core.
    assert_relative_eq!(n[grid.idx(20, 12)], N_SILICON, epsilon = 1e-12);
    assert_relative_eq!(n[grid.idx(0, 0)], N_SILICA, epsilon = 1e-12);
    let (lo, hi) = dielectric.index_bounds();
    assert_relative_eq!(lo, N_SILICA, epsilon = 1e-12);
    assert_relative_eq!(hi, N_SILICON, epsilon = 1e-12);
    assert!(!dielectric.is_anisotropic());
}

#[test]
fn anisotropic_core_fills_separate_tensor_components() {
    let geom = WaveguideGeometry::builder()
        .steps(0.05, 0.05)
        .core(Medium::Anisotropic {
            xx: Material::constant(2.2),
            yy: Material::constant(2.2),
            zz: Material::constant(2.1),
        })
        .build()
        .unwrap();
    assert!(geom.is_anisotropic());
    let dielectric = structure::build(&geom).unwrap();
    let i = dielectric.grid.idx(20, 12);
    assert_relative_eq!(dielectric.eps_xx()[i], 4.84, epsilon = 1e-12);
    assert_relative_eq!(dielectric.eps_zz()[i], 4.41, epsilon = 1e-12);
    assert!(dielectric.is_anisotropic());
}
