#![cfg(test)]

use approx::assert_relative_eq;

use super::full_vectorial;
use super::geometry::WaveguideGeometry;
use super::material::{Material, Medium};
use super::mode::SolverKind;
use super::polarization::Polarization;
use super::postprocess;
use super::solver::{solve, SolveOptions};
use super::structure;

fn coarse_strip() -> WaveguideGeometry {
    WaveguideGeometry::builder().steps(0.05, 0.05).build().unwrap()
}

#[test]
fn operator_couples_the_two_transverse_components() {
    let dielectric = structure::build(&coarse_strip()).unwrap();
    let a = full_vectorial::assemble(&dielectric);
    assert_eq!(a.dim(), 2 * dielectric.grid.len());
    // Hx on the top face of the core couples to Hy above it; inside a
    // homogeneous region the coupling cancels.
    let grid = dielectric.grid;
    let top = 2 * grid.idx(20, 13);
    assert!(a.get(top, top + 3).norm() > 1.0);
    let inner = 2 * grid.idx(20, 11);
    assert!(a.get(inner, inner + 3).norm() < 1e-9);
}

#[test]
fn strip_supports_a_te_and_a_tm_mode() {
    let modes = solve(&coarse_strip(), 2, SolverKind::Full, &SolveOptions::default()).unwrap();
    assert_eq!(modes.len(), 2);
    let (te, tm) = (&modes[0], &modes[1]);
    assert_eq!(te.polarization(), Polarization::TE);
    assert_eq!(tm.polarization(), Polarization::TM);
    assert!(te.te_fraction() > 0.8, "TE fraction {}", te.te_fraction());
    assert!(tm.tm_fraction() > 0.8, "TM fraction {}", tm.tm_fraction());

    let n_te = te.neff().re;
    let n_tm = tm.neff().re;
    assert!(n_te > 2.0 && n_te < 2.7, "TE neff {n_te}");
    assert!(n_tm > 1.5 && n_tm < 2.2, "TM neff {n_tm}");
}

#[test]
fn vectorial_modes_carry_all_six_components() {
    let modes = solve(&coarse_strip(), 1, SolverKind::Full, &SolveOptions::default()).unwrap();
    let mode = &modes[0];
    for f in [mode.ex(), mode.ey(), mode.ez(), mode.hx(), mode.hy(), mode.hz()] {
        let f = f.expect("component present");
        assert_eq!(f.grid(), modes[0].grid().unwrap());
    }
    assert!(mode.fields().has_magnetic());
    assert!(mode.ez().unwrap().norm_sqr() > 0.0);
    assert!(mode.hz().unwrap().norm_sqr() > 0.0);
}

#[test]
fn poynting_power_of_a_forward_mode_is_positive() {
    let modes = solve(&coarse_strip(), 1, SolverKind::Full, &SolveOptions::default()).unwrap();
    assert!(postprocess::power(&modes[0]) > 0.0);
    let normalized = postprocess::normalize(&modes[0]).unwrap();
    assert_relative_eq!(postprocess::power(&normalized), 1.0, max_relative = 1e-6);
}

#[test]
fn isotropic_tensor_matches_the_scalar_material() {
    let opts = SolveOptions::default();
    let iso = solve(&coarse_strip(), 1, SolverKind::Full, &opts).unwrap();
    let tensor = coarse_strip()
        .to_builder()
        .core(Medium::Anisotropic {
            xx: Material::constant(3.476),
            yy: Material::constant(3.476),
            zz: Material::constant(3.476),
        })
        .build()
        .unwrap();
    assert!(tensor.is_anisotropic());
    let aniso = solve(&tensor, 1, SolverKind::Full, &opts).unwrap();
    assert_relative_eq!(iso[0].neff().re, aniso[0].neff().re, epsilon = 1e-8);
}

#[test]
fn larger_yy_index_raises_the_tm_mode_more_than_the_te_mode() {
    let opts = SolveOptions::default();
    let base = solve(&coarse_strip(), 2, SolverKind::Full, &opts).unwrap();
    let raised = coarse_strip()
        .to_builder()
        .core(Medium::Anisotropic {
            xx: Material::constant(3.476),
            yy: Material::constant(3.6),
            zz: Material::constant(3.476),
        })
        .build()
        .unwrap();
    let raised = solve(&raised, 2, SolverKind::Full, &opts).unwrap();
    let te_shift = raised[0].neff().re - base[0].neff().re;
    let tm_shift = raised[1].neff().re - base[1].neff().re;
    assert!(tm_shift > te_shift, "TE shift {te_shift}, TM shift {tm_shift}");
}
