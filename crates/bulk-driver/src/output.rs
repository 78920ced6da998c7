//! CSV output for sweep results and refractive-index profiles.
//!
//! Sweep files have one row per (entry, slot). Skipped entries and empty slots
//! keep their row with blank mode columns so every sweep value appears in the
//! file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use wgmode_core::dielectric::Dielectric2D;
use wgmode_core::sweep::SweepResult;

pub const HEADER: [&str; 7] = [
    "index",
    "value",
    "slot",
    "neff_re",
    "neff_im",
    "polarization",
    "te_fraction",
];

pub fn write_csv<W: Write>(writer: &mut W, result: &SweepResult) -> io::Result<()> {
    writeln!(writer, "# parameter = {}", result.parameter())?;
    writeln!(writer, "{}", HEADER.join(","))?;
    for (index, entry) in result.entries().iter().enumerate() {
        for slot in 0..result.slot_count().max(entry.slots().len()) {
            match entry.tracked(slot) {
                Some(mode) => writeln!(
                    writer,
                    "{index},{:.6},{slot},{:.10},{:.3e},{},{:.6}",
                    entry.value(),
                    mode.neff().re,
                    mode.neff().im,
                    mode.polarization(),
                    mode.te_fraction()
                )?,
                None => writeln!(writer, "{index},{:.6},{slot},,,,", entry.value())?,
            }
        }
    }
    Ok(())
}

/// Writes the CSV to `path`, creating parent directories.
pub fn write_csv_file(path: &Path, result: &SweepResult) -> io::Result<()> {
    let mut writer = create(path)?;
    write_csv(&mut writer, result)?;
    writer.flush()
}

pub const INDEX_HEADER: [&str; 5] = ["x", "y", "n_xx", "n_yy", "n_zz"];

/// Refractive index at every cell centre, x outer and y inner.
pub fn write_index_profile<W: Write>(writer: &mut W, dielectric: &Dielectric2D) -> io::Result<()> {
    writeln!(writer, "# wavelength = {}", dielectric.wavelength())?;
    writeln!(writer, "{}", INDEX_HEADER.join(","))?;
    let grid = dielectric.grid;
    let (xx, yy, zz) = (dielectric.eps_xx(), dielectric.eps_yy(), dielectric.eps_zz());
    for ix in 0..grid.nx {
        for iy in 0..grid.ny {
            let i = grid.idx(ix, iy);
            writeln!(
                writer,
                "{:.6},{:.6},{:.6},{:.6},{:.6}",
                grid.x_at(ix),
                grid.y_at(iy),
                xx[i].sqrt(),
                yy[i].sqrt(),
                zz[i].sqrt()
            )?;
        }
    }
    Ok(())
}

pub fn write_index_profile_file(path: &Path, dielectric: &Dielectric2D) -> io::Result<()> {
    let mut writer = create(path)?;
    write_index_profile(&mut writer, dielectric)?;
    writer.flush()
}

fn create(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}
