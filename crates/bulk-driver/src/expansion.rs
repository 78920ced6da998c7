//! Job expansion from the `[sweep]` table.
//!
//! Every swept value becomes one `ExpandedJob` carrying a validated geometry.
//! Geometry errors surface here, before any solve starts.

use wgmode_core::geometry::WaveguideGeometry;

use crate::config::{ConfigError, SweepConfig};

// ============================================================================
// Expanded Job
// ============================================================================

/// A single sweep entry with its geometry resolved.
#[derive(Debug, Clone)]
pub struct ExpandedJob {
    /// Position in sweep order (0-based).
    pub index: usize,

    /// Value of the swept parameter.
    pub value: f64,

    pub geometry: WaveguideGeometry,
}

// ============================================================================
// Expansion Logic
// ============================================================================

pub fn expand_jobs(config: &SweepConfig) -> Result<Vec<ExpandedJob>, ConfigError> {
    let parameter = config.sweep.parameter;
    config
        .values()
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let geometry = parameter.apply(&config.geometry, value).build().map_err(|e| {
                ConfigError::InvalidSweep(format!("{parameter} = {value}: {e}"))
            })?;
            Ok(ExpandedJob {
                index,
                value,
                geometry,
            })
        })
        .collect()
}
