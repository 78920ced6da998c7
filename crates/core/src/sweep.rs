//! Parameter sweeps with mode tracking.

use std::time::Instant;

use log::{info, warn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ModeSolverError, SweepError};
use crate::geometry::WaveguideGeometry;
use crate::metrics::{MetricsEvent, MetricsRecorder};
use crate::mode::{Mode, ModeSet, SolverKind};
use crate::mode_tracking;
use crate::solver::{self, SolveOptions};

/// What a failing sweep entry does to the rest of the sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the sweep and report the entry.
    #[default]
    FailFast,
    /// Log a warning and leave the entry absent.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    /// Name of the swept parameter, used in logs and errors.
    pub legend: String,
    pub on_failure: FailurePolicy,
    pub solve: SolveOptions,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            legend: "parameter".to_string(),
            on_failure: FailurePolicy::FailFast,
            solve: SolveOptions::default(),
        }
    }
}

// ============================================================================
// Result types
// ============================================================================

/// One sweep step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    value: f64,
    modes: Option<ModeSet>,
    /// `slots[i]` is the native index in `modes` of tracked mode `i`.
    slots: Vec<Option<usize>>,
}

impl SweepEntry {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The native mode set; `None` for a skipped entry.
    pub fn modes(&self) -> Option<&ModeSet> {
        self.modes.as_ref()
    }

    pub fn is_absent(&self) -> bool {
        self.modes.is_none()
    }

    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }

    /// Mode occupying tracked slot `slot` at this step.
    pub fn tracked(&self, slot: usize) -> Option<&Mode> {
        let native = (*self.slots.get(slot)?)?;
        self.modes.as_ref()?.get(native)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    parameter: String,
    n_slots: usize,
    entries: Vec<SweepEntry>,
}

impl SweepResult {
    /// Rejoins per-entry solve outcomes (in sweep order) and tracks modes
    /// across them.
    pub fn from_solves(
        parameter: &str,
        values: &[f64],
        n_modes: usize,
        outcomes: Vec<Result<ModeSet, ModeSolverError>>,
        policy: FailurePolicy,
    ) -> Result<Self, SweepError> {
        if values.len() != outcomes.len() {
            return Err(ConfigurationError::Invalid(format!(
                "{} sweep values but {} solve outcomes",
                values.len(),
                outcomes.len()
            ))
            .into());
        }

        let mut sets = Vec::with_capacity(outcomes.len());
        for (index, (outcome, &value)) in outcomes.into_iter().zip(values).enumerate() {
            match outcome {
                Ok(set) => sets.push(Some(set)),
                Err(source) => match policy {
                    FailurePolicy::FailFast => {
                        return Err(SweepError::Entry {
                            index,
                            parameter: parameter.to_string(),
                            value,
                            source,
                        })
                    }
                    FailurePolicy::Skip => {
                        warn!("[sweep] skipping entry {index} ({parameter} = {value}): {source}");
                        sets.push(None);
                    }
                },
            }
        }

        let entries = track(values, n_modes, sets);
        Ok(Self {
            parameter: parameter.to_string(),
            n_slots: n_modes,
            entries,
        })
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requested mode count, or more when modes appeared that no slot could
    /// take.
    pub fn slot_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.slots.len())
            .fold(self.n_slots, usize::max)
    }

    pub fn entries(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(SweepEntry::value).collect()
    }

    /// Number of skipped entries.
    pub fn absent(&self) -> usize {
        self.entries.iter().filter(|e| e.is_absent()).count()
    }

    /// neff of tracked slot `slot` at every step.
    pub fn slot_neffs(&self, slot: usize) -> Vec<Option<Complex64>> {
        self.entries
            .iter()
            .map(|e| e.tracked(slot).map(Mode::neff))
            .collect()
    }
}

fn track(values: &[f64], n_slots: usize, sets: Vec<Option<ModeSet>>) -> Vec<SweepEntry> {
    let mut last_seen: Vec<Option<Mode>> = vec![None; n_slots];
    let mut started = false;
    let mut entries = Vec::with_capacity(sets.len());

    for (set, &value) in sets.into_iter().zip(values) {
        let Some(set) = set else {
            entries.push(SweepEntry {
                value,
                modes: None,
                slots: vec![None; last_seen.len()],
            });
            continue;
        };

        let slots = if started {
            let prev: Vec<Option<&Mode>> = last_seen.iter().map(Option::as_ref).collect();
            let result = mode_tracking::track_modes(&prev, set.modes());
            if result.had_swaps {
                log::debug!(
                    "[sweep] slots reordered at value {value} (min overlap {:.3})",
                    result.min_overlap
                );
            }
            result.slots
        } else {
            started = true;
            mode_tracking::baseline(n_slots, set.modes())
        };

        if last_seen.len() < slots.len() {
            last_seen.resize(slots.len(), None);
        }
        for (slot, native) in slots.iter().enumerate() {
            if let Some(j) = native {
                last_seen[slot] = set.get(*j).cloned();
            }
        }
        entries.push(SweepEntry {
            value,
            modes: Some(set),
            slots,
        });
    }
    entries
}

// ============================================================================
// Sequential sweep
// ============================================================================

/// Solves every geometry in order and tracks modes across the steps.
pub fn sweep(
    geometries: &[WaveguideGeometry],
    values: &[f64],
    n_modes: usize,
    kind: SolverKind,
    opts: &SweepOptions,
) -> Result<SweepResult, SweepError> {
    sweep_with_metrics(geometries, values, n_modes, kind, opts, None)
}

pub fn sweep_with_metrics(
    geometries: &[WaveguideGeometry],
    values: &[f64],
    n_modes: usize,
    kind: SolverKind,
    opts: &SweepOptions,
    metrics: Option<&MetricsRecorder>,
) -> Result<SweepResult, SweepError> {
    if geometries.len() != values.len() {
        return Err(ConfigurationError::Invalid(format!(
            "{} geometries but {} sweep values",
            geometries.len(),
            values.len()
        ))
        .into());
    }
    if n_modes == 0 {
        return Err(ConfigurationError::NoModesRequested.into());
    }

    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(geometries.len());
    for (index, (geometry, &value)) in geometries.iter().zip(values).enumerate() {
        let entry_start = Instant::now();
        let outcome = solver::solve(geometry, n_modes, kind, &opts.solve);
        if let Some(recorder) = metrics {
            recorder.emit(MetricsEvent::SweepPoint {
                index,
                parameter: &opts.legend,
                value,
                modes: outcome.as_ref().map_or(0, ModeSet::len),
                failed: outcome.is_err(),
                duration_ms: entry_start.elapsed().as_secs_f64() * 1000.0,
            });
        }
        if let (Err(source), FailurePolicy::FailFast) = (&outcome, opts.on_failure) {
            // Stop solving; the error is reported by `from_solves`.
            log::debug!("[sweep] entry {index} failed: {source}");
            outcomes.push(outcome);
            let n = outcomes.len();
            return SweepResult::from_solves(
                &opts.legend,
                &values[..n],
                n_modes,
                outcomes,
                FailurePolicy::FailFast,
            );
        }
        outcomes.push(outcome);
    }

    let result =
        SweepResult::from_solves(&opts.legend, values, n_modes, outcomes, opts.on_failure)?;
    info!(
        "[sweep] {} = {} value(s), {} absent, {:.2?}",
        opts.legend,
        result.len(),
        result.absent(),
        start.elapsed()
    );
    if let Some(recorder) = metrics {
        recorder.emit(MetricsEvent::SweepDone {
            points: result.len(),
            failures: result.absent(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        });
    }
    Ok(result)
}
