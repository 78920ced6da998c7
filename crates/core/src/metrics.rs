//! Lightweight metrics recorder (JSONL) for solves and sweeps.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::mode::SolverKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub format: MetricsFormat,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output: None,
            format: MetricsFormat::JsonLines,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsFormat {
    #[default]
    JsonLines,
}

pub struct MetricsRecorder {
    writer: Mutex<File>,
    format: MetricsFormat,
}

impl MetricsRecorder {
    pub fn new(path: &Path, format: MetricsFormat) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(file),
            format,
        })
    }

    pub fn emit(&self, event: MetricsEvent<'_>) {
        if let Err(err) = self.write_event(event) {
            log::warn!("[metrics] failed to write event: {err}");
        }
    }

    fn write_event(&self, event: MetricsEvent<'_>) -> io::Result<()> {
        match self.format {
            MetricsFormat::JsonLines => {
                let envelope = EventEnvelope {
                    timestamp_ms: now_millis(),
                    event,
                };
                let mut guard = self
                    .writer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                serde_json::to_writer(&mut *guard, &envelope)?;
                guard.write_all(b"\n")?;
                guard.flush()
            }
        }
    }
}

#[derive(Serialize)]
struct EventEnvelope<'a> {
    timestamp_ms: f64,
    #[serde(flatten)]
    event: MetricsEvent<'a>,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricsEvent<'a> {
    SolveStart {
        solver: SolverKind,
        grid_nx: usize,
        grid_ny: usize,
        n_modes: usize,
        wavelength: f64,
        tol: f64,
        max_restarts: usize,
    },
    DielectricBuilt {
        duration_ms: f64,
        grid_points: usize,
        anisotropic: bool,
    },
    SolveDone {
        modes: usize,
        discarded: usize,
        restarts: usize,
        applications: usize,
        shift_index: f64,
        leading_neff: Option<f64>,
        duration_ms: f64,
    },
    CacheLookup {
        key: &'a str,
        hit: bool,
    },
    SweepPoint {
        index: usize,
        parameter: &'a str,
        value: f64,
        modes: usize,
        failed: bool,
        duration_ms: f64,
    },
    SweepDone {
        points: usize,
        failures: usize,
        duration_ms: f64,
    },
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

impl MetricsConfig {
    pub fn build_recorder(&self) -> io::Result<Option<MetricsRecorder>> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.output.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "metrics.output must be set when metrics are enabled",
            )
        })?;
        MetricsRecorder::new(path, self.format).map(Some)
    }
}
