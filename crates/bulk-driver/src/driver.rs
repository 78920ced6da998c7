//! Multi-threaded driver for sweep execution.
//!
//! Entries are solved independently on a rayon pool. Each outcome is stored
//! under its sweep index, so tracking sees the entries in sweep order no
//! matter which worker finished first.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rayon::prelude::*;

use wgmode_core::error::{ModeSolverError, SweepError};
use wgmode_core::metrics::{MetricsEvent, MetricsRecorder};
use wgmode_core::mode::ModeSet;
use wgmode_core::solver::{self, SolveOptions};
use wgmode_core::sweep::SweepResult;

use crate::config::{ConfigError, SweepConfig};
use crate::expansion::{expand_jobs, ExpandedJob};
use crate::output;

// ============================================================================
// Job Errors
// ============================================================================

/// A failed entry, kept for the run summary.
#[derive(Debug, Clone)]
pub struct JobError {
    pub index: usize,

    pub value: f64,

    pub message: String,
}

// ============================================================================
// Pre-Run Report
// ============================================================================

pub struct PreRunReport {
    lines: Vec<String>,
}

impl PreRunReport {
    pub fn build(config: &SweepConfig, jobs: &[ExpandedJob], threads: usize) -> Self {
        let mut lines = Vec::new();

        lines.push(String::from("╭─────────────────────────────────────────────────╮"));
        lines.push(String::from("│            wgmode Sweep Driver                  │"));
        lines.push(String::from("╰─────────────────────────────────────────────────╯"));
        lines.push(String::new());

        lines.push(format!("  Jobs: {}  │  Threads: {}", jobs.len(), threads));
        lines.push(String::new());

        let g = &config.geometry;
        lines.push(format!(
            "  Fixed: λ={} µm, grid step={}×{} µm, cores={}",
            g.wavelength,
            g.x_step,
            g.y_step,
            g.widths.len()
        ));
        if let (Some(first), Some(last)) = (jobs.first(), jobs.last()) {
            lines.push(format!(
                "  Swept: {}: {}→{} ({})",
                config.sweep.parameter,
                first.value,
                last.value,
                jobs.len()
            ));
        }
        lines.push(format!(
            "  Solver: {} (n_modes={})  │  on failure: {:?}",
            config.solver.kind, config.solver.n_modes, config.sweep.on_failure
        ));
        lines.push(format!("  Output: {}", config.sweep.output.display()));
        lines.push(String::new());

        Self { lines }
    }

    pub fn print(&self) {
        for line in &self.lines {
            println!("{}", line);
        }
        let _ = io::stdout().flush();
    }
}

// ============================================================================
// Bulk Driver
// ============================================================================

pub struct BulkDriver {
    config: SweepConfig,

    jobs: Vec<ExpandedJob>,

    options: SolveOptions,

    threads: usize,

    show_progress: bool,
}

impl BulkDriver {
    /// Expands the sweep. `requested_threads` overrides the file setting.
    pub fn new(config: SweepConfig, requested_threads: Option<usize>) -> Result<Self, DriverError> {
        let jobs = expand_jobs(&config)?;
        let options = config.solver.options().map_err(ConfigError::from)?;
        let threads = match requested_threads {
            Some(n) if n > 0 => n,
            _ => config.effective_threads(),
        };
        Ok(Self {
            config,
            jobs,
            options,
            threads,
            show_progress: true,
        })
    }

    /// Hides the progress bar and the pre-run report.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn jobs(&self) -> &[ExpandedJob] {
        &self.jobs
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Solves every entry and tracks modes across them.
    pub fn run(&self) -> Result<SweepRun, DriverError> {
        let recorder = self
            .config
            .metrics
            .build_recorder()
            .map_err(|e| DriverError::OutputError(e.to_string()))?;
        self.run_with_metrics(recorder.as_ref())
    }

    pub fn run_with_metrics(
        &self,
        metrics: Option<&MetricsRecorder>,
    ) -> Result<SweepRun, DriverError> {
        let parameter = self.config.sweep.parameter.name();
        let n_modes = self.config.solver.n_modes;
        if self.jobs.is_empty() {
            warn!("no jobs to execute (sweep resulted in zero values)");
        }

        if self.show_progress {
            PreRunReport::build(&self.config, &self.jobs, self.threads).print();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| DriverError::ThreadPoolError(e.to_string()))?;

        let outcomes: Mutex<Vec<Option<Result<ModeSet, ModeSolverError>>>> =
            Mutex::new((0..self.jobs.len()).map(|_| None).collect());
        let completed = AtomicUsize::new(0);
        let errors = Mutex::new(Vec::new());

        let pb = ProgressBar::new(self.jobs.len() as u64);
        if self.show_progress {
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            {
                pb.set_style(style.progress_chars("█▓░"));
            }
        } else {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }

        let start_time = Instant::now();
        let kind = self.config.solver.kind;

        pool.install(|| {
            self.jobs.par_iter().for_each(|job| {
                let job_start = Instant::now();
                let outcome =
                    solver::solve_with_metrics(&job.geometry, n_modes, kind, &self.options, metrics);
                let duration = job_start.elapsed();
                debug!(
                    "[driver] entry {} ({parameter} = {}) in {:.2?}",
                    job.index, job.value, duration
                );

                if let Some(recorder) = metrics {
                    recorder.emit(MetricsEvent::SweepPoint {
                        index: job.index,
                        parameter,
                        value: job.value,
                        modes: outcome.as_ref().map_or(0, ModeSet::len),
                        failed: outcome.is_err(),
                        duration_ms: duration.as_secs_f64() * 1000.0,
                    });
                }

                match &outcome {
                    Ok(_) => {
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => errors.lock().push(JobError {
                        index: job.index,
                        value: job.value,
                        message: e.to_string(),
                    }),
                }
                outcomes.lock()[job.index] = Some(outcome);
                pb.inc(1);
            });
        });

        pb.finish_and_clear();

        let total_time = start_time.elapsed();
        let mut errors = errors.into_inner();
        errors.sort_by_key(|e| e.index);
        let stats = DriverStats {
            total_jobs: self.jobs.len(),
            completed: completed.load(Ordering::Relaxed),
            failed: errors.len(),
            total_time,
            errors,
        };
        stats.log_summary();

        let values: Vec<f64> = self.jobs.iter().map(|j| j.value).collect();
        let outcomes: Vec<Result<ModeSet, ModeSolverError>> = outcomes
            .into_inner()
            .into_iter()
            .map(|o| o.ok_or_else(|| DriverError::OutputError("sweep entry was never solved".into())))
            .collect::<Result<_, _>>()?;
        let result = SweepResult::from_solves(
            parameter,
            &values,
            n_modes,
            outcomes,
            self.config.sweep.on_failure,
        )?;

        if let Some(recorder) = metrics {
            recorder.emit(MetricsEvent::SweepDone {
                points: result.len(),
                failures: result.absent(),
                duration_ms: total_time.as_secs_f64() * 1000.0,
            });
        }

        Ok(SweepRun { result, stats })
    }

    /// Runs the sweep and writes the CSV named in the configuration.
    pub fn run_and_write(&self) -> Result<SweepRun, DriverError> {
        let run = self.run()?;
        output::write_csv_file(&self.config.sweep.output, &run.result)
            .map_err(|e| DriverError::OutputError(e.to_string()))?;
        info!(
            "[driver] wrote {} entries to {}",
            run.result.len(),
            self.config.sweep.output.display()
        );
        Ok(run)
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Tracked sweep plus run statistics.
#[derive(Debug)]
pub struct SweepRun {
    pub result: SweepResult,
    pub stats: DriverStats,
}

/// Statistics from a completed sweep run.
#[derive(Debug, Default)]
pub struct DriverStats {
    pub total_jobs: usize,

    pub completed: usize,

    pub failed: usize,

    pub total_time: Duration,

    /// Failed entries in sweep order.
    pub errors: Vec<JobError>,
}

impl DriverStats {
    fn log_summary(&self) {
        if self.failed == 0 {
            info!(
                "{} jobs completed in {:.2}s",
                self.completed,
                self.total_time.as_secs_f64()
            );
            return;
        }
        warn!(
            "{}/{} jobs completed, {} failed in {:.2}s",
            self.completed,
            self.total_jobs,
            self.failed,
            self.total_time.as_secs_f64()
        );
        for err in self.errors.iter().take(5) {
            error!("job {} (value {}) failed: {}", err.index, err.value, err.message);
        }
        if self.errors.len() > 5 {
            error!("... and {} more errors", self.errors.len() - 5);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to create thread pool: {0}")]
    ThreadPoolError(String),

    #[error("output error: {0}")]
    OutputError(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sweep(#[from] SweepError),
}
