//! wgmode Bulk Driver - multi-threaded parameter sweeps.
//!
//! Reads a sweep file (a job file plus a `[sweep]` table), expands the swept
//! parameter into one job per value, solves the jobs on a thread pool with a
//! progress bar, tracks modes across the entries and writes a CSV with one
//! row per (entry, slot).

pub mod config;
pub mod driver;
pub mod expansion;
pub mod output;

pub use config::{ConfigError, RangeSpec, SweepConfig, SweepParameter, SweepSection};
pub use driver::{BulkDriver, DriverError, DriverStats, JobError, PreRunReport, SweepRun};
pub use expansion::{expand_jobs, ExpandedJob};
