//! Caller-owned on-disk cache of solve results.
//!
//! Each entry is a JSON file named after the FNV-1a hash of a canonical key
//! (resolved geometry, grid resolution, mode count, solver kind). The key is
//! stored alongside the modes and compared on load, so a stale or colliding
//! file is reported as corrupt rather than returned.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CacheCorruptionError, ModeSolverError};
use crate::geometry::{CanonicalGeometry, WaveguideGeometry};
use crate::metrics::{MetricsEvent, MetricsRecorder};
use crate::mode::{ModeSet, SolverKind};
use crate::solver::{self, SolveOptions};

const FORMAT_VERSION: u32 = 1;

// ============================================================================
// Key
// ============================================================================

/// Everything that identifies a solve result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheKey {
    pub geometry: CanonicalGeometry,
    pub nx: usize,
    pub ny: usize,
    pub n_modes: usize,
    pub solver: SolverKind,
}

impl CacheKey {
    pub fn new(
        geometry: &WaveguideGeometry,
        n_modes: usize,
        solver: SolverKind,
    ) -> Result<Self, ModeSolverError> {
        let (nx, ny) = geometry.cell_counts();
        Ok(Self {
            geometry: geometry.canonical()?,
            nx,
            ny,
            n_modes,
            solver,
        })
    }

    /// 16 hex digits of the FNV-1a hash of the key's JSON form.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let canonical = serde_json::to_string(self)?;
        Ok(format!("{:016x}", fnv1a64(canonical.as_bytes())))
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    key: CacheKey,
    modes: ModeSet,
}

// ============================================================================
// Cache
// ============================================================================

static TMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A directory of cached mode sets.
#[derive(Debug, Clone)]
pub struct ModeCache {
    dir: PathBuf,
}

impl ModeCache {
    /// Opens (and creates if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> io::Result<PathBuf> {
        Ok(self.dir.join(format!("{}.json", key.digest()?)))
    }

    /// Reads the entry for `key`. `Ok(None)` when nothing is stored.
    pub fn load(&self, key: &CacheKey) -> Result<Option<ModeSet>, CacheCorruptionError> {
        let path = self.path_for(key).map_err(|e| CacheCorruptionError {
            path: self.dir.clone(),
            reason: format!("unhashable key: {e}"),
        })?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CacheCorruptionError {
                    path,
                    reason: err.to_string(),
                })
            }
        };
        let corrupt = |reason: String| CacheCorruptionError {
            path: path.clone(),
            reason,
        };
        let entry: CacheEntry = serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
        if entry.version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {} (expected {FORMAT_VERSION})",
                entry.version
            )));
        }
        if entry.key != *key {
            return Err(corrupt("stored key does not match the request".into()));
        }
        if !entry.modes.is_consistent() || entry.modes.requested() != key.n_modes {
            return Err(corrupt("stored modes are inconsistent".into()));
        }
        Ok(Some(entry.modes))
    }

    /// Writes `modes` under `key`: a temporary file renamed into place.
    pub fn store(&self, key: &CacheKey, modes: &ModeSet) -> io::Result<PathBuf> {
        let digest = key.digest()?;
        let path = self.dir.join(format!("{digest}.json"));
        let tmp = self.dir.join(format!(
            ".{digest}.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let entry = CacheEntry {
            version: FORMAT_VERSION,
            key: key.clone(),
            modes: modes.clone(),
        };
        let result = (|| -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, &entry)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map(|()| path)
    }

    /// Returns the cached result for this solve or computes and stores it.
    ///
    /// A corrupt entry is logged and replaced by a fresh solve.
    pub fn get_or_solve(
        &self,
        geometry: &WaveguideGeometry,
        n_modes: usize,
        kind: SolverKind,
        opts: &SolveOptions,
    ) -> Result<ModeSet, ModeSolverError> {
        self.get_or_solve_with_metrics(geometry, n_modes, kind, opts, None)
    }

    pub fn get_or_solve_with_metrics(
        &self,
        geometry: &WaveguideGeometry,
        n_modes: usize,
        kind: SolverKind,
        opts: &SolveOptions,
        metrics: Option<&MetricsRecorder>,
    ) -> Result<ModeSet, ModeSolverError> {
        let key = CacheKey::new(geometry, n_modes, kind)?;
        let digest = key.digest().map_err(io::Error::from)?;
        let cached = match self.load(&key) {
            Ok(hit) => hit,
            Err(err) => {
                warn!("[cache] {err}; recomputing");
                None
            }
        };
        if let Some(recorder) = metrics {
            recorder.emit(MetricsEvent::CacheLookup {
                key: &digest,
                hit: cached.is_some(),
            });
        }
        if let Some(modes) = cached {
            debug!("[cache] hit {digest}");
            return Ok(modes);
        }

        debug!("[cache] miss {digest}");
        let modes = solver::solve_with_metrics(geometry, n_modes, kind, opts, metrics)?;
        if let Err(err) = self.store(&key, &modes) {
            warn!("[cache] failed to store {digest}: {err}");
        }
        Ok(modes)
    }
}
