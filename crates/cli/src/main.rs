//! wgmode command-line interface.
//!
//! ```sh
//! wgmode solve --config job.toml --output modes.csv --fiber-mfd 2.5
//! wgmode solve --config job.toml --index-profile index.csv
//! wgmode sweep --config sweep.toml --threads 8
//! wgmode validate job.toml
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::LevelFilter;
use wgmode_bulk_driver::{output::write_index_profile_file, BulkDriver, SweepConfig};
use wgmode_core::{
    cache::ModeCache,
    io::JobConfig,
    postprocess::{coupling_efficiency, effective_area},
    solver, structure, ModeSet,
};

#[derive(Parser, Debug)]
#[command(name = "wgmode", about = "Finite-difference waveguide mode solver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Only log errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Log solver progress (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve one cross-section and write its modes as CSV.
    Solve {
        /// Path to a TOML job file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to CSV output (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reuse and store results in this cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Fiber mode field diameter in µm; adds a coupling column
        #[arg(long)]
        fiber_mfd: Option<f64>,
        /// Also write the refractive-index profile as CSV
        #[arg(long)]
        index_profile: Option<PathBuf>,
    },
    /// Run a parameter sweep from a TOML sweep file.
    Sweep {
        /// Path to a TOML sweep file (job file plus a [sweep] table)
        #[arg(short, long)]
        config: PathBuf,
        /// Worker threads (overrides the file)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Path to CSV output (overrides the file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a job or sweep file without solving.
    Validate {
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Solve {
            config,
            output,
            cache_dir,
            fiber_mfd,
            index_profile,
        } => run_solve(
            &config,
            output.as_deref(),
            cache_dir,
            fiber_mfd,
            index_profile.as_deref(),
            cli.quiet,
        ),
        Commands::Sweep {
            config,
            threads,
            output,
        } => run_sweep(&config, threads, output, cli.quiet),
        Commands::Validate { config } => run_validate(&config),
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run_solve(
    config_path: &Path,
    output: Option<&Path>,
    cache_dir: Option<PathBuf>,
    fiber_mfd: Option<f64>,
    index_profile: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        eprintln!("[cli] loading config {}", config_path.display());
    }
    let config = JobConfig::from_file(config_path)?;
    let job = config.job()?;
    let metrics_recorder = config.metrics.build_recorder()?;

    if let Some(path) = index_profile {
        let dielectric = structure::build(&job.geometry)?;
        write_index_profile_file(path, &dielectric)?;
        if !quiet {
            eprintln!("[cli] wrote index profile to {}", path.display());
        }
    }

    let modes = match cache_dir {
        Some(dir) => {
            let cache = ModeCache::open(dir)?;
            if !quiet {
                eprintln!("[cli] using cache {}", cache.dir().display());
            }
            cache.get_or_solve_with_metrics(
                &job.geometry,
                job.n_modes,
                job.kind,
                &job.options,
                metrics_recorder.as_ref(),
            )?
        }
        None => solver::solve_with_metrics(
            &job.geometry,
            job.n_modes,
            job.kind,
            &job.options,
            metrics_recorder.as_ref(),
        )?,
    };

    if !quiet {
        match output {
            Some(dest) => eprintln!("[cli] writing CSV to {}", dest.display()),
            None => eprintln!("[cli] streaming CSV to stdout"),
        }
    }
    emit_modes_csv(&modes, fiber_mfd, output)?;
    if !quiet {
        let dest = output.map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
        eprintln!(
            "wrote {} mode(s) to {} ({} discarded)",
            modes.len(),
            dest,
            modes.discarded()
        );
    }
    Ok(())
}

fn emit_modes_csv(modes: &ModeSet, fiber_mfd: Option<f64>, dest: Option<&Path>) -> io::Result<()> {
    let mut writer: Box<dyn Write> = match dest {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    writeln!(
        writer,
        "mode,neff_re,neff_im,polarization,te_fraction,effective_area,coupling"
    )?;
    for (idx, mode) in modes.iter().enumerate() {
        let coupling = match fiber_mfd {
            Some(mfd) => coupling_efficiency(mode, mfd)
                .map(|eta| format!("{eta:.6}"))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
            None => String::new(),
        };
        writeln!(
            writer,
            "{idx},{:.10},{:.3e},{},{:.6},{:.6},{coupling}",
            mode.neff().re,
            mode.neff().im,
            mode.polarization(),
            mode.te_fraction(),
            effective_area(mode),
        )?;
    }
    writer.flush()
}

fn run_sweep(
    config_path: &Path,
    threads: Option<usize>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        eprintln!("[cli] loading sweep {}", config_path.display());
    }
    let mut config = SweepConfig::from_file(config_path)?;
    if let Some(path) = output {
        config.sweep.output = path;
    }
    let output_path = config.sweep.output.clone();
    let mut driver = BulkDriver::new(config, threads)?;
    if quiet {
        driver = driver.quiet();
    }
    let run = driver.run_and_write()?;
    if !quiet {
        eprintln!(
            "wrote {} entries ({} absent) to {} in {:.2}s",
            run.result.len(),
            run.result.absent(),
            output_path.display(),
            run.stats.total_time.as_secs_f64()
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(config_path)?;
    if SweepConfig::is_sweep_document(&text)? {
        let config = SweepConfig::from_str(&text)?;
        let driver = BulkDriver::new(config, None)?;
        println!(
            "Sweep file is valid: {} ({} entries)",
            config_path.display(),
            driver.job_count()
        );
    } else {
        let job = JobConfig::from_toml_str(&text)?.job()?;
        let (nx, ny) = job.geometry.cell_counts();
        println!(
            "Job file is valid: {} ({} solver, {}x{} grid, {} mode(s))",
            config_path.display(),
            job.kind,
            nx,
            ny,
            job.n_modes
        );
    }
    Ok(())
}
