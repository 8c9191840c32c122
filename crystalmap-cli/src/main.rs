//! crystalmap CLI
//!
//! Turns a flood image into a crystal lookup table, either in one pass or by
//! replaying a command script against a calibration session.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{run_script, CommandError, LogProgress};
use crystalmap_algorithms::CalibrationSession;
use crystalmap_core::{CalibrationConfig, FloatGrid, ImageBuffer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    CrystalmapIo(#[from] crystalmap_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] crystalmap_core::Error),

    #[error("line {line}: {source}")]
    Command { line: usize, source: CommandError },

    #[error("line {line}: {source}")]
    Step { line: usize, source: Box<CliError> },

    #[error("{0}")]
    NotReady(&'static str),
}

/// Flood-image crystal map calibration.
#[derive(Parser)]
#[command(name = "crystalmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a flood image
    Info {
        /// Input flood image (grid exchange text format)
        input: PathBuf,
    },

    /// Filter, detect, enumerate and tessellate in one pass
    Calibrate {
        /// Input flood image (grid exchange text format)
        input: PathBuf,

        /// Crystal lookup table output path
        #[arg(short, long)]
        output: PathBuf,

        /// Crystals per row (overrides the configuration file)
        #[arg(long)]
        columns: Option<usize>,

        /// Crystal rows (overrides the configuration file)
        #[arg(long)]
        rows: Option<usize>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Filter kernel size in pixels
        #[arg(long)]
        peak_size: Option<u32>,

        /// Extra background suppression in percent
        #[arg(long)]
        threshold: Option<f64>,

        /// Minimum peak height as a fraction of the maximum
        #[arg(long)]
        cutoff: Option<f64>,

        /// Filter on all cores
        #[arg(long)]
        parallel: bool,

        /// Also write the peak list
        #[arg(long)]
        peaks_out: Option<PathBuf>,

        /// Also write the flood image with crystal boundaries drawn in
        #[arg(long)]
        boundaries_out: Option<PathBuf>,
    },

    /// Replay a command script against a flood image
    Run {
        /// Input flood image (grid exchange text format)
        input: PathBuf,

        /// Command script, one command per line
        script: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn load_config(path: Option<&Path>) -> Result<CalibrationConfig> {
    match path {
        Some(path) => Ok(crystalmap_io::load_config(path)?),
        None => Ok(CalibrationConfig::default()),
    }
}

fn open_session(input: &Path, config: CalibrationConfig) -> Result<CalibrationSession> {
    let raw: FloatGrid = crystalmap_io::load_grid(input)?;
    log::info!(
        "loaded {} ({}x{})",
        input.display(),
        raw.width(),
        raw.height()
    );
    Ok(CalibrationSession::new(raw, config)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => {
            let raw = crystalmap_io::load_grid(&input)?;
            let samples = raw.as_slice();
            let sum: f64 = samples.iter().map(|&v| f64::from(v)).sum();

            println!("File: {}", input.display());
            println!("Size: {} x {} pixels", raw.width(), raw.height());
            println!("Intensity range: {} - {}", raw.min_value(), raw.max_value());
            if !samples.is_empty() {
                println!("Mean intensity: {:.3}", sum / samples.len() as f64);
            }
        }

        Commands::Calibrate {
            input,
            output,
            columns,
            rows,
            config,
            peak_size,
            threshold,
            cutoff,
            parallel,
            peaks_out,
            boundaries_out,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(size) = peak_size {
                config.filter.peak_size = size;
            }
            if let Some(threshold) = threshold {
                config.filter.threshold_pct = threshold;
            }
            if let Some(cutoff) = cutoff {
                config.detection.peak_cutoff = cutoff;
            }
            config.filter.parallel |= parallel;
            let columns = columns.unwrap_or(config.enumeration.columns);
            let rows = rows.unwrap_or(config.enumeration.rows);

            let start = Instant::now();
            let mut session = open_session(&input, config)?;
            session.apply_filter(None, &mut LogProgress::new("filter"))?;
            let found = session.find_peaks()?;
            println!("Peaks found: {}", found);

            let enumerated = session.enumerate(columns, rows);
            if let Some(path) = &peaks_out {
                crystalmap_io::save_peaks(path, session.store())?;
            }
            enumerated?;

            let tessellation = session.tessellate(&mut LogProgress::new("tessellate"));
            let unclaimed = tessellation.labels.unclaimed_count();
            crystalmap_io::save_grid(&output, &tessellation.labels.to_float_grid())?;
            if let Some(path) = &boundaries_out {
                if let Some(image) = session.boundary_image() {
                    crystalmap_io::save_grid(path, image)?;
                }
            }

            println!(
                "Mapped {} x {} crystals in {:.2}s",
                columns,
                rows,
                start.elapsed().as_secs_f64()
            );
            println!("Unclaimed pixels: {}", unclaimed);
            println!("Crystal map: {}", output.display());
        }

        Commands::Run {
            input,
            script,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let mut session = open_session(&input, config)?;
            let text = std::fs::read_to_string(&script)?;
            let mut stdout = std::io::stdout().lock();
            let executed = run_script(&mut session, &text, &mut stdout)?;
            log::info!("{} commands executed from {}", executed, script.display());
        }
    }

    Ok(())
}
