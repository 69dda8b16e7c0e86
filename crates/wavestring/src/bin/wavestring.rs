//! WaveString - headless runner for the driven string simulation.
//!
//! Loads a configuration, plays a fixed number of synthetic frames through
//! the scheduler and optionally writes the final string profiles as CSV.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p wavestring --bin wavestring -- --config demos/two_drives.toml --frames 600
//! cargo run -p wavestring --bin wavestring -- --drive "0.1*sin(2*pi*t)" --right absorbing --csv -
//! ```

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wavestring::config::{DriveConfig, SimulationConfig};
use wavestring::prelude::*;

/// Headless runner for the driven string simulation
#[derive(Parser)]
#[command(name = "wavestring")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to play
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// Wall-clock duration of one frame in milliseconds
    #[arg(long, default_value_t = 1000.0 / 60.0)]
    frame_ms: f64,

    /// Right boundary (fixed, free, absorbing); overrides the configuration
    #[arg(short, long, value_parser = parse_right_boundary)]
    right: Option<RightBoundary>,

    /// Extra drive expression in `t`, simulated as its own string
    #[arg(short, long)]
    drive: Vec<String>,

    /// Log a progress line every N frames (0 disables)
    #[arg(long, default_value_t = 60)]
    log_every: u64,

    /// Write the final string profiles as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_right_boundary(s: &str) -> std::result::Result<RightBoundary, String> {
    match s.to_ascii_lowercase().as_str() {
        "fixed" => Ok(RightBoundary::Fixed),
        "free" => Ok(RightBoundary::Free),
        "absorbing" | "mur" => Ok(RightBoundary::Absorbing),
        other => Err(format!(
            "unknown boundary '{}', expected fixed, free or absorbing",
            other
        )),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "wavestring=debug"
    } else {
        "wavestring=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(
            directive.parse().unwrap_or_else(|_| tracing::Level::INFO.into()),
        ))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> wavestring::Result<()> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(right) = cli.right {
        config.boundary.right = right;
    }
    config
        .drives
        .extend(cli.drive.iter().map(|expression| DriveConfig {
            expression: expression.clone(),
            simulate: true,
        }));

    if !cli.frame_ms.is_finite() || cli.frame_ms < 0.0 {
        return Err(SimulationError::invalid_config(format!(
            "frame duration must be a non-negative number of milliseconds, got {}",
            cli.frame_ms
        )));
    }

    let (mut registry, mut scheduler) = config.build()?;
    let frame = Duration::from_secs_f64(cli.frame_ms / 1000.0);

    tracing::info!(
        frames = cli.frames,
        frame_ms = cli.frame_ms,
        speed = scheduler.speed_factor(),
        "Starting WaveString run"
    );

    let mut totals = FrameReport::default();
    let mut frame_index = 0u64;
    let log_every = cli.log_every;
    let mut observer = |registry: &SimulationRegistry, report: &FrameReport| {
        frame_index += 1;
        if log_every > 0 && frame_index % log_every == 0 {
            tracing::info!(
                frame = frame_index,
                time = report.simulated_time,
                max_displacement = registry.primary().field().max_displacement(),
                instances = registry.instances().count(),
                rows = ?registry.row_ids().map(RowId::raw).collect::<Vec<_>>(),
                "Progress"
            );
        }
    };

    for _ in 0..cli.frames {
        let report = scheduler.advance_with(frame, &mut registry, &mut observer)?;
        totals.steps += report.steps;
        totals.skipped += report.skipped;
        totals.expression_failures += report.expression_failures;
        totals.simulated_time = report.simulated_time;
    }

    tracing::info!(
        steps = totals.steps,
        skipped = totals.skipped,
        expression_failures = totals.expression_failures,
        time = totals.simulated_time,
        energy = registry.primary().field().total_energy(),
        "Run complete"
    );

    if let Some(path) = &cli.csv {
        if path.as_os_str() == "-" {
            write_profile(&registry, io::stdout().lock())?;
        } else {
            write_profile(&registry, File::create(path)?)?;
            tracing::info!(path = %path.display(), "Profile written");
        }
    }

    Ok(())
}
