// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fvolume — command-line front end.
//
// Entry point. Initialises logging, loads a capture and its calibration, and
// runs the regulation pipeline.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fvolume_core::error::FvolumeError;
use fvolume_core::{Calibration, RegulatorConfig};
use fvolume_image::ImageRegulator;
use tracing::info;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fvolume")]
#[command(about = "Rectify, center crop, and resize captures for volume estimation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regulate a captured image into the unified square size.
    Regulate(RegulateArgs),

    /// Print a summary of a calibration file.
    Inspect {
        /// Calibration JSON, bare or wrapped in a capture record.
        #[arg(long)]
        calibration: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct RegulateArgs {
    /// Path to the captured image.
    #[arg(long)]
    image: PathBuf,

    /// Calibration JSON, bare or wrapped in a capture record.
    #[arg(long)]
    calibration: PathBuf,

    /// Where to write the regulated image. Format follows the extension.
    #[arg(long)]
    out: PathBuf,

    /// Optional regulator config (JSON). Defaults to 224x224, bilinear.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Regulate(args) => run_regulate(&args),
        Commands::Inspect { calibration } => run_inspect(&calibration),
    };

    if let Err(err) = result {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run_regulate(args: &RegulateArgs) -> CliResult<()> {
    let config = match &args.config {
        Some(path) => RegulatorConfig::from_path(path)?,
        None => RegulatorConfig::default(),
    };
    let regulator = ImageRegulator::new(config)?;
    let calibration = Calibration::from_path(&args.calibration)?;

    let image = image::open(&args.image).map_err(|err| {
        FvolumeError::ImageError(format!(
            "failed to open {}: {}",
            args.image.display(),
            err
        ))
    })?;
    info!(
        path = %args.image.display(),
        width = image.width(),
        height = image.height(),
        "Capture loaded"
    );

    let regulated = regulator.regulate_dynamic(&image, &calibration)?;
    regulated.save(&args.out).map_err(|err| {
        FvolumeError::ImageError(format!(
            "failed to save image to {}: {}",
            args.out.display(),
            err
        ))
    })?;
    info!(path = %args.out.display(), "Regulated image written");
    Ok(())
}

fn run_inspect(path: &Path) -> CliResult<()> {
    let calibration = Calibration::from_path(path)?;
    println!("{}", serde_json::to_string_pretty(&summarize(&calibration))?);
    Ok(())
}

fn summarize(calibration: &Calibration) -> serde_json::Value {
    let center = calibration.lens_distortion_center;
    let (min, max) = calibration.magnification_range().unwrap_or((0.0, 0.0));
    serde_json::json!({
        "lookup_table_len": calibration.lens_distortion_lookup_table.len(),
        "distortion_center": [center.row, center.col],
        "magnification_min": min,
        "magnification_max": max,
        "has_inverse_table": calibration.inverse_lens_distortion_lookup_table.is_some(),
        "reference_dimensions": calibration.intrinsic_matrix_reference_dimensions,
    })
}
