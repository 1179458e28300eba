//! lumeq - histogram equalization on the GPU
//!
//! Decodes an image file, runs it through the equalization engine, and
//! writes the result.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lumeq_core::{ColorRange, EqualizeError, ErrorClass};
use lumeq_gpu::{BackendPreference, EngineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lumeq")]
#[command(author, version, about = "GPU histogram equalization")]
#[command(long_about = "
Equalizes image brightness with a GPU compute backend, falling back to the
CPU when no adapter is available. Color images are equalized on luma only,
so hue is preserved; alpha is passed through untouched.

Examples:
  lumeq device                          # Show the bound accelerator
  lumeq histogram photo.png             # Print non-empty bins
  lumeq histogram photo.png --json      # Full histogram as JSON
  lumeq equalize dark.png bright.png    # Equalize and save
  lumeq --backend cpu equalize in.jpg out.png
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend: auto, gpu, cpu (overrides LUMEQ_BACKEND)
    #[arg(long, global = true)]
    backend: Option<BackendPreference>,

    /// YCbCr range: full, studio (overrides LUMEQ_COLOR_RANGE)
    #[arg(long = "color-range", global = true)]
    color_range: Option<ColorRange>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the accelerator the engine binds
    Device,

    /// Print the intensity histogram of an image
    #[command(visible_alias = "hist")]
    Histogram(HistogramArgs),

    /// Equalize an image and save the result
    #[command(visible_alias = "eq")]
    Equalize(EqualizeArgs),
}

#[derive(Args)]
struct HistogramArgs {
    /// Input image
    input: PathBuf,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EqualizeArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::error!("{e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// 2 for problems with the input image, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<EqualizeError>().map(EqualizeError::class) {
        Some(ErrorClass::Input) => 2,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(backend) = cli.backend {
        config = config.with_backend(backend);
    }
    if let Some(range) = cli.color_range {
        config = config.with_color_range(range);
    }

    match cli.command {
        Commands::Device => commands::device::run(&config),
        Commands::Histogram(args) => commands::histogram::run(args, &config),
        Commands::Equalize(args) => commands::equalize::run(args, &config),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
