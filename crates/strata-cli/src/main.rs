//! Strata CLI - Scene rendering host
//!
//! Loads scene documents from disk, renders them through the raster backend
//! and writes the encoded image.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::FontArg;

/// Strata - Layered scene compositor
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that renders
#[derive(clap::Args, Clone)]
pub struct RenderArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "png")]
    format: FormatArg,

    /// Quality preset
    #[arg(short, long, value_enum, default_value = "standard")]
    quality: QualityArg,

    /// Device pixel ratio
    #[arg(long, default_value = "1.0")]
    device_scale: f64,

    /// Register a font as FAMILY=PATH (repeatable; the first is the default)
    #[arg(long = "font", value_name = "FAMILY=PATH")]
    fonts: Vec<FontArg>,

    /// Device memory in MiB used for the pre-flight memory check
    #[arg(long)]
    device_memory_mb: Option<u64>,

    /// Lower the quality instead of failing when the render does not fit in memory
    #[arg(long)]
    downgrade: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene document to an image
    Render {
        /// Input scene document (JSON)
        input: PathBuf,

        /// Output file (defaults to the input name with the format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Build and render the sample scene
    Demo {
        /// Output image
        #[arg(short, long, default_value = "demo.png")]
        output: PathBuf,

        /// Also write the sample scene document here
        #[arg(long)]
        save_scene: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Summarize a scene document and dry-run its render
    Inspect {
        /// Input scene document (JSON)
        input: PathBuf,

        /// Print every recorded draw command
        #[arg(long)]
        commands: bool,
    },

    /// Show backend capabilities and render presets
    Caps,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormatArg {
    Png,
    Jpeg,
    Heic,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QualityArg {
    Preview,
    Standard,
    High,
    Print,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(!cli.no_color)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Render {
            input,
            output,
            render,
        } => {
            commands::render::run(&input, output.as_deref(), &render).await?;
        }

        Commands::Demo {
            output,
            save_scene,
            render,
        } => {
            commands::demo::run(&output, save_scene.as_deref(), &render).await?;
        }

        Commands::Inspect {
            input,
            commands: show_commands,
        } => {
            commands::inspect::run(&input, show_commands).await?;
        }

        Commands::Caps => {
            commands::caps::run();
        }
    }

    Ok(())
}
