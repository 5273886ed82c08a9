mod commands;
mod progress;
mod roi_dir;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "caviz", about = "False-color rendering of calcium-imaging recordings")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recording dimensions and value range
    Info(commands::info::InfoArgs),
    /// Print or save the default flags as TOML
    Flags(commands::flags::FlagsArgs),
    /// Render a single false-color image
    Still(commands::still::StillArgs),
    /// Render every retained frame as a movie or image sequence
    Movie(commands::movie::MovieArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Flags(args) => commands::flags::run(args),
        Commands::Still(args) => commands::still::run(args),
        Commands::Movie(args) => commands::movie::run(args),
    }
}
