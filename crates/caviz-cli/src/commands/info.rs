use std::path::PathBuf;

use anyhow::{Context, Result};
use caviz_core::io::read_stack;
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Input TIFF stack or image
    pub file: PathBuf,

    /// Sampling period in milliseconds, used to report the duration
    #[arg(long)]
    pub period: Option<f64>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let movie = read_stack(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    println!("File:        {}", args.file.display());
    println!("Frames:      {}", movie.nt());
    println!("Dimensions:  {}x{}", movie.nx(), movie.ny());
    match movie.finite_min_max() {
        Some((lo, hi)) => println!("Range:       {lo} .. {hi}"),
        None => println!("Range:       no finite values"),
    }
    if let Some(period) = args.period {
        let secs = movie.nt() as f64 * period / 1000.0;
        println!("Duration:    {secs:.2} s at {period} ms/frame");
    }

    let total_mb = (movie.data.len() * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
