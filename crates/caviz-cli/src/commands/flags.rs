use std::path::PathBuf;

use anyhow::{Context, Result};
use caviz_core::flags::Flags;
use caviz_core::pipeline::RenderConfig;
use clap::Args;

#[derive(Args)]
pub struct FlagsArgs {
    /// Write flags to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also print the decoded render configuration
    #[arg(long)]
    pub decoded: bool,
}

/// Print or save every known flag with its default value as TOML.
pub fn run(args: &FlagsArgs) -> Result<()> {
    let flags = Flags::default();
    let toml_str = flags.to_toml_string()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write flags to {}", path.display()))?;
        println!("Default flags saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    if args.decoded {
        let config = RenderConfig::from_flags(&flags)?;
        println!();
        print!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}
