use anyhow::Result;
use caviz_core::pipeline::export_movie;
use clap::Args;

use super::common::RenderArgs;
use crate::progress::BarReporter;
use crate::summary::{print_render_summary, print_report};

#[derive(Args)]
pub struct MovieArgs {
    #[command(flatten)]
    pub render: RenderArgs,
}

pub fn run(args: &MovieArgs) -> Result<()> {
    let (_, config) = args.render.load_config()?;
    let m = args.render.load_measurement()?;
    let rois = args.render.load_rois(&config)?;

    print_render_summary("caviz movie", &args.render.file, &args.render.output, &config, &m);

    let reporter = BarReporter::new()?;
    let report = export_movie(&config, &m, &rois, &args.render.output, &reporter)?;
    reporter.finish();
    print_report(&report);
    Ok(())
}
