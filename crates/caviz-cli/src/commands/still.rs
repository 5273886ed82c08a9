use anyhow::{bail, Result};
use caviz_core::overview::{reduce_movie, WindowDifference};
use caviz_core::pipeline::export_still;
use clap::Args;

use super::common::{parse_window, RenderArgs};
use crate::progress::BarReporter;
use crate::summary::{print_render_summary, print_report};

#[derive(Args)]
pub struct StillArgs {
    #[command(flatten)]
    pub render: RenderArgs,

    /// Show response minus baseline over this frame range (FIRST:LAST)
    /// instead of the mean signal; needs --baseline
    #[arg(long, value_name = "FIRST:LAST")]
    pub response: Option<String>,
}

pub fn run(args: &StillArgs) -> Result<()> {
    let (_, config) = args.render.load_config()?;
    let m = args.render.load_measurement()?;
    let rois = args.render.load_rois(&config)?;

    let overview = match &args.response {
        Some(response) => {
            let Some(baseline) = &args.render.baseline else {
                bail!("--response needs --baseline");
            };
            let reducer = WindowDifference::new(
                parse_window(baseline, "--baseline")?,
                parse_window(response, "--response")?,
            );
            Some(reduce_movie(&m.raw, &reducer)?)
        }
        None => None,
    };

    print_render_summary("caviz still", &args.render.file, &args.render.output, &config, &m);

    let reporter = BarReporter::new()?;
    let report = export_still(
        &config,
        &m,
        overview.as_ref(),
        &rois,
        &args.render.output,
        &reporter,
    )?;
    reporter.finish();
    print_report(&report);
    Ok(())
}
