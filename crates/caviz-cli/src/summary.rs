use std::path::Path;

use caviz_core::colorize::Background;
use caviz_core::measurement::Measurement;
use caviz_core::pipeline::{RenderConfig, RenderReport};
use caviz_core::roi::RoiOverlay;
use caviz_core::scale::BoundEstimator;
use caviz_core::threshold::ThresholdValue;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warning: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warning: Style::new().yellow(),
        }
    }
}

pub fn print_render_summary(
    title: &str,
    input: &Path,
    output: &Path,
    config: &RenderConfig,
    m: &Measurement,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Format"),
        s.method.apply_to(config.output)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Data"),
        s.value.apply_to(format!(
            "{}x{} x {} frames @ {} ms",
            m.nx(),
            m.ny(),
            m.nt(),
            m.sampling_period_ms
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("Scaling"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Limits"),
        s.method.apply_to(config.limits.strategy)
    );
    let estimator = match config.limits.estimator {
        BoundEstimator::MinMax => "min / max".to_string(),
        BoundEstimator::Percentile(p) => format!("{p}th percentile"),
    };
    println!(
        "    {:<12}{}",
        s.label.apply_to("Estimator"),
        s.value.apply_to(estimator)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(config.scale_mode)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Colormap"),
        s.value.apply_to(config.colorizer.primary)
    );
    println!();

    if config.threshold.is_active() {
        println!("  {}", s.header.apply_to("Threshold"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reference"),
            s.value.apply_to(format!("{:?}", config.threshold.reference))
        );
        let level = |v: Option<ThresholdValue>| v.map_or("off".to_string(), |t| t.to_string());
        println!(
            "    {:<12}{} / {}",
            s.label.apply_to("Levels"),
            s.value.apply_to(level(config.threshold.positive)),
            s.value.apply_to(level(config.threshold.negative))
        );
        let background = match config.colorizer.background {
            Background::Baseline => format!("baseline ({})", config.colorizer.secondary),
            Background::Raw => format!("raw ({})", config.colorizer.secondary),
            Background::Flat(_) => "flat color".to_string(),
        };
        println!(
            "    {:<12}{}",
            s.label.apply_to("Background"),
            s.value.apply_to(background)
        );
    } else {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Threshold"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();

    let rois = match config.rois.overlay {
        RoiOverlay::None => None,
        RoiOverlay::Outline(_) => Some("outlines"),
        RoiOverlay::LabeledOnSolid(_) => Some("labeled, solid background"),
        RoiOverlay::LabeledOnImage => Some("labeled"),
    };
    match rois {
        Some(r) => println!(
            "  {:<14}{}",
            s.header.apply_to("ROIs"),
            s.method.apply_to(format!("{r} (source {})", config.rois.source.0))
        ),
        None => println!(
            "  {:<14}{}",
            s.header.apply_to("ROIs"),
            s.disabled.apply_to("none")
        ),
    }
    println!(
        "  {:<14}{}",
        s.header.apply_to("Rotation"),
        s.value.apply_to(config.transform.code())
    );
    println!();
}

pub fn print_report(report: &RenderReport) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Range"),
        s.value.apply_to(format!("{:.4} .. {:.4}", report.range.vmin, report.range.vmax))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!(
            "{} at {}x{}",
            report.frames, report.output_size.0, report.output_size.1
        ))
    );
    if let Some(cov) = report.threshold_coverage {
        println!(
            "  {:<14}{}",
            s.label.apply_to("True color"),
            s.value.apply_to(format!("{:.1}%", cov * 100.0))
        );
    }
    for d in &report.diagnostics {
        println!(
            "  {:<14}{}: {}",
            s.warning.apply_to("Note"),
            d.source,
            d.message
        );
    }
    match report.files.as_slice() {
        [] => {}
        [one] => println!("\nOutput saved to {}", s.path.apply_to(one.display())),
        [first, ..] => println!(
            "\n{} files saved, first: {}",
            report.files.len(),
            s.path.apply_to(first.display())
        ),
    }
}
