pub mod font;

use ndarray::{aview1, s, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::colorize::{Colormap, Rgba};
use crate::consts::{COLORBAR_WIDTH, DEFAULT_BORDER_SIZE, RGBA_CHANNELS, STIMULUS_BAR_HEIGHT};
use crate::error::{CavizError, Result};
use crate::frame::Stimulus;
use crate::scale::{NormalizationRange, ScaleMode};

use font::{draw_text, put, text_width, CHAR_H, CHAR_W};

/// Which annotations to draw and how large the margins are.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderConfig {
    pub colorbar: bool,
    pub timestamp: bool,
    pub stimulus: bool,
    pub size: usize,
    pub fg: Rgba,
    pub bg: Rgba,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            colorbar: false,
            timestamp: false,
            stimulus: false,
            size: DEFAULT_BORDER_SIZE,
            fg: [1.0, 1.0, 1.0, 1.0],
            bg: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl BorderConfig {
    pub fn is_active(&self) -> bool {
        self.colorbar || self.timestamp || self.stimulus
    }
}

/// Margins in pixels around the pasted frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BorderLayout {
    pub top: usize,
    pub bottom: usize,
    pub right: usize,
}

/// What the chrome is keyed to. Built once per export.
#[derive(Clone, Debug)]
pub struct ChromeInputs<'a> {
    /// Frame size after rotation.
    pub width: usize,
    pub height: usize,
    pub range: NormalizationRange,
    pub mode: ScaleMode,
    pub colormap: Colormap,
    pub stimuli: &'a [Stimulus],
    pub sampling_period_ms: f64,
    /// Index of the first retained frame in the uncropped recording.
    pub first_frame: usize,
    /// Number of retained frames.
    pub frames: usize,
}

/// Margins, colorbar and stimulus timeline; everything that does not change
/// from frame to frame.
#[derive(Clone, Debug)]
pub struct StaticChrome {
    pub layout: BorderLayout,
    canvas: Array3<f32>,
    width: usize,
    height: usize,
    config: BorderConfig,
    sampling_period_ms: f64,
    first_frame: usize,
    frames: usize,
}

fn format_value(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(0.01..10_000.0).contains(&a) {
        format!("{v:.1e}")
    } else {
        format!("{v:.2}")
    }
}

impl StaticChrome {
    pub fn build(config: &BorderConfig, inputs: &ChromeInputs<'_>) -> Result<Self> {
        let (w, h) = (inputs.width, inputs.height);
        if w == 0 || h == 0 {
            return Err(CavizError::ShapeMismatch(format!(
                "cannot annotate an empty {w}x{h} frame"
            )));
        }

        let mut labels = Vec::new();
        if config.colorbar {
            let r = inputs.range;
            labels.push((format_value(r.vmax), 0.0));
            if inputs.mode != ScaleMode::Linear && r.vmin < 0.0 && r.vmax > 0.0 {
                labels.push((format_value(0.0), 0.5));
            }
            labels.push((format_value(r.vmin), 1.0));
        }
        let label_w = labels.iter().map(|(l, _)| text_width(l)).max().unwrap_or(0);

        let layout = BorderLayout {
            top: if config.timestamp {
                config.size.max(CHAR_H + 2)
            } else {
                0
            },
            bottom: if config.stimulus {
                config.size.max(STIMULUS_BAR_HEIGHT + 6)
            } else {
                0
            },
            right: if config.colorbar {
                config.size.max(COLORBAR_WIDTH + label_w + 6)
            } else {
                0
            },
        };

        let total_w = w + layout.right;
        let total_h = h + layout.top + layout.bottom;
        let mut canvas = Array3::<f32>::zeros((total_w, total_h, RGBA_CHANNELS));
        for mut px in canvas.lanes_mut(Axis(2)) {
            px.assign(&aview1(&config.bg));
        }

        if config.colorbar {
            let x0 = w + 2;
            for r in 0..h {
                let v = if h > 1 {
                    1.0 - r as f32 / (h - 1) as f32
                } else {
                    1.0
                };
                let color = inputs.colormap.rgba(v);
                for c in x0..x0 + COLORBAR_WIDTH {
                    put(&mut canvas, c, layout.top + r, color);
                }
            }
            let text_x = x0 + COLORBAR_WIDTH + 2;
            for (label, pos) in &labels {
                let row = (pos * h.saturating_sub(CHAR_H) as f64).round() as usize;
                draw_text(&mut canvas, text_x, layout.top + row, label, config.fg);
            }
        }

        if config.stimulus {
            let bar_top = layout.top + h + 2;
            let dim = mix(config.fg, config.bg, 0.25);
            for c in 0..w {
                for r in bar_top..bar_top + STIMULUS_BAR_HEIGHT {
                    put(&mut canvas, c, r, dim);
                }
            }
            for stim in inputs.stimuli {
                let Some((on, off)) = stim.frame_span(inputs.sampling_period_ms) else {
                    continue;
                };
                let last = inputs.first_frame + inputs.frames.saturating_sub(1);
                if off < inputs.first_frame || on > last {
                    continue;
                }
                let on = on.max(inputs.first_frame) - inputs.first_frame;
                let off = off.min(last) - inputs.first_frame;
                let (c0, c1) = (
                    timeline_col(on, inputs.frames, w),
                    timeline_col(off, inputs.frames, w),
                );
                for c in c0..=c1 {
                    for r in bar_top..bar_top + STIMULUS_BAR_HEIGHT {
                        put(&mut canvas, c, r, config.fg);
                    }
                }
            }
        }

        debug!(
            top = layout.top,
            bottom = layout.bottom,
            right = layout.right,
            labels = labels.len(),
            "Built static border chrome"
        );

        Ok(Self {
            layout,
            canvas,
            width: w,
            height: h,
            config: config.clone(),
            sampling_period_ms: inputs.sampling_period_ms,
            first_frame: inputs.first_frame,
            frames: inputs.frames,
        })
    }

    /// Output size `(width, height)` of a composited frame.
    pub fn output_size(&self) -> (usize, usize) {
        let (w, h, _) = self.canvas.dim();
        (w, h)
    }

    /// Paste `frame` into the chrome and draw the per-frame label and tick.
    /// `index` counts retained frames from 0.
    ///
    /// With every annotation disabled the frame is returned unchanged.
    pub fn composite(&self, frame: &Array3<f32>, index: usize) -> Result<Array3<f32>> {
        let (w, h, ch) = frame.dim();
        if (w, h) != (self.width, self.height) || ch != RGBA_CHANNELS {
            return Err(CavizError::ShapeMismatch(format!(
                "frame {:?} vs chrome slot {:?}",
                (w, h, ch),
                (self.width, self.height, RGBA_CHANNELS)
            )));
        }
        if !self.config.is_active() {
            return Ok(frame.clone());
        }

        let mut out = self.canvas.clone();
        // The frame sits above the bottom margin in Y-up storage.
        let y0 = self.layout.bottom;
        out.slice_mut(s![0..w, y0..y0 + h, ..]).assign(frame);

        if self.config.timestamp {
            let absolute = self.first_frame + index;
            let secs = absolute as f64 * self.sampling_period_ms / 1000.0;
            let label = format!("frame {absolute}  t {secs:.2} s");
            let row = self.layout.top.saturating_sub(CHAR_H) / 2;
            let max_chars = (w + self.layout.right) / CHAR_W;
            let label: String = label.chars().take(max_chars).collect();
            draw_text(&mut out, 1, row, &label, self.config.fg);
        }

        if self.config.stimulus {
            let col = timeline_col(index, self.frames, w);
            let bar_top = self.layout.top + h + 2;
            for r in self.layout.top + h..self.layout.top + h + self.layout.bottom {
                let in_bar = (bar_top..bar_top + STIMULUS_BAR_HEIGHT).contains(&r);
                let color = if in_bar { self.config.bg } else { self.config.fg };
                put(&mut out, col, r, color);
            }
        }
        Ok(out)
    }
}

/// Column of frame `t` on a timeline spanning `width` pixels.
fn timeline_col(t: usize, frames: usize, width: usize) -> usize {
    if frames <= 1 || width <= 1 {
        return 0;
    }
    ((t.min(frames - 1) * (width - 1)) as f64 / (frames - 1) as f64).round() as usize
}

fn mix(a: Rgba, b: Rgba, weight_a: f32) -> Rgba {
    let mut out = [0.0; 4];
    for c in 0..4 {
        out[c] = a[c] * weight_a + b[c] * (1.0 - weight_a);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(stimuli: &[Stimulus]) -> ChromeInputs<'_> {
        ChromeInputs {
            width: 40,
            height: 30,
            range: NormalizationRange::new(-1.0, 2.0),
            mode: ScaleMode::Bilinear,
            colormap: Colormap::Jet,
            stimuli,
            sampling_period_ms: 100.0,
            first_frame: 0,
            frames: 10,
        }
    }

    #[test]
    fn test_disabled_border_is_identity() {
        let chrome = StaticChrome::build(&BorderConfig::default(), &inputs(&[])).unwrap();
        let frame = Array3::from_shape_fn((40, 30, 4), |(x, y, c)| (x + y + c) as f32 / 100.0);
        assert_eq!(chrome.composite(&frame, 3).unwrap(), frame);
        assert_eq!(chrome.output_size(), (40, 30));
    }

    #[test]
    fn test_margins_enlarge_frame() {
        let config = BorderConfig {
            colorbar: true,
            timestamp: true,
            stimulus: true,
            ..Default::default()
        };
        let stim = [Stimulus {
            onset_ms: 200.0,
            offset_ms: 500.0,
        }];
        let chrome = StaticChrome::build(&config, &inputs(&stim)).unwrap();
        let (w, h) = chrome.output_size();
        assert_eq!(w, 40 + chrome.layout.right);
        assert_eq!(h, 30 + chrome.layout.top + chrome.layout.bottom);

        let frame = Array3::from_elem((40, 30, 4), 0.5);
        let out = chrome.composite(&frame, 0).unwrap();
        assert_eq!(out.dim(), (w, h, 4));
        // Frame pixels land above the bottom margin.
        assert_eq!(out[[20, chrome.layout.bottom + 10, 0]], 0.5);
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let config = BorderConfig {
            colorbar: true,
            ..Default::default()
        };
        let chrome = StaticChrome::build(&config, &inputs(&[])).unwrap();
        let frame = Array3::zeros((10, 10, 4));
        assert!(chrome.composite(&frame, 0).is_err());
    }

    /// Red channel at (`col`, `row`) with rows counted from the top.
    fn red_at(canvas: &Array3<f32>, col: usize, row: usize) -> f32 {
        let h = canvas.dim().1;
        canvas[[col, h - 1 - row, 0]]
    }

    #[test]
    fn test_stimulus_marks_frame_columns() {
        let config = BorderConfig {
            stimulus: true,
            ..Default::default()
        };
        let stim = [Stimulus {
            onset_ms: 300.0,
            offset_ms: 500.0,
        }];
        let inputs = ChromeInputs {
            width: 20,
            height: 8,
            ..inputs(&stim)
        };
        let chrome = StaticChrome::build(&config, &inputs).unwrap();
        assert_eq!(chrome.layout.top, 0);

        // Frames 3..=5 of 10 on a 20 pixel timeline.
        let bar_row = 8 + 2;
        let lit: Vec<usize> = (0..20)
            .filter(|&c| red_at(&chrome.canvas, c, bar_row) == 1.0)
            .collect();
        assert_eq!(lit, (6..=11).collect::<Vec<_>>());
        assert_eq!(red_at(&chrome.canvas, 0, bar_row), 0.25);

        // The per-frame tick follows the frame index above the bar.
        let frame = Array3::from_elem((20, 8, 4), 0.5);
        for (index, col) in [(0, 0), (3, 6), (9, 19)] {
            let out = chrome.composite(&frame, index).unwrap();
            let ticks: Vec<usize> = (0..20).filter(|&c| red_at(&out, c, 8) == 1.0).collect();
            assert_eq!(ticks, vec![col], "frame {index}");
            assert_eq!(red_at(&out, col, bar_row), 0.0);
        }
    }

    #[test]
    fn test_timeline_col_endpoints() {
        assert_eq!(timeline_col(0, 10, 40), 0);
        assert_eq!(timeline_col(9, 10, 40), 39);
        assert_eq!(timeline_col(3, 1, 40), 0);
    }
}
