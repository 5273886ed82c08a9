use std::ops::RangeInclusive;

use ndarray::{s, ArrayView1, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{CavizError, Result};
use crate::frame::{Frame, Movie};

/// Reduces one pixel's time course to a single response value.
pub trait FrameReducer: Send + Sync {
    /// Check the reducer can run on `nt` frames.
    fn validate(&self, _nt: usize) -> Result<()> {
        Ok(())
    }

    fn reduce(&self, trace: ArrayView1<'_, f32>) -> f32;
}

/// Mean over a response window minus mean over a baseline window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDifference {
    pub baseline: RangeInclusive<usize>,
    pub response: RangeInclusive<usize>,
}

impl WindowDifference {
    pub fn new(baseline: RangeInclusive<usize>, response: RangeInclusive<usize>) -> Self {
        Self { baseline, response }
    }
}

fn window_mean(trace: ArrayView1<'_, f32>, window: &RangeInclusive<usize>) -> f32 {
    trace
        .slice(s![*window.start()..=*window.end()])
        .mean()
        .unwrap_or(f32::NAN)
}

impl FrameReducer for WindowDifference {
    fn validate(&self, nt: usize) -> Result<()> {
        for w in [&self.baseline, &self.response] {
            if w.start() > w.end() || *w.end() >= nt {
                return Err(CavizError::InvalidFrameRange {
                    first: *w.start() as i64,
                    last: *w.end() as i64,
                    total: nt,
                });
            }
        }
        Ok(())
    }

    fn reduce(&self, trace: ArrayView1<'_, f32>) -> f32 {
        window_mean(trace, &self.response) - window_mean(trace, &self.baseline)
    }
}

/// Collapse a movie into a single overview frame, one reduction per pixel.
/// Large frames are reduced in parallel.
pub fn reduce_movie<R: FrameReducer + ?Sized>(movie: &Movie, reducer: &R) -> Result<Frame> {
    reducer.validate(movie.nt())?;
    let lanes = Zip::from(movie.data.lanes(Axis(2)));
    let frame = if movie.nx() * movie.ny() >= PARALLEL_PIXEL_THRESHOLD {
        lanes.par_map_collect(|trace| reducer.reduce(trace))
    } else {
        lanes.map_collect(|trace| reducer.reduce(trace))
    };
    debug!(nx = movie.nx(), ny = movie.ny(), "Reduced movie to overview frame");
    Ok(frame)
}
