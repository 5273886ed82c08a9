use std::ops::RangeInclusive;

use ndarray::{s, Axis, Zip};
use tracing::debug;

use crate::error::{CavizError, Result};
use crate::frame::Movie;

/// ΔF/F in percent: `100 · (F − F0) / F0`, with `F0` the per-pixel mean over
/// `baseline` frames. Pixels whose `F0` is zero come out as NaN.
pub fn delta_f_over_f(raw: &Movie, baseline: RangeInclusive<usize>) -> Result<Movie> {
    let (b0, b1) = (*baseline.start(), *baseline.end());
    if b0 > b1 || b1 >= raw.nt() {
        return Err(CavizError::InvalidFrameRange {
            first: b0 as i64,
            last: b1 as i64,
            total: raw.nt(),
        });
    }
    let f0 = raw
        .data
        .slice(s![.., .., b0..=b1])
        .mean_axis(Axis(2))
        .ok_or(CavizError::EmptySequence)?;
    debug!(first = b0, last = b1, "Computing dF/F");

    let mut out = raw.data.clone();
    for mut frame in out.axis_iter_mut(Axis(2)) {
        Zip::from(&mut frame).and(&f0).for_each(|v, &base| {
            *v = if base == 0.0 {
                f32::NAN
            } else {
                100.0 * (*v - base) / base
            };
        });
    }
    Ok(Movie::new(out))
}
