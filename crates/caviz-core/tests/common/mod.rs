#![allow(dead_code)]

use caviz_core::frame::{Frame, Movie};
use caviz_core::measurement::Measurement;
use caviz_core::pipeline::NoOpReporter;
use ndarray::{Array2, Array3};

pub const REPORTER: NoOpReporter = NoOpReporter;

/// Every pixel of every frame equals `value`.
pub fn constant_movie(nx: usize, ny: usize, nt: usize, value: f32) -> Movie {
    Movie::new(Array3::from_elem((nx, ny, nt), value))
}

/// Pixel value `x + 10 * y + 100 * t`, distinct everywhere.
pub fn ramp_movie(nx: usize, ny: usize, nt: usize) -> Movie {
    Movie::new(Array3::from_shape_fn((nx, ny, nt), |(x, y, t)| {
        (x + 10 * y + 100 * t) as f32
    }))
}

/// `light` where `x + y` is even, `dark` otherwise.
pub fn checkerboard(nx: usize, ny: usize, light: f32, dark: f32) -> Frame {
    Array2::from_shape_fn((nx, ny), |(x, y)| {
        if (x + y) % 2 == 0 {
            light
        } else {
            dark
        }
    })
}

/// A measurement rendering `raw` directly at 100 ms per frame.
pub fn measurement(raw: Movie) -> Measurement {
    Measurement::from_raw(raw, 100.0).expect("valid measurement")
}

pub fn assert_rgba_close(actual: [f32; 4], expected: [f32; 4]) {
    for c in 0..4 {
        assert!(
            (actual[c] - expected[c]).abs() < 1e-5,
            "channel {c}: {actual:?} vs {expected:?}"
        );
    }
}
