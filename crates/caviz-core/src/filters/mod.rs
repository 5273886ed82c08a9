pub mod gaussian;

pub use gaussian::{filter_space, filter_time, GaussianFilter};
