pub mod border;
pub mod colorize;
pub mod consts;
pub mod error;
pub mod exclude;
pub mod filters;
pub mod flags;
pub mod frame;
pub mod io;
pub mod measurement;
pub mod overview;
pub mod pipeline;
pub mod roi;
pub mod rotate;
pub mod scale;
pub mod signal;
pub mod threshold;
