pub mod config;
mod orchestrator;
mod types;

pub use config::RenderConfig;
pub use orchestrator::{
    export_movie, export_still, render_movie, render_still, still_measurement,
};
pub use types::{NoOpReporter, ProgressReporter, RenderReport, RenderStage, RenderedMovie};
