pub mod common;
pub mod flags;
pub mod info;
pub mod movie;
pub mod still;
