//! Shared data model

pub mod config;
pub mod generation;
pub mod image;
pub mod vision;

pub use config::*;
pub use generation::*;
pub use image::*;
pub use vision::*;
