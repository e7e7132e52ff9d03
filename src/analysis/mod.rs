//! Analysis tools
//!
//! Normalization of raw vision output into `VisionAnalysis` and the batch
//! combiner that folds many analyses into one.

pub mod combiner;
pub mod parse;

pub use combiner::{CombineOptions, TEXT_SEPARATOR, combine, union_preserving_order};
pub use parse::{FALLBACK_CONFIDENCE, FALLBACK_LANGUAGE, parse_vision_analysis};
