//! Utility modules
//!
//! Image inspection, JSON recovery from model output and HTTP header helpers.

pub mod http_headers;
pub mod image;
pub mod json;
pub mod mime;

pub use image::{content_hash, inspect};
pub use json::{parse_json_lenient, strip_code_fences};
pub use mime::detect_format;
