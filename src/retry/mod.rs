//! Retry module
//! - policy.rs: the resilience state machine wrapped around every provider call
//! - classify.rs: HTTP status to error mapping that feeds the policy

pub mod classify;
pub mod policy;

pub use classify::{classify_http_error, extract_error_message};
pub use policy::*;
