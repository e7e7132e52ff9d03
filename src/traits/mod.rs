//! Capability model and adapter contract

pub mod capabilities;
pub mod provider;

pub use capabilities::ProviderCapabilities;
pub use provider::ProviderAdapter;
