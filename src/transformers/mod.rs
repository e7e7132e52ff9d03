//! Transformers layer
//!
//! Request transformers turn a resolved `ProviderRequest` into a vendor JSON
//! body; response transformers turn the vendor JSON back into a
//! `GenerationResult` and classify vendor error envelopes.

pub mod request;
pub mod response;

pub use request::RequestTransformer;
pub use response::ResponseTransformer;
