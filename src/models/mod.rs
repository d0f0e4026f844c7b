//! Data models and structures for the probing engine

pub mod config;
pub mod endpoint;
pub mod params;

// Re-export main model types
pub use config::Config;
pub use endpoint::Endpoint;
pub use params::{ResultLabels, SentToken, TestParameters};
