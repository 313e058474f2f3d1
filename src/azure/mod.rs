//! Azure DevOps REST plumbing: configuration, typed errors, upstream response
//! adapters and the HTTP client.

pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use client::AzureClient;
pub use config::AzureConfig;
pub use error::FetchError;
pub use model::ApiFlavor;
