//! HTTP backend for `zvault-integrations`.
//!
//! [`HttpIntegrationApi`] talks to the `ZVault` integration API over
//! `reqwest` with bearer authentication, a per-request timeout, and no
//! retries.
//!
//! ```rust,no_run
//! use zvault_integrations::IntegrationsConfig;
//! use zvault_integrations_http::HttpIntegrationApi;
//!
//! # fn example() -> Result<(), zvault_integrations_http::ClientError> {
//! let api = HttpIntegrationApi::from_config(&IntegrationsConfig::from_env())?;
//! # let _ = api;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod wire;

pub use client::HttpIntegrationApi;
pub use error::ClientError;
