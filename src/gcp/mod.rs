//! GCP API interaction module
//!
//! This module provides the plumbing for talking to Google Cloud REST APIs:
//! authentication, the HTTP layer, and an authenticated client bound to a
//! service endpoint.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Authenticated client for making API requests
//! - [`http`] - HTTP utilities and the typed API error
//!
//! # Example
//!
//! ```ignore
//! use compliance_mcp::gcp::client::{GcpClient, DEFAULT_ENDPOINT};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new(DEFAULT_ENDPOINT).await?;
//!     let url = client.api_url("organizations/123/locations/global/frameworks");
//!     let frameworks = client.get(&url).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use http::ApiError;
