//! compliance-mcp
//!
//! A Model Context Protocol server for Google Cloud's Cloud Security
//! Compliance API: browse and author frameworks and cloud controls, and
//! deploy frameworks onto organizations, folders and projects.

pub mod compliance;
pub mod config;
pub mod gcp;
pub mod mcp;

/// Version injected at compile time via COMPLIANCE_MCP_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("COMPLIANCE_MCP_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
