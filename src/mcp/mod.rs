//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the compliance operations as MCP tools over stdio.
//!
//! ## Architecture
//!
//! ```text
//!   MCP client (agent)
//!         │  JSON-RPC 2.0, one message per line
//!         ▼
//!   server    - reader loop, one task per tools/call, single writer
//!         │
//!         ▼
//!   handlers  - argument decoding, names, polling, error mapping
//!         │
//!         ▼
//!   compliance::ComplianceApi (Config and Deployment handles)
//! ```
//!
//! ## Tools
//!
//! Frameworks and cloud controls: `list_frameworks`, `get_framework`,
//! `list_cloud_controls`, `get_cloud_control`, `create_cloud_control`,
//! `create_framework`.
//!
//! Deployments: `list_framework_deployments`, `get_framework_deployment`,
//! `create_framework_deployment`, `delete_framework_deployment`,
//! `list_cloud_control_deployments`, `get_cloud_control_deployment`.

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use handlers::ToolHandlers;
pub use server::McpServer;
