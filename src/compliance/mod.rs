//! Compliance domain layer
//!
//! Everything between a tool call and the remote Cloud Security Compliance
//! API: resource names, the control metadata batch notation, the service
//! seam and its REST implementation, long-running operation polling, and
//! the error taxonomy reported to callers.
//!
//! # Architecture
//!
//! - [`names`] - Builds and validates hierarchical resource names
//! - [`metadata`] - Parses `id#revision` batches into deployment metadata
//! - [`model`] - Request bodies and long-running operation types
//! - [`service`] - The [`ComplianceApi`] seam and [`ServiceHandle`]
//! - [`client`] - REST implementation of [`ComplianceApi`]
//! - [`poller`] - Bounded polling of long-running operations
//! - [`error`] - Classification of failures into [`ErrorKind`]s

pub mod client;
pub mod error;
pub mod metadata;
pub mod model;
pub mod names;
pub mod poller;
pub mod service;

pub use client::{ClientSettings, ComplianceClient};
pub use error::{classify, ClassifiedError, ErrorKind};
pub use metadata::{parse_control_metadata, ControlMetadataEntry, EnforcementMode};
pub use model::{FrameworkDeploymentSpec, Operation, OperationHandle};
pub use names::{build_resource_name, Collection, Location, ParentName, PrincipalPath, ResourceName};
pub use poller::{OperationPoller, PollOutcome};
pub use service::{ComplianceApi, ServiceHandle};
