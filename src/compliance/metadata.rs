//! Control Metadata
//!
//! Parses the compact `id#revision,id#revision` batch notation used when
//! deploying a framework into per-control deployment metadata.

use super::names::{Collection, ParentName, ResourceName};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::num::NonZeroU64;

/// Separator between batch entries
const ENTRY_SEPARATOR: char = ',';

/// Separator between a control id and its revision
const REVISION_SEPARATOR: char = '#';

/// How findings of a deployed control are acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementMode {
    Preventive,
    #[default]
    Detective,
    Audit,
}

impl EnforcementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preventive => "PREVENTIVE",
            Self::Detective => "DETECTIVE",
            Self::Audit => "AUDIT",
        }
    }
}

/// One control to deploy alongside a framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMetadataEntry {
    pub control_name: ResourceName,
    pub major_revision_id: NonZeroU64,
    pub enforcement_mode: EnforcementMode,
}

impl ControlMetadataEntry {
    /// Wire form of a `CloudControlMetadata` message
    pub fn to_json(&self) -> Value {
        json!({
            "cloudControlDetails": {
                "name": self.control_name.to_string(),
                // int64 fields travel as strings in the REST mapping
                "majorRevisionId": self.major_revision_id.to_string(),
            },
            "enforcementMode": self.enforcement_mode.as_str(),
        })
    }
}

/// Parse a batch with every entry in detective mode
pub fn parse_control_metadata(batch: &str, parent: &ParentName) -> Vec<ControlMetadataEntry> {
    parse_control_metadata_with_mode(batch, parent, EnforcementMode::default())
}

/// Parse a batch such as `"ctrl-a#1, ctrl-b#2"`.
///
/// Malformed entries are dropped rather than failing the batch; compare the
/// result length with [`count_entries`] to detect drops.
pub fn parse_control_metadata_with_mode(
    batch: &str,
    parent: &ParentName,
    mode: EnforcementMode,
) -> Vec<ControlMetadataEntry> {
    batch
        .split(ENTRY_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let entry = parse_entry(token, parent, mode);
            if entry.is_none() {
                tracing::warn!("Skipping malformed control metadata entry: {:?}", token);
            }
            entry
        })
        .collect()
}

/// Number of non-empty entries in a batch, well-formed or not
pub fn count_entries(batch: &str) -> usize {
    batch
        .split(ENTRY_SEPARATOR)
        .filter(|token| !token.trim().is_empty())
        .count()
}

fn parse_entry(
    token: &str,
    parent: &ParentName,
    mode: EnforcementMode,
) -> Option<ControlMetadataEntry> {
    let parts: Vec<&str> = token.split(REVISION_SEPARATOR).collect();
    let [id, revision] = parts.as_slice() else {
        return None;
    };

    if revision.is_empty() || !revision.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let major_revision_id = revision.parse::<u64>().ok().and_then(NonZeroU64::new)?;
    let control_name = parent.child(Collection::CloudControls, id).ok()?;

    Some(ControlMetadataEntry {
        control_name,
        major_revision_id,
        enforcement_mode: mode,
    })
}
