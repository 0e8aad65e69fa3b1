//! Resource Names
//!
//! Hierarchical resource names of the form
//! `{principal}/locations/{location}/{collection}/{id}`, where the principal
//! is an organization, folder, or project.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Location used when the caller does not name one
pub const DEFAULT_LOCATION: &str = "global";

/// Why a resource name could not be built or parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("'{0}' must start with organizations/, folders/ or projects/")]
    UnknownPrincipal(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} '{value}' contains an invalid character")]
    InvalidSegment { field: &'static str, value: String },
    #[error("'{0}' is not a valid {1} name")]
    Malformed(String, &'static str),
}

/// Check a single path segment: non-empty, no separators or URL metacharacters
fn validate_segment(field: &'static str, value: &str) -> Result<(), NameError> {
    if value.is_empty() {
        return Err(NameError::Empty(field));
    }
    if value
        .chars()
        .any(|c| c == '/' || c == '?' || c == '#' || c == '%' || c.is_whitespace())
    {
        return Err(NameError::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Kind of resource that owns compliance resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    Organization,
    Folder,
    Project,
}

impl PrincipalKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Organization => "organizations",
            Self::Folder => "folders",
            Self::Project => "projects",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "organizations" => Some(Self::Organization),
            "folders" => Some(Self::Folder),
            "projects" => Some(Self::Project),
            _ => None,
        }
    }
}

/// `organizations/{id}`, `folders/{id}` or `projects/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrincipalPath {
    kind: PrincipalKind,
    id: String,
}

impl PrincipalPath {
    pub fn new(kind: PrincipalKind, id: &str) -> Result<Self, NameError> {
        validate_segment("principal id", id)?;
        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }

    pub fn organization(id: &str) -> Result<Self, NameError> {
        Self::new(PrincipalKind::Organization, id)
    }

    /// Parse a principal path such as `folders/42`
    pub fn parse(path: &str) -> Result<Self, NameError> {
        let (prefix, id) = path
            .split_once('/')
            .ok_or_else(|| NameError::UnknownPrincipal(path.to_string()))?;
        let kind = PrincipalKind::from_prefix(prefix)
            .ok_or_else(|| NameError::UnknownPrincipal(path.to_string()))?;
        Self::new(kind, id)
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PrincipalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for PrincipalPath {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Location segment scoping a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location {
    pub fn new(location: &str) -> Result<Self, NameError> {
        validate_segment("location", location)?;
        Ok(Self(location.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Location {
    fn default() -> Self {
        Self(DEFAULT_LOCATION.to_string())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource collections exposed by the compliance API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Frameworks,
    CloudControls,
    FrameworkDeployments,
    CloudControlDeployments,
}

impl Collection {
    /// Path segment, which is also the field holding items in list responses
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frameworks => "frameworks",
            Self::CloudControls => "cloudControls",
            Self::FrameworkDeployments => "frameworkDeployments",
            Self::CloudControlDeployments => "cloudControlDeployments",
        }
    }

    /// Query parameter carrying the new resource id on create
    pub fn id_param(self) -> &'static str {
        match self {
            Self::Frameworks => "frameworkId",
            Self::CloudControls => "cloudControlId",
            Self::FrameworkDeployments => "frameworkDeploymentId",
            Self::CloudControlDeployments => "cloudControlDeploymentId",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "frameworks" => Some(Self::Frameworks),
            "cloudControls" => Some(Self::CloudControls),
            "frameworkDeployments" => Some(Self::FrameworkDeployments),
            "cloudControlDeployments" => Some(Self::CloudControlDeployments),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{principal}/locations/{location}`, the parent of every collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentName {
    principal: PrincipalPath,
    location: Location,
}

impl ParentName {
    pub fn new(principal: PrincipalPath, location: Location) -> Self {
        Self {
            principal,
            location,
        }
    }

    /// Compose from raw caller input
    pub fn from_parts(principal: &str, location: &str) -> Result<Self, NameError> {
        Ok(Self::new(
            PrincipalPath::parse(principal)?,
            Location::new(location)?,
        ))
    }

    /// Parse `organizations/1/locations/global` and the like
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            [prefix, id, "locations", location] => {
                Self::from_parts(&format!("{}/{}", prefix, id), location)
            }
            _ => Err(NameError::Malformed(name.to_string(), "parent")),
        }
    }

    pub fn principal(&self) -> &PrincipalPath {
        &self.principal
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Name of a child resource in `collection`
    pub fn child(&self, collection: Collection, id: &str) -> Result<ResourceName, NameError> {
        ResourceName::new(self.clone(), collection, id)
    }
}

impl fmt::Display for ParentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/locations/{}", self.principal, self.location)
    }
}

/// Fully qualified name of a framework, cloud control, or deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    parent: ParentName,
    collection: Collection,
    id: String,
}

impl ResourceName {
    pub fn new(parent: ParentName, collection: Collection, id: &str) -> Result<Self, NameError> {
        validate_segment("resource id", id)?;
        Ok(Self {
            parent,
            collection,
            id: id.to_string(),
        })
    }

    /// Parse a full name such as
    /// `organizations/1/locations/global/frameworks/cis-benchmark`
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            [prefix, principal_id, "locations", location, collection, id] => {
                let collection = Collection::from_segment(collection)
                    .ok_or_else(|| NameError::Malformed(name.to_string(), "resource"))?;
                let parent = ParentName::from_parts(&format!("{}/{}", prefix, principal_id), location)?;
                Self::new(parent, collection, id)
            }
            _ => Err(NameError::Malformed(name.to_string(), "resource")),
        }
    }

    pub fn parent(&self) -> &ParentName {
        &self.parent
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.parent, self.collection, self.id)
    }
}

impl FromStr for ResourceName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Compose `{principal}/locations/{location}/{collection}/{id}` from caller input
pub fn build_resource_name(
    principal: &str,
    location: &str,
    collection: Collection,
    id: &str,
) -> Result<ResourceName, NameError> {
    ParentName::from_parts(principal, location)?.child(collection, id)
}
