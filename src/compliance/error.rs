//! Error Classification
//!
//! Every failure that reaches a tool boundary is reduced to a short kind and
//! a displayable detail string.

use super::names::NameError;
use crate::gcp::ApiError;
use serde_json::{json, Value};
use std::fmt;

/// Coarse failure categories reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    ClientUnavailable,
    MalformedInput,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::AlreadyExists => "AlreadyExists",
            Self::ClientUnavailable => "ClientUnavailable",
            Self::MalformedInput => "MalformedInput",
            Self::Unexpected => "Unexpected",
        }
    }

    /// Kind for a remote failure. The canonical status name wins over the
    /// HTTP code, since several statuses share a code (409 is also ABORTED).
    fn from_api_error(error: &ApiError) -> Self {
        match error.status.as_deref() {
            Some("NOT_FOUND") => Self::NotFound,
            Some("PERMISSION_DENIED") => Self::PermissionDenied,
            Some("ALREADY_EXISTS") => Self::AlreadyExists,
            Some(_) => Self::Unexpected,
            None => match error.code {
                404 => Self::NotFound,
                403 => Self::PermissionDenied,
                409 => Self::AlreadyExists,
                _ => Self::Unexpected,
            },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure shaped for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn client_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClientUnavailable, detail)
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, detail)
    }

    /// Name what was missing or duplicated, e.g. `framework 'cis'`
    pub fn about(mut self, subject: &str) -> Self {
        match self.kind {
            ErrorKind::NotFound => {
                self.detail = format!("Could not find {}. {}", subject, self.detail);
            }
            ErrorKind::AlreadyExists => {
                self.detail = format!("{} already exists. {}", capitalize(subject), self.detail);
            }
            _ => {}
        }
        self
    }

    /// `{"error": kind, "details": detail}`
    pub fn to_json(&self) -> Value {
        json!({
            "error": self.kind.as_str(),
            "details": self.detail,
        })
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl From<NameError> for ClassifiedError {
    fn from(error: NameError) -> Self {
        Self::malformed(error.to_string())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Classify a failure raised by a remote call
pub fn classify(error: &anyhow::Error) -> ClassifiedError {
    if let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        return ClassifiedError::new(ErrorKind::from_api_error(api), api.message.clone());
    }
    if let Some(name) = error.chain().find_map(|e| e.downcast_ref::<NameError>()) {
        return name.clone().into();
    }
    ClassifiedError::new(ErrorKind::Unexpected, format!("{:#}", error))
}
