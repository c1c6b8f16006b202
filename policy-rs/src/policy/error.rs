use std::fmt;

use itertools::Itertools;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, Display)]
pub enum PolicyKind {
    #[strum(serialize = "prefix-list")]
    PrefixList,
    #[strum(serialize = "community-list")]
    CommunityList,
    #[strum(serialize = "route-map")]
    RouteMap,
}

/// Entity or rule key used in error reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub kind: PolicyKind,
    pub name: String,
    pub sequence: Option<u32>,
}

impl Key {
    pub fn entity(kind: PolicyKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            sequence: None,
        }
    }

    pub fn rule(kind: PolicyKind, name: &str, sequence: u32) -> Self {
        Self {
            kind,
            name: name.to_string(),
            sequence: Some(sequence),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if let Some(sequence) = self.sequence {
            write!(f, " rule {}", sequence)?;
        }
        Ok(())
    }
}

/// A route-map rule field naming a list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Reference {
    pub route_map: String,
    pub sequence: u32,
    pub field: &'static str,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route-map {} rule {} match {}",
            self.route_map, self.sequence, self.field
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{0} already exists")]
    DuplicateKey(Key),

    #[error("{0} not found")]
    NotFound(Key),

    #[error("dangling reference to {kind} {name} from {}", .referrers.iter().join(", "))]
    DanglingReference {
        kind: PolicyKind,
        name: String,
        referrers: Vec<Reference>,
    },

    #[error("conflicting {field}: {reason}")]
    ConflictingIntent { field: String, reason: String },

    #[error("device rejected change: {0}")]
    UpstreamRejected(String),

    #[error("policy manager is not running")]
    ManagerStopped,
}

impl PolicyError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PolicyError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn conflict(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PolicyError::ConflictingIntent {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors produced by local validation, false when the device
    /// refused the change.
    pub fn is_local(&self) -> bool {
        !matches!(self, PolicyError::UpstreamRejected(_))
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;
