//! # Allowlist
//!
//! The statically configured set of resources a gateway may touch.
//! An empty allowlist is the "no restriction" sentinel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::actions::Action;
use crate::resources::ResourceRef;

/// Returned when a resolved resource fails the allowlist check.
///
/// Only the reference as the caller wrote it is carried, so the message does not
/// reveal whether the resource exists or what it resolved to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} '{reference}' is not in the allowed list")]
pub struct AccessDenied {
    /// Human label for the resource kind (e.g. "Channel").
    pub kind: String,
    /// The reference exactly as the caller supplied it.
    pub reference: String,
    /// What the caller tried to do.
    pub action: Action,
}

/// A set of allowed resource ids or names.
///
/// Entries are matched exactly against both the canonical id and the current
/// display name of a resolved resource.
///
/// # Example
///
/// ```
/// use gateway_policy::{Allowlist, ResourceRef};
///
/// let allowlist = Allowlist::parse("X");
///
/// // id match
/// assert!(allowlist.allows(&ResourceRef::new("X", "something-else")));
/// // name match
/// assert!(allowlist.allows(&ResourceRef::new("Y", "X")));
/// // neither
/// assert!(!allowlist.allows(&ResourceRef::new("Y", "Z")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowlist {
    entries: BTreeSet<String>,
}

impl Allowlist {
    /// An allowlist that admits everything.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list.
    ///
    /// Entries are trimmed and blank entries dropped, so `""` and `" , "`
    /// both yield an unrestricted allowlist.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether no restriction is configured.
    pub fn is_unrestricted(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Same as [`Allowlist::is_unrestricted`].
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether an id or name appears in the list.
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    /// Evaluate the policy for a resolved resource.
    pub fn allows(&self, resource: &ResourceRef) -> bool {
        self.is_unrestricted() || self.contains(&resource.id) || self.contains(&resource.name)
    }

    /// Evaluate the policy and produce a denial carrying the caller's reference.
    ///
    /// `kind` labels the resource in the denial (e.g. "Channel").
    pub fn check(
        &self,
        resource: &ResourceRef,
        action: Action,
        kind: &str,
        reference: &str,
    ) -> Result<(), AccessDenied> {
        if self.allows(resource) {
            Ok(())
        } else {
            Err(AccessDenied {
                kind: kind.to_string(),
                reference: reference.to_string(),
                action,
            })
        }
    }

    /// Iterate entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Allowlist {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for Allowlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(", "))
    }
}
