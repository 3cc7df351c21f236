//! # Resources
//!
//! Upstream services fronted by the gateways and the resources they expose.

use serde::{Deserialize, Serialize};

/// Upstream service a tool talks to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// Athena: SQL query engine and data catalog.
    Athena,
    /// Slack: team messaging.
    Slack,
}

impl Service {
    /// Get the string representation of the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Athena => "athena",
            Service::Slack => "slack",
        }
    }

    /// Display label used in reports (e.g. "Slack API error").
    pub fn label(&self) -> &'static str {
        match self {
            Service::Athena => "Athena",
            Service::Slack => "Slack",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved resource as seen by the access policy.
///
/// `id` is the canonical identifier and `name` the current display name.
/// Both come from the upstream service, never from the caller's input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// Canonical identifier (e.g. `C0123456789`).
    pub id: String,
    /// Current display name (may be empty when metadata was unavailable).
    pub name: String,
}

impl ResourceRef {
    /// Create a new resource reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Reference known only by its identifier.
    pub fn id_only(id: impl Into<String>) -> Self {
        Self::new(id, String::new())
    }
}
