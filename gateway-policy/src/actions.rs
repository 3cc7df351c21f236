//! # Actions
//!
//! Operations a tool performs on a resource after the access check.

use serde::{Deserialize, Serialize};

/// Actions a resource-scoped tool can perform.
///
/// Every action is either content-returning or mutating, so every action
/// must pass the access policy first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Enumerate resources (per-entry filtering).
    List,

    /// Read content held by the resource.
    Read,

    /// Post new content to the resource.
    Post,

    /// Remove content from the resource.
    Delete,
}

impl Action {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Post => "post",
            Action::Delete => "delete",
        }
    }

}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
