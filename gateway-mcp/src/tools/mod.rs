//! Gateway MCP tools
//!
//! This module provides the tool catalogs of both gateways.
//! Each catalog is built from an already-configured client and shares it
//! read-only across its tools.

pub mod athena;
pub mod slack;

pub use athena::athena_tools;
pub use slack::slack_tools;

/// Raise an integer limit below 1 to 1.
pub(crate) fn at_least_one(value: i64) -> usize {
    usize::try_from(value.max(1)).unwrap_or(usize::MAX)
}
