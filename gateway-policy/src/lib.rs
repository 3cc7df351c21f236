//! # Gateway Policy
//!
//! This crate provides the access policy shared by the tool gateways.
//! Resource-scoped tools resolve a caller's loose reference to a canonical
//! resource first, then ask the policy whether the resource may be touched.
//!
//! ## Overview
//!
//! The gateway-policy crate handles:
//! - **Allowlist**: The configured set of permitted resource ids or names
//! - **Resources**: The service and resource vocabulary (`Service`, `ResourceRef`)
//! - **Actions**: What a tool is about to do with a resource
//!
//! ## Semantics
//!
//! ```text
//! allowed(resource) = allowlist.is_empty()
//!                  || allowlist.contains(resource.id)
//!                  || allowlist.contains(resource.name)
//! ```
//!
//! An empty allowlist means "no restriction". There is no way to express
//! "restrict to nothing"; an operator who wants that should not run the gateway.
//!
//! ## Usage
//!
//! ```rust
//! use gateway_policy::{Action, Allowlist, ResourceRef};
//!
//! let allowlist = Allowlist::parse("general, C0123456789");
//!
//! let general = ResourceRef::new("C0999999999", "general");
//! assert!(allowlist.allows(&general));
//!
//! let random = ResourceRef::new("C0888888888", "random");
//! assert!(allowlist.check(&random, Action::Post, "Channel", "random").is_err());
//!
//! assert!(Allowlist::unrestricted().allows(&random));
//! ```

pub mod actions;
pub mod allowlist;
pub mod resources;

// Re-export main types for convenience
pub use actions::Action;
pub use allowlist::{AccessDenied, Allowlist};
pub use resources::{ResourceRef, Service};
