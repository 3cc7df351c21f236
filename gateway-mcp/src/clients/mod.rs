//! Upstream service clients.
//!
//! - Athena: query engine and data catalog, via the AWS SDK
//! - Slack: Web API, via HTTP with a bot token
//!
//! Both read their settings from [`config`], built once at startup.

pub mod athena;
pub mod config;
pub mod slack;

pub use athena::{AthenaClient, QueryEngine};
pub use config::{AthenaConfig, ConfigError, SlackConfig};
pub use slack::SlackClient;
