//! Gateway error taxonomy
//!
//! Every component returns a [`GatewayResult`]. The dispatcher is the single
//! place where a [`GatewayError`] becomes caller-facing text, via
//! [`GatewayError::report`].

use crate::clients::config::ConfigError;
use crate::validation::ValidationError;
use gateway_policy::{AccessDenied, Service};
use thiserror::Error;

/// Gateway error types.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No tool with this name is declared.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Missing or malformed argument.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The resolver found no matching resource.
    #[error("{kind} '{reference}' not found. Use its ID or exact name.")]
    NotFound {
        /// Human label for the resource kind (e.g. "Channel").
        kind: &'static str,
        /// The reference exactly as the caller supplied it.
        reference: String,
    },

    /// The resource exists but is outside the allowlist.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    /// The upstream service reported a failure.
    #[error("{} API error: {message}", .service.label())]
    Upstream {
        /// Which service failed.
        service: Service,
        /// Upstream error text (e.g. `channel_not_found`).
        message: String,
        /// Missing capability reported by the upstream, if any.
        needed: Option<String>,
    },

    /// Missing or invalid configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Upstream failure without a capability hint.
    pub fn upstream(service: Service, message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            service,
            message: message.into(),
            needed: None,
        }
    }

    /// Render the caller-facing report for a failed call to `tool`.
    pub fn report(&self, tool: &str) -> String {
        match self {
            GatewayError::UnknownTool(_) => self.to_string(),
            GatewayError::AccessDenied(denied) => format!(
                "Error: {} '{}' is not in the allowed {}s list.",
                denied.kind,
                denied.reference,
                denied.kind.to_lowercase()
            ),
            GatewayError::Upstream {
                needed: Some(needed),
                ..
            } => format!("Error executing {}: {}\nMissing scope: {}", tool, self, needed),
            _ => format!("Error executing {}: {}", tool, self),
        }
    }

    /// Short machine-friendly label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownTool(_) => "unknown_tool",
            GatewayError::Validation(_) => "validation",
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::AccessDenied(_) => "access_denied",
            GatewayError::Upstream { .. } => "upstream",
            GatewayError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_policy::Action;

    #[test]
    fn test_access_denied_report_hides_resolution() {
        let err = GatewayError::from(AccessDenied {
            kind: "Channel".to_string(),
            reference: "#random".to_string(),
            action: Action::Post,
        });
        assert_eq!(
            err.report("slack_send_message"),
            "Error: Channel '#random' is not in the allowed channels list."
        );
    }

    #[test]
    fn test_upstream_report_includes_missing_scope() {
        let err = GatewayError::Upstream {
            service: Service::Slack,
            message: "missing_scope".to_string(),
            needed: Some("channels:history".to_string()),
        };
        assert_eq!(
            err.report("slack_read_messages"),
            "Error executing slack_read_messages: Slack API error: missing_scope\nMissing scope: channels:history"
        );
    }

    #[test]
    fn test_generic_report_names_tool() {
        let err = GatewayError::from(ValidationError::MissingArgument("query".to_string()));
        assert_eq!(
            err.report("athena_query"),
            "Error executing athena_query: Missing required argument: query"
        );
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_unknown_tool_report() {
        let err = GatewayError::UnknownTool("nope".to_string());
        assert_eq!(err.report("nope"), "Unknown tool: nope");
    }
}
