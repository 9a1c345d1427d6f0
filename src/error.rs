//! Error types for the node auto-healer
//!
//! Every failure raised while selecting a cloud backend or assembling its
//! service clients carries enough context (service family, API version,
//! region) to be actionable from a single log line.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the auto-healer bootstrap
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Cloud Provider Selection
    // =========================================================================
    #[error("Unknown cloud provider: {name}")]
    UnknownProvider { name: String },

    // =========================================================================
    // Identity & Service Catalog
    // =========================================================================
    #[error("Authentication against {auth_url} failed: {reason}")]
    Authentication { auth_url: String, reason: String },

    #[error("Failed to find {family} {version} {availability} endpoint for region {region}: {reason}")]
    EndpointNotFound {
        family: String,
        version: String,
        availability: String,
        region: String,
        reason: String,
    },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    // =========================================================================
    // Transport & Parse Errors
    // =========================================================================
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the process-level caller should do when provider construction fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupAction {
    /// Retry the whole construction with exponential backoff
    RetryWithBackoff,
    /// Retry the whole construction after a fixed delay
    RetryAfter(Duration),
    /// Give up, the operator has to fix something
    Abort,
}

impl Error {
    /// Determine what the caller should do with this error
    pub fn action(&self) -> StartupAction {
        match self {
            // Identity service or network may come back
            Error::Authentication { .. } | Error::Http(_) | Error::Kube(_) => {
                StartupAction::RetryWithBackoff
            }

            // Catalogs are edited by hand, do not hammer the identity service
            Error::EndpointNotFound { .. } => StartupAction::RetryAfter(Duration::from_secs(60)),

            // Operator mistakes - retrying cannot help
            Error::Configuration(_)
            | Error::UnknownProvider { .. }
            | Error::YamlParse(_)
            | Error::Io(_) => StartupAction::Abort,

            Error::Internal(_) | Error::JsonParse(_) => StartupAction::Abort,
        }
    }

    /// Check if construction may be retried after this error
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), StartupAction::Abort)
    }

    /// Name of the service family this error is attributed to, if any
    pub fn service_family(&self) -> Option<&str> {
        match self {
            Error::EndpointNotFound { family, .. } => Some(family.as_str()),
            _ => None,
        }
    }
}

/// Result type alias for the auto-healer
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint_error() -> Error {
        Error::EndpointNotFound {
            family: "orchestration".into(),
            version: "v1".into(),
            availability: "public".into(),
            region: "RegionOne".into(),
            reason: "no matching endpoint in catalog".into(),
        }
    }

    #[test]
    fn test_error_actions() {
        let err = Error::Authentication {
            auth_url: "http://keystone:5000/v3".into(),
            reason: "401 Unauthorized".into(),
        };
        assert_eq!(err.action(), StartupAction::RetryWithBackoff);

        assert_eq!(
            endpoint_error().action(),
            StartupAction::RetryAfter(Duration::from_secs(60))
        );

        let err = Error::UnknownProvider {
            name: "aws".into(),
        };
        assert_eq!(err.action(), StartupAction::Abort);
    }

    #[test]
    fn test_error_retryable() {
        assert!(endpoint_error().is_retryable());

        let config_err = Error::Configuration("missing auth-url".into());
        assert!(!config_err.is_retryable());
    }

    #[test]
    fn test_endpoint_error_names_family_and_region() {
        let err = endpoint_error();
        let message = err.to_string();

        assert!(message.contains("orchestration"));
        assert!(message.contains("RegionOne"));
        assert!(message.contains("v1"));
        assert_eq!(err.service_family(), Some("orchestration"));
    }
}
