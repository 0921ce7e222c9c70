//! Error types shared across the node claim crates
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries the workspace or context it came from.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for shared node claim operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Validation error for a workspace's resource block
    #[error("validation error for {workspace}: {message}")]
    Validation {
        /// Name of the workspace with invalid configuration
        workspace: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "resource.count")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "create_client", "retry")
        context: String,
    },
}

impl Error {
    /// Create a validation error without workspace context
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            workspace: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with workspace context and field path
    pub fn validation_for_field(
        workspace: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            workspace: workspace.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors need a config fix and never retry.
    /// Kubernetes errors retry unless the API server rejected the request (4xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => crate::kube_utils::is_transient(source),
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} error", reason),
            reason: reason.to_string(),
            code,
        })
    }

    /// Story: a workspace with zero nodes is rejected before any claim is created
    #[test]
    fn story_validation_names_workspace_and_field() {
        let err = Error::validation_for_field("llama-70b", "resource.count", "must be at least 1");
        assert!(err.to_string().contains("llama-70b"));
        assert!(err.to_string().contains("must be at least 1"));
        match &err {
            Error::Validation {
                workspace, field, ..
            } => {
                assert_eq!(workspace, "llama-70b");
                assert_eq!(field.as_deref(), Some("resource.count"));
            }
            _ => panic!("Expected Validation variant"),
        }
        assert!(!err.is_retryable());
    }

    #[test]
    fn validation_without_context_uses_unknown() {
        match Error::validation("bad") {
            Error::Validation { workspace, .. } => assert_eq!(workspace, UNKNOWN_CONTEXT),
            _ => panic!("Expected Validation variant"),
        }
    }

    #[test]
    fn serialization_errors_are_not_retryable() {
        let err = Error::serialization_for_kind("NodeClaim", "missing field 'spec'");
        match &err {
            Error::Serialization { kind, .. } => assert_eq!(kind.as_deref(), Some("NodeClaim")),
            _ => panic!("Expected Serialization variant"),
        }
        assert!(!err.is_retryable());
    }

    #[test]
    fn serde_json_errors_convert_to_serialization() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn internal_error_carries_context() {
        let err = Error::internal_with_context("create_client", "no kubeconfig");
        match &err {
            Error::Internal { context, .. } => assert_eq!(context, "create_client"),
            _ => panic!("Expected Internal variant"),
        }
        assert!(err.to_string().contains("[create_client]"));
        assert!(err.is_retryable());
    }

    #[test]
    fn kube_errors_retry_only_when_transient() {
        let forbidden: Error = api_error(403, "Forbidden").into();
        assert!(!forbidden.is_retryable());

        let unavailable: Error = api_error(503, "ServiceUnavailable").into();
        assert!(unavailable.is_retryable());

        let throttled: Error = api_error(429, "TooManyRequests").into();
        assert!(throttled.is_retryable());
    }
}
