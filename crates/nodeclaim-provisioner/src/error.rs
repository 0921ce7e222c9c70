//! Provisioning error types
//!
//! Callers tell a definitive backend failure (`ProvisioningFailed`) apart
//! from an expired wait (`Timeout`/`Cancelled`) to choose between abandoning
//! the workload and retrying it.

use nodeclaim_common::kube_utils::{is_not_found, is_transient};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Create was rejected for a reason other than the claim already existing.
    /// Displays the backend error unchanged.
    #[error("{source}")]
    Submission {
        claim: String,
        #[source]
        source: kube::Error,
    },

    /// The backend reported a definitive negative outcome (e.g. no capacity).
    /// Displays exactly the backend's reason.
    #[error("{reason}")]
    ProvisioningFailed { claim: String, reason: String },

    #[error("timed out waiting for node claims of workspace '{workspace}': {} still pending ({})", .pending.len(), .pending.join(", "))]
    Timeout {
        workspace: String,
        pending: Vec<String>,
    },

    #[error("provisioning of node claims for workspace '{workspace}' was cancelled")]
    Cancelled { workspace: String },

    /// A status fetch failed with a non-transient error
    #[error("{source}")]
    Fetch {
        claim: String,
        #[source]
        source: kube::Error,
    },

    /// A tracked claim no longer exists, e.g. deleted out from under the wait
    #[error("node claim '{claim}' not found")]
    ClaimNotFound { claim: String },

    /// Fewer claims exist than the workspace needs; it was never fully provisioned
    #[error("workspace '{workspace}' needs {expected} node claim(s) but {found} exist")]
    IncompleteClaims {
        workspace: String,
        expected: u32,
        found: usize,
    },

    /// Listing the workspace's claims failed
    #[error("{source}")]
    List {
        workspace: String,
        #[source]
        source: kube::Error,
    },

    #[error("{0}")]
    Common(#[from] nodeclaim_common::Error),
}

impl ProvisionError {
    /// Error for a failed status fetch of `claim`
    pub(crate) fn fetch(claim: impl Into<String>, source: kube::Error) -> Self {
        let claim = claim.into();
        if is_not_found(&source) {
            Self::ClaimNotFound { claim }
        } else {
            Self::Fetch { claim, source }
        }
    }

    /// True if the backend definitively failed a claim
    pub fn is_provisioning_failure(&self) -> bool {
        matches!(self, Self::ProvisioningFailed { .. })
    }

    /// True if the barrier's deadline elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True if the caller cancelled the wait
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether re-running the create-then-wait sequence may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Submission { source, .. }
            | Self::Fetch { source, .. }
            | Self::List { source, .. } => is_transient(source),
            Self::ProvisioningFailed { .. } => false,
            Self::Timeout { .. }
            | Self::Cancelled { .. }
            | Self::ClaimNotFound { .. }
            | Self::IncompleteClaims { .. } => true,
            Self::Common(e) => e.is_retryable(),
        }
    }

    /// Name of the claim the error is about, if any
    pub fn claim(&self) -> Option<&str> {
        match self {
            Self::Submission { claim, .. }
            | Self::ProvisioningFailed { claim, .. }
            | Self::Fetch { claim, .. }
            | Self::ClaimNotFound { claim } => Some(claim),
            _ => None,
        }
    }
}
