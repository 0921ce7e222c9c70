//! Idempotent NodeClaim submission

use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use nodeclaim_common::crd::NodeClaim;
use nodeclaim_common::kube_utils::{is_already_exists, is_transient};
use nodeclaim_common::LABEL_WORKSPACE_NAME;

use crate::client::NodeClaimClient;
use crate::error::ProvisionError;
use crate::status::{classify, ClaimState};

/// Creates NodeClaims, treating "already exists" as success
pub struct ClaimSubmitter {
    client: Arc<dyn NodeClaimClient>,
    settle_delay: Duration,
}

impl ClaimSubmitter {
    pub fn new(client: Arc<dyn NodeClaimClient>, settle_delay: Duration) -> Self {
        Self {
            client,
            settle_delay,
        }
    }

    /// Submit a NodeClaim.
    ///
    /// An `AlreadyExists` rejection means an earlier run already submitted
    /// this claim and is not an error. Any other create failure is returned
    /// unchanged and not retried. After submission one status fetch is made
    /// so a claim the backend has already failed (e.g. SKU unavailable)
    /// surfaces here instead of after a full wait.
    ///
    /// Cancelling `cancel` abandons whichever call is in flight.
    #[instrument(skip(self, claim, cancel), fields(claim = %claim.name_any()))]
    pub async fn submit(
        &self,
        claim: &NodeClaim,
        cancel: &CancellationToken,
    ) -> Result<(), ProvisionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("submission cancelled");
                let workspace = claim
                    .labels()
                    .get(LABEL_WORKSPACE_NAME)
                    .cloned()
                    .unwrap_or_else(|| claim.name_any());
                Err(ProvisionError::Cancelled { workspace })
            }
            result = self.create_and_check(claim) => result,
        }
    }

    async fn create_and_check(&self, claim: &NodeClaim) -> Result<(), ProvisionError> {
        let name = claim.name_any();
        let namespace = claim.namespace().unwrap_or_default();

        match self.client.create(claim).await {
            Ok(()) => info!(namespace = %namespace, "created NodeClaim"),
            Err(e) if is_already_exists(&e) => {
                info!(namespace = %namespace, "NodeClaim already exists, treating as in flight")
            }
            Err(source) => {
                return Err(ProvisionError::Submission {
                    claim: name,
                    source,
                })
            }
        }

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let latest = match self.client.get(&namespace, &name).await {
            Ok(latest) => latest,
            Err(e) if is_transient(&e) => {
                // The barrier will observe the claim on its next round
                warn!(error = %e, "post-submit status fetch failed, deferring to wait");
                return Ok(());
            }
            Err(source) => return Err(ProvisionError::fetch(name, source)),
        };

        match classify(&latest) {
            ClaimState::Failed { reason } => {
                warn!(reason = %reason, "NodeClaim failed immediately after submission");
                Err(ProvisionError::ProvisioningFailed {
                    claim: name,
                    reason,
                })
            }
            state => {
                debug!(?state, "NodeClaim submitted");
                Ok(())
            }
        }
    }
}
