//! Readiness barrier over a set of NodeClaims
//!
//! Polls every outstanding claim concurrently once per round. The first
//! claim observed as failed aborts the whole wait, since one lost node
//! makes a multi-node workload unschedulable and further waiting only
//! delays the report. Timeout and cancellation are reported separately.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use nodeclaim_common::crd::{NodeClaim, WorkloadSpec};
use nodeclaim_common::kube_utils::is_transient;

use crate::client::{ClaimKey, NodeClaimClient};
use crate::error::ProvisionError;
use crate::status::{classify, ClaimState};

/// Waits until every claim of a workload is Ready
pub struct ReadinessBarrier {
    client: Arc<dyn NodeClaimClient>,
    poll_interval: Duration,
    timeout: Duration,
}

enum Round {
    Cancelled,
    TimedOut,
    Fetched(Result<(), ProvisionError>),
}

impl ReadinessBarrier {
    pub fn new(client: Arc<dyn NodeClaimClient>, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            client,
            poll_interval,
            timeout,
        }
    }

    /// Block until all `claims` are Ready, one fails, the configured
    /// timeout passes, or `cancel` fires.
    ///
    /// An empty claim set succeeds immediately. Transient fetch errors are
    /// retried on the next round; any other fetch error is terminal.
    pub async fn await_ready(
        &self,
        workload: &WorkloadSpec,
        claims: impl IntoIterator<Item = ClaimKey>,
        cancel: &CancellationToken,
    ) -> Result<(), ProvisionError> {
        self.await_ready_until(workload, claims, cancel, Instant::now() + self.timeout)
            .await
    }

    /// Same as [`await_ready`](Self::await_ready) with an absolute deadline,
    /// for callers whose deadline also covers work done before the wait.
    #[instrument(skip(self, workload, claims, cancel, deadline), fields(workspace = %workload.name))]
    pub async fn await_ready_until(
        &self,
        workload: &WorkloadSpec,
        claims: impl IntoIterator<Item = ClaimKey>,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<(), ProvisionError> {
        let mut outstanding: BTreeSet<ClaimKey> = claims.into_iter().collect();
        if outstanding.is_empty() {
            debug!("no node claims to wait for");
            return Ok(());
        }

        info!(
            count = outstanding.len(),
            remaining = ?deadline.saturating_duration_since(Instant::now()),
            "waiting for node claims to become ready"
        );

        loop {
            let round = tokio::select! {
                biased;
                _ = cancel.cancelled() => Round::Cancelled,
                _ = sleep_until(deadline) => Round::TimedOut,
                result = self.poll_once(&mut outstanding) => Round::Fetched(result),
            };

            match round {
                Round::Cancelled => return Err(cancelled(workload)),
                Round::TimedOut => return Err(timed_out(workload, &outstanding)),
                Round::Fetched(Err(e)) => return Err(e),
                Round::Fetched(Ok(())) => {}
            }

            if outstanding.is_empty() {
                info!("all node claims are ready");
                return Ok(());
            }
            debug!(pending = outstanding.len(), "node claims still pending");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(workload)),
                _ = sleep_until(deadline) => return Err(timed_out(workload, &outstanding)),
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Fetch every outstanding claim concurrently, dropping Ready ones.
    ///
    /// Returns at the first terminal observation without waiting for the
    /// remaining fetches; dropping the stream abandons them.
    async fn poll_once(&self, outstanding: &mut BTreeSet<ClaimKey>) -> Result<(), ProvisionError> {
        let mut fetches: FuturesUnordered<_> = outstanding
            .iter()
            .cloned()
            .map(|key| {
                let client = self.client.clone();
                async move {
                    let result = client.get(&key.namespace, &key.name).await;
                    (key, result)
                }
            })
            .collect();

        while let Some((key, result)) = fetches.next().await {
            if observe(&key, result)? {
                info!(claim = %key, "node claim is ready");
                outstanding.remove(&key);
            }
        }
        Ok(())
    }
}

/// Whether one fetch shows the claim Ready, or a terminal error
fn observe(key: &ClaimKey, result: Result<NodeClaim, kube::Error>) -> Result<bool, ProvisionError> {
    match result {
        Ok(claim) => match classify(&claim) {
            ClaimState::Failed { reason } => {
                warn!(claim = %key, reason = %reason, "node claim failed");
                Err(ProvisionError::ProvisioningFailed {
                    claim: key.name.clone(),
                    reason,
                })
            }
            ClaimState::Ready => Ok(true),
            ClaimState::Pending => Ok(false),
        },
        Err(e) if is_transient(&e) => {
            warn!(claim = %key, error = %e, "transient error fetching node claim, retrying next round");
            Ok(false)
        }
        Err(source) => Err(ProvisionError::fetch(&key.name, source)),
    }
}

fn cancelled(workload: &WorkloadSpec) -> ProvisionError {
    info!("wait for node claims cancelled");
    ProvisionError::Cancelled {
        workspace: workload.name.clone(),
    }
}

fn timed_out(workload: &WorkloadSpec, outstanding: &BTreeSet<ClaimKey>) -> ProvisionError {
    let pending: Vec<String> = outstanding.iter().map(|k| k.name.clone()).collect();
    warn!(pending = ?pending, "timed out waiting for node claims");
    ProvisionError::Timeout {
        workspace: workload.name.clone(),
        pending,
    }
}
