//! Create-then-wait provisioning of a workload's GPU nodes

use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use nodeclaim_common::crd::{NodeClaim, WorkloadSpec};

use crate::barrier::ReadinessBarrier;
use crate::client::{ClaimKey, NodeClaimClient};
use crate::config::ProvisionerConfig;
use crate::error::ProvisionError;
use crate::manifest::ManifestBuilder;
use crate::status::{classify, ClaimState};
use crate::submit::ClaimSubmitter;

/// Provisions the nodes of a workload through a `NodeClaimClient`
pub struct NodeClaimProvisioner {
    client: Arc<dyn NodeClaimClient>,
    manifests: ManifestBuilder,
    submitter: ClaimSubmitter,
    barrier: ReadinessBarrier,
    timeout: Duration,
}

impl NodeClaimProvisioner {
    pub fn from_config(client: Arc<dyn NodeClaimClient>, config: ProvisionerConfig) -> Self {
        Self {
            manifests: ManifestBuilder::new(config.manifest),
            submitter: ClaimSubmitter::new(client.clone(), config.settle_delay),
            barrier: ReadinessBarrier::new(client.clone(), config.poll_interval, config.timeout),
            timeout: config.timeout,
            client,
        }
    }

    /// Generate the manifest for every node of `workload`, in index order
    pub fn manifests(&self, workload: &WorkloadSpec) -> Vec<NodeClaim> {
        self.manifests.build_all(workload)
    }

    /// Submit one NodeClaim per required node, then wait for all of them.
    ///
    /// Claims are submitted in index order and the first submission error
    /// aborts before the remaining ones are sent. Re-running after a partial
    /// failure picks up the already-created claims by name. The configured
    /// timeout covers submission and the wait together.
    #[instrument(skip(self, workload, cancel), fields(workspace = %workload.name, namespace = %workload.namespace))]
    pub async fn provision(
        &self,
        workload: &WorkloadSpec,
        cancel: &CancellationToken,
    ) -> Result<(), ProvisionError> {
        info!(count = workload.node_count, instance_type = %workload.instance_type, "provisioning node claims");
        let deadline = Instant::now() + self.timeout;

        let claims = self.manifests(workload);
        let mut keys = Vec::with_capacity(claims.len());
        for claim in &claims {
            tokio::select! {
                biased;
                result = self.submitter.submit(claim, cancel) => result?,
                _ = sleep_until(deadline) => {
                    let pending = claims[keys.len()..].iter().map(|c| c.name_any()).collect();
                    warn!("timed out submitting node claims");
                    return Err(ProvisionError::Timeout {
                        workspace: workload.name.clone(),
                        pending,
                    });
                }
            }
            keys.push(ClaimKey::of(claim));
        }

        self.barrier
            .await_ready_until(workload, keys, cancel, deadline)
            .await
    }

    /// Wait for the workload's existing claims without creating any.
    ///
    /// A claim already marked failed aborts before any polling; claims
    /// already Ready are not polled again. Fewer claims than the workload
    /// needs is an error, since the missing nodes would never arrive.
    #[instrument(skip(self, workload, cancel), fields(workspace = %workload.name, namespace = %workload.namespace))]
    pub async fn wait_for_pending(
        &self,
        workload: &WorkloadSpec,
        cancel: &CancellationToken,
    ) -> Result<(), ProvisionError> {
        let claims = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ProvisionError::Cancelled {
                    workspace: workload.name.clone(),
                })
            }
            claims = self.list_node_claims(workload) => claims?,
        };

        let mut pending = Vec::new();
        for claim in &claims {
            match classify(claim) {
                ClaimState::Failed { reason } => {
                    warn!(claim = %claim.name_any(), reason = %reason, "existing node claim has failed");
                    return Err(ProvisionError::ProvisioningFailed {
                        claim: claim.name_any(),
                        reason,
                    });
                }
                ClaimState::Ready => {}
                ClaimState::Pending => pending.push(ClaimKey::of(claim)),
            }
        }

        if claims.len() < workload.node_count as usize {
            warn!(
                expected = workload.node_count,
                found = claims.len(),
                "workspace has fewer node claims than it needs"
            );
            return Err(ProvisionError::IncompleteClaims {
                workspace: workload.name.clone(),
                expected: workload.node_count,
                found: claims.len(),
            });
        }

        info!(total = claims.len(), pending = pending.len(), "waiting for existing node claims");
        self.barrier.await_ready(workload, pending, cancel).await
    }

    /// List the NodeClaims belonging to `workload`
    pub async fn list_node_claims(
        &self,
        workload: &WorkloadSpec,
    ) -> Result<Vec<NodeClaim>, ProvisionError> {
        self.client
            .list(&workload.namespace, &workload.claim_selector())
            .await
            .map_err(|source| ProvisionError::List {
                workspace: workload.name.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nodeclaim_common::crd::{Condition, ConditionStatus, ResourceSpec};
    use nodeclaim_common::{LABEL_WORKSPACE_NAME, LABEL_WORKSPACE_NAMESPACE};

    use crate::fake::{FakeNodeClaimClient, Snapshot};
    use crate::manifest::node_claim_name;

    fn workload(count: u32) -> WorkloadSpec {
        let resource = ResourceSpec {
            count: Some(count),
            instance_type: "Standard_NC12s_v3".to_string(),
            label_selector: None,
        };
        WorkloadSpec::new("falcon-7b", "kaito", &resource)
            .unwrap()
            .with_uid("8c1a86f4-6d3b-4a5e-9f1e-4c1d7e2a9b10")
    }

    fn config() -> ProvisionerConfig {
        ProvisionerConfig {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
            settle_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn provisioner(fake: &Arc<FakeNodeClaimClient>) -> NodeClaimProvisioner {
        NodeClaimProvisioner::from_config(fake.clone(), config())
    }

    fn key_for(workload: &WorkloadSpec, index: u32) -> ClaimKey {
        ClaimKey::new(&workload.namespace, node_claim_name(workload, &index.to_string()))
    }

    fn identity_labels(workload: &WorkloadSpec) -> [(&'static str, String); 2] {
        [
            (LABEL_WORKSPACE_NAME, workload.name.clone()),
            (LABEL_WORKSPACE_NAMESPACE, workload.namespace.clone()),
        ]
    }

    fn insert_existing(fake: &FakeNodeClaimClient, workload: &WorkloadSpec, name: &str) -> ClaimKey {
        let key = ClaimKey::new(&workload.namespace, name);
        let labels = identity_labels(workload);
        let labels: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fake.insert_named(&key, &labels);
        key
    }

    fn ready_conditions() -> Vec<Condition> {
        vec![
            Condition::new("Launched", ConditionStatus::True, "", ""),
            Condition::new("Ready", ConditionStatus::True, "", ""),
        ]
    }

    fn launch_failed_conditions(message: &str) -> Vec<Condition> {
        vec![Condition::new(
            "Launched",
            ConditionStatus::False,
            "LaunchFailed",
            message,
        )]
    }

    #[tokio::test(start_paused = true)]
    async fn provisions_one_claim_per_node_in_index_order() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(3);
        let keys: Vec<_> = (0..3).map(|i| key_for(&workload, i)).collect();
        for key in &keys {
            fake.script(key, vec![Snapshot::pending(), Snapshot::ready()]);
        }

        provisioner(&fake)
            .provision(&workload, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fake.created(), keys);
        let stored = fake.stored(&keys[0]).unwrap();
        assert_eq!(stored.namespace().as_deref(), Some("kaito"));
        assert_eq!(
            stored.labels().get(LABEL_WORKSPACE_NAME).map(String::as_str),
            Some("falcon-7b")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reprovisioning_reuses_existing_claims() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(2);
        for i in 0..2 {
            fake.script(&key_for(&workload, i), vec![Snapshot::ready()]);
        }
        let provisioner = provisioner(&fake);

        provisioner
            .provision(&workload, &CancellationToken::new())
            .await
            .unwrap();
        provisioner
            .provision(&workload, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fake.created().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_failure_stops_before_remaining_claims() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        fake.fail_create(500, "admission webhook unavailable");

        let err = provisioner(&fake)
            .provision(&workload(3), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Submission { .. }));
        assert!(err.to_string().contains("admission webhook unavailable"));
        assert!(fake.created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_launch_failure_surfaces_from_provision() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(2);
        fake.script(
            &key_for(&workload, 0),
            vec![Snapshot::launch_failed("instance types unavailable")],
        );

        let err = provisioner(&fake)
            .provision(&workload, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "instance types unavailable");
        // The second claim is never submitted
        assert_eq!(fake.created(), vec![key_for(&workload, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_submission_creates_nothing() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = provisioner(&fake)
            .provision(&workload(2), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(fake.created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_reaches_a_stalled_submission() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(2);
        fake.hang(&key_for(&workload, 0));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = provisioner(&fake)
            .provision(&workload, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(fake.created(), vec![key_for(&workload, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_covers_a_stalled_submission() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(2);
        fake.hang(&key_for(&workload, 0));

        let start = Instant::now();
        let err = provisioner(&fake)
            .provision(&workload, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(start.elapsed() >= config().timeout);
        match err {
            ProvisionError::Timeout { pending, .. } => {
                assert_eq!(
                    pending,
                    vec![
                        key_for(&workload, 0).name,
                        key_for(&workload, 1).name
                    ]
                );
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_shared_by_submission_and_wait() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(1);
        fake.script(&key_for(&workload, 0), vec![Snapshot::pending()]);
        let provisioner = NodeClaimProvisioner::from_config(
            fake.clone(),
            ProvisionerConfig {
                settle_delay: Duration::from_secs(40),
                ..config()
            },
        );

        let start = Instant::now();
        let err = provisioner
            .provision(&workload, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pending_fails_on_a_failed_claim_without_polling() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(2);
        let good = insert_existing(&fake, &workload, "wsgood");
        let bad = insert_existing(&fake, &workload, "wsbad");
        fake.set_status(&bad, launch_failed_conditions("Fail to get machine"));

        let err = provisioner(&fake)
            .wait_for_pending(&workload, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Fail to get machine");
        assert_eq!(err.claim(), Some("wsbad"));
        assert_eq!(fake.get_calls(&good), 0);
        assert_eq!(fake.get_calls(&bad), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pending_waits_only_for_unready_claims() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(2);
        let ready = insert_existing(&fake, &workload, "wsready");
        let pending = insert_existing(&fake, &workload, "wspending");
        fake.set_status(&ready, ready_conditions());
        fake.script(&pending, vec![Snapshot::pending(), Snapshot::ready()]);

        provisioner(&fake)
            .wait_for_pending(&workload, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fake.get_calls(&ready), 0);
        assert_eq!(fake.get_calls(&pending), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pending_ignores_other_workspaces() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(1);
        let own = insert_existing(&fake, &workload, "wsown");
        fake.set_status(&own, ready_conditions());
        let other = ClaimKey::new("kaito", "wsother");
        fake.insert_named(
            &other,
            &[
                (LABEL_WORKSPACE_NAME, "llama-2"),
                (LABEL_WORKSPACE_NAMESPACE, "kaito"),
            ],
        );
        fake.set_status(&other, launch_failed_conditions("quota exceeded"));

        provisioner(&fake)
            .wait_for_pending(&workload, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fake.get_calls(&other), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pending_without_claims_is_not_ready() {
        let fake = Arc::new(FakeNodeClaimClient::new());

        let err = provisioner(&fake)
            .wait_for_pending(&workload(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::IncompleteClaims {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pending_reports_partially_provisioned_workspace() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(3);
        let only = insert_existing(&fake, &workload, "wsonly");
        fake.set_status(&only, ready_conditions());

        let err = provisioner(&fake)
            .wait_for_pending(&workload, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "workspace 'falcon-7b' needs 3 node claim(s) but 1 exist"
        );
    }

    #[tokio::test]
    async fn list_failure_is_reported() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        fake.fail_list(500, "Failed to list machines");

        let err = provisioner(&fake)
            .list_node_claims(&workload(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::List { .. }));
        assert!(err.to_string().contains("Failed to list machines"));
        assert!(err.is_retryable());
    }

    #[test]
    fn manifests_cover_every_node() {
        let fake = Arc::new(FakeNodeClaimClient::new());
        let workload = workload(4);
        let names: Vec<String> = provisioner(&fake)
            .manifests(&workload)
            .iter()
            .map(|c| c.name_any())
            .collect();

        assert_eq!(names.len(), 4);
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(names[0], node_claim_name(&workload, "0"));
    }
}
