//! NodeClaim manifest generation
//!
//! Pure transformation from a workload and an index to the NodeClaim that
//! requests one of its nodes. The name is a function of
//! `(namespace, workspace, index)` only, so regenerating the manifest for the
//! same pair always addresses the same object and re-submission is idempotent.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

use nodeclaim_common::crd::{
    CloudProvider, NodeClaim, NodeClaimResources, NodeClaimSpec, NodeClassReference,
    NodeSelectorRequirement, Taint, TaintEffect, WorkloadSpec, WORKSPACE_GROUP, WORKSPACE_KIND,
    WORKSPACE_VERSION,
};
use nodeclaim_common::kube_utils::deterministic_hash;
use nodeclaim_common::{
    DO_NOT_DISRUPT_ANNOTATION, LABEL_INSTANCE_TYPE, LABEL_NODE_POOL, LABEL_OS,
    LABEL_WORKSPACE_NAME, LABEL_WORKSPACE_NAMESPACE, NODE_POOL_NAME,
};

use crate::config::ManifestOptions;

/// Prefix of every generated NodeClaim name
const NAME_PREFIX: &str = "ws";
/// Hex characters of the identity hash kept in the name
const NAME_HASH_LEN: usize = 9;

/// Taint keeping non-GPU workloads off provisioned nodes
const GPU_TAINT_KEY: &str = "sku";
const GPU_TAINT_VALUE: &str = "gpu";

/// Resource name of the per-node storage request
const STORAGE_RESOURCE: &str = "storage";

/// Deterministic NodeClaim name for one node of a workload
pub fn node_claim_name(workload: &WorkloadSpec, index: &str) -> String {
    let hash = deterministic_hash(&format!(
        "{}/{}/{}",
        workload.namespace, workload.name, index
    ));
    format!("{}{}", NAME_PREFIX, &hash[..NAME_HASH_LEN])
}

/// Builds NodeClaim manifests with a fixed set of options
#[derive(Clone, Debug, Default)]
pub struct ManifestBuilder {
    options: ManifestOptions,
}

impl ManifestBuilder {
    pub fn new(options: ManifestOptions) -> Self {
        Self { options }
    }

    /// Generate the NodeClaim requesting node `index` of `workload`.
    ///
    /// Never fails; `workload` is expected to be validated already.
    pub fn build(&self, index: &str, workload: &WorkloadSpec) -> NodeClaim {
        let mut claim = NodeClaim::new(
            &node_claim_name(workload, index),
            NodeClaimSpec {
                requirements: requirements(workload),
                resources: self.resources(),
                taints: vec![Taint {
                    key: GPU_TAINT_KEY.to_string(),
                    value: Some(GPU_TAINT_VALUE.to_string()),
                    effect: TaintEffect::NoSchedule,
                }],
                node_class_ref: self.options.cloud_provider.map(node_class_ref),
            },
        );

        claim.metadata.namespace = Some(workload.namespace.clone());
        claim.metadata.labels = Some(labels(workload));
        claim.metadata.annotations = Some(BTreeMap::from([(
            DO_NOT_DISRUPT_ANNOTATION.to_string(),
            "true".to_string(),
        )]));
        claim.metadata.owner_references = owner_reference(workload).map(|r| vec![r]);

        claim
    }

    /// One manifest per required node, indices `0..node_count` in order
    pub fn build_all(&self, workload: &WorkloadSpec) -> Vec<NodeClaim> {
        (0..workload.node_count)
            .map(|index| self.build(&index.to_string(), workload))
            .collect()
    }

    fn resources(&self) -> Option<NodeClaimResources> {
        self.options
            .storage_request
            .as_ref()
            .map(|storage| NodeClaimResources {
                requests: BTreeMap::from([(STORAGE_RESOURCE.to_string(), storage.clone())]),
            })
    }
}

/// Instance type first, then node pool and OS, then label-selector entries
/// in key order. A selector key already constrained above is skipped.
fn requirements(workload: &WorkloadSpec) -> Vec<NodeSelectorRequirement> {
    let mut reqs = vec![
        NodeSelectorRequirement::in_values(LABEL_INSTANCE_TYPE, &workload.instance_type),
        NodeSelectorRequirement::in_values(LABEL_NODE_POOL, NODE_POOL_NAME),
        NodeSelectorRequirement::in_values(LABEL_OS, "linux"),
    ];

    for (key, value) in &workload.label_selector {
        if reqs.iter().any(|r| &r.key == key) {
            continue;
        }
        reqs.push(NodeSelectorRequirement::in_values(key, value));
    }

    reqs
}

/// Selector labels plus the identity labels used to list a workload's claims.
/// Identity labels win over selector entries with the same key.
fn labels(workload: &WorkloadSpec) -> BTreeMap<String, String> {
    let mut labels = workload.label_selector.clone();
    labels.insert(LABEL_NODE_POOL.to_string(), NODE_POOL_NAME.to_string());
    labels.insert(LABEL_WORKSPACE_NAME.to_string(), workload.name.clone());
    labels.insert(
        LABEL_WORKSPACE_NAMESPACE.to_string(),
        workload.namespace.clone(),
    );
    labels
}

/// Non-controlling back-reference so the workspace's deletion garbage-collects
/// its claims without making the workspace their controller.
fn owner_reference(workload: &WorkloadSpec) -> Option<OwnerReference> {
    workload.uid.as_ref().map(|uid| OwnerReference {
        api_version: format!("{}/{}", WORKSPACE_GROUP, WORKSPACE_VERSION),
        kind: WORKSPACE_KIND.to_string(),
        name: workload.name.clone(),
        uid: uid.clone(),
        controller: Some(false),
        block_owner_deletion: Some(false),
    })
}

fn node_class_ref(provider: CloudProvider) -> NodeClassReference {
    let (api_version, kind) = match provider {
        CloudProvider::Azure => ("karpenter.azure.com/v1alpha2", "AKSNodeClass"),
        CloudProvider::Aws => ("karpenter.k8s.aws/v1beta1", "EC2NodeClass"),
    };
    NodeClassReference {
        api_version: Some(api_version.to_string()),
        kind: kind.to_string(),
        name: "default".to_string(),
    }
}
