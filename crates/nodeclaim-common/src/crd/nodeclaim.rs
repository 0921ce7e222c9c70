//! NodeClaim CRD types
//!
//! Mirrors the subset of Karpenter's `karpenter.sh/v1beta1` NodeClaim that
//! provisioning reads and writes. Each NodeClaim requests one compute node;
//! its status is written exclusively by the provisioning backend.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

/// NodeClaim requests a single node matching a set of requirements.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "karpenter.sh",
    version = "v1beta1",
    kind = "NodeClaim",
    plural = "nodeclaims",
    namespaced,
    status = "NodeClaimStatus",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".metadata.labels.node\\.kubernetes\\.io/instance-type"}"#,
    printcolumn = r#"{"name":"Node","type":"string","jsonPath":".status.nodeName"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimSpec {
    /// Scheduling constraints the launched node must satisfy
    #[serde(default)]
    pub requirements: Vec<NodeSelectorRequirement>,

    /// Resources the node must provide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<NodeClaimResources>,

    /// Taints applied to the node at registration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// Cloud-specific node class used to launch the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class_ref: Option<NodeClassReference>,
}

/// A single `key operator values` scheduling constraint
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelectorRequirement {
    /// Node label key
    pub key: String,
    /// Relationship between the label and values
    pub operator: NodeSelectorOperator,
    /// Values to match; a single value for `In` constraints built here
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl NodeSelectorRequirement {
    /// Build an `In` requirement with a single value
    pub fn in_values(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: NodeSelectorOperator::In,
            values: vec![value.into()],
        }
    }
}

/// Node selector operators
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum NodeSelectorOperator {
    /// Label value is in the set
    In,
    /// Label value is not in the set
    NotIn,
    /// Label key exists
    Exists,
    /// Label key does not exist
    DoesNotExist,
    /// Label value is greater than the single value
    Gt,
    /// Label value is less than the single value
    Lt,
}

/// Resource requests for the node
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimResources {
    /// Requested quantities keyed by resource name (e.g. "storage" → "120Gi")
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
}

/// Node taint
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    /// Taint key
    pub key: String,
    /// Taint value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Taint effect
    pub effect: TaintEffect,
}

/// Taint effects
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum TaintEffect {
    /// Do not schedule new pods without a toleration
    NoSchedule,
    /// Avoid scheduling new pods without a toleration
    PreferNoSchedule,
    /// Evict running pods without a toleration
    NoExecute,
}

/// Reference to a provider-specific node class object
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeClassReference {
    /// API version of the node class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Kind of the node class
    pub kind: String,
    /// Name of the node class
    pub name: String,
}

/// Status of a NodeClaim, written by the provisioning backend
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimStatus {
    /// Name of the node once registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Cloud provider instance identifier
    #[serde(default, rename = "providerID", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Lifecycle conditions (Launched, Registered, Initialized, Ready)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl NodeClaim {
    /// Conditions from the latest status snapshot, empty if none reported yet
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
