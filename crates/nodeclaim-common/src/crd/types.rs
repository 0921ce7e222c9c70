//! Supporting types shared by the NodeClaim CRD

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cloud providers with a known Karpenter node class
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    /// Microsoft Azure (karpenter-provider-azure)
    Azure,
    /// Amazon Web Services (karpenter-provider-aws)
    Aws,
}

impl std::str::FromStr for CloudProvider {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "aws" => Ok(Self::Aws),
            _ => Err(crate::Error::validation(format!(
                "invalid cloud provider: {s}, expected one of: azure, aws"
            ))),
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Azure => write!(f, "azure"),
            Self::Aws => write!(f, "aws"),
        }
    }
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Condition types the provisioning backend reports on a NodeClaim
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeClaimConditionType {
    /// The cloud instance was (or failed to be) launched
    Launched,
    /// The node registered with the cluster
    Registered,
    /// The node finished initialization
    Initialized,
    /// Generic readiness marker; terminal success
    Ready,
    /// Any other condition type
    Other(String),
}

impl From<&str> for NodeClaimConditionType {
    fn from(s: &str) -> Self {
        match s {
            "Launched" => Self::Launched,
            "Registered" => Self::Registered,
            "Initialized" => Self::Initialized,
            "Ready" => Self::Ready,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for NodeClaimConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launched => write!(f, "Launched"),
            Self::Registered => write!(f, "Registered"),
            Self::Initialized => write!(f, "Initialized"),
            Self::Ready => write!(f, "Ready"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Kubernetes-style condition for status reporting
///
/// Written by the provisioning backend; reason, message, and timestamps
/// may be absent on freshly reported conditions.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Launched, Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    #[serde(default)]
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Severity reported by knative-style conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            severity: None,
            last_transition_time: Some(Utc::now()),
        }
    }

    /// Typed view of the condition's `type` field
    pub fn kind(&self) -> NodeClaimConditionType {
        NodeClaimConditionType::from(self.type_.as_str())
    }

    /// Returns true if this condition has the given kind and status True
    pub fn is_true(&self, kind: &NodeClaimConditionType) -> bool {
        self.status == ConditionStatus::True && &self.kind() == kind
    }

    /// Returns true if this condition has the given kind and status False
    pub fn is_false(&self, kind: &NodeClaimConditionType) -> bool {
        self.status == ConditionStatus::False && &self.kind() == kind
    }
}
