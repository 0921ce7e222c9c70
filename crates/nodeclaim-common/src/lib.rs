//! Common types for node claim provisioning: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod retry;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Label key carrying the owning workspace name on every NodeClaim
pub const LABEL_WORKSPACE_NAME: &str = "kaito.sh/workspace";

/// Label key carrying the owning workspace namespace on every NodeClaim
pub const LABEL_WORKSPACE_NAMESPACE: &str = "kaito.sh/workspacenamespace";

/// Label key Karpenter uses to associate a NodeClaim with a node pool
pub const LABEL_NODE_POOL: &str = "karpenter.sh/nodepool";

/// Placeholder node pool name so Karpenter never scales the pool on its own
pub const NODE_POOL_NAME: &str = "kaito";

/// Annotation preventing Karpenter from disrupting provisioned GPU nodes
pub const DO_NOT_DISRUPT_ANNOTATION: &str = "karpenter.sh/do-not-disrupt";

/// Well-known node label for the instance type / SKU
pub const LABEL_INSTANCE_TYPE: &str = "node.kubernetes.io/instance-type";

/// Well-known node label for the operating system
pub const LABEL_OS: &str = "kubernetes.io/os";
