//! Resource definitions used by node claim provisioning

mod nodeclaim;
mod types;
mod workspace;

pub use nodeclaim::{
    NodeClaim, NodeClaimResources, NodeClaimSpec, NodeClaimStatus, NodeClassReference,
    NodeSelectorOperator, NodeSelectorRequirement, Taint, TaintEffect,
};
pub use types::{CloudProvider, Condition, ConditionStatus, NodeClaimConditionType};
pub use workspace::{
    workspace_api_resource, ResourceSpec, WorkloadSpec, WORKSPACE_GROUP, WORKSPACE_KIND,
    WORKSPACE_PLURAL, WORKSPACE_VERSION,
};
