//! NodeClaim provisioning for KAITO workspaces
//!
//! Turns a workload description into one Karpenter NodeClaim per required
//! GPU node, submits them idempotently, and blocks until every node is
//! Ready, one fails, the deadline passes, or the caller cancels.

pub mod barrier;
pub mod client;
pub mod config;
pub mod error;
pub mod manifest;
pub mod provisioner;
pub mod status;
pub mod submit;

#[cfg(test)]
mod fake;

pub use barrier::ReadinessBarrier;
pub use client::{ClaimKey, KubeNodeClaimClient, NodeClaimClient};
pub use config::{ManifestOptions, ProvisionerConfig};
pub use error::ProvisionError;
pub use manifest::{node_claim_name, ManifestBuilder};
pub use provisioner::NodeClaimProvisioner;
pub use status::{classify, ClaimState};
pub use submit::ClaimSubmitter;
