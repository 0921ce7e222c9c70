//! Collaborator interface to the cluster API for NodeClaims

use std::fmt;

use async_trait::async_trait;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};

use nodeclaim_common::crd::NodeClaim;

#[cfg(test)]
use mockall::automock;

/// Identity of a NodeClaim: namespace plus name
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimKey {
    pub namespace: String,
    pub name: String,
}

impl ClaimKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of an existing claim object
    pub fn of(claim: &NodeClaim) -> Self {
        Self::new(claim.namespace().unwrap_or_default(), claim.name_any())
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Trait abstracting the Kubernetes API operations on NodeClaims
///
/// The production implementation talks to the API server; tests substitute
/// a mock or an in-memory fake.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeClaimClient: Send + Sync {
    /// Create a NodeClaim. Fails with a 409 `AlreadyExists` API error when an
    /// object with the same identity exists.
    async fn create(&self, claim: &NodeClaim) -> Result<(), kube::Error>;

    /// Fetch the latest snapshot of a NodeClaim. Fails with 404 if it was
    /// never created or has been garbage-collected.
    async fn get(&self, namespace: &str, name: &str) -> Result<NodeClaim, kube::Error>;

    /// List NodeClaims in a namespace matching a label selector
    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<NodeClaim>, kube::Error>;
}

/// Real Kubernetes client implementation
#[derive(Clone)]
pub struct KubeNodeClaimClient {
    client: Client,
}

impl KubeNodeClaimClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<NodeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl NodeClaimClient for KubeNodeClaimClient {
    async fn create(&self, claim: &NodeClaim) -> Result<(), kube::Error> {
        let namespace = claim.namespace().unwrap_or_default();
        self.api(&namespace)
            .create(&PostParams::default(), claim)
            .await?;
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<NodeClaim, kube::Error> {
        self.api(namespace).get(name).await
    }

    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<NodeClaim>, kube::Error> {
        let params = ListParams::default().labels(label_selector);
        Ok(self.api(namespace).list(&params).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeclaim_common::crd::NodeClaimSpec;

    #[test]
    fn claim_key_display_and_order() {
        let a = ClaimKey::new("kaito", "ws1");
        let b = ClaimKey::new("kaito", "ws2");
        assert_eq!(a.to_string(), "kaito/ws1");
        assert!(a < b);
    }

    #[test]
    fn claim_key_of_object() {
        let mut claim = NodeClaim::new("ws1", NodeClaimSpec::default());
        claim.metadata.namespace = Some("kaito".to_string());
        assert_eq!(ClaimKey::of(&claim), ClaimKey::new("kaito", "ws1"));
    }
}
