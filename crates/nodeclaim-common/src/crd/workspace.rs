//! Workspace types consumed read-only
//!
//! The `kaito.sh/v1alpha1` Workspace is owned by another controller and keeps
//! its `resource` block at the top level of the object rather than under
//! `spec`, so it is read as a `DynamicObject` and only that block is parsed.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};

use crate::Error;

/// API group of the Workspace resource
pub const WORKSPACE_GROUP: &str = "kaito.sh";
/// API version of the Workspace resource
pub const WORKSPACE_VERSION: &str = "v1alpha1";
/// Kind of the Workspace resource
pub const WORKSPACE_KIND: &str = "Workspace";
/// Plural of the Workspace resource
pub const WORKSPACE_PLURAL: &str = "workspaces";

/// `ApiResource` for reading Workspaces through a dynamic API
pub fn workspace_api_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(WORKSPACE_GROUP, WORKSPACE_VERSION, WORKSPACE_KIND);
    ApiResource::from_gvk_with_plural(&gvk, WORKSPACE_PLURAL)
}

/// The `resource` block of a Workspace
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// Number of GPU nodes required; defaults to 1 when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// Instance type / SKU of each node
    #[serde(default)]
    pub instance_type: String,

    /// Labels every provisioned node must carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

/// Everything node claim provisioning needs to know about one workload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadSpec {
    /// Workspace name
    pub name: String,
    /// Workspace namespace; NodeClaims are created here
    pub namespace: String,
    /// Workspace UID, used for the owner back-reference when known
    pub uid: Option<String>,
    /// Number of nodes to provision, at least 1
    pub node_count: u32,
    /// Instance type / SKU of each node
    pub instance_type: String,
    /// Labels copied onto each NodeClaim as `In` requirements
    pub label_selector: BTreeMap<String, String>,
}

impl WorkloadSpec {
    /// Build a validated workload from its parts
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource: &ResourceSpec,
    ) -> Result<Self, Error> {
        let name = name.into();
        let namespace = namespace.into();

        if namespace.is_empty() {
            return Err(Error::validation_for_field(
                &name,
                "metadata.namespace",
                "workspace must be namespaced",
            ));
        }

        let node_count = resource.count.unwrap_or(1);
        if node_count == 0 {
            return Err(Error::validation_for_field(
                &name,
                "resource.count",
                "node count must be at least 1",
            ));
        }

        if resource.instance_type.trim().is_empty() {
            return Err(Error::validation_for_field(
                &name,
                "resource.instanceType",
                "instance type must not be empty",
            ));
        }

        let label_selector = resource
            .label_selector
            .as_ref()
            .and_then(|s| s.match_labels.clone())
            .unwrap_or_default();

        Ok(Self {
            name,
            namespace,
            uid: None,
            node_count,
            instance_type: resource.instance_type.clone(),
            label_selector,
        })
    }

    /// Attach the workspace UID for the owner back-reference
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Label selector string matching every NodeClaim of this workload
    pub fn claim_selector(&self) -> String {
        format!(
            "{}={},{}={}",
            crate::LABEL_WORKSPACE_NAME,
            self.name,
            crate::LABEL_WORKSPACE_NAMESPACE,
            self.namespace
        )
    }
}

impl TryFrom<&DynamicObject> for WorkloadSpec {
    type Error = Error;

    fn try_from(obj: &DynamicObject) -> Result<Self, Self::Error> {
        let name = obj.name_any();
        let namespace = obj.namespace().unwrap_or_default();

        let resource = obj.data.get("resource").cloned().ok_or_else(|| {
            Error::validation_for_field(&name, "resource", "workspace has no resource block")
        })?;
        let resource: ResourceSpec = serde_json::from_value(resource).map_err(|e| {
            Error::serialization_for_kind(WORKSPACE_KIND, format!("invalid resource block: {}", e))
        })?;

        let spec = Self::new(name, namespace, &resource)?;
        Ok(match obj.uid() {
            Some(uid) => spec.with_uid(uid),
            None => spec,
        })
    }
}
