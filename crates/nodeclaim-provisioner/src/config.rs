//! Provisioner configuration
//!
//! Poll interval, deadline, and settle delay are environment-dependent
//! tuning, not behavior; every value here can be overridden by the caller.

use std::time::Duration;

use nodeclaim_common::crd::CloudProvider;

/// Default time between status polling rounds
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default deadline for all claims of a workload to become Ready.
/// GPU instances routinely take several minutes to launch and initialize.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default pause between create and the submitter's single status fetch
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Options applied to every generated NodeClaim manifest
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Cloud whose Karpenter node class the claims reference
    pub cloud_provider: Option<CloudProvider>,
    /// Storage request for each node (Kubernetes quantity, e.g. "120Gi")
    pub storage_request: Option<String>,
}

/// Configuration for the create-then-wait sequence
#[derive(Clone, Debug)]
pub struct ProvisionerConfig {
    /// Time between polling rounds of the readiness barrier
    pub poll_interval: Duration,
    /// Deadline after which the barrier gives up with a timeout
    pub timeout: Duration,
    /// Pause after create before the first status fetch
    pub settle_delay: Duration,
    /// Manifest options
    pub manifest: ManifestOptions,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            manifest: ManifestOptions::default(),
        }
    }
}
