//! CLI commands

use std::time::Duration;

use clap::Args;
use kube::api::{Api, DynamicObject};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nodeclaim_common::crd::{workspace_api_resource, WorkloadSpec};
use nodeclaim_common::kube_utils::is_transient;
use nodeclaim_common::retry::{retry_with_backoff, RetryConfig};

use crate::{Error, Result};

pub mod manifest;
pub mod provision;
pub mod wait;

/// Attempts made to read the Workspace before giving up
const WORKSPACE_FETCH_ATTEMPTS: u32 = 5;

/// The Workspace a command operates on
#[derive(Args, Debug, Clone)]
pub struct WorkspaceTarget {
    /// Workspace name
    #[arg(long, short = 'w')]
    pub workspace: String,

    /// Workspace namespace; node claims are created in the same namespace
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,
}

/// Read the Workspace and turn it into a validated workload.
///
/// Transient API errors are retried with backoff; anything else (including
/// a missing Workspace) fails at once.
pub async fn fetch_workload(client: &Client, target: &WorkspaceTarget) -> Result<WorkloadSpec> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &target.namespace, &workspace_api_resource());

    let obj = retry_with_backoff(
        &RetryConfig::with_max_attempts(WORKSPACE_FETCH_ATTEMPTS),
        "get_workspace",
        is_transient,
        || api.get(&target.workspace),
    )
    .await
    .map_err(|source| Error::WorkspaceFetch {
        namespace: target.namespace.clone(),
        name: target.workspace.clone(),
        source,
    })?;

    let workload = WorkloadSpec::try_from(&obj)?;
    debug!(
        workspace = %workload.name,
        count = workload.node_count,
        instance_type = %workload.instance_type,
        "loaded workspace"
    );
    Ok(workload)
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling wait");
            trigger.cancel();
        }
    });
    token
}

/// Parse a duration such as "90s", "15m", "1h", or raw seconds
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid =
        || Error::validation(format!("invalid duration '{}', expected e.g. 1h, 15m, 30s", s));

    let (digits, scale) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s, 1)
    };

    let n: u64 = digits.parse().map_err(|_| invalid())?;
    n.checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

/// Parse a poll interval; zero would make the barrier fetch without pause
pub fn parse_poll_interval(s: &str) -> Result<Duration> {
    let interval = parse_duration(s)?;
    if interval.is_zero() {
        return Err(Error::validation("poll interval must be greater than zero"));
    }
    Ok(interval)
}

/// Parse a `key=value` label
pub fn parse_label(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(Error::validation(format!(
            "invalid label '{}', expected key=value",
            s
        ))),
    }
}
