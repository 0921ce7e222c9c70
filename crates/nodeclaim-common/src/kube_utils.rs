//! Shared Kubernetes utilities using kube-rs
//!
//! Client construction, API error classification, and the deterministic
//! hashing used to derive stable object names.

use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::Error;

/// HTTP status the API server returns for an object that already exists
const CODE_CONFLICT: u16 = 409;
/// HTTP status the API server returns for a missing object
const CODE_NOT_FOUND: u16 = 404;
/// Status reason distinguishing AlreadyExists from other 409 conflicts
const REASON_ALREADY_EXISTS: &str = "AlreadyExists";

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns true if the API server rejected a create because the object exists.
///
/// A 409 with a different reason (e.g. an optimistic-concurrency `Conflict`
/// on update) is not treated as "already exists".
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(
        err,
        kube::Error::Api(ae) if ae.code == CODE_CONFLICT && ae.reason == REASON_ALREADY_EXISTS
    )
}

/// Returns true if the API server reported the object as not found
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == CODE_NOT_FOUND)
}

/// Returns true if the error is a hiccup of the observation channel rather
/// than an answer from the API server.
///
/// Transport failures, request timeouts (408/504), throttling (429), and
/// server-side errors (5xx) are transient. Other 4xx responses and
/// (de)serialization failures are definitive.
pub fn is_transient(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(ae) => ae.code == 408 || ae.code == 429 || ae.code >= 500,
        kube::Error::SerdeError(_) => false,
        _ => true,
    }
}

/// Hex-encoded SHA-256 digest of the input, truncated to 16 characters
pub fn deterministic_hash(input: &str) -> String {
    use aws_lc_rs::digest;
    let hash = digest::digest(&digest::SHA256, input.as_bytes());
    hash.as_ref()[..8]
        .iter()
        .fold(String::with_capacity(16), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        })
}

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from optional kubeconfig path with custom timeouts
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}
