//! nodeclaim CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use nodeclaim_common::crd::CloudProvider;
use nodeclaim_provisioner::{ManifestOptions, ProvisionerConfig};

use commands::{parse_duration, parse_poll_interval};

/// nodeclaim - provision and await GPU nodes for KAITO workspaces
#[derive(Parser, Debug)]
#[command(name = "nodeclaim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to kubeconfig (in-cluster config or ~/.kube/config if unset)
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Time between status polling rounds (e.g. 5s, 1m)
    #[arg(long, global = true, default_value = "5s", value_parser = parse_poll_interval)]
    pub poll_interval: Duration,

    /// Deadline for every node claim to become ready (e.g. 15m)
    #[arg(long, global = true, default_value = "15m", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Pause between creating a claim and its first status check
    #[arg(long, global = true, default_value = "2s", value_parser = parse_duration)]
    pub settle_delay: Duration,

    /// Cloud whose Karpenter node class the claims reference (azure, aws)
    #[arg(long, global = true, env = "CLOUD_PROVIDER")]
    pub cloud_provider: Option<CloudProvider>,

    /// Storage request for each node (e.g. 120Gi)
    #[arg(long, global = true)]
    pub storage: Option<String>,
}

impl GlobalArgs {
    pub fn manifest_options(&self) -> ManifestOptions {
        ManifestOptions {
            cloud_provider: self.cloud_provider,
            storage_request: self.storage.clone(),
        }
    }

    pub fn provisioner_config(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            poll_interval: self.poll_interval,
            timeout: self.timeout,
            settle_delay: self.settle_delay,
            manifest: self.manifest_options(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the node claims of a workspace and wait until they are ready
    Provision(commands::provision::ProvisionArgs),
    /// Wait for a workspace's existing node claims without creating any
    Wait(commands::wait::WaitArgs),
    /// Print the node claim manifests for a workload without contacting a cluster
    Manifest(commands::manifest::ManifestArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Provision(args) => commands::provision::run(args, &self.global).await,
            Commands::Wait(args) => commands::wait::run(args, &self.global).await,
            Commands::Manifest(args) => commands::manifest::run(args, &self.global),
        }
    }
}
