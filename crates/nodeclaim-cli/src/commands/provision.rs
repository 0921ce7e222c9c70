//! Provision command

use std::sync::Arc;

use clap::Args;
use tracing::info;

use nodeclaim_common::kube_utils::create_client;
use nodeclaim_provisioner::{KubeNodeClaimClient, NodeClaimProvisioner};

use super::WorkspaceTarget;
use crate::{GlobalArgs, Result};

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub target: WorkspaceTarget,
}

/// Create one NodeClaim per node the Workspace needs and wait for them
pub async fn run(args: ProvisionArgs, global: &GlobalArgs) -> Result<()> {
    let client = create_client(global.kubeconfig.as_deref()).await?;
    let workload = super::fetch_workload(&client, &args.target).await?;

    let provisioner = NodeClaimProvisioner::from_config(
        Arc::new(KubeNodeClaimClient::new(client)),
        global.provisioner_config(),
    );
    let cancel = super::cancel_on_ctrl_c();
    provisioner.provision(&workload, &cancel).await?;

    info!(workspace = %workload.name, count = workload.node_count, "workspace nodes are ready");
    println!(
        "workspace {}/{}: {} node claim(s) ready",
        workload.namespace, workload.name, workload.node_count
    );
    Ok(())
}
