//! Wait command

use std::sync::Arc;

use clap::Args;

use nodeclaim_common::kube_utils::create_client;
use nodeclaim_provisioner::{KubeNodeClaimClient, NodeClaimProvisioner};

use super::WorkspaceTarget;
use crate::{GlobalArgs, Result};

#[derive(Args, Debug)]
pub struct WaitArgs {
    #[command(flatten)]
    pub target: WorkspaceTarget,
}

/// Wait for the node claims a previous run created for the Workspace
pub async fn run(args: WaitArgs, global: &GlobalArgs) -> Result<()> {
    let client = create_client(global.kubeconfig.as_deref()).await?;
    let workload = super::fetch_workload(&client, &args.target).await?;

    let provisioner = NodeClaimProvisioner::from_config(
        Arc::new(KubeNodeClaimClient::new(client)),
        global.provisioner_config(),
    );
    let cancel = super::cancel_on_ctrl_c();
    provisioner.wait_for_pending(&workload, &cancel).await?;

    println!(
        "workspace {}/{}: node claims ready",
        workload.namespace, workload.name
    );
    Ok(())
}
