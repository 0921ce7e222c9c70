//! Manifest command - render NodeClaims for a workload offline

use clap::Args;

use nodeclaim_common::crd::{ResourceSpec, WorkloadSpec};
use nodeclaim_provisioner::{ManifestBuilder, ManifestOptions};

use super::{parse_label, WorkspaceTarget};
use crate::{GlobalArgs, Result};

#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub target: WorkspaceTarget,

    /// Instance type / SKU of each node
    #[arg(long)]
    pub instance_type: String,

    /// Number of nodes
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Label each node must carry (repeatable, key=value)
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    /// Workspace UID for the owner reference
    #[arg(long)]
    pub uid: Option<String>,
}

/// Print the NodeClaims for the workload as a multi-document YAML stream
pub fn run(args: ManifestArgs, global: &GlobalArgs) -> Result<()> {
    print!("{}", render(&args, global.manifest_options())?);
    Ok(())
}

fn render(args: &ManifestArgs, options: ManifestOptions) -> Result<String> {
    let resource = ResourceSpec {
        count: Some(args.count),
        instance_type: args.instance_type.clone(),
        label_selector: None,
    };
    let mut workload =
        WorkloadSpec::new(&args.target.workspace, &args.target.namespace, &resource)?;
    workload.label_selector = args.labels.iter().cloned().collect();
    if let Some(uid) = &args.uid {
        workload = workload.with_uid(uid);
    }

    let mut out = String::new();
    for claim in ManifestBuilder::new(options).build_all(&workload) {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&claim)?);
    }
    Ok(out)
}
