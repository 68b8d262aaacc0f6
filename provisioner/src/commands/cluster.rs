use anyhow::Result;
use common::{
    cluster::{ClusterRequest, ClusterStatus},
    command::with_progress,
    provider::{CREATE, DELETE, WAIT},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{print_yaml, provider, read_yaml};
use crate::args::{ClusterArg, CreateArgs, Cli, KubeconfigArgs, UpgradeArgs};

const UPGRADE: [&str; 3] = [
    "Requesting upgrade",
    "Could not upgrade cluster",
    "Upgrade requested",
];

pub async fn create(cli: &Cli, args: &CreateArgs, cancel: CancellationToken) -> Result<()> {
    let req: ClusterRequest = read_yaml(&args.request)?;
    let provider = provider(cli, cancel)?;

    let mut info = with_progress(provider.create_cluster(&req), cli.verbose, CREATE, &req.name).await?;
    if args.wait {
        info = with_progress(
            provider.wait_for_cluster(&info.iid, ClusterStatus::Active),
            cli.verbose,
            WAIT,
            &req.name,
        )
        .await?;
    }
    print_yaml(&info)
}

pub async fn get(cli: &Cli, args: &ClusterArg, cancel: CancellationToken) -> Result<()> {
    let info = provider(cli, cancel)?.get_cluster(&args.iid()).await?;
    print_yaml(&info)
}

pub async fn list(cli: &Cli, cancel: CancellationToken) -> Result<()> {
    let clusters = provider(cli, cancel)?.list_clusters().await?;
    info!(count = clusters.len(), "clusters listed");
    print_yaml(&clusters)
}

pub async fn ids(cli: &Cli, cancel: CancellationToken) -> Result<()> {
    for iid in provider(cli, cancel)?.list_iid().await? {
        println!("{}\t{}", iid.name_id, iid.system_id);
    }
    Ok(())
}

pub async fn delete(cli: &Cli, args: &ClusterArg, cancel: CancellationToken) -> Result<()> {
    let provider = provider(cli, cancel)?;
    with_progress(
        provider.delete_cluster(&args.iid()),
        cli.verbose,
        DELETE,
        &args.cluster,
    )
    .await?;
    Ok(())
}

pub async fn upgrade(cli: &Cli, args: &UpgradeArgs, cancel: CancellationToken) -> Result<()> {
    let provider = provider(cli, cancel)?;
    let info = with_progress(
        provider.upgrade_cluster(&args.cluster.iid(), &args.version),
        cli.verbose,
        UPGRADE,
        &args.cluster.cluster,
    )
    .await?;
    print_yaml(&info)
}

pub async fn kubeconfig(cli: &Cli, args: &KubeconfigArgs, cancel: CancellationToken) -> Result<()> {
    let kubeconfig = provider(cli, cancel)?
        .cluster_kubeconfig(&args.cluster.iid())
        .await?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, kubeconfig)?;
            info!(path = %path, "kubeconfig written");
        }
        None => print!("{kubeconfig}"),
    }
    Ok(())
}
