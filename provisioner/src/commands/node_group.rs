use anyhow::Result;
use common::{
    cluster::NodeGroupRequest,
    command::with_progress,
    provider::REMOVE_NODE_GROUP,
};
use tokio_util::sync::CancellationToken;

use super::{print_yaml, provider, read_yaml};
use crate::args::{AddNodeGroupArgs, AutoscalingArgs, Cli, ClusterArg, NodeGroupTarget, ScaleArgs};

const ADD: [&str; 3] = [
    "Adding node group",
    "Could not add node group",
    "Node group added",
];

const SCALE: [&str; 3] = [
    "Scaling node group",
    "Could not scale node group",
    "Node group scaled",
];

pub async fn add(cli: &Cli, args: &AddNodeGroupArgs, cancel: CancellationToken) -> Result<()> {
    let req: NodeGroupRequest = read_yaml(&args.request)?;
    let provider = provider(cli, cancel)?;
    let info = with_progress(
        provider.add_node_group(&args.cluster.iid(), &req),
        cli.verbose,
        ADD,
        &req.name,
    )
    .await?;
    print_yaml(&info)
}

pub async fn list(cli: &Cli, args: &ClusterArg, cancel: CancellationToken) -> Result<()> {
    let groups = provider(cli, cancel)?.list_node_groups(&args.iid()).await?;
    print_yaml(&groups)
}

pub async fn get(cli: &Cli, args: &NodeGroupTarget, cancel: CancellationToken) -> Result<()> {
    let group = provider(cli, cancel)?
        .get_node_group(&args.cluster.iid(), &args.node_group_iid())
        .await?;
    print_yaml(&group)
}

pub async fn scale(cli: &Cli, args: &ScaleArgs, cancel: CancellationToken) -> Result<()> {
    let provider = provider(cli, cancel)?;
    let info = with_progress(
        provider.change_node_group_scaling(
            &args.target.cluster.iid(),
            &args.target.node_group_iid(),
            args.desired,
            args.min,
            args.max,
        ),
        cli.verbose,
        SCALE,
        &args.target.node_group,
    )
    .await?;
    print_yaml(&info)
}

pub async fn autoscaling(cli: &Cli, args: &AutoscalingArgs, cancel: CancellationToken) -> Result<()> {
    let on = args.enable && !args.disable;
    provider(cli, cancel)?
        .set_node_group_autoscaling(&args.target.cluster.iid(), &args.target.node_group_iid(), on)
        .await?;
    println!(
        "Autoscaling {} for {}",
        if on { "enabled" } else { "disabled" },
        args.target.node_group
    );
    Ok(())
}

pub async fn remove(cli: &Cli, args: &NodeGroupTarget, cancel: CancellationToken) -> Result<()> {
    let provider = provider(cli, cancel)?;
    with_progress(
        provider.remove_node_group(&args.cluster.iid(), &args.node_group_iid()),
        cli.verbose,
        REMOVE_NODE_GROUP,
        &args.node_group,
    )
    .await?;
    Ok(())
}
