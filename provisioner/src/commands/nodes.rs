use anyhow::Result;
use k8s_openapi::api::core::v1::Node;
use kube::{
    api::ListParams,
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config,
};
use tokio_util::sync::CancellationToken;

use super::provider;
use crate::args::{Cli, ClusterArg};

/// Lists nodes through the generated kubeconfig, which also checks that the
/// embedded token is accepted by the API server.
pub async fn nodes(cli: &Cli, args: &ClusterArg, cancel: CancellationToken) -> Result<()> {
    let kubeconfig = provider(cli, cancel)?
        .cluster_kubeconfig(&args.iid())
        .await?;
    let kubeconfig = Kubeconfig::from_yaml(&kubeconfig)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    let client = Client::try_from(config)?;

    let api: Api<Node> = Api::all(client);
    let nodes = api.list(&ListParams::default()).await?;
    if nodes.items.is_empty() {
        println!("No nodes registered yet");
    }
    for node in nodes.items {
        println!("{}\t{}\t{}", node_name(&node), node_ready(&node), kubelet_version(&node));
    }
    Ok(())
}

fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or("<unnamed>")
}

fn node_ready(node: &Node) -> &'static str {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|c| c.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True");
    if ready {
        "Ready"
    } else {
        "NotReady"
    }
}

fn kubelet_version(node: &Node) -> &str {
    node.status
        .as_ref()
        .and_then(|s| s.node_info.as_ref())
        .map_or("", |i| i.kubelet_version.as_str())
}
