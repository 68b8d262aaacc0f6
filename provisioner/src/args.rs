use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use common::cluster::Iid;

#[derive(Debug, Parser)]
#[command(name = "provisioner")]
#[command(author, version, about = "Managed Kubernetes cluster provisioning on Naver Cloud", long_about = None)]
pub struct Cli {
    /// Verbose logging
    #[arg(long, short, action = ArgAction::SetTrue, global = true)]
    pub verbose: bool,

    /// Configuration file
    #[arg(long, short, default_value = "config.toml", global = true)]
    pub file: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a cluster from a YAML request
    Create(CreateArgs),
    /// Show one cluster
    Get(ClusterArg),
    /// Show every cluster
    List,
    /// List cluster names and ids
    Ids,
    /// Delete a cluster
    Delete(ClusterArg),
    /// Upgrade a cluster's Kubernetes version
    Upgrade(UpgradeArgs),
    /// Print a kubeconfig with an embedded token
    Kubeconfig(KubeconfigArgs),
    /// List the Kubernetes nodes of a cluster
    Nodes(ClusterArg),
    /// Manage node groups
    #[command(subcommand)]
    NodeGroup(NodeGroupCommands),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Cluster request (YAML)
    #[arg(long, short)]
    pub request: String,

    /// Wait until the cluster is active
    #[arg(long, short, action = ArgAction::SetTrue)]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct ClusterArg {
    /// Cluster uuid, or its name with --by-name
    pub cluster: String,

    /// Address the cluster by name
    #[arg(long, action = ArgAction::SetTrue)]
    pub by_name: bool,
}

impl ClusterArg {
    pub fn iid(&self) -> Iid {
        if self.by_name {
            Iid::named(self.cluster.as_str())
        } else {
            Iid::new("", self.cluster.as_str())
        }
    }
}

#[derive(Debug, Args)]
pub struct UpgradeArgs {
    #[command(flatten)]
    pub cluster: ClusterArg,

    /// Target Kubernetes version
    pub version: String,
}

#[derive(Debug, Args)]
pub struct KubeconfigArgs {
    #[command(flatten)]
    pub cluster: ClusterArg,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum NodeGroupCommands {
    /// Add a node group from a YAML request
    Add(AddNodeGroupArgs),
    /// List node groups of a cluster
    List(ClusterArg),
    /// Show one node group
    Get(NodeGroupTarget),
    /// Change node counts
    Scale(ScaleArgs),
    /// Turn autoscaling on or off
    Autoscaling(AutoscalingArgs),
    /// Remove a node group
    Remove(NodeGroupTarget),
}

#[derive(Debug, Args)]
pub struct AddNodeGroupArgs {
    #[command(flatten)]
    pub cluster: ClusterArg,

    /// Node group request (YAML)
    #[arg(long, short)]
    pub request: String,
}

#[derive(Debug, Args)]
pub struct NodeGroupTarget {
    #[command(flatten)]
    pub cluster: ClusterArg,

    /// Node pool instance number or name
    pub node_group: String,
}

impl NodeGroupTarget {
    /// Instance numbers are numeric, node group names start with a letter
    pub fn node_group_iid(&self) -> Iid {
        if !self.node_group.is_empty() && self.node_group.chars().all(|c| c.is_ascii_digit()) {
            Iid::new("", self.node_group.as_str())
        } else {
            Iid::named(self.node_group.as_str())
        }
    }
}

#[derive(Debug, Args)]
pub struct ScaleArgs {
    #[command(flatten)]
    pub target: NodeGroupTarget,

    #[arg(long)]
    pub desired: u32,

    #[arg(long)]
    pub min: u32,

    #[arg(long)]
    pub max: u32,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["enable", "disable"])))]
pub struct AutoscalingArgs {
    #[command(flatten)]
    pub target: NodeGroupTarget,

    #[arg(long, action = ArgAction::SetTrue)]
    pub enable: bool,

    #[arg(long, action = ArgAction::SetTrue)]
    pub disable: bool,
}
