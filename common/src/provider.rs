use crate::{
    cluster::{ClusterInfo, ClusterRequest, ClusterStatus, Iid, NodeGroupInfo, NodeGroupRequest},
    Result,
};

pub const CREATE: [&str; 3] = [
    "Creating cluster",
    "Could not create cluster",
    "Cluster created",
];

pub const WAIT: [&str; 3] = [
    "Waiting for cluster to become active",
    "Cluster did not become active",
    "Cluster active",
];

pub const DELETE: [&str; 3] = [
    "Deleting cluster",
    "Could not delete cluster",
    "Cluster deletion requested",
];

pub const REMOVE_NODE_GROUP: [&str; 3] = [
    "Removing node group",
    "Could not remove node group",
    "Node group removed",
];

/// Managed Kubernetes operations of one cloud. Every entity is addressed by
/// an [`Iid`]; implementations resolve vendor ids themselves.
#[async_trait::async_trait]
pub trait ClusterProvider: Send + Sync {
    fn name(&self) -> String;

    async fn create_cluster(&self, req: &ClusterRequest) -> Result<ClusterInfo>;
    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>>;
    async fn get_cluster(&self, iid: &Iid) -> Result<ClusterInfo>;
    async fn delete_cluster(&self, iid: &Iid) -> Result<bool>;
    async fn list_iid(&self) -> Result<Vec<Iid>>;
    async fn upgrade_cluster(&self, iid: &Iid, version: &str) -> Result<ClusterInfo>;

    /// Blocks until the cluster reports `status`, bounded by the
    /// provider's polling configuration.
    async fn wait_for_cluster(&self, iid: &Iid, status: ClusterStatus) -> Result<ClusterInfo>;

    /// Ready-to-use kubeconfig with an embedded bearer token
    async fn cluster_kubeconfig(&self, iid: &Iid) -> Result<String>;

    async fn add_node_group(&self, cluster: &Iid, req: &NodeGroupRequest)
        -> Result<NodeGroupInfo>;
    async fn list_node_groups(&self, cluster: &Iid) -> Result<Vec<NodeGroupInfo>>;
    async fn get_node_group(&self, cluster: &Iid, node_group: &Iid) -> Result<NodeGroupInfo>;
    async fn set_node_group_autoscaling(
        &self,
        cluster: &Iid,
        node_group: &Iid,
        on: bool,
    ) -> Result<bool>;
    async fn change_node_group_scaling(
        &self,
        cluster: &Iid,
        node_group: &Iid,
        desired: u32,
        min: u32,
        max: u32,
    ) -> Result<NodeGroupInfo>;
    async fn remove_node_group(&self, cluster: &Iid, node_group: &Iid) -> Result<bool>;
}
