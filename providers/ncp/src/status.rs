use common::cluster::{ClusterStatus, NodeGroupStatus};
use tracing::warn;

pub const CLUSTER_CREATING: &str = "CREATING";
pub const CLUSTER_RUNNING: &str = "RUNNING";
pub const CLUSTER_WORKING: &str = "WORKING";
pub const CLUSTER_UPDATING: &str = "UPDATING";
pub const CLUSTER_DELETING: &str = "DELETING";
pub const CLUSTER_RETURNED: &str = "RETURNED";

pub const POOL_CREATING: &str = "CREATING";
pub const POOL_RUN: &str = "RUN";
pub const POOL_DELETING: &str = "DELETING";

/// Unknown values degrade to `Inactive`; callers keep the raw string in the
/// key/value list so nothing is lost.
pub fn cluster_status(raw: &str) -> ClusterStatus {
    match raw.to_ascii_uppercase().as_str() {
        CLUSTER_CREATING => ClusterStatus::Creating,
        CLUSTER_RUNNING => ClusterStatus::Active,
        CLUSTER_WORKING | CLUSTER_UPDATING => ClusterStatus::Updating,
        CLUSTER_DELETING => ClusterStatus::Deleting,
        CLUSTER_RETURNED => ClusterStatus::Inactive,
        _ => {
            warn!(status = raw, "unrecognized cluster status, reporting Inactive");
            ClusterStatus::Inactive
        }
    }
}

pub fn node_pool_status(raw: &str) -> NodeGroupStatus {
    match raw.to_ascii_uppercase().as_str() {
        POOL_CREATING => NodeGroupStatus::Creating,
        POOL_RUN => NodeGroupStatus::Active,
        POOL_DELETING => NodeGroupStatus::Deleting,
        _ => {
            warn!(status = raw, "unrecognized node pool status, reporting Inactive");
            NodeGroupStatus::Inactive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_statuses() {
        assert_eq!(cluster_status("CREATING"), ClusterStatus::Creating);
        assert_eq!(cluster_status("RUNNING"), ClusterStatus::Active);
        assert_eq!(cluster_status("WORKING"), ClusterStatus::Updating);
        assert_eq!(cluster_status("updating"), ClusterStatus::Updating);
        assert_eq!(cluster_status("DELETING"), ClusterStatus::Deleting);
        assert_eq!(cluster_status("RETURNED"), ClusterStatus::Inactive);
        assert_eq!(cluster_status("SOMETHING_NEW"), ClusterStatus::Inactive);
    }

    #[test]
    fn node_pool_statuses() {
        assert_eq!(node_pool_status("RUN"), NodeGroupStatus::Active);
        assert_eq!(node_pool_status("CREATING"), NodeGroupStatus::Creating);
        assert_eq!(node_pool_status("DELETING"), NodeGroupStatus::Deleting);
        assert_eq!(node_pool_status(""), NodeGroupStatus::Inactive);
    }
}
