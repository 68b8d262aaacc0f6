//! Vendor API seam: the calls the orchestrator makes against NKS, VPC and
//! server APIs, plus their wire types.

use async_trait::async_trait;
use common::{cluster::Iid, Result};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait VendorApi: Send + Sync {
    /// VPC with its current subnet list, looked up by id or else by name
    async fn get_vpc(&self, vpc: &Iid) -> Result<Vpc>;
    async fn get_subnet(&self, subnet_no: &str) -> Result<Subnet>;
    async fn default_network_acl(&self, vpc_no: &str) -> Result<String>;
    async fn create_subnet(&self, req: &SubnetCreate) -> Result<Subnet>;

    async fn server_spec(&self, spec_code: &str) -> Result<Option<ServerSpec>>;
    async fn k8s_versions(&self, hypervisor: &str) -> Result<Vec<OptionItem>>;
    async fn server_images(&self, hypervisor: &str) -> Result<Vec<OptionItem>>;
    async fn server_products(
        &self,
        hypervisor: &str,
        software_code: &str,
        zone: &str,
    ) -> Result<Vec<ProductOption>>;

    /// Returns the uuid of the new cluster
    async fn create_cluster(&self, body: &ClusterInputBody) -> Result<String>;
    async fn list_clusters(&self) -> Result<Vec<Cluster>>;
    async fn delete_cluster(&self, uuid: &str) -> Result<()>;
    async fn upgrade_cluster(&self, uuid: &str, version: &str) -> Result<()>;
    /// Partial kubeconfig without a users section. Fails with
    /// `Error::NotReady` while the cluster is still being created.
    async fn kubeconfig(&self, uuid: &str) -> Result<String>;

    async fn list_node_pools(&self, uuid: &str) -> Result<Vec<NodePool>>;
    async fn create_node_pool(&self, uuid: &str, body: &NodePoolCreationBody) -> Result<()>;
    async fn update_node_pool(
        &self,
        uuid: &str,
        instance_no: &str,
        body: &NodePoolUpdateBody,
    ) -> Result<()>;
    async fn delete_node_pool(&self, uuid: &str, instance_no: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonCode {
    pub code: String,
    pub code_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vpc {
    pub vpc_no: String,
    pub vpc_name: String,
    pub ipv4_cidr_block: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subnet {
    pub subnet_no: String,
    pub vpc_no: String,
    pub zone_code: String,
    pub subnet_name: String,
    /// CIDR block
    pub subnet: String,
    pub subnet_status: CommonCode,
    pub subnet_type: CommonCode,
    pub usage_type: CommonCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetCreate {
    pub vpc_no: String,
    pub zone_code: String,
    pub subnet_name: String,
    pub cidr: String,
    pub network_acl_no: String,
    pub subnet_type_code: String,
    pub usage_type_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSpec {
    pub server_spec_code: String,
    pub cpu_count: u32,
    /// Bytes
    pub memory_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionItem {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductOption {
    pub label: String,
    pub value: String,
    pub detail: Option<ProductDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDetail {
    pub cpu_count: Option<u32>,
    pub memory_size_gb: Option<u32>,
    pub product_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    pub uuid: String,
    pub name: String,
    pub status: String,
    pub k8s_version: Option<String>,
    pub endpoint: Option<String>,
    pub cluster_type: Option<String>,
    pub hypervisor_code: Option<String>,
    pub region_code: Option<String>,
    pub zone_code: Option<String>,
    pub vpc_no: Option<i64>,
    pub vpc_name: Option<String>,
    pub subnet_no_list: Vec<i64>,
    pub lb_private_subnet_no: Option<i64>,
    pub lb_public_subnet_no: Option<i64>,
    pub acg_no: Option<i64>,
    pub acg_name: Option<String>,
    pub login_key_name: Option<String>,
    pub created_at: Option<String>,
    pub node_pool: Vec<NodePool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePool {
    pub instance_no: i64,
    pub name: String,
    pub status: String,
    pub node_count: u32,
    pub server_spec_code: Option<String>,
    pub software_code: Option<String>,
    pub product_code: Option<String>,
    pub storage_size: Option<u32>,
    pub autoscale: Option<Autoscale>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Autoscale {
    pub enabled: bool,
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInputBody {
    pub name: String,
    pub cluster_type: String,
    pub k8s_version: String,
    pub login_key_name: String,
    pub region_code: String,
    pub zone_code: String,
    pub hypervisor_code: String,
    pub public_network: bool,
    pub vpc_no: i64,
    pub subnet_no_list: Vec<i64>,
    pub lb_private_subnet_no: i64,
    pub lb_public_subnet_no: i64,
    pub node_pool: Vec<NodePoolDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolDto {
    pub name: String,
    pub node_count: u32,
    pub software_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_spec_code: Option<String>,
    pub product_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscale: Option<Autoscale>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolCreationBody {
    pub name: String,
    pub node_count: u32,
    pub subnet_no: i64,
    pub storage_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_spec_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscale: Option<Autoscale>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolUpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscale: Option<Autoscale>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_list_entry_deserializes() {
        let json = r#"{
            "uuid": "2d1f0b1e-uuid",
            "name": "demo",
            "status": "RUNNING",
            "k8sVersion": "1.27.9-nks.1",
            "endpoint": "https://demo.kr.vnks.ntruss.com",
            "vpcNo": 1234,
            "vpcName": "vpc-01",
            "subnetNoList": [11, 12],
            "acgNo": 77,
            "acgName": "nks-acg",
            "loginKeyName": "my-key",
            "createdAt": "2024-01-02T03:04:05+0900",
            "nodePool": [{
                "instanceNo": 501,
                "name": "workers",
                "status": "RUN",
                "nodeCount": 2,
                "serverSpecCode": "s2-g2",
                "softwareCode": "SW.VSVR.OS.LNX64.UBNTU.SVR2004.WRKND.B050",
                "storageSize": 100,
                "autoscale": {"enabled": true, "min": 1, "max": 3},
                "isDefault": true
            }]
        }"#;
        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.k8s_version.as_deref(), Some("1.27.9-nks.1"));
        assert_eq!(cluster.subnet_no_list, vec![11, 12]);
        let pool = &cluster.node_pool[0];
        assert!(pool.is_default);
        assert_eq!(
            pool.autoscale,
            Some(Autoscale {
                enabled: true,
                min: 1,
                max: 3
            })
        );
        assert_eq!(pool.product_code, None);
    }

    #[test]
    fn create_body_uses_vendor_field_names() {
        let body = ClusterInputBody {
            name: "demo".into(),
            lb_private_subnet_no: 3,
            node_pool: vec![NodePoolDto {
                name: "ng".into(),
                node_count: 1,
                ..Default::default()
            }],
            ..Default::default()
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["lbPrivateSubnetNo"], 3);
        assert!(v.get("k8sVersion").is_some());
        assert_eq!(v["nodePool"][0]["nodeCount"], 1);
        assert!(v["nodePool"][0].get("autoscale").is_none());
        assert!(v["nodePool"][0].get("serverSpecCode").is_none());
    }
}
