use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier pair: the caller-facing name and the vendor-assigned id
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Iid {
    pub name_id: String,
    pub system_id: String,
}

impl Iid {
    pub fn new(name_id: impl Into<String>, system_id: impl Into<String>) -> Self {
        Self {
            name_id: name_id.into(),
            system_id: system_id.into(),
        }
    }

    pub fn named(name_id: impl Into<String>) -> Self {
        Self::new(name_id, "")
    }

    pub fn is_empty(&self) -> bool {
        self.name_id.is_empty() && self.system_id.is_empty()
    }

    /// Two identifiers refer to the same resource when their names match or
    /// their system ids match; empty fields never match.
    pub fn same_as(&self, other: &Iid) -> bool {
        (!self.name_id.is_empty() && self.name_id == other.name_id)
            || (!self.system_id.is_empty() && self.system_id == other.system_id)
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name_id.is_empty(), self.system_id.is_empty()) {
            (false, false) => write!(f, "{} ({})", self.name_id, self.system_id),
            (false, true) => f.write_str(&self.name_id),
            _ => f.write_str(&self.system_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Inactive,
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "Creating",
            Self::Active => "Active",
            Self::Updating => "Updating",
            Self::Deleting => "Deleting",
            Self::Inactive => "Inactive",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeGroupStatus {
    Creating,
    Active,
    Deleting,
    Inactive,
}

impl fmt::Display for NodeGroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "Creating",
            Self::Active => "Active",
            Self::Deleting => "Deleting",
            Self::Inactive => "Inactive",
        };
        f.write_str(s)
    }
}

/// Network placement requested for a new cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkRequest {
    pub vpc: Iid,
    pub subnets: Vec<Iid>,
    pub security_groups: Vec<Iid>,
}

/// Vendor-specific knobs that are optional on a request; unset fields fall
/// back to the provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    pub cluster_type: Option<String>,
    pub public_network: Option<bool>,
    pub hypervisor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub name: String,
    pub version: String,
    pub network: NetworkRequest,
    pub node_groups: Vec<NodeGroupRequest>,
    #[serde(default)]
    pub options: ClusterOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupRequest {
    pub name: String,
    pub vm_spec_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub key_pair: Iid,
    pub desired: u32,
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub on_auto_scaling: bool,
    #[serde(default)]
    pub root_disk_size: Option<u32>,
    /// Skips image resolution when set
    #[serde(default)]
    pub software_code: Option<String>,
    /// Skips product resolution when set
    #[serde(default)]
    pub product_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessInfo {
    pub endpoint: String,
    pub kubeconfig: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub vpc: Iid,
    pub subnets: Vec<Iid>,
    pub security_groups: Vec<Iid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub iid: Iid,
    pub version: String,
    pub created_at: Option<DateTime<Utc>>,
    pub status: ClusterStatus,
    pub access: AccessInfo,
    pub network: NetworkInfo,
    pub node_groups: Vec<NodeGroupInfo>,
    pub key_values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupInfo {
    pub iid: Iid,
    pub vm_spec_name: String,
    pub image: Iid,
    pub product_code: Option<String>,
    pub key_pair: Iid,
    pub desired: u32,
    pub min: u32,
    pub max: u32,
    pub on_auto_scaling: bool,
    pub root_disk_size: u32,
    pub status: NodeGroupStatus,
    pub key_values: BTreeMap<String, String>,
}
