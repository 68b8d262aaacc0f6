//! Node pool operations on an existing NKS cluster.

use std::collections::BTreeMap;

use common::{
    cluster::{Iid, NodeGroupInfo, NodeGroupRequest},
    poll::poll_until,
    Error, Result,
};
use tracing::{info, instrument, warn};

use crate::{
    api::{Autoscale, NodePool, NodePoolCreationBody, NodePoolUpdateBody, VendorApi},
    capability::{CapabilityResolver, NodeCodes},
    cluster::NcpClusterHandler,
    status::node_pool_status,
    validate::{validate_node_group, validate_scaling},
};

pub const DEFAULT_STORAGE_GB: u32 = 100;
const STORAGE_RANGE_GB: std::ops::RangeInclusive<u32> = 50..=2000;

/// Codes for a node group, honouring explicit overrides on the request
pub(crate) async fn resolve_codes<A: VendorApi + ?Sized>(
    resolver: &CapabilityResolver<'_, A>,
    ng: &NodeGroupRequest,
) -> Result<NodeCodes> {
    let codes = match (&ng.software_code, &ng.product_code) {
        (Some(sw), Some(pc)) => NodeCodes {
            software_code: sw.clone(),
            product_code: pc.clone(),
        },
        (Some(sw), None) => NodeCodes {
            product_code: resolver.product_code(&ng.vm_spec_name, sw).await?,
            software_code: sw.clone(),
        },
        (None, Some(pc)) => NodeCodes {
            software_code: resolver.software_code(ng.image.as_deref()).await?,
            product_code: pc.clone(),
        },
        (None, None) => {
            resolver
                .resolve(&ng.vm_spec_name, ng.image.as_deref())
                .await?
        }
    };
    Ok(codes)
}

pub(crate) fn autoscale_of(ng: &NodeGroupRequest) -> Option<Autoscale> {
    ng.on_auto_scaling.then_some(Autoscale {
        enabled: true,
        min: ng.min,
        max: ng.max,
    })
}

/// The VM spec is optional once a product code is given
pub(crate) fn server_spec_of(ng: &NodeGroupRequest) -> Option<String> {
    let spec = ng.vm_spec_name.trim();
    (!spec.is_empty()).then(|| spec.to_owned())
}

/// Out-of-range sizes fall back to the default
pub fn storage_size(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => DEFAULT_STORAGE_GB,
        Some(gb) if STORAGE_RANGE_GB.contains(&gb) => gb,
        Some(gb) => {
            warn!(
                requested = gb,
                default = DEFAULT_STORAGE_GB,
                "root disk size outside 50..=2000 GB, using default"
            );
            DEFAULT_STORAGE_GB
        }
    }
}

pub(crate) fn node_group_info(pool: &NodePool, login_key: &str) -> NodeGroupInfo {
    let autoscale = pool.autoscale.unwrap_or_default();

    let mut kv = BTreeMap::new();
    kv.insert("InstanceNo".to_owned(), pool.instance_no.to_string());
    kv.insert("Status".to_owned(), pool.status.clone());
    if let Some(spec) = &pool.server_spec_code {
        kv.insert("ServerSpecCode".to_owned(), spec.clone());
    }
    if let Some(sw) = &pool.software_code {
        kv.insert("SoftwareCode".to_owned(), sw.clone());
    }
    if let Some(a) = pool.autoscale {
        kv.insert("AutoScalingEnabled".to_owned(), a.enabled.to_string());
        kv.insert("AutoScalingMin".to_owned(), a.min.to_string());
        kv.insert("AutoScalingMax".to_owned(), a.max.to_string());
    }
    if pool.is_default {
        kv.insert("IsDefault".to_owned(), "true".to_owned());
    }

    NodeGroupInfo {
        iid: Iid::new(pool.name.as_str(), pool.instance_no.to_string()),
        vm_spec_name: pool.server_spec_code.clone().unwrap_or_default(),
        image: Iid::new("", pool.software_code.clone().unwrap_or_default()),
        product_code: pool.product_code.clone(),
        key_pair: Iid::named(login_key),
        desired: pool.node_count,
        min: autoscale.min,
        max: autoscale.max,
        on_auto_scaling: autoscale.enabled,
        root_disk_size: pool.storage_size.unwrap_or_default(),
        status: node_pool_status(&pool.status),
        key_values: kv,
    }
}

/// Matches on instance number when known, otherwise on name
fn find_pool(pools: Vec<NodePool>, iid: &Iid) -> Result<NodePool> {
    let names: Vec<String> = pools
        .iter()
        .map(|p| format!("{}({})", p.name, p.instance_no))
        .collect();
    pools
        .into_iter()
        .find(|p| {
            if iid.system_id.is_empty() {
                p.name == iid.name_id
            } else {
                p.instance_no.to_string() == iid.system_id
            }
        })
        .ok_or_else(|| Error::lookup(format!("node pool {iid} not found"), names))
}

impl<A: VendorApi> NcpClusterHandler<A> {
    async fn pool_of(&self, cluster: &Iid, node_group: &Iid) -> Result<(String, String, NodePool)> {
        let c = self.find_cluster(cluster).await?;
        let pools = self.api.list_node_pools(&c.uuid).await?;
        let pool = find_pool(pools, node_group)?;
        Ok((c.uuid, c.login_key_name.unwrap_or_default(), pool))
    }

    #[instrument(skip_all, fields(cluster = %cluster, node_group = %req.name))]
    pub async fn add_pool(&self, cluster: &Iid, req: &NodeGroupRequest) -> Result<NodeGroupInfo> {
        validate_node_group(req)?;
        let c = self.find_cluster(cluster).await?;
        let subnet_no = *c.subnet_no_list.first().ok_or_else(|| {
            Error::validation(format!("cluster {} has no worker subnet", c.name))
        })?;

        let resolver = CapabilityResolver::new(&self.api, self.cluster_hypervisor(&c), &self.zone);
        let codes = resolve_codes(&resolver, req).await?;
        let body = NodePoolCreationBody {
            name: req.name.clone(),
            node_count: req.desired,
            subnet_no,
            storage_size: storage_size(req.root_disk_size),
            server_spec_code: server_spec_of(req),
            software_code: Some(codes.software_code),
            product_code: Some(codes.product_code),
            autoscale: autoscale_of(req),
        };
        self.api.create_node_pool(&c.uuid, &body).await?;
        info!(uuid = %c.uuid, "node pool creation requested");

        let pools = self.api.list_node_pools(&c.uuid).await?;
        let pool = find_pool(pools, &Iid::named(req.name.as_str()))?;
        Ok(node_group_info(
            &pool,
            c.login_key_name.as_deref().unwrap_or_default(),
        ))
    }

    pub async fn list_pools(&self, cluster: &Iid) -> Result<Vec<NodeGroupInfo>> {
        let c = self.find_cluster(cluster).await?;
        let login_key = c.login_key_name.unwrap_or_default();
        let pools = self.api.list_node_pools(&c.uuid).await?;
        Ok(pools
            .iter()
            .map(|p| node_group_info(p, &login_key))
            .collect())
    }

    pub async fn get_pool(&self, cluster: &Iid, node_group: &Iid) -> Result<NodeGroupInfo> {
        let (_, login_key, pool) = self.pool_of(cluster, node_group).await?;
        Ok(node_group_info(&pool, &login_key))
    }

    /// Toggles autoscaling, keeping the pool's bounds. Unset bounds default
    /// to the current node count.
    #[instrument(skip(self))]
    pub async fn set_pool_autoscaling(
        &self,
        cluster: &Iid,
        node_group: &Iid,
        on: bool,
    ) -> Result<bool> {
        let (uuid, _, pool) = self.pool_of(cluster, node_group).await?;
        let current = pool.autoscale.unwrap_or_default();
        let bound = |v: u32| if v == 0 { pool.node_count } else { v };
        let body = NodePoolUpdateBody {
            node_count: None,
            autoscale: Some(Autoscale {
                enabled: on,
                min: bound(current.min),
                max: bound(current.max),
            }),
        };
        self.api
            .update_node_pool(&uuid, &pool.instance_no.to_string(), &body)
            .await?;
        info!(uuid = %uuid, pool = %pool.name, on, "node pool autoscaling updated");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn scale_pool(
        &self,
        cluster: &Iid,
        node_group: &Iid,
        desired: u32,
        min: u32,
        max: u32,
    ) -> Result<NodeGroupInfo> {
        validate_scaling(desired, min, max)?;
        let (uuid, login_key, pool) = self.pool_of(cluster, node_group).await?;
        let instance_no = pool.instance_no.to_string();
        let body = NodePoolUpdateBody {
            node_count: Some(desired),
            autoscale: Some(Autoscale {
                enabled: pool.autoscale.is_some_and(|a| a.enabled),
                min,
                max,
            }),
        };
        self.api.update_node_pool(&uuid, &instance_no, &body).await?;

        let pools = self.api.list_node_pools(&uuid).await?;
        let pool = find_pool(pools, &Iid::new("", instance_no))?;
        Ok(node_group_info(&pool, &login_key))
    }

    /// Deletes a non-default pool and waits for it to disappear. Running out
    /// of attempts only warns, the vendor already accepted the delete.
    #[instrument(skip(self))]
    pub async fn remove_pool(&self, cluster: &Iid, node_group: &Iid) -> Result<bool> {
        let (uuid, _, pool) = self.pool_of(cluster, node_group).await?;
        if pool.is_default {
            return Err(Error::validation(format!(
                "node pool {} is the cluster's default node pool and cannot be removed",
                pool.name
            )));
        }
        let instance_no = pool.instance_no;
        self.api
            .delete_node_pool(&uuid, &instance_no.to_string())
            .await?;

        let api = &self.api;
        let uuid = uuid.as_str();
        let waited = poll_until(
            self.polling.node_pool_delete,
            &format!("node pool {} removal", pool.name),
            &self.cancel,
            move || async move {
                match api.list_node_pools(uuid).await {
                    Ok(pools) => Ok(pools.iter().any(|p| p.instance_no == instance_no)),
                    Err(err) => {
                        warn!(error = %err, "could not list node pools, assuming pool still present");
                        Ok(true)
                    }
                }
            },
            |present| !present,
        )
        .await;

        match waited {
            Ok(_) => info!(uuid, pool = %pool.name, "node pool removed"),
            Err(Error::Timeout { attempts, .. }) => {
                warn!(uuid, pool = %pool.name, attempts, "node pool still listed, deletion continues in the background")
            }
            Err(err) => return Err(err),
        }
        Ok(true)
    }
}
