//! Cluster lifecycle on NKS: create with compensating delete, read, list,
//! delete, upgrade and wait.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, Utc};
use common::{
    cluster::{
        AccessInfo, ClusterInfo, ClusterOptions, ClusterRequest, ClusterStatus, Iid, NetworkInfo,
        NodeGroupInfo, NodeGroupRequest,
    },
    config::{ClusterDefaults, Config, Polling},
    poll::poll_until,
    provider::ClusterProvider,
    Error, Result,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    api::{Cluster, ClusterInputBody, NodePoolDto, VendorApi, Vpc},
    capability::{CapabilityResolver, Hypervisor},
    kubeconfig::CredentialBuilder,
    network::{is_private_lb, is_public_lb, NetworkEnsurer, PRIVATE_LB_SUBNET, PUBLIC_LB_SUBNET},
    node_group::{autoscale_of, node_group_info, resolve_codes, server_spec_of, storage_size},
    status::cluster_status,
    validate::{validate_cluster_request, validate_version},
};

pub const KUBECONFIG_PENDING: &str =
    "Kubeconfig will be available after cluster reaches RUNNING status";

pub struct NcpClusterHandler<A> {
    pub(crate) api: A,
    pub(crate) region: String,
    pub(crate) zone: String,
    access_key: String,
    secret_key: String,
    defaults: ClusterDefaults,
    pub(crate) hypervisor: Hypervisor,
    pub(crate) polling: Polling,
    pub(crate) cancel: CancellationToken,
}

impl<A: VendorApi> NcpClusterHandler<A> {
    pub fn new(
        api: A,
        config: &Config,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            api,
            region: config.region.region.clone(),
            zone: config.region.zone.clone(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            hypervisor: Hypervisor::from_str(&config.cluster.hypervisor)?,
            defaults: config.cluster.clone(),
            polling: config.polling.clone(),
            cancel: CancellationToken::new(),
        })
    }

    /// Token checked by every polling loop of this handler
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn hypervisor_for(&self, options: &ClusterOptions) -> Result<Hypervisor> {
        match options.hypervisor.as_deref() {
            Some(h) => Hypervisor::from_str(h),
            None => Ok(self.hypervisor),
        }
    }

    /// Hypervisor a running cluster was created with
    pub(crate) fn cluster_hypervisor(&self, cluster: &Cluster) -> Hypervisor {
        cluster
            .hypervisor_code
            .as_deref()
            .and_then(|h| Hypervisor::from_str(h).ok())
            .unwrap_or(self.hypervisor)
    }

    fn credentials(&self) -> CredentialBuilder<'_, A> {
        CredentialBuilder::new(&self.api, &self.region, &self.access_key, &self.secret_key)
    }

    #[instrument(skip_all, fields(cluster = %req.name))]
    pub async fn create(&self, req: &ClusterRequest) -> Result<ClusterInfo> {
        validate_cluster_request(req)?;
        let hypervisor = self.hypervisor_for(&req.options)?;
        let versions = self.api.k8s_versions(hypervisor.code()).await?;
        validate_version(&req.version, &versions)?;

        let vpc = NetworkEnsurer::new(
            &self.api,
            &self.zone,
            self.polling.subnet_ready,
            &self.cancel,
        )
        .ensure_lb_subnets(&req.network.vpc)
        .await?;

        let resolver = CapabilityResolver::new(&self.api, hypervisor, &self.zone);
        let mut node_pool = Vec::with_capacity(req.node_groups.len());
        for ng in &req.node_groups {
            let codes = resolve_codes(&resolver, ng).await?;
            debug!(node_group = %ng.name, ?codes, "node group resolved");
            node_pool.push(NodePoolDto {
                name: ng.name.clone(),
                node_count: ng.desired,
                software_code: codes.software_code,
                server_spec_code: server_spec_of(ng),
                product_code: codes.product_code,
                storage_size: Some(storage_size(ng.root_disk_size)),
                autoscale: autoscale_of(ng),
            });
        }

        let body = self.build_request(req, &vpc, hypervisor, node_pool)?;
        let uuid = self.api.create_cluster(&body).await?;
        info!(uuid = %uuid, "cluster creation requested");

        // from here on the vendor holds a cluster that must not be leaked
        match self.describe_uuid(&uuid).await {
            Ok(info) => Ok(info),
            Err(err) => Err(self.roll_back(&uuid, err).await),
        }
    }

    /// Issues a single delete for `uuid` and wraps the failure that caused it.
    /// A failing delete is only logged.
    async fn roll_back(&self, uuid: &str, cause: Error) -> Error {
        warn!(uuid, error = %cause, "cluster creation failed, deleting cluster");
        let deleted = match self.api.delete_cluster(uuid).await {
            Ok(()) => true,
            Err(err) => {
                warn!(uuid, error = %err, "rollback delete failed, cluster must be removed manually");
                false
            }
        };
        Error::RolledBack {
            cluster_id: uuid.to_owned(),
            deleted,
            source: Box::new(cause),
        }
    }

    fn build_request(
        &self,
        req: &ClusterRequest,
        vpc: &Vpc,
        hypervisor: Hypervisor,
        node_pool: Vec<NodePoolDto>,
    ) -> Result<ClusterInputBody> {
        let lb_private = vpc
            .subnets
            .iter()
            .find(|s| is_private_lb(s))
            .ok_or_else(|| Error::not_found("subnet", PRIVATE_LB_SUBNET))?;
        let lb_public = vpc
            .subnets
            .iter()
            .find(|s| is_public_lb(s))
            .ok_or_else(|| Error::not_found("subnet", PUBLIC_LB_SUBNET))?;

        let workers: Vec<_> = vpc
            .subnets
            .iter()
            .filter(|s| !is_private_lb(s) && !is_public_lb(s))
            .filter(|s| {
                let iid = Iid::new(s.subnet_name.as_str(), s.subnet_no.as_str());
                req.network.subnets.iter().any(|r| r.same_as(&iid))
            })
            .collect();
        if workers.is_empty() {
            return Err(Error::lookup(
                format!("none of the requested subnets exist in VPC {}", vpc.vpc_name),
                vpc.subnets
                    .iter()
                    .filter(|s| !is_private_lb(s) && !is_public_lb(s))
                    .map(|s| format!("{}({})", s.subnet_name, s.subnet_no))
                    .collect(),
            ));
        }

        let login_key = req
            .node_groups
            .first()
            .map(|g| key_name(&g.key_pair))
            .unwrap_or_default();

        Ok(ClusterInputBody {
            name: req.name.clone(),
            cluster_type: req
                .options
                .cluster_type
                .clone()
                .unwrap_or_else(|| self.defaults.cluster_type.clone()),
            k8s_version: req.version.clone(),
            login_key_name: login_key,
            region_code: self.region.clone(),
            zone_code: self.zone.clone(),
            hypervisor_code: hypervisor.code().to_owned(),
            public_network: req
                .options
                .public_network
                .unwrap_or(self.defaults.public_network),
            vpc_no: parse_no("VPC", &vpc.vpc_no)?,
            subnet_no_list: workers
                .iter()
                .map(|s| parse_no("subnet", &s.subnet_no))
                .collect::<Result<_>>()?,
            lb_private_subnet_no: parse_no("subnet", &lb_private.subnet_no)?,
            lb_public_subnet_no: parse_no("subnet", &lb_public.subnet_no)?,
            node_pool,
        })
    }

    /// Finds a cluster by uuid, or by name when the uuid is not known
    pub(crate) async fn find_cluster(&self, iid: &Iid) -> Result<Cluster> {
        let clusters = self.api.list_clusters().await?;
        clusters
            .into_iter()
            .find(|c| {
                if iid.system_id.is_empty() {
                    c.name == iid.name_id
                } else {
                    c.uuid == iid.system_id
                }
            })
            .ok_or_else(|| Error::not_found("cluster", iid.to_string()))
    }

    async fn describe_uuid(&self, uuid: &str) -> Result<ClusterInfo> {
        let cluster = self.find_cluster(&Iid::new("", uuid)).await?;
        Ok(self.describe(cluster).await)
    }

    async fn describe(&self, c: Cluster) -> ClusterInfo {
        let kubeconfig = self.access_kubeconfig(&c).await;
        let login_key = c.login_key_name.clone().unwrap_or_default();

        let mut kv = BTreeMap::new();
        kv.insert("Status".to_owned(), c.status.clone());
        kv.insert("Uuid".to_owned(), c.uuid.clone());
        let optional = [
            ("VpcNo", c.vpc_no.map(|n| n.to_string())),
            ("Endpoint", c.endpoint.clone()),
            ("K8sVersion", c.k8s_version.clone()),
            ("AcgName", c.acg_name.clone()),
            ("AcgNo", c.acg_no.map(|n| n.to_string())),
            ("ClusterType", c.cluster_type.clone()),
            ("HypervisorCode", c.hypervisor_code.clone()),
            ("ZoneCode", c.zone_code.clone()),
        ];
        for (k, v) in optional {
            if let Some(v) = v {
                kv.insert(k.to_owned(), v);
            }
        }

        ClusterInfo {
            iid: Iid::new(c.name.as_str(), c.uuid.as_str()),
            version: c.k8s_version.clone().unwrap_or_default(),
            created_at: c.created_at.as_deref().and_then(parse_created_at),
            status: cluster_status(&c.status),
            access: AccessInfo {
                endpoint: c.endpoint.clone().unwrap_or_default(),
                kubeconfig,
            },
            network: NetworkInfo {
                vpc: Iid::new(
                    c.vpc_name.clone().unwrap_or_default(),
                    c.vpc_no.map(|n| n.to_string()).unwrap_or_default(),
                ),
                subnets: c
                    .subnet_no_list
                    .iter()
                    .map(|n| Iid::new("", n.to_string()))
                    .collect(),
                security_groups: c
                    .acg_no
                    .map(|n| {
                        vec![Iid::new(
                            c.acg_name.clone().unwrap_or_default(),
                            n.to_string(),
                        )]
                    })
                    .unwrap_or_default(),
            },
            node_groups: c
                .node_pool
                .iter()
                .map(|p| node_group_info(p, &login_key))
                .collect(),
            key_values: kv,
        }
    }

    /// Kubeconfig for the read path. A cluster still being created gets a
    /// placeholder instead of an error.
    async fn access_kubeconfig(&self, c: &Cluster) -> String {
        match self.credentials().build(&c.uuid, &c.name).await {
            Ok(kubeconfig) => kubeconfig,
            Err(Error::NotReady(_)) => KUBECONFIG_PENDING.to_owned(),
            Err(err) => {
                warn!(uuid = %c.uuid, error = %err, "could not build kubeconfig");
                format!("Kubeconfig is not available: {err}")
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, iid: &Iid) -> Result<ClusterInfo> {
        let cluster = self.find_cluster(iid).await?;
        Ok(self.describe(cluster).await)
    }

    pub async fn list(&self) -> Result<Vec<ClusterInfo>> {
        let clusters = self.api.list_clusters().await?;
        let mut out = Vec::with_capacity(clusters.len());
        for c in clusters {
            out.push(self.describe(c).await);
        }
        Ok(out)
    }

    pub async fn list_iid(&self) -> Result<Vec<Iid>> {
        let clusters = self.api.list_clusters().await?;
        Ok(clusters
            .into_iter()
            .map(|c| Iid::new(c.name, c.uuid))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, iid: &Iid) -> Result<bool> {
        if iid.system_id.is_empty() {
            return Err(Error::validation("cluster system id is required for delete"));
        }
        self.api.delete_cluster(&iid.system_id).await?;
        info!(uuid = %iid.system_id, "cluster deletion requested");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn upgrade(&self, iid: &Iid, version: &str) -> Result<ClusterInfo> {
        let cluster = self.find_cluster(iid).await?;
        let hypervisor = self.cluster_hypervisor(&cluster);
        let versions = self.api.k8s_versions(hypervisor.code()).await?;
        validate_version(version, &versions)?;

        self.api.upgrade_cluster(&cluster.uuid, version).await?;
        info!(uuid = %cluster.uuid, version, "cluster upgrade requested");
        self.describe_uuid(&cluster.uuid).await
    }

    #[instrument(skip(self))]
    pub async fn wait_for(&self, iid: &Iid, target: ClusterStatus) -> Result<ClusterInfo> {
        let cluster = poll_until(
            self.polling.cluster_ready,
            &format!("cluster {iid} to become {target}"),
            &self.cancel,
            || self.find_cluster(iid),
            |c| cluster_status(&c.status) == target,
        )
        .await?;
        Ok(self.describe(cluster).await)
    }

    pub async fn kubeconfig(&self, iid: &Iid) -> Result<String> {
        let cluster = self.find_cluster(iid).await?;
        self.credentials().build(&cluster.uuid, &cluster.name).await
    }
}

/// Login key name NKS expects; falls back to the id when no name is known
fn key_name(key: &Iid) -> String {
    if key.name_id.is_empty() {
        key.system_id.clone()
    } else {
        key.name_id.clone()
    }
}

fn parse_no(kind: &str, raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| Error::serialization(format!("{kind} number '{raw}' is not numeric")))
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| debug!(raw, error = %e, "unparseable creation time"))
        .ok()
}

#[async_trait::async_trait]
impl<A: VendorApi> ClusterProvider for NcpClusterHandler<A> {
    fn name(&self) -> String {
        crate::PROVIDER_NAME.to_owned()
    }

    async fn create_cluster(&self, req: &ClusterRequest) -> Result<ClusterInfo> {
        self.create(req).await
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>> {
        self.list().await
    }

    async fn get_cluster(&self, iid: &Iid) -> Result<ClusterInfo> {
        self.get(iid).await
    }

    async fn delete_cluster(&self, iid: &Iid) -> Result<bool> {
        self.delete(iid).await
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        NcpClusterHandler::list_iid(self).await
    }

    async fn upgrade_cluster(&self, iid: &Iid, version: &str) -> Result<ClusterInfo> {
        self.upgrade(iid, version).await
    }

    async fn wait_for_cluster(&self, iid: &Iid, status: ClusterStatus) -> Result<ClusterInfo> {
        self.wait_for(iid, status).await
    }

    async fn cluster_kubeconfig(&self, iid: &Iid) -> Result<String> {
        self.kubeconfig(iid).await
    }

    async fn add_node_group(
        &self,
        cluster: &Iid,
        req: &NodeGroupRequest,
    ) -> Result<NodeGroupInfo> {
        self.add_pool(cluster, req).await
    }

    async fn list_node_groups(&self, cluster: &Iid) -> Result<Vec<NodeGroupInfo>> {
        self.list_pools(cluster).await
    }

    async fn get_node_group(
        &self,
        cluster: &Iid,
        node_group: &Iid,
    ) -> Result<NodeGroupInfo> {
        self.get_pool(cluster, node_group).await
    }

    async fn set_node_group_autoscaling(
        &self,
        cluster: &Iid,
        node_group: &Iid,
        on: bool,
    ) -> Result<bool> {
        self.set_pool_autoscaling(cluster, node_group, on).await
    }

    async fn change_node_group_scaling(
        &self,
        cluster: &Iid,
        node_group: &Iid,
        desired: u32,
        min: u32,
        max: u32,
    ) -> Result<NodeGroupInfo> {
        self.scale_pool(cluster, node_group, desired, min, max).await
    }

    async fn remove_node_group(&self, cluster: &Iid, node_group: &Iid) -> Result<bool> {
        self.remove_pool(cluster, node_group).await
    }
}
