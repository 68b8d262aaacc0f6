//! HTTP implementation of [`VendorApi`] against the NCP API gateway.

use std::time::Instant;

use async_trait::async_trait;
use common::{cluster::Iid, config::Endpoints, Error, Result};
use reqwest::{header::HeaderMap, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    api::{
        Cluster, ClusterInputBody, NodePool, NodePoolCreationBody, NodePoolUpdateBody, OptionItem,
        ProductOption, ServerSpec, Subnet, SubnetCreate, VendorApi, Vpc,
    },
    network::DEFAULT_NETWORK_ACL,
    signature,
};

pub const NKS_ENDPOINT: &str = "https://nks.apigw.ntruss.com/vnks/v2";
pub const VPC_ENDPOINT: &str = "https://ncloud.apigw.ntruss.com/vpc/v2";
pub const SERVER_ENDPOINT: &str = "https://ncloud.apigw.ntruss.com/vserver/v2";

pub struct NcpClient {
    http: reqwest::Client,
    nks: String,
    vpc: String,
    server: String,
    region: String,
    zone: String,
    access_key: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct CreateClusterResponse {
    uuid: String,
}

#[derive(Deserialize)]
struct ClustersResponse {
    #[serde(default)]
    clusters: Vec<Cluster>,
}

#[derive(Deserialize)]
struct KubeconfigResponse {
    #[serde(default)]
    kubeconfig: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodePoolsResponse {
    #[serde(default)]
    node_pool: Vec<NodePool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkAcl {
    #[serde(default)]
    network_acl_no: String,
}

impl NcpClient {
    pub fn new(
        region: &str,
        zone: &str,
        access_key: &str,
        secret_key: &str,
        endpoints: &Endpoints,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(endpoints.timeout())
            .build()
            .map_err(|e| Error::config(format!("could not build HTTP client: {e}")))?;
        let base = |o: &Option<String>, d: &str| {
            o.as_deref().unwrap_or(d).trim_end_matches('/').to_owned()
        };
        Ok(Self {
            http,
            nks: base(&endpoints.nks, NKS_ENDPOINT),
            vpc: base(&endpoints.vpc, VPC_ENDPOINT),
            server: base(&endpoints.server, SERVER_ENDPOINT),
            region: region.to_owned(),
            zone: zone.to_owned(),
            access_key: access_key.to_owned(),
            secret_key: secret_key.to_owned(),
        })
    }

    fn nks_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        build_url(&self.nks, path, params)
    }

    /// VPC and server APIs take the region and a JSON switch on every call
    fn classic_url(&self, base: &str, action: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut all = vec![
            ("regionCode", self.region.as_str()),
            ("responseFormatType", "json"),
        ];
        all.extend_from_slice(params);
        build_url(base, &format!("/{action}"), &all)
    }

    fn headers(&self, method: &Method, url: &Url) -> Result<HeaderMap> {
        let timestamp = signature::timestamp_millis();
        let sig = signature::sign(
            method.as_str(),
            &signed_uri(url),
            &timestamp,
            &self.access_key,
            &self.secret_key,
        )?;
        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("x-ncp-apigw-timestamp", timestamp.as_str()),
            ("x-ncp-iam-access-key", self.access_key.as_str()),
            ("x-ncp-apigw-signature-v2", sig.as_str()),
            ("x-ncp-region_code", self.region.as_str()),
        ] {
            let value = value
                .parse()
                .map_err(|_| Error::config(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String> {
        let start = Instant::now();
        let headers = self.headers(&method, &url)?;
        let mut req = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await.map_err(|e| {
            warn!(operation, error = %e, "request failed");
            Error::api(operation, e)
        })?;
        let status = res.status();
        let text = res.text().await.map_err(|e| Error::api(operation, e))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if status.is_success() {
            debug!(operation, elapsed_ms, "call finished");
            return Ok(text);
        }
        warn!(operation, status = status.as_u16(), elapsed_ms, body = %text, "call rejected");
        Err(status_error(operation, status, text))
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, url: Url) -> Result<T> {
        let text = self.send::<()>(operation, Method::GET, url, None).await?;
        parse(operation, &text)
    }

    async fn classic_list<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
        list: &str,
    ) -> Result<Vec<T>> {
        let text = self.send::<()>(operation, Method::GET, url, None).await?;
        unwrap_list(operation, &text, list)
    }

    async fn subnets_of(&self, vpc_no: &str) -> Result<Vec<Subnet>> {
        let url = self.classic_url(&self.vpc, "getSubnetList", &[("vpcNo", vpc_no)])?;
        self.classic_list("getSubnetList", url, "subnetList").await
    }
}

fn build_url(base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url> {
    let raw = format!("{base}{path}");
    let url = if params.is_empty() {
        Url::parse(&raw)
    } else {
        Url::parse_with_params(&raw, params)
    };
    url.map_err(|e| Error::config(format!("invalid endpoint {raw}: {e}")))
}

/// Path and query, the part of the URL covered by the gateway signature
fn signed_uri(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_owned(),
    }
}

fn status_error(operation: &str, status: StatusCode, body: String) -> Error {
    if status == StatusCode::CONFLICT {
        return Error::NotReady(format!("{operation}: {body}"));
    }
    Error::Api {
        operation: operation.to_owned(),
        status: Some(status.as_u16()),
        message: body,
    }
}

fn parse<T: DeserializeOwned>(operation: &str, text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::serialization(format!("{operation} response: {e}")))
}

/// VPC and server responses wrap their payload as
/// `{"<action>Response": {"<list>": [...]}}`.
fn unwrap_list<T: DeserializeOwned>(operation: &str, text: &str, list: &str) -> Result<Vec<T>> {
    let root: Value = parse(operation, text)?;
    let items = root
        .as_object()
        .and_then(|o| o.values().next())
        .and_then(|inner| inner.get(list))
        .cloned()
        .unwrap_or(Value::Array(vec![]));
    serde_json::from_value(items)
        .map_err(|e| Error::serialization(format!("{operation} {list}: {e}")))
}

#[async_trait]
impl VendorApi for NcpClient {
    async fn get_vpc(&self, vpc: &Iid) -> Result<Vpc> {
        let found: Option<Vpc> = if !vpc.system_id.is_empty() {
            let url = self.classic_url(&self.vpc, "getVpcDetail", &[("vpcNo", vpc.system_id.as_str())])?;
            let vpcs: Vec<Vpc> = self.classic_list("getVpcDetail", url, "vpcList").await?;
            vpcs.into_iter().next()
        } else {
            let url = self.classic_url(&self.vpc, "getVpcList", &[("vpcName", vpc.name_id.as_str())])?;
            let vpcs: Vec<Vpc> = self.classic_list("getVpcList", url, "vpcList").await?;
            vpcs.into_iter().find(|v| v.vpc_name == vpc.name_id)
        };
        let mut found = found.ok_or_else(|| Error::not_found("VPC", vpc.to_string()))?;
        found.subnets = self.subnets_of(&found.vpc_no).await?;
        Ok(found)
    }

    async fn get_subnet(&self, subnet_no: &str) -> Result<Subnet> {
        let url = self.classic_url(&self.vpc, "getSubnetDetail", &[("subnetNo", subnet_no)])?;
        let subnets: Vec<Subnet> = self
            .classic_list("getSubnetDetail", url, "subnetList")
            .await?;
        subnets
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("subnet", subnet_no))
    }

    async fn default_network_acl(&self, vpc_no: &str) -> Result<String> {
        let url = self.classic_url(
            &self.vpc,
            "getNetworkAclList",
            &[("vpcNo", vpc_no), ("networkAclName", DEFAULT_NETWORK_ACL)],
        )?;
        let acls: Vec<NetworkAcl> = self
            .classic_list("getNetworkAclList", url, "networkAclList")
            .await?;
        acls.into_iter()
            .map(|a| a.network_acl_no)
            .find(|no| !no.is_empty())
            .ok_or_else(|| Error::not_found("network ACL", DEFAULT_NETWORK_ACL))
    }

    async fn create_subnet(&self, req: &SubnetCreate) -> Result<Subnet> {
        let url = self.classic_url(
            &self.vpc,
            "createSubnet",
            &[
                ("zoneCode", req.zone_code.as_str()),
                ("vpcNo", req.vpc_no.as_str()),
                ("subnetName", req.subnet_name.as_str()),
                ("subnet", req.cidr.as_str()),
                ("networkAclNo", req.network_acl_no.as_str()),
                ("subnetTypeCode", req.subnet_type_code.as_str()),
                ("usageTypeCode", req.usage_type_code.as_str()),
            ],
        )?;
        let subnets: Vec<Subnet> = self.classic_list("createSubnet", url, "subnetList").await?;
        subnets.into_iter().next().ok_or_else(|| {
            Error::api(
                "createSubnet",
                format!("no subnet returned for {} ({})", req.subnet_name, req.cidr),
            )
        })
    }

    async fn server_spec(&self, spec_code: &str) -> Result<Option<ServerSpec>> {
        let url = self.classic_url(
            &self.server,
            "getServerSpecList",
            &[("zoneCode", self.zone.as_str()), ("serverSpecCodeList.1", spec_code)],
        )?;
        let specs: Vec<ServerSpec> = self
            .classic_list("getServerSpecList", url, "serverSpecList")
            .await?;
        Ok(specs.into_iter().next())
    }

    async fn k8s_versions(&self, hypervisor: &str) -> Result<Vec<OptionItem>> {
        let url = self.nks_url("/option/version", &[("hypervisorCode", hypervisor)])?;
        self.get("list versions", url).await
    }

    async fn server_images(&self, hypervisor: &str) -> Result<Vec<OptionItem>> {
        let url = self.nks_url("/option/server-image", &[("hypervisorCode", hypervisor)])?;
        self.get("list server images", url).await
    }

    async fn server_products(
        &self,
        hypervisor: &str,
        software_code: &str,
        zone: &str,
    ) -> Result<Vec<ProductOption>> {
        let url = self.nks_url(
            "/option/server-product-code",
            &[
                ("softwareCode", software_code),
                ("zoneCode", zone),
                ("hypervisorCode", hypervisor),
            ],
        )?;
        self.get("list server products", url).await
    }

    async fn create_cluster(&self, body: &ClusterInputBody) -> Result<String> {
        let url = self.nks_url("/clusters", &[])?;
        let text = self
            .send("create cluster", Method::POST, url, Some(body))
            .await?;
        let res: CreateClusterResponse = parse("create cluster", &text)?;
        Ok(res.uuid)
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let url = self.nks_url("/clusters", &[])?;
        let res: ClustersResponse = self.get("list clusters", url).await?;
        Ok(res.clusters)
    }

    async fn delete_cluster(&self, uuid: &str) -> Result<()> {
        let url = self.nks_url(&format!("/clusters/{uuid}"), &[])?;
        self.send::<()>("delete cluster", Method::DELETE, url, None)
            .await?;
        Ok(())
    }

    async fn upgrade_cluster(&self, uuid: &str, version: &str) -> Result<()> {
        let url = self.nks_url(
            &format!("/clusters/{uuid}/upgrade"),
            &[("k8sVersion", version)],
        )?;
        self.send::<()>("upgrade cluster", Method::PATCH, url, None)
            .await?;
        Ok(())
    }

    async fn kubeconfig(&self, uuid: &str) -> Result<String> {
        let url = self.nks_url(&format!("/clusters/{uuid}/kubeconfig"), &[])?;
        let res: KubeconfigResponse = self.get("get kubeconfig", url).await?;
        if res.kubeconfig.is_empty() {
            return Err(Error::api("get kubeconfig", "empty kubeconfig in response"));
        }
        Ok(res.kubeconfig)
    }

    async fn list_node_pools(&self, uuid: &str) -> Result<Vec<NodePool>> {
        let url = self.nks_url(&format!("/clusters/{uuid}/node-pool"), &[])?;
        let res: NodePoolsResponse = self.get("list node pools", url).await?;
        Ok(res.node_pool)
    }

    async fn create_node_pool(&self, uuid: &str, body: &NodePoolCreationBody) -> Result<()> {
        let url = self.nks_url(&format!("/clusters/{uuid}/node-pool"), &[])?;
        self.send("create node pool", Method::POST, url, Some(body))
            .await?;
        Ok(())
    }

    async fn update_node_pool(
        &self,
        uuid: &str,
        instance_no: &str,
        body: &NodePoolUpdateBody,
    ) -> Result<()> {
        let url = self.nks_url(&format!("/clusters/{uuid}/node-pool/{instance_no}"), &[])?;
        self.send("update node pool", Method::PATCH, url, Some(body))
            .await?;
        Ok(())
    }

    async fn delete_node_pool(&self, uuid: &str, instance_no: &str) -> Result<()> {
        let url = self.nks_url(&format!("/clusters/{uuid}/node-pool/{instance_no}"), &[])?;
        self.send::<()>("delete node pool", Method::DELETE, url, None)
            .await?;
        Ok(())
    }
}
