//! Request checks that run before any vendor call.

use common::{
    cluster::{ClusterRequest, Iid, NodeGroupRequest},
    Error, Result,
};
use regex::Regex;

use crate::api::OptionItem;

lazy_static::lazy_static! {
    static ref NAME_PATTERN: Regex = Regex::new(r"^[a-z][a-z0-9-]{1,28}[a-z0-9]$").unwrap();
}

/// NKS resource names: 3 to 30 characters of lowercase letters, digits and
/// `-`, starting with a letter and not ending with `-`.
pub fn is_valid_name(s: &str) -> bool {
    NAME_PATTERN.is_match(s)
}

/// Static checks on a create request: required fields, subnet and security
/// group presence and node group rules.
pub fn validate_cluster_request(req: &ClusterRequest) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(Error::validation("cluster name is required"));
    }
    if !is_valid_name(&req.name) {
        return Err(Error::validation(format!(
            "cluster name '{}' must be 3-30 lowercase letters, digits or '-' and start with a letter",
            req.name
        )));
    }
    if req.version.trim().is_empty() {
        return Err(Error::validation("Kubernetes version is required"));
    }
    if req.network.vpc.is_empty() {
        return Err(Error::validation("VPC reference is required"));
    }
    if req.network.subnets.is_empty() {
        return Err(Error::validation("at least one subnet must be specified"));
    }
    if req.network.security_groups.is_empty() {
        return Err(Error::validation(
            "at least one security group must be specified",
        ));
    }
    validate_node_groups(&req.node_groups)
}

/// Node groups of one cluster must share the key pair of the first group,
/// since NKS attaches the login key to the cluster.
pub fn validate_node_groups(groups: &[NodeGroupRequest]) -> Result<()> {
    let Some(first) = groups.first() else {
        return Err(Error::validation("at least one node group must be specified"));
    };
    if first.key_pair.is_empty() {
        return Err(Error::validation(format!(
            "node group {}: key pair is required",
            first.name
        )));
    }
    for ng in groups {
        validate_node_group(ng)?;
        if !same_key_pair(&first.key_pair, &ng.key_pair) {
            return Err(Error::validation(format!(
                "node group {}: key pair {} differs from {}; all node groups must share one key pair",
                ng.name, ng.key_pair, first.key_pair
            )));
        }
    }
    Ok(())
}

/// Compares on every field `other` sets; an empty reference never matches.
fn same_key_pair(first: &Iid, other: &Iid) -> bool {
    match (other.name_id.is_empty(), other.system_id.is_empty()) {
        (false, false) => other.name_id == first.name_id && other.system_id == first.system_id,
        (false, true) => other.name_id == first.name_id,
        (true, false) => other.system_id == first.system_id,
        (true, true) => false,
    }
}

pub fn validate_node_group(ng: &NodeGroupRequest) -> Result<()> {
    let fail = |msg: &str| Err(Error::validation(format!("node group {}: {msg}", ng.name)));
    if ng.name.trim().is_empty() {
        return Err(Error::validation("node group name is required"));
    }
    if !is_valid_name(&ng.name) {
        return fail("name must be 3-30 lowercase letters, digits or '-' and start with a letter");
    }
    if ng.vm_spec_name.trim().is_empty() && ng.product_code.is_none() {
        return fail("VM spec name is required unless a product code is given");
    }
    if ng.desired < 1 {
        return fail("desired node count must be at least 1");
    }
    if ng.on_auto_scaling && ng.min < 1 {
        return fail("min node count must be at least 1 when autoscaling is on");
    }
    if ng.min > 0 && !ng.on_auto_scaling {
        return fail("min node count requires autoscaling to be on");
    }
    if ng.min > 0 && ng.min > ng.max {
        return fail("max node count must not be smaller than min node count");
    }
    if ng.min > 0 && ng.desired < ng.min {
        return fail("desired node count must not be smaller than min node count");
    }
    Ok(())
}

/// Case-insensitive check of `version` against the vendor's current list
pub fn validate_version(version: &str, supported: &[OptionItem]) -> Result<()> {
    if supported
        .iter()
        .any(|v| !v.value.is_empty() && v.value.eq_ignore_ascii_case(version))
    {
        return Ok(());
    }
    Err(Error::lookup(
        format!("unsupported Kubernetes version {version}"),
        supported
            .iter()
            .filter(|v| !v.value.is_empty())
            .map(|v| v.value.clone())
            .collect(),
    ))
}

pub fn validate_scaling(desired: u32, min: u32, max: u32) -> Result<()> {
    if min < 1 {
        return Err(Error::validation("min node count must be at least 1"));
    }
    if max < 1 {
        return Err(Error::validation("max node count must be at least 1"));
    }
    if min > max {
        return Err(Error::validation(
            "max node count must not be smaller than min node count",
        ));
    }
    if desired < min || desired > max {
        return Err(Error::validation(format!(
            "desired node count {desired} must be between {min} and {max}"
        )));
    }
    Ok(())
}
