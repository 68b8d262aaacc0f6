//! Makes sure a VPC has the two load-balancer subnets NKS requires.

use common::{
    cluster::Iid,
    poll::{poll_until, PollConfig},
    subnet::plan_subnets,
    Error, Result,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{Subnet, SubnetCreate, VendorApi, Vpc};

pub const LB_SUBNET_PREFIX_LEN: u8 = 26;
pub const PRIVATE_LB_SUBNET: &str = "nks-private-lb-subnet";
pub const PUBLIC_LB_SUBNET: &str = "nks-public-lb-subnet";
pub const DEFAULT_NETWORK_ACL: &str = "default-network-acl";

const SUBNET_TYPE_PRIVATE: &str = "PRIVATE";
const SUBNET_TYPE_PUBLIC: &str = "PUBLIC";
const USAGE_TYPE_LOADBALANCER: &str = "LOADB";
const SUBNET_STATUS_RUN: &str = "RUN";

pub fn is_private_lb(subnet: &Subnet) -> bool {
    subnet.subnet_name.eq_ignore_ascii_case(PRIVATE_LB_SUBNET)
}

pub fn is_public_lb(subnet: &Subnet) -> bool {
    subnet.subnet_name.eq_ignore_ascii_case(PUBLIC_LB_SUBNET)
}

pub struct NetworkEnsurer<'a, A: ?Sized> {
    api: &'a A,
    zone: &'a str,
    poll: PollConfig,
    cancel: &'a CancellationToken,
}

impl<'a, A: VendorApi + ?Sized> NetworkEnsurer<'a, A> {
    pub fn new(
        api: &'a A,
        zone: &'a str,
        poll: PollConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            api,
            zone,
            poll,
            cancel,
        }
    }

    /// Creates whichever load-balancer subnet is missing and returns the VPC
    /// as it looks afterwards. Created subnets are left in place on failure.
    pub async fn ensure_lb_subnets(&self, vpc: &Iid) -> Result<Vpc> {
        let mut current = self.api.get_vpc(vpc).await?;
        let has_private = current.subnets.iter().any(is_private_lb);
        let has_public = current.subnets.iter().any(is_public_lb);
        if has_private && has_public {
            debug!(vpc = %current.vpc_no, "load balancer subnets already present");
            return Ok(current);
        }

        let used: Vec<&str> = current.subnets.iter().map(|s| s.subnet.as_str()).collect();
        let missing = usize::from(!has_private) + usize::from(!has_public);
        let mut free = plan_subnets(
            &current.ipv4_cidr_block,
            used.as_slice(),
            LB_SUBNET_PREFIX_LEN,
            2,
        )?
        .into_iter();
        if free.len() < missing {
            return Err(Error::validation(format!(
                "VPC {} ({}) has no room for {missing} /{LB_SUBNET_PREFIX_LEN} load balancer subnet(s)",
                current.vpc_name, current.ipv4_cidr_block
            )));
        }

        if !has_private {
            if let Some(block) = free.next() {
                self.create_and_wait(
                    &current.vpc_no,
                    PRIVATE_LB_SUBNET,
                    &block.to_string(),
                    SUBNET_TYPE_PRIVATE,
                )
                .await?;
                current = self.api.get_vpc(vpc).await?;
            }
        }
        if !has_public {
            if let Some(block) = free.next() {
                self.create_and_wait(
                    &current.vpc_no,
                    PUBLIC_LB_SUBNET,
                    &block.to_string(),
                    SUBNET_TYPE_PUBLIC,
                )
                .await?;
                current = self.api.get_vpc(vpc).await?;
            }
        }
        Ok(current)
    }

    async fn create_and_wait(
        &self,
        vpc_no: &str,
        name: &str,
        cidr: &str,
        subnet_type: &str,
    ) -> Result<Subnet> {
        let network_acl_no = self.api.default_network_acl(vpc_no).await?;
        let created = self
            .api
            .create_subnet(&SubnetCreate {
                vpc_no: vpc_no.to_owned(),
                zone_code: self.zone.to_owned(),
                subnet_name: name.to_owned(),
                cidr: cidr.to_owned(),
                network_acl_no,
                subnet_type_code: subnet_type.to_owned(),
                usage_type_code: USAGE_TYPE_LOADBALANCER.to_owned(),
            })
            .await?;
        info!(subnet = name, cidr, subnet_no = %created.subnet_no, "subnet requested");

        let api = self.api;
        let subnet_no = created.subnet_no.as_str();
        poll_until(
            self.poll,
            &format!("subnet {name}"),
            self.cancel,
            || api.get_subnet(subnet_no),
            |s| s.subnet_status.code.eq_ignore_ascii_case(SUBNET_STATUS_RUN),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;
    use crate::api::{CommonCode, MockVendorApi};

    fn subnet(no: &str, name: &str, cidr: &str, status: &str) -> Subnet {
        Subnet {
            subnet_no: no.into(),
            vpc_no: "100".into(),
            subnet_name: name.into(),
            subnet: cidr.into(),
            subnet_status: CommonCode {
                code: status.into(),
                code_name: String::new(),
            },
            ..Default::default()
        }
    }

    fn vpc(subnets: Vec<Subnet>) -> Vpc {
        Vpc {
            vpc_no: "100".into(),
            vpc_name: "vpc-01".into(),
            ipv4_cidr_block: "10.0.0.0/16".into(),
            subnets,
        }
    }

    fn fast() -> PollConfig {
        PollConfig::new(3, Duration::from_millis(1))
    }

    /// VPC whose subnet list grows with every create call
    fn stateful_api(initial: Vec<Subnet>, ready: bool) -> (MockVendorApi, Arc<Mutex<Vec<Subnet>>>) {
        let state = Arc::new(Mutex::new(initial));
        let mut api = MockVendorApi::new();

        let s = state.clone();
        api.expect_get_vpc()
            .returning(move |_| Ok(vpc(s.lock().unwrap().clone())));
        api.expect_default_network_acl()
            .returning(|_| Ok("acl-1".into()));
        let s = state.clone();
        api.expect_create_subnet().returning(move |req| {
            let mut subnets = s.lock().unwrap();
            let created = subnet(
                &format!("{}", 200 + subnets.len()),
                &req.subnet_name,
                &req.cidr,
                "INIT",
            );
            subnets.push(created.clone());
            Ok(created)
        });
        let s = state.clone();
        api.expect_get_subnet().returning(move |no| {
            let subnets = s.lock().unwrap();
            let mut found = subnets
                .iter()
                .find(|x| x.subnet_no == no)
                .cloned()
                .ok_or_else(|| Error::not_found("subnet", no))?;
            if ready {
                found.subnet_status.code = "RUN".into();
            }
            Ok(found)
        });
        (api, state)
    }

    #[tokio::test]
    async fn existing_lb_subnets_are_left_alone() {
        let mut api = MockVendorApi::new();
        api.expect_get_vpc().times(1).returning(|_| {
            Ok(vpc(vec![
                subnet("1", PRIVATE_LB_SUBNET, "10.0.255.192/26", "RUN"),
                subnet("2", "NKS-PUBLIC-LB-SUBNET", "10.0.255.128/26", "RUN"),
            ]))
        });
        api.expect_create_subnet().never();

        let cancel = CancellationToken::new();
        let ensurer = NetworkEnsurer::new(&api, "KR-1", fast(), &cancel);
        let out = ensurer.ensure_lb_subnets(&Iid::new("vpc-01", "100")).await.unwrap();
        assert_eq!(out.subnets.len(), 2);
    }

    #[tokio::test]
    async fn creates_both_subnets_from_the_top_of_the_vpc() {
        let (api, state) = stateful_api(vec![subnet("1", "workers", "10.0.1.0/24", "RUN")], true);
        let cancel = CancellationToken::new();
        let ensurer = NetworkEnsurer::new(&api, "KR-1", fast(), &cancel);

        let out = ensurer.ensure_lb_subnets(&Iid::named("vpc-01")).await.unwrap();
        assert_eq!(out.subnets.len(), 3);

        let subnets = state.lock().unwrap();
        let private = subnets.iter().find(|s| is_private_lb(s)).unwrap();
        let public = subnets.iter().find(|s| is_public_lb(s)).unwrap();
        assert_eq!(private.subnet, "10.0.255.192/26");
        assert_eq!(public.subnet, "10.0.255.128/26");
    }

    #[tokio::test]
    async fn only_the_missing_subnet_is_created() {
        let (api, state) = stateful_api(
            vec![subnet("1", PRIVATE_LB_SUBNET, "10.0.255.192/26", "RUN")],
            true,
        );
        let cancel = CancellationToken::new();
        let ensurer = NetworkEnsurer::new(&api, "KR-1", fast(), &cancel);
        ensurer.ensure_lb_subnets(&Iid::named("vpc-01")).await.unwrap();

        let subnets = state.lock().unwrap();
        assert_eq!(subnets.len(), 2);
        assert_eq!(subnets[1].subnet_name, PUBLIC_LB_SUBNET);
        assert_eq!(subnets[1].subnet, "10.0.255.128/26");
    }

    #[tokio::test]
    async fn subnet_that_never_runs_aborts() {
        let (api, state) = stateful_api(vec![], false);
        let cancel = CancellationToken::new();
        let ensurer = NetworkEnsurer::new(&api, "KR-1", fast(), &cancel);

        let err = ensurer.ensure_lb_subnets(&Iid::named("vpc-01")).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 3, .. }));
        // public subnet is never attempted
        assert_eq!(state.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn full_vpc_is_rejected_before_any_create() {
        let mut api = MockVendorApi::new();
        api.expect_get_vpc().returning(|_| {
            let mut v = vpc(vec![subnet("1", "all", "10.0.0.0/16", "RUN")]);
            v.ipv4_cidr_block = "10.0.0.0/16".into();
            Ok(v)
        });
        api.expect_create_subnet().never();

        let cancel = CancellationToken::new();
        let ensurer = NetworkEnsurer::new(&api, "KR-1", fast(), &cancel);
        let err = ensurer.ensure_lb_subnets(&Iid::named("vpc-01")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
