//! Resolves a VM spec name and an image reference into the software and
//! product codes NKS expects for a node pool.

use std::{fmt, str::FromStr};

use common::{Error, Result};
use tracing::debug;

use crate::api::{OptionItem, ProductOption, VendorApi};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Hypervisor {
    #[default]
    Xen,
    Kvm,
}

impl Hypervisor {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Xen => "XEN",
            Self::Kvm => "KVM",
        }
    }

    /// Image label prefix used when a node group asks for the default image
    pub fn default_image(&self) -> &'static str {
        match self {
            Self::Xen => "ubuntu-20",
            Self::Kvm => "ubuntu-22.04-nks",
        }
    }
}

impl FromStr for Hypervisor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xen" => Ok(Self::Xen),
            "kvm" => Ok(Self::Kvm),
            other => Err(Error::config(format!(
                "unknown hypervisor '{other}', expected xen or kvm"
            ))),
        }
    }
}

impl fmt::Display for Hypervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Codes for one node pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCodes {
    pub software_code: String,
    pub product_code: String,
}

pub struct CapabilityResolver<'a, A: ?Sized> {
    api: &'a A,
    hypervisor: Hypervisor,
    zone: &'a str,
}

impl<'a, A: VendorApi + ?Sized> CapabilityResolver<'a, A> {
    pub fn new(api: &'a A, hypervisor: Hypervisor, zone: &'a str) -> Self {
        Self {
            api,
            hypervisor,
            zone,
        }
    }

    pub async fn resolve(&self, vm_spec: &str, image: Option<&str>) -> Result<NodeCodes> {
        let software_code = self.software_code(image).await?;
        let product_code = self.product_code(vm_spec, &software_code).await?;
        Ok(NodeCodes {
            software_code,
            product_code,
        })
    }

    /// Empty or `default` images pick the hypervisor's default label
    pub async fn software_code(&self, image: Option<&str>) -> Result<String> {
        let wanted = match image.map(str::trim) {
            None | Some("") => self.hypervisor.default_image(),
            Some(name) if name.eq_ignore_ascii_case("default") => self.hypervisor.default_image(),
            Some(name) => name,
        };
        let images = self.api.server_images(self.hypervisor.code()).await?;
        match_image(&images, wanted)
    }

    pub async fn product_code(&self, vm_spec: &str, software_code: &str) -> Result<String> {
        if vm_spec.is_empty() {
            return Err(Error::validation("VM spec name is empty"));
        }
        if software_code.is_empty() {
            return Err(Error::validation("software code is empty"));
        }
        let spec = match self.api.server_spec(vm_spec).await? {
            Some(spec) => spec,
            None => {
                return Err(Error::lookup(
                    format!("VM spec {vm_spec} does not exist"),
                    vec![],
                ))
            }
        };
        let memory_gb = u32::try_from(spec.memory_size / GIB).unwrap_or(u32::MAX);
        let products = self
            .api
            .server_products(self.hypervisor.code(), software_code, self.zone)
            .await?;
        let code = match_product(&products, vm_spec, spec.cpu_count, memory_gb)?;
        debug!(vm_spec, software_code, product_code = %code, "resolved product code");
        Ok(code)
    }
}

/// Case-insensitive substring match over image labels
pub fn match_image(images: &[OptionItem], wanted: &str) -> Result<String> {
    let needle = wanted.to_lowercase();
    images
        .iter()
        .find(|i| i.label.to_lowercase().contains(&needle))
        .map(|i| i.value.clone())
        .ok_or_else(|| {
            Error::lookup(
                format!("no server image matching '{wanted}'"),
                images
                    .iter()
                    .map(|i| format!("{}[Code={}]", i.label, i.value))
                    .collect(),
            )
        })
}

/// Exact CPU and memory match. Several candidates sharing the same code
/// count as one; distinct codes are ambiguous.
pub fn match_product(
    products: &[ProductOption],
    vm_spec: &str,
    cpu: u32,
    memory_gb: u32,
) -> Result<String> {
    let mut codes: Vec<&str> = products
        .iter()
        .filter(|p| !p.value.is_empty())
        .filter(|p| {
            p.detail.as_ref().is_some_and(|d| {
                d.cpu_count == Some(cpu) && d.memory_size_gb == Some(memory_gb)
            })
        })
        .map(|p| p.value.as_str())
        .collect();
    codes.sort_unstable();
    codes.dedup();

    if let [code] = codes.as_slice() {
        return Ok((*code).to_owned());
    }

    let reason = if codes.is_empty() {
        "no matching"
    } else {
        "ambiguous"
    };
    Err(Error::lookup(
        format!("{reason} NKS product code for VM spec {vm_spec} (CPU:{cpu}, Mem:{memory_gb}GB)"),
        products.iter().filter(|p| !p.value.is_empty()).map(describe_product).collect(),
    ))
}

fn describe_product(p: &ProductOption) -> String {
    let field = |v: Option<u32>| v.map_or_else(|| "?".to_owned(), |v| v.to_string());
    let (cpu, mem) = match &p.detail {
        Some(d) => (field(d.cpu_count), field(d.memory_size_gb)),
        None => ("?".to_owned(), "?".to_owned()),
    };
    format!("{} (CPU:{cpu}, Mem:{mem}GB)", p.value)
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::api::{MockVendorApi, ProductDetail, ServerSpec};

    fn image(label: &str, value: &str) -> OptionItem {
        OptionItem {
            label: label.into(),
            value: value.into(),
        }
    }

    fn product(code: &str, cpu: u32, mem: u32) -> ProductOption {
        ProductOption {
            label: code.into(),
            value: code.into(),
            detail: Some(ProductDetail {
                cpu_count: Some(cpu),
                memory_size_gb: Some(mem),
                product_code: None,
            }),
        }
    }

    fn images() -> Vec<OptionItem> {
        vec![
            image("ubuntu-20.04-64-server", "SW.UBNTU.2004"),
            image("ubuntu-22.04-nks", "SW.UBNTU.2204.NKS"),
        ]
    }

    #[test]
    fn image_match_is_case_insensitive_substring() {
        assert_eq!(match_image(&images(), "UBUNTU-22.04").unwrap(), "SW.UBNTU.2204.NKS");
        assert_eq!(match_image(&images(), "20.04").unwrap(), "SW.UBNTU.2004");
    }

    #[test]
    fn image_miss_lists_all_labels() {
        match match_image(&images(), "centos").unwrap_err() {
            Error::Lookup { what, candidates } => {
                assert!(what.contains("centos"));
                assert_eq!(
                    candidates,
                    vec![
                        "ubuntu-20.04-64-server[Code=SW.UBNTU.2004]",
                        "ubuntu-22.04-nks[Code=SW.UBNTU.2204.NKS]"
                    ]
                );
            }
            e => panic!("Expected Lookup, got {e:?}"),
        }
    }

    #[test]
    fn product_needs_exact_cpu_and_memory() {
        let products = vec![product("P-2-4", 2, 4), product("P-2-8", 2, 8), product("P-4-8", 4, 8)];
        assert_eq!(match_product(&products, "s2-g2", 2, 8).unwrap(), "P-2-8");

        match match_product(&products, "s2-g3", 2, 16).unwrap_err() {
            Error::Lookup { candidates, .. } => {
                assert_eq!(
                    candidates,
                    vec![
                        "P-2-4 (CPU:2, Mem:4GB)",
                        "P-2-8 (CPU:2, Mem:8GB)",
                        "P-4-8 (CPU:4, Mem:8GB)"
                    ]
                );
            }
            e => panic!("Expected Lookup, got {e:?}"),
        }
    }

    #[test]
    fn ambiguous_products_are_rejected() {
        let products = vec![product("P-A", 2, 8), product("P-B", 2, 8)];
        let err = match_product(&products, "s2-g2", 2, 8).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
        assert!(err.to_string().contains("P-A (CPU:2, Mem:8GB), P-B (CPU:2, Mem:8GB)"));
    }

    #[test]
    fn duplicate_entries_of_one_code_still_match() {
        let products = vec![product("P-A", 2, 8), product("P-A", 2, 8)];
        assert_eq!(match_product(&products, "s2-g2", 2, 8).unwrap(), "P-A");
    }

    #[tokio::test]
    async fn default_image_depends_on_hypervisor() {
        let mut api = MockVendorApi::new();
        api.expect_server_images()
            .with(eq("KVM"))
            .returning(|_| Ok(images()));
        let resolver = CapabilityResolver::new(&api, Hypervisor::Kvm, "KR-1");
        assert_eq!(
            resolver.software_code(Some("Default")).await.unwrap(),
            "SW.UBNTU.2204.NKS"
        );
        assert_eq!(resolver.software_code(None).await.unwrap(), "SW.UBNTU.2204.NKS");
    }

    #[tokio::test]
    async fn resolve_floors_memory_to_whole_gigabytes() {
        let mut api = MockVendorApi::new();
        api.expect_server_images().returning(|_| Ok(images()));
        api.expect_server_spec().with(eq("s2-g2")).returning(|_| {
            Ok(Some(ServerSpec {
                server_spec_code: "s2-g2".into(),
                cpu_count: 2,
                memory_size: 8 * GIB + 512,
            }))
        });
        api.expect_server_products()
            .with(eq("XEN"), eq("SW.UBNTU.2004"), eq("KR-1"))
            .returning(|_, _, _| Ok(vec![product("P-2-8", 2, 8), product("P-2-16", 2, 16)]));

        let resolver = CapabilityResolver::new(&api, Hypervisor::Xen, "KR-1");
        let codes = resolver.resolve("s2-g2", Some("default")).await.unwrap();
        assert_eq!(
            codes,
            NodeCodes {
                software_code: "SW.UBNTU.2004".into(),
                product_code: "P-2-8".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_vm_spec_is_a_lookup_error() {
        let mut api = MockVendorApi::new();
        api.expect_server_spec().returning(|_| Ok(None));
        let resolver = CapabilityResolver::new(&api, Hypervisor::Xen, "KR-1");
        let err = resolver.product_code("nope", "SW").await.unwrap_err();
        assert!(matches!(err, Error::Lookup { .. }));
    }

    #[test]
    fn hypervisor_parses_from_config() {
        assert_eq!("KVM".parse::<Hypervisor>().unwrap(), Hypervisor::Kvm);
        assert_eq!("xen".parse::<Hypervisor>().unwrap().code(), "XEN");
        assert!("hyperv".parse::<Hypervisor>().is_err());
    }
}
