//! Naver Cloud Platform driver for NKS managed Kubernetes clusters.

pub mod api;
pub mod capability;
pub mod client;
pub mod cluster;
pub mod kubeconfig;
pub mod network;
pub mod node_group;
pub mod signature;
pub mod status;
pub mod validate;

pub use client::NcpClient;
pub use cluster::NcpClusterHandler;

pub const PROVIDER_NAME: &str = "ncp";
