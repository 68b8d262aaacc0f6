use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{exit, poll::PollConfig};

pub const ACCESS_KEY_ENV: &str = "NCLOUD_ACCESS_KEY";
pub const SECRET_KEY_ENV: &str = "NCLOUD_SECRET_KEY";

pub const DEFAULT_CLUSTER_TYPE: &str = "SVR.VNKS.STAND.C002.M008.NET.SSD.B050.G002";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub provider: String,
    #[serde(default)]
    pub credential: Credential,
    pub region: RegionInfo,
    #[serde(default)]
    pub cluster: ClusterDefaults,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Long-lived API key pair; fields left out of the file are read from the
/// environment.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct Credential {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionInfo {
    pub region: String,
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterDefaults {
    pub cluster_type: String,
    pub public_network: bool,
    pub hypervisor: String,
}

impl Default for ClusterDefaults {
    fn default() -> Self {
        Self {
            cluster_type: DEFAULT_CLUSTER_TYPE.to_owned(),
            public_network: true,
            hypervisor: "xen".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Polling {
    pub subnet_ready: PollConfig,
    pub node_pool_delete: PollConfig,
    pub cluster_ready: PollConfig,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            subnet_ready: PollConfig::subnet_ready(),
            node_pool_delete: PollConfig::node_pool_delete(),
            cluster_ready: PollConfig::cluster_create(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Endpoints {
    pub nks: Option<String>,
    pub vpc: Option<String>,
    pub server: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Endpoints {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

impl Credential {
    /// Fills missing keys from the environment
    pub fn resolve(&self) -> Result<(String, String)> {
        let access_key = match self
            .access_key
            .clone()
            .or_else(|| std::env::var(ACCESS_KEY_ENV).ok())
        {
            Some(k) if !k.is_empty() => k,
            _ => exit!(
                "missing access key",
                "No access key in config and {} is not set",
                ACCESS_KEY_ENV
            ),
        };
        let secret_key = match self
            .secret_key
            .clone()
            .or_else(|| std::env::var(SECRET_KEY_ENV).ok())
        {
            Some(k) if !k.is_empty() => k,
            _ => exit!(
                "missing secret key",
                "No secret key in config and {} is not set",
                SECRET_KEY_ENV
            ),
        };
        Ok((access_key, secret_key))
    }
}

pub fn parse_config(file: &str) -> Result<Config> {
    let config = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(err) => exit!(err, "Could not read config file {}", file),
    };

    let config = match parse_config_str(&config) {
        Ok(c) => c,
        Err(err) => exit!(err, "Could not parse config file {}", file),
    };

    info!("config file parsed");
    Ok(config)
}

pub fn parse_config_str(s: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(s)
}
