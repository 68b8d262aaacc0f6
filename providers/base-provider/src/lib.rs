use anyhow::Result;
use common::{config::Config, exit, provider::ClusterProvider};
use ncp::{NcpClient, NcpClusterHandler};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const PROVIDERS: &[&str] = &[ncp::PROVIDER_NAME];

/// Builds the provider named in `config`, wired to the live vendor API.
/// `cancel` aborts any status polling the provider is doing.
pub fn connect(config: &Config, cancel: CancellationToken) -> Result<Box<dyn ClusterProvider>> {
    match config.provider.as_str() {
        ncp::PROVIDER_NAME => {
            let (access_key, secret_key) = config.credential.resolve()?;
            let client = NcpClient::new(
                &config.region.region,
                &config.region.zone,
                &access_key,
                &secret_key,
                &config.endpoints,
            )?;
            let handler = NcpClusterHandler::new(client, config, access_key, secret_key)?
                .with_cancellation(cancel);
            info!(provider = ncp::PROVIDER_NAME, region = %config.region.region, "provider ready");
            Ok(Box::new(handler))
        }
        other => exit!(
            "unknown provider",
            "Unknown provider {}, expected one of {}",
            other,
            PROVIDERS.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use common::config::parse_config_str;

    use super::*;

    const CONFIG: &str = r#"
provider = "ncp"

[credential]
access_key = "AK"
secret_key = "SK"

[region]
region = "KR"
zone = "KR-1"
"#;

    #[test]
    fn ncp_is_built_from_config() {
        let config = parse_config_str(CONFIG).unwrap();
        let provider = connect(&config, CancellationToken::new()).unwrap();
        assert_eq!(provider.name(), "ncp");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = parse_config_str(CONFIG).unwrap();
        config.provider = "aws".into();
        let err = connect(&config, CancellationToken::new()).err().unwrap();
        assert_eq!(err.to_string(), "unknown provider");
    }

    #[test]
    fn bad_hypervisor_is_a_config_error() {
        let mut config = parse_config_str(CONFIG).unwrap();
        config.cluster.hypervisor = "vmware".into();
        assert!(connect(&config, CancellationToken::new()).is_err());
    }
}
