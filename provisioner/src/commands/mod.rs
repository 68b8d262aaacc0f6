use anyhow::Result;
use common::{config::parse_config, exit, provider::ClusterProvider};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

use crate::args::Cli;

pub mod cluster;
pub mod node_group;
pub mod nodes;

fn provider(cli: &Cli, cancel: CancellationToken) -> Result<Box<dyn ClusterProvider>> {
    let config = parse_config(&cli.file)?;
    base_provider::connect(&config, cancel)
}

fn read_yaml<T: DeserializeOwned>(file: &str) -> Result<T> {
    let s = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(err) => exit!(err, "Could not read request file {}", file),
    };
    match serde_yaml::from_str(&s) {
        Ok(v) => Ok(v),
        Err(err) => exit!(err, "Could not parse request file {}", file),
    }
}

fn print_yaml<T: Serialize>(value: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}
