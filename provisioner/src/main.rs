use anyhow::Result;
use args::{Cli, Commands, NodeGroupCommands};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_env("LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling pending waits");
            on_interrupt.cancel();
        }
    });

    match &cli.command {
        Commands::Create(args) => commands::cluster::create(&cli, args, cancel).await,
        Commands::Get(args) => commands::cluster::get(&cli, args, cancel).await,
        Commands::List => commands::cluster::list(&cli, cancel).await,
        Commands::Ids => commands::cluster::ids(&cli, cancel).await,
        Commands::Delete(args) => commands::cluster::delete(&cli, args, cancel).await,
        Commands::Upgrade(args) => commands::cluster::upgrade(&cli, args, cancel).await,
        Commands::Kubeconfig(args) => commands::cluster::kubeconfig(&cli, args, cancel).await,
        Commands::Nodes(args) => commands::nodes::nodes(&cli, args, cancel).await,
        Commands::NodeGroup(c) => match c {
            NodeGroupCommands::Add(args) => commands::node_group::add(&cli, args, cancel).await,
            NodeGroupCommands::List(args) => commands::node_group::list(&cli, args, cancel).await,
            NodeGroupCommands::Get(args) => commands::node_group::get(&cli, args, cancel).await,
            NodeGroupCommands::Scale(args) => commands::node_group::scale(&cli, args, cancel).await,
            NodeGroupCommands::Autoscaling(args) => {
                commands::node_group::autoscaling(&cli, args, cancel).await
            }
            NodeGroupCommands::Remove(args) => {
                commands::node_group::remove(&cli, args, cancel).await
            }
        },
    }
}
