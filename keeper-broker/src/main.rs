use clap::Parser;
use keeper_broker::{BrokerConfig, CliOverrides};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "keeper-broker", version, about = "Multi-tenant encrypted secret broker")]
struct BrokerArgs {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Override the state snapshot file
    #[arg(long)]
    state_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = real_main().await {
        eprintln!("broker exited with error: {err:#}");
        process::exit(1);
    }
}

async fn real_main() -> anyhow::Result<()> {
    let args = BrokerArgs::parse();
    keeper_broker::telemetry::init()?;

    let overrides = CliOverrides {
        bind: args.bind,
        state_path: args.state_path,
    };
    let config = BrokerConfig::resolve(args.config.as_deref(), &overrides)?;
    tracing::debug!(?config, "configuration resolved");

    keeper_broker::run(config).await
}
