use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use topo::domain::config::ApiConfig;
use topo::kernel::config::load_config;
use topo_logger::Logger;
use topo_server::Server;

/// Topology classification service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file; the extension is optional.
    #[arg(short, long, env = "TOPO_CONFIG", default_value = "server")]
    config: PathBuf,
}

#[topo_runtime::main(high_performance)]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cfg: ApiConfig =
        load_config(Some(&args.config)).context("Critical: Configuration is malformed")?;
    let _log = Logger::init(&cfg.server.name, &cfg.logging)?;

    Server::builder().config(cfg).build().await?.run().await
}
