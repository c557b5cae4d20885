use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use echo_dispatch::config::Config;
use echo_dispatch::server::EchoServer;

#[derive(Parser, Debug)]
#[command(name = "echo-dispatch")]
struct Args {
    /// Override the configured listen port.
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(short, long)]
    config: Option<String>,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.listen.port = port;
    }

    info!(
        port = config.listen.port,
        fixtures = config.projects.len(),
        "starting echo-dispatch"
    );

    let repo = Arc::new(config.build_repository());
    EchoServer::new(config, repo).run().await
}
