//! proxy-front
//!
//! Front server for a browser-based web proxy, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     FRONT SERVER                      │
//!                    │                                                       │
//!   Client           │  ┌─────────┐    ┌──────────┐  upgrade  ┌──────────┐  │
//!   ─────────────────┼─▶│   net   │───▶│ classify │──────────▶│  tunnel  │──┼──▶ Tunnel
//!                    │  │listener │    │          │           │  router  │  │    backend
//!                    │  └─────────┘    └────┬─────┘           └──────────┘  │
//!                    │                      │ HTTP                           │
//!                    │                      ▼                                │
//!   Response         │  ┌──────────┐   ┌──────────┐    ┌──────────────┐     │
//!   ◀────────────────┼──│ security │◀──│   http   │◀───│    assets    │     │
//!                    │  │  policy  │   │  server  │    │   (mounts)   │     │
//!                    │  └──────────┘   └──────────┘    └──────────────┘     │
//!                    │                                                       │
//!                    │  ┌─────────┐ ┌──────────────┐ ┌───────────────────┐  │
//!                    │  │ config  │ │ observability│ │     lifecycle     │  │
//!                    │  └─────────┘ └──────────────┘ └───────────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use proxy_front::config::{apply_port_override, load_effective};
use proxy_front::lifecycle;
use proxy_front::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "proxy-front", version, about = "Front server for a browser web proxy")]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "PROXY_FRONT_CONFIG")]
    config: Option<PathBuf>,

    /// Load and validate the configuration, print the mounts, and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_effective(cli.config.as_deref(), None)?;
    logging::init_logging(&config.observability)?;
    apply_port_override(&mut config, std::env::var("PORT").ok().as_deref());

    if cli.check {
        println!("configuration ok");
        println!("listen: {}:{}", config.listener.host, config.listener.port);
        println!("tunnel: {}", config.tunnel.path);
        for mount in &config.mounts {
            println!("mount: {} -> {}", mount.prefix, mount.root);
        }
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.listener.host,
        port = config.listener.port,
        mounts = config.mounts.len(),
        "proxy-front starting"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
