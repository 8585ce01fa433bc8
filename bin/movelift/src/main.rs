//! movelift turns Move source text into a live Sui deployment in one shot.

mod cli;
mod server;

use std::io::Read as _;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command};
use movelift_deploy::{DeployError, Deployer, DeployerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut config = DeployerConfig::for_network(cli.network)?;
    if let Some(rpc_url) = &cli.rpc_url {
        config = config.with_rpc_url(rpc_url)?;
    }
    if let Some(faucet_url) = &cli.faucet_url {
        config = config.with_faucet_url(faucet_url)?;
    }
    if let Some(master_key) = &cli.master_key {
        config = config.with_master_key(master_key)?;
    }
    config = config.with_toolchain(cli.toolchain.clone());

    let deployer = Deployer::new(config)?;

    match cli.command {
        Command::Deploy { source } => deploy_once(&deployer, &source).await,
        Command::Serve { listen } => server::serve(listen, deployer).await,
    }
}

/// Deploy a single source file and print the result (or error) as JSON.
async fn deploy_once(deployer: &Deployer, source: &Path) -> Result<()> {
    let move_code = read_source(source)?;

    match deployer.deploy(&move_code).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            let body = serde_json::json!({
                "error": e.category(),
                "details": e.details(),
            });
            eprintln!("{}", serde_json::to_string_pretty(&body)?);
            Err(render_exit_error(e))
        }
    }
}

fn render_exit_error(e: DeployError) -> anyhow::Error {
    anyhow::anyhow!("Deployment failed ({})", e.category())
}

/// Read the Move source from a file, or stdin when the path is '-'.
fn read_source(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read Move source from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read Move source from {}", source.display()))
    }
}
