use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use movelift_deploy::{Network, DEFAULT_TOOLCHAIN};
use tracing::level_filters::LevelFilter;

/// The default target network.
const DEFAULT_NETWORK: Network = Network::Devnet;

#[derive(Parser)]
#[command(name = "movelift")]
#[command(
    author,
    version,
    about = "Publish Move source to a Sui network in one shot"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "MOVELIFT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The target Sui network.
    #[arg(short, long, env = "MOVELIFT_NETWORK", default_value_t = DEFAULT_NETWORK)]
    pub network: Network,

    /// Override the fullnode JSON-RPC endpoint.
    #[arg(long, alias = "rpc", env = "MOVELIFT_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Override the faucet endpoint.
    #[arg(long, alias = "faucet", env = "MOVELIFT_FAUCET_URL")]
    pub faucet_url: Option<String>,

    /// Master funding identity key material (hex seed or base64
    /// flag-prefixed key). If not provided, burner identities stay
    /// unfunded and must be funded out of band.
    #[arg(long, env = "MOVELIFT_MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,

    /// The Move toolchain program to invoke.
    #[arg(long, env = "MOVELIFT_TOOLCHAIN", default_value = DEFAULT_TOOLCHAIN)]
    pub toolchain: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a Move source file and print the deployment result as JSON.
    Deploy {
        /// Path to the Move source file, or '-' to read from stdin.
        source: PathBuf,
    },
    /// Run the HTTP deployment service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "MOVELIFT_LISTEN", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
}
