//! Deployment configuration: target network selection, gas budgets, and
//! the optional master funding identity.

use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::build::DEFAULT_TOOLCHAIN;
use crate::keys::SuiKeypair;

/// Gas budget for the publish transaction, in MIST.
pub const DEFAULT_PUBLISH_GAS_BUDGET: u64 = 100_000_000;
/// Gas budget for the init call, in MIST.
pub const DEFAULT_CALL_GAS_BUDGET: u64 = 10_000_000;
/// Gas budget for the master-identity transfer, in MIST.
pub const DEFAULT_TRANSFER_GAS_BUDGET: u64 = 5_000_000;
/// Amount transferred to a burner identity, in MIST (0.2 SUI).
pub const DEFAULT_FUNDING_AMOUNT: u64 = 200_000_000;
/// How long to poll for funding confirmation before reporting a timeout.
pub const DEFAULT_FUNDING_TIMEOUT: Duration = Duration::from_secs(30);

/// Target Sui network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Network {
    Localnet,
    Devnet,
    Testnet,
}

impl Network {
    /// Fullnode JSON-RPC endpoint for the network.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Localnet => "http://127.0.0.1:9000",
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
        }
    }

    /// Faucet endpoint, where the network provides one.
    pub fn faucet_url(&self) -> &'static str {
        match self {
            Network::Localnet => "http://127.0.0.1:9123/gas",
            Network::Devnet => "https://faucet.devnet.sui.io/gas",
            Network::Testnet => "https://faucet.testnet.sui.io/gas",
        }
    }

    /// Framework revision the generated manifest pins against.
    pub fn framework_rev(&self) -> &'static str {
        match self {
            Network::Localnet | Network::Testnet => "framework/testnet",
            Network::Devnet => "framework/devnet",
        }
    }
}

/// Configuration for a [`crate::Deployer`].
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    pub rpc_url: Url,
    pub faucet_url: Option<Url>,
    pub framework_rev: String,
    /// Pre-funded identity used for gas transfers. Absence disables
    /// funding; the pipeline then proceeds with an unfunded burner.
    pub master_key: Option<SuiKeypair>,
    /// Toolchain program name or path.
    pub toolchain: String,
    pub publish_gas_budget: u64,
    pub call_gas_budget: u64,
    pub transfer_gas_budget: u64,
    /// Gas amount granted to each burner identity, in MIST.
    pub funding_amount: u64,
    pub funding_timeout: Duration,
}

impl DeployerConfig {
    /// Defaults for a well-known network.
    pub fn for_network(network: Network) -> Result<Self> {
        let rpc_url = Url::parse(network.rpc_url()).context("Invalid network RPC URL")?;
        let faucet_url =
            Some(Url::parse(network.faucet_url()).context("Invalid network faucet URL")?);

        Ok(Self {
            rpc_url,
            faucet_url,
            framework_rev: network.framework_rev().to_string(),
            master_key: None,
            toolchain: DEFAULT_TOOLCHAIN.to_string(),
            publish_gas_budget: DEFAULT_PUBLISH_GAS_BUDGET,
            call_gas_budget: DEFAULT_CALL_GAS_BUDGET,
            transfer_gas_budget: DEFAULT_TRANSFER_GAS_BUDGET,
            funding_amount: DEFAULT_FUNDING_AMOUNT,
            funding_timeout: DEFAULT_FUNDING_TIMEOUT,
        })
    }

    /// Override the fullnode RPC endpoint.
    pub fn with_rpc_url(mut self, url: &str) -> Result<Self> {
        self.rpc_url = Url::parse(url).context("Invalid RPC URL")?;
        Ok(self)
    }

    /// Override the faucet endpoint.
    pub fn with_faucet_url(mut self, url: &str) -> Result<Self> {
        self.faucet_url = Some(Url::parse(url).context("Invalid faucet URL")?);
        Ok(self)
    }

    /// Configure the master funding identity from encoded key material
    /// (hex seed or base64 flag-prefixed key).
    pub fn with_master_key(mut self, encoded: &str) -> Result<Self> {
        self.master_key =
            Some(SuiKeypair::from_encoded(encoded).context("Invalid master key material")?);
        Ok(self)
    }

    /// Override the toolchain program.
    pub fn with_toolchain(mut self, program: impl Into<String>) -> Self {
        self.toolchain = program.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_network_from_str() {
        assert_eq!(Network::from_str("devnet").unwrap(), Network::Devnet);
        assert_eq!(Network::from_str("testnet").unwrap(), Network::Testnet);
        assert_eq!(Network::from_str("localnet").unwrap(), Network::Localnet);
        assert!(Network::from_str("mainnet").is_err());
    }

    #[test]
    fn test_network_display_round_trip() {
        for network in [Network::Localnet, Network::Devnet, Network::Testnet] {
            assert_eq!(Network::from_str(&network.to_string()).unwrap(), network);
        }
    }

    #[test]
    fn test_for_network_defaults() {
        let config = DeployerConfig::for_network(Network::Devnet).unwrap();
        assert_eq!(config.rpc_url.as_str(), "https://fullnode.devnet.sui.io/");
        assert!(config.faucet_url.is_some());
        assert!(config.master_key.is_none());
        assert_eq!(config.toolchain, DEFAULT_TOOLCHAIN);
        assert_eq!(config.publish_gas_budget, DEFAULT_PUBLISH_GAS_BUDGET);
    }

    #[test]
    fn test_with_master_key() {
        let keypair = SuiKeypair::from_seed([4u8; 32]);
        let config = DeployerConfig::for_network(Network::Localnet)
            .unwrap()
            .with_master_key(&keypair.private_key_hex())
            .unwrap();
        assert_eq!(
            config.master_key.unwrap().address(),
            keypair.address()
        );
    }

    #[test]
    fn test_with_rpc_url_rejects_garbage() {
        let config = DeployerConfig::for_network(Network::Localnet).unwrap();
        assert!(config.with_rpc_url("not a url").is_err());
    }
}
