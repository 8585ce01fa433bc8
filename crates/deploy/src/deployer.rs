use anyhow::Result;
use serde::Serialize;

use crate::build::MoveBuild;
use crate::config::DeployerConfig;
use crate::error::DeployError;
use crate::funding::{FundingOutcome, FundingService};
use crate::init::{self, InitOutcome};
use crate::keys::SuiKeypair;
use crate::publish;
use crate::rpc::SuiClient;
use crate::workspace::{self, with_workspace};

/// Terminal artifact of a deployment attempt.
///
/// `object_id` absence is a valid state: not every module exposes a
/// callable initializer. The private key is the only copy; nothing is
/// retained server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    /// Object id of the published package.
    pub package_id: String,
    /// Primary interactive object created by the init call, if any.
    pub object_id: Option<String>,
    /// The burner identity's address.
    pub address: String,
    /// The burner identity's private key seed, hex-encoded.
    pub private_key_hex: String,
    /// Whether gas reached the burner identity.
    pub funding_succeeded: bool,
    /// Detailed funding outcome.
    pub funding: FundingOutcome,
    /// Detailed init outcome.
    pub init: InitOutcome,
}

/// Orchestrates the full deployment pipeline.
///
/// Sequencing: provision identity → open scoped workspace → build
/// (funding runs concurrently, it is independent) → publish → try-init →
/// assemble the result. Build and publish failures are fatal; funding and
/// init failures are absorbed into the result.
pub struct Deployer {
    config: DeployerConfig,
    client: SuiClient,
    funding: FundingService,
    build: MoveBuild,
}

impl Deployer {
    pub fn new(config: DeployerConfig) -> Result<Self> {
        let client = SuiClient::new(config.rpc_url.clone())?;
        let funding = FundingService::new(client.clone(), &config)?;
        let build = MoveBuild::new(config.toolchain.clone());

        Ok(Self {
            config,
            client,
            funding,
            build,
        })
    }

    /// Deploy `move_code` as a fresh on-chain package.
    ///
    /// The workspace directory is gone by the time this returns, on every
    /// path past input validation.
    pub async fn deploy(&self, move_code: &str) -> Result<DeploymentResult, DeployError> {
        if move_code.trim().is_empty() {
            return Err(DeployError::MissingSource);
        }

        // Parsed up front so a malformed declaration fails before any
        // identity or directory is created.
        let module = workspace::parse_module_decl(move_code).map_err(DeployError::Build)?;

        let identity = SuiKeypair::generate().map_err(DeployError::Provision)?;
        tracing::info!(
            address = identity.address(),
            module = %module.name,
            "Starting deployment"
        );

        let build_fut = with_workspace(move_code, &self.config.framework_rev, async |ws| {
            self.build.build(ws).await
        });
        let fund_fut = self.funding.fund(identity.address());

        let (build_result, funding) = tokio::join!(build_fut, fund_fut);
        let artifact = build_result.map_err(DeployError::Build)?;

        if !funding.succeeded() {
            tracing::warn!(
                address = identity.address(),
                funding = ?funding,
                "Proceeding with degraded funding"
            );
        }

        let published = publish::publish(
            &self.client,
            &identity,
            &artifact,
            self.config.publish_gas_budget,
        )
        .await
        .map_err(DeployError::Publish)?;

        let init = init::try_init(
            &self.client,
            &identity,
            &published.package_id,
            &module.name,
            self.config.call_gas_budget,
        )
        .await;

        let result = DeploymentResult {
            package_id: published.package_id,
            object_id: init.object_id().map(String::from),
            address: identity.address().to_string(),
            private_key_hex: identity.private_key_hex(),
            funding_succeeded: funding.succeeded(),
            funding,
            init,
        };

        tracing::info!(
            package_id = %result.package_id,
            object_id = ?result.object_id,
            "Deployment complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;

    fn deployer() -> Deployer {
        let config = DeployerConfig::for_network(Network::Localnet).unwrap();
        Deployer::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_rejects_empty_source() {
        let err = deployer().deploy("").await.unwrap_err();
        assert!(matches!(err, DeployError::MissingSource));
        assert_eq!(err.category(), "input_error");
    }

    #[tokio::test]
    async fn test_deploy_rejects_whitespace_source() {
        let err = deployer().deploy("  \n\t ").await.unwrap_err();
        assert!(matches!(err, DeployError::MissingSource));
    }

    #[tokio::test]
    async fn test_deploy_rejects_source_without_module_declaration() {
        let err = deployer().deploy("fun main() {}").await.unwrap_err();
        assert!(matches!(err, DeployError::Build(_)));
    }

    #[test]
    fn test_result_wire_shape() {
        let result = DeploymentResult {
            package_id: "0xpkg".to_string(),
            object_id: None,
            address: "0xaddr".to_string(),
            private_key_hex: "ab".repeat(32),
            funding_succeeded: false,
            funding: FundingOutcome::Timeout,
            init: InitOutcome::NotInitializable,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["packageId"], "0xpkg");
        assert_eq!(value["objectId"], serde_json::Value::Null);
        assert_eq!(value["address"], "0xaddr");
        assert_eq!(value["fundingSucceeded"], false);
        assert_eq!(value["funding"]["status"], "timeout");
        assert_eq!(value["init"]["status"], "notInitializable");
    }
}
