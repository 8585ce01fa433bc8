//! Gas funding for burner identities.
//!
//! Funding is best-effort by contract: a failure here is recorded in the
//! deployment result, never propagated as a pipeline-fatal error. An
//! unfunded identity can still be funded manually by the caller.

use std::time::Duration;

use anyhow::{Context, Result};
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::config::DeployerConfig;
use crate::keys::SuiKeypair;
use crate::rpc::{SuiClient, TransactionBlockBytes};

/// Canonical SUI coin type tag.
const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Outcome of a funding attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum FundingOutcome {
    /// Gas reached the burner identity.
    Funded,
    /// The faucet accepted the request but confirmation did not arrive
    /// within the polling window.
    Timeout,
    /// No funding path succeeded.
    Failed { reason: String },
}

impl FundingOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, FundingOutcome::Funded)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Balance {
    total_balance: String,
}

#[derive(Debug, Deserialize)]
struct CoinPage {
    data: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Coin {
    coin_object_id: String,
}

/// Supplies gas to burner identities via the network faucet and/or a
/// transfer from the pre-funded master identity.
pub struct FundingService {
    client: SuiClient,
    http: reqwest::Client,
    faucet_url: Option<Url>,
    /// Master identity behind a single-writer lease: concurrent
    /// deployments must not race on the same coin objects.
    master: Option<Mutex<SuiKeypair>>,
    amount: u64,
    transfer_gas_budget: u64,
    timeout: Duration,
}

impl FundingService {
    pub fn new(client: SuiClient, config: &DeployerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create faucet HTTP client")?;

        Ok(Self {
            client,
            http,
            faucet_url: config.faucet_url.clone(),
            master: config.master_key.clone().map(Mutex::new),
            amount: config.funding_amount,
            transfer_gas_budget: config.transfer_gas_budget,
            timeout: config.funding_timeout,
        })
    }

    /// Fund `address`, trying the faucet first and a master transfer
    /// regardless of the faucet outcome. Never returns an error.
    pub async fn fund(&self, address: &str) -> FundingOutcome {
        let Some(master) = &self.master else {
            tracing::warn!(address, "No master funding identity configured, burner stays unfunded");
            return FundingOutcome::Failed {
                reason: "no master funding identity configured".to_string(),
            };
        };

        let mut faucet_accepted = false;
        let mut faucet_confirmed = false;

        if let Some(faucet_url) = &self.faucet_url {
            match self.request_faucet(faucet_url, address).await {
                Ok(()) => {
                    faucet_accepted = true;
                    faucet_confirmed = self.await_balance(address).await.is_ok();
                    if faucet_confirmed {
                        tracing::info!(address, "Faucet funding confirmed");
                    }
                }
                Err(e) => {
                    tracing::warn!(address, error = format!("{:#}", e), "Faucet request failed");
                }
            }
        }

        let transfer_result = {
            let master = master.lock().await;
            self.transfer_from_master(&master, address).await
        };

        match transfer_result {
            Ok(()) => {
                tracing::info!(address, amount = self.amount, "Master transfer confirmed");
                return FundingOutcome::Funded;
            }
            Err(e) => {
                tracing::warn!(address, error = format!("{:#}", e), "Master transfer failed");
            }
        }

        if faucet_confirmed {
            FundingOutcome::Funded
        } else if faucet_accepted {
            FundingOutcome::Timeout
        } else {
            FundingOutcome::Failed {
                reason: "faucet request and master transfer both failed".to_string(),
            }
        }
    }

    /// Request gas for `address` from the network faucet, with retries.
    async fn request_faucet(&self, faucet_url: &Url, address: &str) -> Result<()> {
        let send = || async {
            let response = self
                .http
                .post(faucet_url.clone())
                .json(&serde_json::json!({
                    "FixedAmountRequest": { "recipient": address }
                }))
                .send()
                .await
                .context("Failed to send faucet request")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Faucet returned {}: {}", status, body);
            }
            Ok(())
        };

        send.retry(ExponentialBuilder::default().with_max_times(3))
            .await
    }

    /// Poll the burner's balance until it is non-zero or the window closes.
    async fn await_balance(&self, address: &str) -> Result<()> {
        SuiClient::wait_until("funding confirmation", self.timeout, || async {
            let balance: Balance = self
                .client
                .call(
                    "suix_getBalance",
                    vec![serde_json::json!(address), serde_json::json!(SUI_COIN_TYPE)],
                )
                .await?;
            let total: u128 = balance
                .total_balance
                .parse()
                .context("Unparsable totalBalance in balance response")?;
            if total > 0 {
                Ok(())
            } else {
                anyhow::bail!("Balance still zero")
            }
        })
        .await
    }

    /// Transfer a fixed gas amount from the master identity.
    ///
    /// Callers must hold the master lease for the full duration.
    async fn transfer_from_master(&self, master: &SuiKeypair, recipient: &str) -> Result<()> {
        let coins: CoinPage = self
            .client
            .call(
                "suix_getCoins",
                vec![
                    serde_json::json!(master.address()),
                    serde_json::json!(SUI_COIN_TYPE),
                    Value::Null,
                    Value::Null,
                ],
            )
            .await
            .context("Failed to list master gas coins")?;

        let coin = coins
            .data
            .first()
            .context("Master identity holds no gas coins")?;

        let tx: TransactionBlockBytes = self
            .client
            .call(
                "unsafe_transferSui",
                vec![
                    serde_json::json!(master.address()),
                    serde_json::json!(coin.coin_object_id),
                    serde_json::json!(self.transfer_gas_budget.to_string()),
                    serde_json::json!(recipient),
                    serde_json::json!(self.amount.to_string()),
                ],
            )
            .await
            .context("Failed to construct transfer transaction")?;

        let response = self
            .client
            .execute_transaction_block(master, &tx.tx_bytes)
            .await
            .context("Failed to execute transfer transaction")?;

        let effects = response
            .effects
            .context("Transfer response missing effects")?;
        if !effects.status.is_success() {
            anyhow::bail!(
                "Transfer execution failed: {}",
                effects.status.error_message()
            );
        }

        Ok(())
    }
}
