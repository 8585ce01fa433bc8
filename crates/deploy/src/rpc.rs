//! Sui JSON-RPC client, transaction signing, and shared response types.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::keys::{blake2b256, SuiKeypair, ED25519_FLAG};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between polling attempts when waiting for a condition.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Intent prefix for user transaction data (scope, version, app id).
const TRANSACTION_DATA_INTENT: [u8; 3] = [0, 0, 0];

/// Transaction bytes returned by the `unsafe_*` builder endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlockBytes {
    pub tx_bytes: String,
}

/// Execution response from `sui_executeTransactionBlock`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub digest: String,
    pub effects: Option<TransactionEffects>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub created: Vec<CreatedObject>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// The reported execution error, or the raw status when none is given.
    pub fn error_message(&self) -> String {
        self.error.clone().unwrap_or_else(|| self.status.clone())
    }
}

/// An object created by a transaction, with its reported ownership.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedObject {
    pub owner: Owner,
    pub reference: ObjectRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: String,
}

/// Object ownership as reported in transaction effects.
///
/// Immutable ownership is a bare string; the other variants are keyed
/// objects (`AddressOwner`, `ObjectOwner`, `Shared`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Owner {
    Literal(String),
    Keyed(BTreeMap<String, Value>),
}

impl Owner {
    pub fn is_immutable(&self) -> bool {
        matches!(self, Owner::Literal(s) if s == "Immutable")
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Owner::Keyed(m) if m.contains_key("Shared"))
    }
}

/// A thin JSON-RPC client for a Sui fullnode.
#[derive(Debug, Clone)]
pub struct SuiClient {
    http: reqwest::Client,
    url: Url,
}

impl SuiClient {
    pub fn new(url: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, url })
    }

    /// Make a JSON-RPC call and deserialize the result.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let result: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = result.get("error") {
            anyhow::bail!(
                "RPC error from {}: {}",
                method,
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown")
            );
        }

        let result_value = result
            .get("result")
            .with_context(|| format!("No result in {} response", method))?
            .clone();

        serde_json::from_value(result_value)
            .with_context(|| format!("Failed to deserialize {} result", method))
    }

    /// Sign and submit transaction bytes, awaiting local execution with
    /// effect reporting enabled.
    pub async fn execute_transaction_block(
        &self,
        keypair: &SuiKeypair,
        tx_bytes_b64: &str,
    ) -> Result<TransactionResponse> {
        let signature = sign_transaction(keypair, tx_bytes_b64)?;

        self.call(
            "sui_executeTransactionBlock",
            vec![
                serde_json::json!(tx_bytes_b64),
                serde_json::json!([signature]),
                serde_json::json!({
                    "showEffects": true,
                    "showObjectChanges": true
                }),
                serde_json::json!("WaitForLocalExecution"),
            ],
        )
        .await
    }

    /// Poll a check function until it succeeds or `timeout` elapses.
    pub async fn wait_until<F, Fut>(name: &str, timeout: Duration, check_fn: F) -> Result<()>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let start = std::time::Instant::now();

        loop {
            match check_fn().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::trace!(error = %e, condition = %name, "Condition not met, retrying...");
                }
            }

            if start.elapsed() > timeout {
                anyhow::bail!("Timed out waiting for {}", name);
            }

            tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        }
    }
}

/// Produce a serialized Sui signature over base64 transaction bytes.
///
/// The signed message is blake2b-256 over the transaction-data intent
/// prefix and the raw transaction bytes; the serialized form is
/// flag ‖ signature ‖ public key, base64-encoded (97 bytes raw).
pub fn sign_transaction(keypair: &SuiKeypair, tx_bytes_b64: &str) -> Result<String> {
    let tx_bytes = BASE64
        .decode(tx_bytes_b64)
        .context("Transaction bytes are not valid base64")?;

    let mut message = Vec::with_capacity(TRANSACTION_DATA_INTENT.len() + tx_bytes.len());
    message.extend_from_slice(&TRANSACTION_DATA_INTENT);
    message.extend_from_slice(&tx_bytes);
    let digest = blake2b256(&message);

    let signature = keypair.sign(&digest);

    let mut serialized = Vec::with_capacity(97);
    serialized.push(ED25519_FLAG);
    serialized.extend_from_slice(&signature);
    serialized.extend_from_slice(&keypair.public_key_bytes());

    Ok(BASE64.encode(&serialized))
}
