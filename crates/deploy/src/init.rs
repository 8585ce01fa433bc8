//! Best-effort invocation of a module's init entry point.
//!
//! Not every module exposes a callable, argument-free initializer, so the
//! outcome is a tagged value rather than an error: callers can tell
//! "module has no initializer" apart from "initializer exists but errored",
//! and neither aborts the deployment.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::keys::SuiKeypair;
use crate::rpc::{SuiClient, TransactionBlockBytes};

/// Name of the conventional initialization entry point.
const INIT_FUNCTION: &str = "init";

/// Outcome of an init attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "status")]
pub enum InitOutcome {
    /// The call succeeded and created an object.
    Initialized { object_id: String },
    /// The module exposes no callable argument-free init entry point.
    NotInitializable,
    /// The entry point exists but its call failed or produced no object.
    InitFailed { reason: String },
}

impl InitOutcome {
    /// The created object id, when initialization produced one.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            InitOutcome::Initialized { object_id } => Some(object_id),
            _ => None,
        }
    }
}

/// Call `<package_id>::<module_name>::init` with no arguments.
///
/// Soft-fail by contract: every failure is classified into the outcome,
/// never returned as an error.
pub async fn try_init(
    client: &SuiClient,
    identity: &SuiKeypair,
    package_id: &str,
    module_name: &str,
    gas_budget: u64,
) -> InitOutcome {
    tracing::info!(
        package_id,
        module = module_name,
        "Attempting module init call..."
    );

    match run_init(client, identity, package_id, module_name, gas_budget).await {
        Ok(Some(object_id)) => {
            tracing::info!(object_id = %object_id, "Module initialized");
            InitOutcome::Initialized { object_id }
        }
        Ok(None) => {
            tracing::warn!(package_id, "Init call succeeded but created no objects");
            InitOutcome::InitFailed {
                reason: "init call succeeded but created no objects".to_string(),
            }
        }
        Err(e) => {
            let outcome = classify_init_error(&e);
            tracing::warn!(
                package_id,
                error = format!("{:#}", e),
                outcome = ?outcome,
                "Init call did not produce an object"
            );
            outcome
        }
    }
}

async fn run_init(
    client: &SuiClient,
    identity: &SuiKeypair,
    package_id: &str,
    module_name: &str,
    gas_budget: u64,
) -> Result<Option<String>> {
    let tx: TransactionBlockBytes = client
        .call(
            "unsafe_moveCall",
            vec![
                serde_json::json!(identity.address()),
                serde_json::json!(package_id),
                serde_json::json!(module_name),
                serde_json::json!(INIT_FUNCTION),
                serde_json::json!([]),
                serde_json::json!([]),
                Value::Null,
                serde_json::json!(gas_budget.to_string()),
            ],
        )
        .await
        .context("Failed to construct init transaction")?;

    let response = client
        .execute_transaction_block(identity, &tx.tx_bytes)
        .await
        .context("Failed to execute init transaction")?;

    let effects = response.effects.context("Init response missing effects")?;
    if !effects.status.is_success() {
        anyhow::bail!("Init execution failed: {}", effects.status.error_message());
    }

    Ok(effects
        .created
        .first()
        .map(|o| o.reference.object_id.clone()))
}

/// Classify an init failure: a missing or unresolvable entry point means
/// the module is simply not initializable; anything else is a failed call.
fn classify_init_error(error: &anyhow::Error) -> InitOutcome {
    let message = format!("{:#}", error).to_lowercase();
    let not_initializable = [
        "could not resolve",
        "function not found",
        "does not exist",
        "not an entry function",
        "non-entry function",
    ];
    if not_initializable.iter().any(|m| message.contains(m)) {
        InitOutcome::NotInitializable
    } else {
        InitOutcome::InitFailed {
            reason: format!("{:#}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_function_as_not_initializable() {
        let err = anyhow::anyhow!(
            "RPC error from unsafe_moveCall: Could not resolve function init in module counter"
        );
        assert_eq!(classify_init_error(&err), InitOutcome::NotInitializable);

        let err = anyhow::anyhow!("RPC error: function 'init' is not an entry function");
        assert_eq!(classify_init_error(&err), InitOutcome::NotInitializable);
    }

    #[test]
    fn test_classify_execution_failure_as_init_failed() {
        let err = anyhow::anyhow!("init execution failed: MoveAbort in counter::init, code 3");
        match classify_init_error(&err) {
            InitOutcome::InitFailed { reason } => assert!(reason.contains("MoveAbort")),
            other => panic!("expected InitFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_object_id_accessor() {
        let initialized = InitOutcome::Initialized {
            object_id: "0xobj".to_string(),
        };
        assert_eq!(initialized.object_id(), Some("0xobj"));
        assert_eq!(InitOutcome::NotInitializable.object_id(), None);
        assert_eq!(
            InitOutcome::InitFailed {
                reason: String::new()
            }
            .object_id(),
            None
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(InitOutcome::Initialized {
            object_id: "0xobj".to_string(),
        })
        .unwrap();
        assert_eq!(value["status"], "initialized");
        assert_eq!(value["objectId"], "0xobj");

        let value = serde_json::to_value(InitOutcome::NotInitializable).unwrap();
        assert_eq!(value["status"], "notInitializable");
    }
}
