//! Package publication.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::build::BuildArtifact;
use crate::keys::SuiKeypair;
use crate::rpc::{CreatedObject, SuiClient, TransactionBlockBytes};

/// Result of a successful publish transaction.
#[derive(Debug)]
pub struct PublishOutcome {
    /// Object id of the published package.
    pub package_id: String,
    /// Every object the transaction created, package included.
    pub created: Vec<CreatedObject>,
}

/// Submit a publish transaction for the compiled artifact.
///
/// The identity pays the gas; the returned package id is the unique
/// created object with immutable ownership. A publish whose effects carry
/// zero or more than one immutable object is malformed and fails.
pub async fn publish(
    client: &SuiClient,
    identity: &SuiKeypair,
    artifact: &BuildArtifact,
    gas_budget: u64,
) -> Result<PublishOutcome> {
    tracing::info!(
        sender = identity.address(),
        modules = artifact.modules().len(),
        gas_budget,
        "Publishing package..."
    );

    let tx: TransactionBlockBytes = client
        .call(
            "unsafe_publish",
            vec![
                serde_json::json!(identity.address()),
                serde_json::json!(artifact.modules_base64()),
                serde_json::json!(artifact.dependencies()),
                Value::Null,
                serde_json::json!(gas_budget.to_string()),
            ],
        )
        .await
        .context("Failed to construct publish transaction")?;

    let response = client
        .execute_transaction_block(identity, &tx.tx_bytes)
        .await
        .context("Failed to execute publish transaction")?;

    let effects = response
        .effects
        .context("Publish response missing effects")?;
    if !effects.status.is_success() {
        anyhow::bail!(
            "Publish execution failed: {}",
            effects.status.error_message()
        );
    }

    let package_id = select_package_id(&effects.created)?;

    tracing::info!(
        package_id = %package_id,
        digest = %response.digest,
        "Package published"
    );

    Ok(PublishOutcome {
        package_id,
        created: effects.created,
    })
}

/// Select the package object among a publish transaction's created
/// objects: a published package is always created as the transaction's
/// single immutable object.
fn select_package_id(created: &[CreatedObject]) -> Result<String> {
    let mut immutable = created.iter().filter(|o| o.owner.is_immutable());

    let package = immutable
        .next()
        .context("Publish effects contain no immutable created object")?;
    if immutable.next().is_some() {
        anyhow::bail!("Publish effects contain more than one immutable created object");
    }

    Ok(package.reference.object_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(owner: serde_json::Value, object_id: &str) -> CreatedObject {
        serde_json::from_value(serde_json::json!({
            "owner": owner,
            "reference": { "objectId": object_id }
        }))
        .unwrap()
    }

    fn immutable(object_id: &str) -> CreatedObject {
        created(serde_json::json!("Immutable"), object_id)
    }

    fn address_owned(object_id: &str) -> CreatedObject {
        created(serde_json::json!({"AddressOwner": "0xsender"}), object_id)
    }

    #[test]
    fn test_select_package_id_exactly_one_immutable() {
        let objects = vec![address_owned("0xgas"), immutable("0xpackage")];
        assert_eq!(select_package_id(&objects).unwrap(), "0xpackage");
    }

    #[test]
    fn test_select_package_id_no_immutable() {
        let objects = vec![address_owned("0xgas")];
        let err = select_package_id(&objects).unwrap_err();
        assert!(err.to_string().contains("no immutable"));
    }

    #[test]
    fn test_select_package_id_empty() {
        assert!(select_package_id(&[]).is_err());
    }

    #[test]
    fn test_select_package_id_multiple_immutable() {
        let objects = vec![immutable("0xone"), immutable("0xtwo")];
        let err = select_package_id(&objects).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }
}
