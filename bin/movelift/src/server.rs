//! HTTP surface for the deployment pipeline.
//!
//! A single `POST /deploy` operation accepting `{"moveCode": "..."}`.
//! Fatal pipeline errors map to `{error, details}` with a machine-readable
//! category; degraded outcomes (unfunded identity, no init object) are
//! still HTTP-level successes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use movelift_deploy::{DeployError, Deployer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployRequest {
    #[serde(default)]
    move_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

impl ErrorBody {
    fn from_deploy_error(e: &DeployError) -> Self {
        Self {
            error: e.category().to_string(),
            details: e.details(),
        }
    }
}

/// Map a fatal pipeline error to an HTTP status.
fn status_for(e: &DeployError) -> StatusCode {
    match e {
        DeployError::MissingSource => StatusCode::BAD_REQUEST,
        DeployError::Build(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DeployError::Provision(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DeployError::Publish(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn handle_deploy(
    State(deployer): State<Arc<Deployer>>,
    Json(request): Json<DeployRequest>,
) -> Response {
    // Validated here so no workspace or identity is created for bad input.
    let Some(move_code) = request.move_code.filter(|c| !c.trim().is_empty()) else {
        let e = DeployError::MissingSource;
        return (
            status_for(&e),
            Json(ErrorBody::from_deploy_error(&e)),
        )
            .into_response();
    };

    match deployer.deploy(&move_code).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!(
                category = e.category(),
                details = e.details(),
                "Deployment failed"
            );
            (status_for(&e), Json(ErrorBody::from_deploy_error(&e))).into_response()
        }
    }
}

/// Serve the deployment API until the process is stopped.
pub async fn serve(listen: SocketAddr, deployer: Deployer) -> Result<()> {
    let app = Router::new()
        .route("/deploy", post(handle_deploy))
        .with_state(Arc::new(deployer));

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;

    tracing::info!(listen = %listen, "Deployment service listening");

    axum::serve(listener, app)
        .await
        .context("Deployment service terminated")
}
