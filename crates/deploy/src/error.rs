//! Fatal pipeline errors.
//!
//! Funding and init failures are deliberately absent here: they are
//! absorbed into [`crate::DeploymentResult`] so a degraded-but-usable
//! deployment is preferred over an all-or-nothing failure.

/// A fatal deployment pipeline error.
///
/// Each variant maps to a machine-readable category plus the underlying
/// diagnostic chain for human consumption.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The request carried no Move source text.
    #[error("missing required field: moveCode")]
    MissingSource,

    /// Keypair provisioning failed (entropy source failure).
    #[error("identity provisioning failed")]
    Provision(#[source] anyhow::Error),

    /// The toolchain exited non-zero or emitted unparsable artifacts.
    #[error("move build failed")]
    Build(#[source] anyhow::Error),

    /// The publish transaction failed or reported malformed effects.
    #[error("publish transaction failed")]
    Publish(#[source] anyhow::Error),
}

impl DeployError {
    /// Machine-readable error category.
    pub fn category(&self) -> &'static str {
        match self {
            DeployError::MissingSource => "input_error",
            DeployError::Provision(_) => "internal_error",
            DeployError::Build(_) => "build_error",
            DeployError::Publish(_) => "publish_error",
        }
    }

    /// Human-readable detail, including the full cause chain.
    pub fn details(&self) -> String {
        match self {
            DeployError::MissingSource => {
                "the moveCode field is required and must be non-empty".to_string()
            }
            DeployError::Provision(e) | DeployError::Build(e) | DeployError::Publish(e) => {
                format!("{:#}", e)
            }
        }
    }
}
