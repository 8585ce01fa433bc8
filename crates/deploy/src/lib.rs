//! movelift-deploy - Deployment orchestration for Sui Move packages.
//!
//! This crate turns raw Move source text into a live on-chain deployment:
//! it provisions a disposable keypair, funds it with gas, compiles the
//! module through the `sui` toolchain, publishes the package, and attempts
//! the module's `init` entry point.

mod deployer;
pub use deployer::{Deployer, DeploymentResult};

mod error;
pub use error::DeployError;

pub mod build;
pub mod config;
pub mod funding;
pub mod init;
pub mod keys;
pub mod publish;
pub mod rpc;
pub mod workspace;

pub use build::{BuildArtifact, MoveBuild, DEFAULT_TOOLCHAIN};
pub use config::{DeployerConfig, Network};
pub use funding::{FundingOutcome, FundingService};
pub use init::InitOutcome;
pub use keys::SuiKeypair;
pub use publish::PublishOutcome;
pub use rpc::SuiClient;
pub use workspace::{with_workspace, ModuleDecl, Workspace};
