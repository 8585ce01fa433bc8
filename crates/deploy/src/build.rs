//! Move toolchain invocation and artifact parsing.
//!
//! The compiler is an external, versioned contract: it must emit exactly
//! one JSON object on stdout describing the compiled modules and their
//! dependencies. Any deviation fails loudly instead of being guessed
//! around.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tokio::process::Command;

use crate::workspace::Workspace;

/// Default toolchain program name.
pub const DEFAULT_TOOLCHAIN: &str = "sui";

/// Maximum stderr excerpt carried into build error diagnostics.
const STDERR_EXCERPT_LEN: usize = 2000;

/// Compiled bytecode artifacts for one package.
///
/// Immutable once produced; an empty module list is a build failure, not
/// an empty success.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    modules: Vec<Vec<u8>>,
    dependencies: Vec<String>,
}

impl BuildArtifact {
    /// The compiled module bytecode blobs, in emission order.
    pub fn modules(&self) -> &[Vec<u8>] {
        &self.modules
    }

    /// Object ids of the framework packages the modules depend on.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Module blobs re-encoded as base64 for the publish transaction.
    pub fn modules_base64(&self) -> Vec<String> {
        self.modules.iter().map(|m| BASE64.encode(m)).collect()
    }
}

/// The artifact manifest the toolchain emits on stdout.
#[derive(Debug, Deserialize)]
struct ArtifactManifest {
    modules: Vec<String>,
    dependencies: Vec<String>,
}

/// Invoker for the external Move compiler.
#[derive(Debug, Clone)]
pub struct MoveBuild {
    /// Toolchain program name or path.
    pub program: String,
}

impl Default for MoveBuild {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOLCHAIN.to_string(),
        }
    }
}

impl MoveBuild {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Compile the workspace, returning the parsed bytecode artifacts.
    ///
    /// Fails if the subprocess exits non-zero, stdout is not a valid
    /// artifact manifest, or the manifest contains zero modules.
    pub async fn build(&self, workspace: &Workspace) -> Result<BuildArtifact> {
        tracing::info!(
            program = %self.program,
            root = %workspace.root().display(),
            "Compiling Move package..."
        );

        let output = Command::new(&self.program)
            .args(["move", "build", "--dump-bytecode-as-base64", "--path"])
            .arg(workspace.root())
            .output()
            .await
            .with_context(|| format!("Failed to run '{} move build'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "'{} move build' exited with {}: {}",
                self.program,
                output.status,
                excerpt(&stderr)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let artifact = parse_artifact(&stdout)?;

        tracing::info!(
            modules = artifact.modules.len(),
            dependencies = artifact.dependencies.len(),
            "Move package compiled"
        );

        Ok(artifact)
    }
}

/// Parse the toolchain's stdout as a strict artifact manifest.
fn parse_artifact(stdout: &str) -> Result<BuildArtifact> {
    let manifest: ArtifactManifest = serde_json::from_str(stdout.trim()).with_context(|| {
        format!(
            "Toolchain stdout is not an artifact manifest: {}",
            excerpt(stdout)
        )
    })?;

    if manifest.modules.is_empty() {
        anyhow::bail!("Toolchain emitted zero compiled modules");
    }

    let modules = manifest
        .modules
        .iter()
        .map(|m| {
            BASE64
                .decode(m)
                .context("Artifact manifest contains invalid base64 module bytecode")
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BuildArtifact {
        modules,
        dependencies: manifest.dependencies,
    })
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= STDERR_EXCERPT_LEN {
        return trimmed.to_string();
    }
    let mut end = STDERR_EXCERPT_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_artifact_valid_manifest() {
        let stdout = r#"{"modules":["AQID","BAUG"],"dependencies":["0x1","0x2"]}"#;
        let artifact = parse_artifact(stdout).unwrap();
        assert_eq!(artifact.modules().len(), 2);
        assert_eq!(artifact.modules()[0], vec![1, 2, 3]);
        assert_eq!(artifact.modules()[1], vec![4, 5, 6]);
        assert_eq!(artifact.dependencies(), ["0x1", "0x2"]);
    }

    #[test]
    fn test_parse_artifact_ignores_extra_fields() {
        let stdout = r#"{"modules":["AQID"],"dependencies":["0x2"],"digest":[1,2,3]}"#;
        let artifact = parse_artifact(stdout).unwrap();
        assert_eq!(artifact.modules().len(), 1);
    }

    #[test]
    fn test_parse_artifact_rejects_zero_modules() {
        let stdout = r#"{"modules":[],"dependencies":["0x1"]}"#;
        let err = parse_artifact(stdout).unwrap_err();
        assert!(err.to_string().contains("zero compiled modules"));
    }

    #[test]
    fn test_parse_artifact_rejects_free_form_output() {
        assert!(parse_artifact("BUILDING counter\ndone").is_err());
        assert!(parse_artifact("").is_err());
    }

    #[test]
    fn test_parse_artifact_rejects_invalid_base64() {
        let stdout = r#"{"modules":["@@not-base64@@"],"dependencies":[]}"#;
        assert!(parse_artifact(stdout).is_err());
    }

    #[test]
    fn test_modules_base64_round_trip() {
        let stdout = r#"{"modules":["AQID"],"dependencies":[]}"#;
        let artifact = parse_artifact(stdout).unwrap();
        assert_eq!(artifact.modules_base64(), ["AQID"]);
    }

    #[test]
    fn test_excerpt_truncates_long_output() {
        let long = "x".repeat(STDERR_EXCERPT_LEN * 2);
        let short = excerpt(&long);
        assert!(short.len() < long.len());
        assert!(short.ends_with("..."));
    }
}
