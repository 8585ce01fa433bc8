//! Ephemeral Move build workspaces.
//!
//! Each deployment attempt compiles inside its own freshly created
//! directory holding a `Move.toml` manifest and the module source. The
//! directory is removed on every exit path of [`with_workspace`], including
//! panics (the backing [`TempDir`] removes itself on drop).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tempdir::TempDir;

/// Git repository providing the Sui framework dependency.
pub const SUI_FRAMEWORK_GIT: &str = "https://github.com/MystenLabs/sui.git";
/// Subdirectory of the framework package inside the Sui repository.
pub const SUI_FRAMEWORK_SUBDIR: &str = "crates/sui-framework/packages/sui-framework";

/// The parsed `module <alias>::<name>` declaration of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecl {
    /// The named address the module is declared under.
    pub address_alias: String,
    /// The module name, used for the init call after publish.
    pub name: String,
}

/// Parse the first module declaration from Move source text.
///
/// Accepts both the block form `module a::b { ... }` and the label form
/// `module a::b;`. Line comments are skipped.
pub fn parse_module_decl(source: &str) -> Result<ModuleDecl> {
    for line in source.lines() {
        let line = line.trim();
        if line.starts_with("//") {
            continue;
        }
        let Some(rest) = line.strip_prefix("module") else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let decl: String = rest
            .trim_start()
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '{' && *c != ';')
            .collect();
        let (alias, name) = decl
            .split_once("::")
            .with_context(|| format!("Module declaration '{}' is not of the form addr::name", decl))?;
        if alias.is_empty() || name.is_empty() {
            anyhow::bail!("Module declaration '{}' is not of the form addr::name", decl);
        }
        return Ok(ModuleDecl {
            address_alias: alias.to_string(),
            name: name.to_string(),
        });
    }
    anyhow::bail!("Source text contains no module declaration")
}

#[derive(Debug, Serialize)]
struct MoveManifest {
    package: ManifestPackage,
    dependencies: BTreeMap<String, ManifestDependency>,
    addresses: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ManifestPackage {
    name: String,
    version: String,
    edition: String,
}

#[derive(Debug, Serialize)]
struct ManifestDependency {
    git: String,
    subdir: String,
    rev: String,
}

/// Render the build manifest declaring the Sui framework dependency and
/// pinning the module's address alias to `0x0` for publication.
fn render_manifest(module: &ModuleDecl, framework_rev: &str) -> Result<String> {
    let mut dependencies = BTreeMap::new();
    dependencies.insert(
        "Sui".to_string(),
        ManifestDependency {
            git: SUI_FRAMEWORK_GIT.to_string(),
            subdir: SUI_FRAMEWORK_SUBDIR.to_string(),
            rev: framework_rev.to_string(),
        },
    );

    let mut addresses = BTreeMap::new();
    addresses.insert(module.address_alias.clone(), "0x0".to_string());

    let manifest = MoveManifest {
        package: ManifestPackage {
            name: module.address_alias.clone(),
            version: "0.0.1".to_string(),
            edition: "2024".to_string(),
        },
        dependencies,
        addresses,
    };

    toml::to_string_pretty(&manifest).context("Failed to serialize Move.toml manifest")
}

/// An ephemeral build directory for one compilation attempt.
pub struct Workspace {
    dir: TempDir,
    source_path: PathBuf,
    module: ModuleDecl,
}

impl Workspace {
    /// Create a workspace containing the manifest and the module source.
    fn create(source: &str, framework_rev: &str) -> Result<Self> {
        let module = parse_module_decl(source)?;
        let dir = TempDir::new("movelift-ws-").context("Failed to create workspace directory")?;

        let manifest = render_manifest(&module, framework_rev)?;
        std::fs::write(dir.path().join("Move.toml"), manifest)
            .context("Failed to write Move.toml")?;

        let sources = dir.path().join("sources");
        std::fs::create_dir(&sources).context("Failed to create sources directory")?;
        let source_path = sources.join(format!("{}.move", module.name));
        std::fs::write(&source_path, source).context("Failed to write module source")?;

        tracing::debug!(
            root = %dir.path().display(),
            module = %module.name,
            "Workspace created"
        );

        Ok(Self {
            dir,
            source_path,
            module,
        })
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the written module source file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// The module declaration parsed from the source.
    pub fn module(&self) -> &ModuleDecl {
        &self.module
    }

    /// Remove the workspace directory. Failures are logged, never surfaced.
    fn close(self) {
        let root = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(root = %root.display(), error = %e, "Failed to remove workspace");
        }
    }
}

/// Run `f` with a freshly created workspace for `source`.
///
/// The workspace directory is removed before this function returns,
/// whether the continuation succeeds, fails, or panics. No deployment
/// attempt may leak a directory.
pub async fn with_workspace<T, F>(source: &str, framework_rev: &str, f: F) -> Result<T>
where
    F: AsyncFnOnce(&Workspace) -> Result<T>,
{
    let workspace = Workspace::create(source, framework_rev)?;
    let result = f(&workspace).await;
    workspace.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER_SOURCE: &str = r#"
module counter::counter {
    public struct Counter has key {
        id: UID,
        value: u64,
    }
}
"#;

    #[test]
    fn test_parse_module_decl_block_form() {
        let decl = parse_module_decl("module counter::counter {\n}").unwrap();
        assert_eq!(decl.address_alias, "counter");
        assert_eq!(decl.name, "counter");
    }

    #[test]
    fn test_parse_module_decl_label_form() {
        let decl = parse_module_decl("module my_pkg::vault;\n").unwrap();
        assert_eq!(decl.address_alias, "my_pkg");
        assert_eq!(decl.name, "vault");
    }

    #[test]
    fn test_parse_module_decl_skips_comments() {
        let source = "// module wrong::wrong {\nmodule right::right {}";
        let decl = parse_module_decl(source).unwrap();
        assert_eq!(decl.address_alias, "right");
    }

    #[test]
    fn test_parse_module_decl_rejects_missing_declaration() {
        assert!(parse_module_decl("fun main() {}").is_err());
        assert!(parse_module_decl("").is_err());
    }

    #[test]
    fn test_parse_module_decl_rejects_unqualified_name() {
        assert!(parse_module_decl("module counter {").is_err());
    }

    #[test]
    fn test_manifest_pins_alias_to_zero_address() {
        let decl = ModuleDecl {
            address_alias: "counter".to_string(),
            name: "counter".to_string(),
        };
        let manifest = render_manifest(&decl, "framework/testnet").unwrap();
        assert!(manifest.contains("counter = \"0x0\""));
        assert!(manifest.contains(SUI_FRAMEWORK_GIT));
        assert!(manifest.contains("framework/testnet"));
    }

    #[tokio::test]
    async fn test_workspace_layout() {
        with_workspace(COUNTER_SOURCE, "framework/testnet", async |ws| {
            assert!(ws.root().join("Move.toml").exists());
            assert!(ws.source_path().exists());
            assert_eq!(ws.module().name, "counter");
            let written = std::fs::read_to_string(ws.source_path()).unwrap();
            assert_eq!(written, COUNTER_SOURCE);
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_workspace_removed_on_success() {
        let mut root = PathBuf::new();
        with_workspace(COUNTER_SOURCE, "framework/testnet", async |ws| {
            root = ws.root().to_path_buf();
            assert!(root.exists());
            Ok(())
        })
        .await
        .unwrap();
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_workspace_removed_on_error() {
        let mut root = PathBuf::new();
        let result: Result<()> = with_workspace(COUNTER_SOURCE, "framework/testnet", async |ws| {
            root = ws.root().to_path_buf();
            anyhow::bail!("continuation failed")
        })
        .await;
        assert!(result.is_err());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_concurrent_workspaces_get_distinct_roots() {
        let (a, b) = tokio::join!(
            with_workspace(COUNTER_SOURCE, "framework/testnet", async |ws| {
                Ok(ws.root().to_path_buf())
            }),
            with_workspace(COUNTER_SOURCE, "framework/testnet", async |ws| {
                Ok(ws.root().to_path_buf())
            }),
        );
        assert_ne!(a.unwrap(), b.unwrap());
    }
}
