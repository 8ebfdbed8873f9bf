use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A piece of text that must, or must not, appear in a file.
///
/// `text` is a literal substring unless it is wrapped in slashes
/// (`/pattern/`), in which case it is a regular expression.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContentRule {
    pub text: String,
    #[serde(default)]
    pub ignore_case: bool,
    /// Human name used in diagnostics instead of the raw text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ContentRule {
    pub fn literal(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ignore_case: false,
            label: None,
        }
    }

    pub fn labelled(text: &str, label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::literal(text)
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.text.clone())
    }
}

/// A config file that must exist and contain every `required` rule.
///
/// Matches of a `placeholders` rule are reported as warnings only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileRule {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub required: Vec<ContentRule>,
    #[serde(default)]
    pub placeholders: Vec<ContentRule>,
}

/// A helper script that must be a regular file and should be executable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScriptRule {
    pub name: String,
    pub path: String,
}

/// A task-recipe file that must mention every recipe in `recipes`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeRule {
    pub name: String,
    pub path: String,
    pub recipes: Vec<String>,
}

/// An optional external tool probed with `which`.
///
/// Tools without a hint are grouped into one warning.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_hint: Option<String>,
}

/// The fixed, ordered catalog the static validator walks through.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Catalog {
    pub files: Vec<FileRule>,
    pub scripts: Vec<ScriptRule>,
    pub recipe_files: Vec<RecipeRule>,
    pub tools: Vec<ToolRule>,
    pub tools_check_name: String,
    pub probe_timeout_secs: u64,
    pub next_steps: Vec<String>,
}

impl Catalog {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let substituter = || ContentRule::labelled("nix-blazar.cachix.org", "Cache substituter");
        let public_key = || ContentRule::literal("YOUR_CACHE_PUBLIC_KEY_HERE");

        Self {
            files: vec![
                FileRule {
                    name: "flake configuration".to_string(),
                    path: "flake.nix".to_string(),
                    required: vec![substituter()],
                    placeholders: vec![public_key()],
                },
                FileRule {
                    name: "nix base configuration".to_string(),
                    path: "modules/base/nix.nix".to_string(),
                    required: vec![substituter()],
                    placeholders: vec![public_key()],
                },
                FileRule {
                    name: "secrets configuration".to_string(),
                    path: "secrets/sops/default.nix".to_string(),
                    required: vec![
                        ContentRule::literal("CACHIX_AUTH_TOKEN"),
                        ContentRule::literal("CACHIX_SIGNING_KEY"),
                    ],
                    placeholders: vec![],
                },
                FileRule {
                    name: "CI workflow".to_string(),
                    path: ".github/workflows/cache-management.yml".to_string(),
                    required: vec![
                        ContentRule::labelled("cachix", "Cachix steps").ignoring_case(),
                        ContentRule::labelled("CACHIX_AUTH_TOKEN", "Cache authentication"),
                    ],
                    placeholders: vec![],
                },
            ],
            scripts: vec![ScriptRule {
                name: "cache management script".to_string(),
                path: "scripts/cache-manager.sh".to_string(),
            }],
            recipe_files: vec![RecipeRule {
                name: "justfile recipes".to_string(),
                path: "justfile".to_string(),
                recipes: [
                    "cache-setup",
                    "cache-push-packages",
                    "cache-push-devshells",
                    "cache-push-system",
                    "cache-push-all",
                    "cache-status",
                ]
                .map(String::from)
                .to_vec(),
            }],
            tools: vec![
                ToolRule {
                    name: "nix".to_string(),
                    install_hint: None,
                },
                ToolRule {
                    name: "jq".to_string(),
                    install_hint: None,
                },
                ToolRule {
                    name: "cachix".to_string(),
                    install_hint: Some("nix profile install nixpkgs#cachix".to_string()),
                },
            ],
            tools_check_name: "dependencies".to_string(),
            probe_timeout_secs: 5,
            next_steps: vec![
                "Replace YOUR_CACHE_PUBLIC_KEY_HERE with your actual cache public key".to_string(),
                "Add your Cachix credentials to secrets: just edit-secrets".to_string(),
                "Setup the cache: just cache-setup".to_string(),
                "Test cache functionality: just cache-push-all".to_string(),
            ],
        }
    }
}

/// The battery of scenarios run against the task runner's jj recipes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TestPlan {
    /// Program that executes the recipes.
    pub runner: String,
    /// Recipe file, relative to the project root. When set, scenarios that
    /// run outside the project root point the runner back at it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_file: Option<String>,
    pub timeout_secs: u64,
    pub help_recipe: String,
    pub expected_commands: Vec<String>,
    pub install_check_recipe: String,
    pub repo_check_recipe: String,
    pub outside_repo_phrase: String,
    pub init_recipe: String,
    pub tool_binary: String,
    pub marker_dir: String,
    pub legacy_commands: Vec<String>,
    /// Invocations that omit a required argument and must be rejected.
    pub missing_argument_invocations: Vec<Vec<String>>,
}

impl TestPlan {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            runner: "just".to_string(),
            recipe_file: Some("justfile".to_string()),
            timeout_secs: 30,
            help_recipe: "jj-help".to_string(),
            expected_commands: [
                "jj-init",
                "jj-add",
                "jj-commit",
                "jj-checkout",
                "jj-branch",
                "jj-status",
                "jj-log",
                "jj-diff",
                "jj-push",
                "jj-pull",
            ]
            .map(String::from)
            .to_vec(),
            install_check_recipe: "_jj-check-install".to_string(),
            repo_check_recipe: "_jj-check-repo".to_string(),
            outside_repo_phrase: "Not in a jujutsu repository".to_string(),
            init_recipe: "jj-init".to_string(),
            tool_binary: "jj".to_string(),
            marker_dir: ".jj".to_string(),
            legacy_commands: ["status", "log", "diff"].map(String::from).to_vec(),
            missing_argument_invocations: vec![
                vec!["jj-checkout".to_string()],
                vec!["jj-branch".to_string(), "create".to_string()],
            ],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub catalog: Catalog,
    pub plan: TestPlan,
}

/// On-disk formats the configuration can be read from and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unsupported config format for {} (expected .toml, .yaml, .yml or .json)",
                path.display()
            ),
        }
    }

    pub fn parse(self, content: &str) -> Result<HarnessConfig> {
        match self {
            Self::Toml => toml::from_str(content).context("Failed to parse TOML config"),
            Self::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML config"),
            Self::Json => serde_json::from_str(content).context("Failed to parse JSON config"),
        }
    }

    pub fn render(self, config: &HarnessConfig) -> Result<String> {
        match self {
            Self::Toml => toml::to_string_pretty(config).context("Failed to serialize to TOML"),
            Self::Yaml => serde_yaml::to_string(config).context("Failed to serialize to YAML"),
            Self::Json => {
                serde_json::to_string_pretty(config).context("Failed to serialize to JSON")
            }
        }
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<HarnessConfig>;
    fn config_path(&self) -> Option<&Path>;
}

/// Resolves the project root and loads the harness configuration.
pub struct ConfigManager {
    config_path: Option<PathBuf>,
    project_root: PathBuf,
}

impl ConfigManager {
    /// Uses `project_root` if given, otherwise searches upward from the
    /// current directory for the default recipe file.
    pub fn new(project_root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let project_root = match project_root {
            Some(root) => root,
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                find_project_root(&cwd, "justfile")
            }
        };
        Ok(Self::new_at(project_root, config_path))
    }

    pub fn new_at(project_root: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            project_root,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn export_config(&self, format: ConfigFormat) -> Result<String> {
        format.render(&self.load_config()?)
    }
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<HarnessConfig> {
        let Some(path) = &self.config_path else {
            return Ok(HarnessConfig::default());
        };

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        format.parse(&content)
    }

    fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Nearest ancestor of `start` (inclusive) containing `marker`, or `start`.
pub fn find_project_root(start: &Path, marker: &str) -> PathBuf {
    let mut dir = start;

    loop {
        if dir.join(marker).exists() {
            return dir.to_path_buf();
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => return start.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = ConfigFormat::Toml
            .parse("[plan]\ntimeout_secs = 7\n")
            .unwrap();
        assert_eq!(config.plan.timeout_secs, 7);
        assert_eq!(config.plan.runner, "just");
        assert_eq!(config.catalog, Catalog::default());
    }

    #[test]
    fn every_format_reads_back_what_it_writes() {
        let config = HarnessConfig::default();
        for format in [ConfigFormat::Toml, ConfigFormat::Yaml, ConfigFormat::Json] {
            let text = format.render(&config).unwrap();
            assert_eq!(format.parse(&text).unwrap(), config, "{format:?}");
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(ConfigFormat::from_path(Path::new("harness.ini")).is_err());
        assert_eq!(
            ConfigFormat::from_path(Path::new("harness.yml")).unwrap(),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn project_root_is_found_from_a_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("justfile"), "").unwrap();
        let nested = dir.path().join("modules").join("base");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested, "justfile"), dir.path());
    }

    #[test]
    fn missing_marker_falls_back_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let marker = "no-such-marker-9c2e";
        assert_eq!(find_project_root(dir.path(), marker), dir.path());
    }
}
