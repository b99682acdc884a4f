//! Three-tier configuration management.
//!
//! Settings merge default -> user -> team -> project, with the project
//! level winning. Files are YAML; partial files override only the keys
//! they mention.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::git::repository::GitRepository;

/// A provider's registration: whether it may be used and how preferred it
/// is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Whether this provider may be selected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection priority, lower is preferred.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    1
}

/// Ollama connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    /// Server base URL.
    #[serde(default = "OllamaSettings::default_base_url")]
    pub base_url: String,
    /// Model name to use.
    #[serde(default = "OllamaSettings::default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate, unlimited when absent.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl OllamaSettings {
    fn default_base_url() -> String {
        "http://localhost:11434".to_string()
    }
    fn default_model() -> String {
        "qwen2.5:7b".to_string()
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            timeout: default_timeout(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// OpenAI connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    /// API key; the OPENAI_API_KEY environment variable is used when
    /// absent.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name to use.
    #[serde(default = "OpenAiSettings::default_model")]
    pub model: String,
    /// API base URL.
    #[serde(default = "OpenAiSettings::default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
}

impl OpenAiSettings {
    fn default_model() -> String {
        "gpt-3.5-turbo".to_string()
    }
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::default_model(),
            base_url: Self::default_base_url(),
            timeout: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Anthropic connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicSettings {
    /// API key; the ANTHROPIC_API_KEY environment variable is used when
    /// absent.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name to use.
    #[serde(default = "AnthropicSettings::default_model")]
    pub model: String,
    /// API base URL.
    #[serde(default = "AnthropicSettings::default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
}

impl AnthropicSettings {
    fn default_model() -> String {
        "claude-3-haiku-20240307".to_string()
    }
    fn default_base_url() -> String {
        "https://api.anthropic.com/v1".to_string()
    }
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::default_model(),
            base_url: Self::default_base_url(),
            timeout: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// LM Studio connection settings (OpenAI-compatible local server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmStudioSettings {
    /// Server base URL.
    #[serde(default = "LmStudioSettings::default_base_url")]
    pub base_url: String,
    /// Model name to use.
    #[serde(default = "LmStudioSettings::default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
}

impl LmStudioSettings {
    fn default_base_url() -> String {
        "http://localhost:1234/v1".to_string()
    }
    fn default_model() -> String {
        "local-model".to_string()
    }
}

impl Default for LmStudioSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            timeout: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

/// Template selection and lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Template used by `gitai commit` when none is given.
    #[serde(default = "TemplateSettings::default_commit")]
    pub default_commit_template: String,
    /// Template used by `gitai pr` when none is given.
    #[serde(default = "TemplateSettings::default_pr")]
    pub default_pr_template: String,
    /// Extra template search paths, lowest precedence.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

impl TemplateSettings {
    fn default_commit() -> String {
        "conventional".to_string()
    }
    fn default_pr() -> String {
        "github".to_string()
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            default_commit_template: Self::default_commit(),
            default_pr_template: Self::default_pr(),
            search_paths: Vec::new(),
        }
    }
}

/// Git-related analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// Default base branch for PR comparisons.
    #[serde(default = "GitSettings::default_branch_name")]
    pub default_branch: String,
    /// Glob patterns for files excluded from analysis.
    #[serde(default = "GitSettings::default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

impl GitSettings {
    fn default_branch_name() -> String {
        "main".to_string()
    }
    fn default_ignore_patterns() -> Vec<String> {
        vec!["*.log".to_string(), "*.tmp".to_string(), ".env*".to_string()]
    }
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            default_branch: Self::default_branch_name(),
            ignore_patterns: Self::default_ignore_patterns(),
        }
    }
}

/// User-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    /// Full name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Preferred provider name.
    #[serde(default)]
    pub preferred_provider: Option<String>,
    /// Personal templates directory.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

/// Team-shared settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamSettings {
    /// Team name.
    #[serde(default)]
    pub name: String,
    /// Team templates directory.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    /// Team conventions (commit format, PR format, ...).
    #[serde(default)]
    pub conventions: BTreeMap<String, String>,
}

/// Project-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Repository URL.
    #[serde(default)]
    pub repository_url: Option<String>,
    /// Project templates directory.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

/// The merged gitai configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitAiConfig {
    /// Provider registrations keyed by name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderEntry>,
    /// Template settings.
    #[serde(default)]
    pub templates: TemplateSettings,
    /// Git analysis settings.
    #[serde(default)]
    pub git: GitSettings,
    /// User-level settings.
    #[serde(default)]
    pub user: Option<UserSettings>,
    /// Team-shared settings.
    #[serde(default)]
    pub team: Option<TeamSettings>,
    /// Project-level settings.
    #[serde(default)]
    pub project: Option<ProjectSettings>,
    /// Ollama settings.
    #[serde(default)]
    pub ollama: Option<OllamaSettings>,
    /// OpenAI settings.
    #[serde(default)]
    pub openai: Option<OpenAiSettings>,
    /// Anthropic settings.
    #[serde(default)]
    pub anthropic: Option<AnthropicSettings>,
    /// LM Studio settings.
    #[serde(default)]
    pub lmstudio: Option<LmStudioSettings>,
}

impl Default for GitAiConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "ollama".to_string(),
            ProviderEntry {
                enabled: true,
                priority: 1,
            },
        );
        Self {
            providers,
            templates: TemplateSettings::default(),
            git: GitSettings::default(),
            user: None,
            team: None,
            project: None,
            ollama: Some(OllamaSettings::default()),
            openai: None,
            anthropic: None,
            lmstudio: None,
        }
    }
}

impl GitAiConfig {
    /// Names of enabled providers sorted by priority, best first.
    pub fn enabled_providers(&self) -> Vec<String> {
        let mut enabled: Vec<(&String, i32)> = self
            .providers
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, entry)| (name, entry.priority))
            .collect();
        enabled.sort_by_key(|(_, priority)| *priority);
        enabled.into_iter().map(|(name, _)| name.clone()).collect()
    }

    /// Template search paths in precedence order: project, team, user,
    /// then the configured extra paths.
    pub fn template_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = self.project.as_ref().and_then(|p| p.templates_dir.clone()) {
            paths.push(dir);
        }
        if let Some(dir) = self.team.as_ref().and_then(|t| t.templates_dir.clone()) {
            paths.push(dir);
        }
        if let Some(dir) = self.user.as_ref().and_then(|u| u.templates_dir.clone()) {
            paths.push(dir);
        }
        paths.extend(self.templates.search_paths.iter().cloned());
        paths
    }

    /// Ensures enabled providers have a settings section, filling
    /// defaults where absent.
    fn fill_provider_defaults(&mut self) {
        for name in self.enabled_providers() {
            match name.as_str() {
                "ollama" if self.ollama.is_none() => self.ollama = Some(OllamaSettings::default()),
                "openai" if self.openai.is_none() => self.openai = Some(OpenAiSettings::default()),
                "anthropic" if self.anthropic.is_none() => {
                    self.anthropic = Some(AnthropicSettings::default());
                }
                "lmstudio" if self.lmstudio.is_none() => {
                    self.lmstudio = Some(LmStudioSettings::default());
                }
                _ => {}
            }
        }
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !self.providers.values().any(|entry| entry.enabled) {
            anyhow::bail!("At least one provider must be enabled");
        }

        let sections: [(&str, Option<(&str, u64, f64)>); 4] = [
            (
                "ollama",
                self.ollama
                    .as_ref()
                    .map(|s| (s.base_url.as_str(), s.timeout, s.temperature)),
            ),
            (
                "openai",
                self.openai
                    .as_ref()
                    .map(|s| (s.base_url.as_str(), s.timeout, s.temperature)),
            ),
            (
                "anthropic",
                self.anthropic
                    .as_ref()
                    .map(|s| (s.base_url.as_str(), s.timeout, s.temperature)),
            ),
            (
                "lmstudio",
                self.lmstudio
                    .as_ref()
                    .map(|s| (s.base_url.as_str(), s.timeout, s.temperature)),
            ),
        ];

        for (name, section) in sections {
            let Some((base_url, timeout, temperature)) = section else {
                continue;
            };
            let parsed = Url::parse(base_url)
                .with_context(|| format!("{name}.base_url is not a valid URL: {base_url}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{name}.base_url must be an HTTP or HTTPS URL: {base_url}");
            }
            if timeout == 0 {
                anyhow::bail!("{name}.timeout must be positive");
            }
            if !(0.0..=1.0).contains(&temperature) {
                anyhow::bail!("{name}.temperature must be between 0 and 1");
            }
        }

        Ok(())
    }
}

/// Configuration levels, lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// Per-user settings under the platform config directory.
    User,
    /// Team-shared settings in an explicitly chosen directory.
    Team,
    /// Per-repository settings under `.gitai/`.
    Project,
}

/// Loads, merges and saves the three configuration tiers.
pub struct ConfigManager {
    project_root: Option<PathBuf>,
    team_config_dir: Option<PathBuf>,
    user_config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager with auto-discovered project root and the
    /// platform user config directory.
    pub fn new() -> Self {
        let project_root = GitRepository::discover().ok().map(|repo| repo.root());
        Self {
            project_root,
            team_config_dir: None,
            user_config_dir: Self::default_user_config_dir(),
        }
    }

    /// Creates a manager with explicit directories (used by tests and the
    /// `--team` flag).
    pub fn with_dirs(
        project_root: Option<PathBuf>,
        team_config_dir: Option<PathBuf>,
        user_config_dir: PathBuf,
    ) -> Self {
        Self {
            project_root,
            team_config_dir,
            user_config_dir,
        }
    }

    /// Sets the team configuration directory.
    pub fn with_team_dir(mut self, dir: PathBuf) -> Self {
        self.team_config_dir = Some(dir);
        self
    }

    /// Platform default for the user configuration directory.
    pub fn default_user_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gitai")
    }

    /// Path of the configuration file for a level, when determinable.
    pub fn config_path(&self, level: ConfigLevel) -> Option<PathBuf> {
        match level {
            ConfigLevel::User => Some(self.user_config_dir.join("config.yaml")),
            ConfigLevel::Team => self
                .team_config_dir
                .as_ref()
                .map(|dir| dir.join("config.yaml")),
            ConfigLevel::Project => self
                .project_root
                .as_ref()
                .map(|root| root.join(".gitai").join("config.yaml")),
        }
    }

    /// Loads and merges all tiers into a validated configuration.
    pub fn load(&self) -> Result<GitAiConfig> {
        let mut merged = serde_yaml::to_value(GitAiConfig::default())
            .context("Failed to serialize default configuration")?;

        for level in [ConfigLevel::User, ConfigLevel::Team, ConfigLevel::Project] {
            let Some(path) = self.config_path(level) else {
                continue;
            };
            if !path.exists() {
                continue;
            }
            let overlay = load_yaml_file(&path)?;
            merge_values(&mut merged, overlay);
        }

        let mut config: GitAiConfig =
            serde_yaml::from_value(merged).context("Configuration validation failed")?;
        config.fill_provider_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Saves a configuration to one level's file.
    pub fn save(&self, config: &GitAiConfig, level: ConfigLevel) -> Result<()> {
        let path = self
            .config_path(level)
            .with_context(|| format!("Cannot determine path for {level:?} configuration"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {parent:?}"))?;
        }

        let content =
            serde_yaml::to_string(config).context("Failed to serialize configuration")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {path:?}"))?;
        Ok(())
    }

    /// Initializes the user configuration with basic identity settings.
    pub fn init_user_config(
        &self,
        name: Option<String>,
        email: Option<String>,
        provider: &str,
    ) -> Result<GitAiConfig> {
        let mut config = GitAiConfig::default();
        config.user = Some(UserSettings {
            name,
            email,
            preferred_provider: Some(provider.to_string()),
            templates_dir: None,
        });
        self.save(&config, ConfigLevel::User)?;
        Ok(config)
    }

    /// Where each level's configuration file lives and whether it exists.
    pub fn describe_sources(&self) -> Vec<(ConfigLevel, Option<PathBuf>, bool)> {
        [ConfigLevel::User, ConfigLevel::Team, ConfigLevel::Project]
            .into_iter()
            .map(|level| {
                let path = self.config_path(level);
                let exists = path.as_ref().is_some_and(|p| p.exists());
                (level, path, exists)
            })
            .collect()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn load_yaml_file(path: &Path) -> Result<serde_yaml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {path:?}"))?;
    serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {path:?}"))
}

/// Deep-merges `overlay` onto `base`: mappings merge recursively, any
/// other value replaces.
fn merge_values(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(dir: &Path) -> ConfigManager {
        ConfigManager::with_dirs(
            Some(dir.join("project")),
            Some(dir.join("team")),
            dir.join("user"),
        )
    }

    fn write_config(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }

    #[test]
    fn default_config_is_valid() {
        let config = GitAiConfig::default();
        config.validate().expect("default config validates");
        assert_eq!(config.enabled_providers(), vec!["ollama"]);
        assert!(config.ollama.is_some());
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = manager(dir.path()).load().expect("load");
        assert_eq!(config.templates.default_commit_template, "conventional");
        assert_eq!(config.git.default_branch, "main");
    }

    #[test]
    fn partial_user_config_overrides_only_named_keys() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());
        write_config(
            &dir.path().join("user/config.yaml"),
            "ollama:\n  model: llama3\n",
        );

        let config = m.load().expect("load");
        let ollama = config.ollama.expect("ollama section");
        assert_eq!(ollama.model, "llama3");
        // Untouched fields keep their defaults.
        assert_eq!(ollama.base_url, "http://localhost:11434");
        assert_eq!(ollama.timeout, 30);
    }

    #[test]
    fn project_level_wins_over_user_level() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());
        write_config(
            &dir.path().join("user/config.yaml"),
            "git:\n  default_branch: develop\n",
        );
        write_config(
            &dir.path().join("project/.gitai/config.yaml"),
            "git:\n  default_branch: trunk\n",
        );

        let config = m.load().expect("load");
        assert_eq!(config.git.default_branch, "trunk");
    }

    #[test]
    fn enabling_a_provider_fills_its_settings() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());
        write_config(
            &dir.path().join("user/config.yaml"),
            "providers:\n  openai:\n    enabled: true\n    priority: 2\n",
        );

        let config = m.load().expect("load");
        assert!(config.openai.is_some());
        assert_eq!(config.enabled_providers(), vec!["ollama", "openai"]);
    }

    #[test]
    fn invalid_temperature_fails_validation() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());
        write_config(
            &dir.path().join("user/config.yaml"),
            "ollama:\n  temperature: 1.5\n",
        );
        assert!(m.load().is_err());
    }

    #[test]
    fn invalid_base_url_fails_validation() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());
        write_config(
            &dir.path().join("user/config.yaml"),
            "ollama:\n  base_url: ftp://example.com\n",
        );
        assert!(m.load().is_err());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());
        write_config(
            &dir.path().join("user/config.yaml"),
            "providers: [not: a map\n",
        );
        assert!(m.load().is_err());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempdir().expect("tempdir");
        let m = manager(dir.path());

        let config = m
            .init_user_config(
                Some("Ada".to_string()),
                Some("ada@example.com".to_string()),
                "anthropic",
            )
            .expect("init");
        assert!(m.config_path(ConfigLevel::User).expect("path").exists());

        let reloaded = m.load().expect("reload");
        let user = reloaded.user.expect("user section");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.preferred_provider.as_deref(), Some("anthropic"));
        assert_eq!(
            config.user.expect("saved user").email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn template_search_paths_precedence() {
        let mut config = GitAiConfig::default();
        config.user = Some(UserSettings {
            templates_dir: Some(PathBuf::from("/user/t")),
            ..Default::default()
        });
        config.team = Some(TeamSettings {
            templates_dir: Some(PathBuf::from("/team/t")),
            ..Default::default()
        });
        config.project = Some(ProjectSettings {
            templates_dir: Some(PathBuf::from("/project/t")),
            ..Default::default()
        });

        let paths = config.template_search_paths();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/project/t"),
                PathBuf::from("/team/t"),
                PathBuf::from("/user/t"),
            ]
        );
    }
}
