use crate::error::{Result, YoloError};
use crate::io;
use crate::paths::{self, UserDirs};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use yolo_llm::{ProviderConfig, ProviderKind};

pub const DEFAULT_EDITOR: &str = "vi";

// ---------------------------------------------------------------------------
// Per-user files
// ---------------------------------------------------------------------------

/// `<user-config>/yolo/settings/config.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Set false for endpoints that cannot bind functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calling: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub api_keys: BTreeMap<String, String>,
    /// Older single-key layout: `openai: { api_key: ... }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<LegacyOpenAi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyOpenAi {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// `<user-home>/.yolo/config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    #[serde(default)]
    pub dev_mode: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prompts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub api_keys: BTreeMap<String, String>,
}

/// Where the key for a provider comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env,
    Config,
    Missing,
}

impl KeySource {
    pub fn as_str(self) -> &'static str {
        match self {
            KeySource::Env => "environment",
            KeySource::Config => "config",
            KeySource::Missing => "none",
        }
    }
}

/// Merged per-user configuration. The JSON client state wins over the YAML
/// settings where both carry a value.
#[derive(Debug, Clone)]
pub struct UserConfig {
    dirs: UserDirs,
    pub settings: Settings,
    pub client: ClientState,
}

fn invalid(path: &Path, reason: impl ToString) -> YoloError {
    YoloError::InvalidConfig {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(None),
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(invalid(path, e)),
    }
}

fn load_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match read_optional(path)? {
        Some(text) => serde_yaml::from_str(&text).map_err(|e| invalid(path, e)),
        None => Ok(T::default()),
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match read_optional(path)? {
        Some(text) => serde_json::from_str(&text).map_err(|e| invalid(path, e)),
        None => Ok(T::default()),
    }
}

impl UserConfig {
    /// Missing files load as defaults; malformed ones are errors.
    pub fn load(dirs: UserDirs) -> Result<Self> {
        let settings = load_yaml(&dirs.settings_file())?;
        let client = load_json(&dirs.client_file())?;
        Ok(Self {
            dirs,
            settings,
            client,
        })
    }

    pub fn dirs(&self) -> &UserDirs {
        &self.dirs
    }

    pub fn provider(&self) -> Result<ProviderKind> {
        match self.settings.provider.as_deref() {
            None | Some("") => Ok(ProviderKind::default()),
            Some(name) => name
                .parse()
                .map_err(|e| invalid(&self.dirs.settings_file(), e)),
        }
    }

    /// Stored key for `kind`, ignoring the environment.
    pub fn stored_key(&self, kind: ProviderKind) -> Option<&str> {
        let name = kind.as_str();
        let legacy = match kind {
            ProviderKind::OpenAi => self
                .settings
                .openai
                .as_ref()
                .and_then(|o| o.api_key.as_deref()),
            _ => None,
        };
        self.client
            .api_keys
            .get(name)
            .or_else(|| self.settings.api_keys.get(name))
            .map(String::as_str)
            .or(legacy)
            .filter(|k| !k.trim().is_empty())
    }

    /// Resolve the key for `kind`: `env` (usually the process environment)
    /// is consulted first for `<PROVIDER>_API_KEY`.
    pub fn resolve_key(
        &self,
        kind: ProviderKind,
        env: impl Fn(&str) -> Option<String>,
    ) -> (Option<String>, KeySource) {
        if let Some(key) = env(&kind.env_var()).filter(|k| !k.trim().is_empty()) {
            return (Some(key), KeySource::Env);
        }
        match self.stored_key(kind) {
            Some(key) => (Some(key.to_string()), KeySource::Config),
            None => (None, KeySource::Missing),
        }
    }

    pub fn provider_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ProviderConfig> {
        let kind = self.provider()?;
        let mut config = ProviderConfig::new(kind);
        config.api_key = self.resolve_key(kind, env).0;
        config.model = self.settings.model.clone();
        config.base_url = self.settings.base_url.clone();
        if let Some(tool_calling) = self.settings.tool_calling {
            config.tool_calling = tool_calling;
        }
        Ok(config)
    }

    pub fn provider_config(&self) -> Result<ProviderConfig> {
        self.provider_config_with(|name| std::env::var(name).ok())
    }

    /// `EDITOR`, then the configured editor, then `vi`.
    pub fn editor(&self) -> String {
        std::env::var("EDITOR")
            .ok()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.settings.editor.clone())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
    }

    pub fn dev_mode(&self) -> bool {
        self.client.dev_mode
    }

    pub fn prompt_override(&self, key: &str) -> Option<&str> {
        self.client.prompts.get(key).map(String::as_str)
    }

    pub fn set_dev_mode(&mut self, enabled: bool) -> Result<()> {
        self.client.dev_mode = enabled;
        self.save_client()
    }

    /// Persist provider settings. The key lands in `api_keys` under the
    /// provider's name.
    pub fn configure_provider(
        &mut self,
        kind: ProviderKind,
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<()> {
        self.settings.provider = Some(kind.as_str().to_string());
        self.settings
            .api_keys
            .insert(kind.as_str().to_string(), api_key.trim().to_string());
        if model.is_some() {
            self.settings.model = model;
        }
        if base_url.is_some() {
            self.settings.base_url = base_url;
        }
        self.save_settings()
    }

    pub fn save_settings(&self) -> Result<()> {
        let data = serde_yaml::to_string(&self.settings)?;
        io::atomic_write(&self.dirs.settings_file(), data.as_bytes())
    }

    pub fn save_client(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.client)?;
        io::atomic_write(&self.dirs.client_file(), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Project config
// ---------------------------------------------------------------------------

/// `yolo/settings/config.yml`, written by `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub ai_provider: String,
    #[serde(default = "default_true")]
    pub use_conventional_commits: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            ai_provider: ProviderKind::default().as_str().to_string(),
            use_conventional_commits: true,
        }
    }
}

impl ProjectConfig {
    pub fn load(root: &Path) -> Result<Self> {
        load_yaml(&root.join(paths::PROJECT_CONFIG_FILE))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&root.join(paths::PROJECT_CONFIG_FILE), data.as_bytes())
    }
}
