use crate::anthropic::Messages;
use crate::error::CompletionError;
use crate::openai::ChatCompletions;
use crate::service::CompletionService;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Mistral,
    /// Any endpoint speaking the OpenAI chat-completions dialect.
    Compatible,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Mistral,
        ProviderKind::Compatible,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Compatible => "compatible",
        }
    }

    /// Environment variable that overrides the stored key, e.g. `OPENAI_API_KEY`.
    pub fn env_var(self) -> String {
        format!("{}_API_KEY", self.as_str().to_uppercase())
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4-turbo-preview",
            ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
            ProviderKind::Mistral => "mistral-large-latest",
            ProviderKind::Compatible => "llama3.1",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Mistral => "https://api.mistral.ai/v1",
            ProviderKind::Compatible => "http://localhost:11434/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CompletionError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| CompletionError::Provider(format!("unknown provider '{s}'")))
    }
}

/// Everything needed to open a connection to one provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// When false, structured output goes through the JSON repair path
    /// instead of a bound function.
    pub tool_calling: bool,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            tool_calling: true,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(self.kind.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(self.kind.default_base_url())
            .trim_end_matches('/')
    }
}

/// Open a completion service for `config`. Fails with `NoCredentials` when no
/// key is configured.
pub fn connect(config: &ProviderConfig) -> Result<Box<dyn CompletionService>> {
    let key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| CompletionError::NoCredentials {
            provider: config.kind.to_string(),
            env_var: config.kind.env_var(),
        })?;

    tracing::debug!(provider = %config.kind, model = config.model(), "connecting completion service");

    match config.kind {
        ProviderKind::Anthropic => Ok(Box::new(Messages::new(
            config.base_url(),
            key,
            config.model(),
        )?)),
        ProviderKind::OpenAi | ProviderKind::Mistral | ProviderKind::Compatible => {
            let backend = ChatCompletions::new(config.base_url(), key, config.model())?;
            Ok(Box::new(backend.tool_calling(config.tool_calling)))
        }
    }
}
