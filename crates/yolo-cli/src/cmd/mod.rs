pub mod ai;
pub mod ask;
pub mod commit;
pub mod dev;
pub mod explain;
pub mod graph;
pub mod init;
pub mod item;
pub mod prompt;
pub mod sprint;
pub mod version;

use anyhow::Context;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use yolo_core::config::UserConfig;
use yolo_core::explainer::ErrorExplainer;
use yolo_core::materializer::DocumentGuidance;
use yolo_core::paths::{self, UserDirs};
use yolo_core::prompts::{MethodologyPrompts, PromptName};
use yolo_core::YoloError;
use yolo_llm::{CompletionError, CompletionService, Schema};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Per-invocation context: the project root and the merged user config.
pub struct Session {
    pub root: PathBuf,
    pub config: UserConfig,
}

impl Session {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let dirs = UserDirs::discover()?;
        let config = UserConfig::load(dirs).context("loading user configuration")?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn dirs(&self) -> &UserDirs {
        self.config.dirs()
    }

    /// Connect to the configured provider. Fails without credentials.
    pub fn completion(&self) -> anyhow::Result<Box<dyn CompletionService>> {
        let provider = self.config.provider_config()?;
        Ok(yolo_llm::connect(&provider)?)
    }

    /// Like [`Session::completion`], but a missing key yields a service whose
    /// every call fails. For commands that only need the model optionally.
    pub fn completion_or_offline(&self) -> anyhow::Result<Box<dyn CompletionService>> {
        match self.completion() {
            Ok(service) => Ok(service),
            Err(e) => match e.downcast_ref::<CompletionError>() {
                Some(CompletionError::NoCredentials { .. }) => {
                    tracing::debug!(reason = %e, "no completion service, running offline");
                    Ok(Box::new(Offline {
                        reason: e.to_string(),
                    }))
                }
                _ => Err(e),
            },
        }
    }

    /// A methodology prompt, honoring an override in the client state.
    pub fn prompt(&self, name: PromptName) -> anyhow::Result<String> {
        if let Some(text) = self.config.prompt_override(name.as_str()) {
            return Ok(text.to_string());
        }
        let prompts = MethodologyPrompts::load(self.dirs())?;
        Ok(prompts.get(name).to_string())
    }

    pub fn guidance(&self) -> anyhow::Result<DocumentGuidance> {
        DocumentGuidance::load(self.dirs(), &self.root).context("loading document prompts")
    }

    pub fn require_initialized(&self) -> anyhow::Result<()> {
        if !paths::is_initialized(&self.root) {
            return Err(YoloError::NotInitialized.into());
        }
        Ok(())
    }
}

struct Offline {
    reason: String,
}

impl CompletionService for Offline {
    fn complete(&self, _system: &str, _user: &str, _temperature: f32) -> yolo_llm::Result<String> {
        Err(CompletionError::Provider(self.reason.clone()))
    }

    fn complete_structured(
        &self,
        _system: &str,
        _user: &str,
        _schema: &Schema,
        _function_name: &str,
    ) -> yolo_llm::Result<Value> {
        Err(CompletionError::Provider(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Print the explainer's reading of `err` to stderr, then hand `err` back
/// so the command still exits non-zero.
pub fn explained(completion: &dyn CompletionService, err: anyhow::Error, context: &str) -> anyhow::Error {
    if let Some(explanation) = ErrorExplainer::new(completion).analyze(&format!("{err:#}"), context) {
        eprintln!("{explanation}");
    }
    err
}

/// Join positional words; read stdin when there are none.
pub fn text_or_stdin(words: &[String]) -> anyhow::Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("reading stdin")?;
    Ok(text)
}
