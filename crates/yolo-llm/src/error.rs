use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no API key configured for {provider}: set {env_var} or run 'yolo ai config'")]
    NoCredentials { provider: String, env_var: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("the model returned no choices")]
    NoResponse,

    #[error("structured output for '{function}' did not match its schema: {reason}")]
    ShapeMismatch { function: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CompletionError {
    pub(crate) fn shape(function: &str, reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}
