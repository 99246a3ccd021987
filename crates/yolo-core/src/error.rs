use thiserror::Error;
use yolo_llm::CompletionError;

/// Coarse classification used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Shape,
    Filesystem,
    Logic,
    User,
}

#[derive(Debug, Error)]
pub enum YoloError {
    #[error("not initialized: run 'yolo init'")]
    NotInitialized,

    #[error("work item not found: {0}")]
    ItemNotFound(String),

    #[error("work item already exists: {0}")]
    ItemExists(String),

    #[error("invalid work item id '{0}': expected E, F or T followed by three digits")]
    InvalidId(String),

    #[error("invalid work item kind: {0}")]
    InvalidKind(String),

    #[error("invalid status '{0}': expected planned, in-progress, completed or deprecated")]
    InvalidStatus(String),

    #[error("parent {parent} of {child} not found")]
    ParentNotFound { child: String, parent: String },

    #[error("dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("no identifiers left for {0}: 999 items already exist")]
    IdSpaceExhausted(String),

    #[error("invalid commit message: {0}")]
    InvalidCommitMessage(String),

    #[error("{0}")]
    Usage(String),

    #[error("git {command} failed: {output}")]
    Vcs { command: String, output: String },

    #[error("git is not installed or not on PATH")]
    GitNotInstalled,

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("user configuration directory not found: set YOLO_CONFIG_DIR")]
    ConfigDirNotFound,

    #[error("invalid configuration in {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl YoloError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            YoloError::HomeNotFound
            | YoloError::ConfigDirNotFound
            | YoloError::InvalidConfig { .. }
            | YoloError::GitNotInstalled
            | YoloError::NotInitialized => ErrorKind::Configuration,
            YoloError::Completion(CompletionError::NoCredentials { .. }) => ErrorKind::Configuration,
            YoloError::Completion(CompletionError::ShapeMismatch { .. })
            | YoloError::InvalidCommitMessage(_) => ErrorKind::Shape,
            YoloError::Completion(_) | YoloError::Vcs { .. } => ErrorKind::Transport,
            YoloError::Io(_) | YoloError::Yaml(_) | YoloError::Json(_) => ErrorKind::Filesystem,
            YoloError::ItemExists(_)
            | YoloError::ParentNotFound { .. }
            | YoloError::DependencyCycle(_)
            | YoloError::IdSpaceExhausted(_) => ErrorKind::Logic,
            YoloError::ItemNotFound(_)
            | YoloError::InvalidId(_)
            | YoloError::InvalidKind(_)
            | YoloError::InvalidStatus(_)
            | YoloError::Usage(_) => ErrorKind::User,
        }
    }
}

pub type Result<T> = std::result::Result<T, YoloError>;
