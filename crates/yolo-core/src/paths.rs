use crate::error::{Result, YoloError};
use crate::types::{ItemId, ItemKind};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Repository layout
// ---------------------------------------------------------------------------

pub const YOLO_DIR: &str = "yolo";
pub const EPICS_DIR: &str = "yolo/epics";
pub const FEATURES_DIR: &str = "yolo/features";
pub const TASKS_DIR: &str = "yolo/tasks";
pub const RELATIONSHIPS_DIR: &str = "yolo/relationships";
pub const SETTINGS_DIR: &str = "yolo/settings";
pub const WEB_DIR: &str = "yolo/web";

pub const HISTORY_FILE: &str = "HISTORY.yml";
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";
pub const README_FILE: &str = "README.md";
pub const WISHES_FILE: &str = "WISHES.md";
pub const STRATEGY_FILE: &str = "STRATEGY.md";
pub const LLM_INSTRUCTIONS_FILE: &str = "LLM_INSTRUCTIONS.md";
pub const YOLO_README_FILE: &str = "yolo/README.md";
pub const PROMPTS_FILE: &str = "yolo/settings/prompts.yml";
pub const PROJECT_CONFIG_FILE: &str = "yolo/settings/config.yml";
pub const SPRINT_FILE: &str = "sprint.current.md";

/// Directories `init` guarantees, in creation order.
pub const REQUIRED_DIRS: [&str; 6] = [
    YOLO_DIR,
    EPICS_DIR,
    FEATURES_DIR,
    TASKS_DIR,
    RELATIONSHIPS_DIR,
    SETTINGS_DIR,
];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn kind_dir(root: &Path, kind: ItemKind) -> PathBuf {
    root.join(YOLO_DIR).join(kind.dir_name())
}

pub fn item_path(root: &Path, id: &ItemId) -> PathBuf {
    kind_dir(root, id.kind()).join(format!("{id}.md"))
}

pub fn history_path(root: &Path) -> PathBuf {
    root.join(HISTORY_FILE)
}

pub fn changelog_path(root: &Path) -> PathBuf {
    root.join(CHANGELOG_FILE)
}

pub fn is_initialized(root: &Path) -> bool {
    root.join(YOLO_DIR).is_dir()
}

// ---------------------------------------------------------------------------
// Per-user locations
// ---------------------------------------------------------------------------

/// Overrides `<user-config>/yolo`.
pub const CONFIG_DIR_ENV: &str = "YOLO_CONFIG_DIR";
/// Overrides `<user-home>/.yolo`.
pub const HOME_DIR_ENV: &str = "YOLO_HOME";

/// Where per-user settings live. Resolved once and passed down rather than
/// looked up by each component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirs {
    /// `<user-config>/yolo`
    pub config_dir: PathBuf,
    /// `<user-home>/.yolo`
    pub home_dir: PathBuf,
}

impl UserDirs {
    pub fn discover() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or(YoloError::ConfigDirNotFound)?
                .join("yolo"),
        };
        let home_dir = match std::env::var_os(HOME_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir().ok_or(YoloError::HomeNotFound)?.join(".yolo"),
        };
        Ok(Self {
            config_dir,
            home_dir,
        })
    }

    /// Both directories under one base; handy for tests.
    pub fn under(base: &Path) -> Self {
        Self {
            config_dir: base.join("config").join("yolo"),
            home_dir: base.join("home").join(".yolo"),
        }
    }

    /// `<user-config>/yolo/settings/config.yml`
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings").join("config.yml")
    }

    /// `<user-home>/.yolo/config.json`
    pub fn client_file(&self) -> PathBuf {
        self.home_dir.join("config.json")
    }

    /// `<user-config>/yolo/methodology_prompts.yml`
    pub fn methodology_prompts_file(&self) -> PathBuf {
        self.config_dir.join("methodology_prompts.yml")
    }
}
