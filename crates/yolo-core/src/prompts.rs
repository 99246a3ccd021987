//! Named methodology prompts, overridable per user in
//! `<user-config>/yolo/methodology_prompts.yml`.

use crate::error::{Result, YoloError};
use crate::io;
use crate::paths::{self, UserDirs};
use crate::types::ItemKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptName {
    Standard,
    Changelog,
    Readme,
    Epic,
    Feature,
    Task,
    History,
    Methodology,
}

impl PromptName {
    pub const ALL: [PromptName; 8] = [
        PromptName::Standard,
        PromptName::Changelog,
        PromptName::Readme,
        PromptName::Epic,
        PromptName::Feature,
        PromptName::Task,
        PromptName::History,
        PromptName::Methodology,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptName::Standard => "standard",
            PromptName::Changelog => "changelog",
            PromptName::Readme => "readme",
            PromptName::Epic => "epic",
            PromptName::Feature => "feature",
            PromptName::Task => "task",
            PromptName::History => "history",
            PromptName::Methodology => "methodology",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            PromptName::Standard => "standard documentation prompt",
            PromptName::Changelog => "changelog update prompt",
            PromptName::Readme => "README update prompt",
            PromptName::Epic => "epic documentation prompt",
            PromptName::Feature => "feature documentation prompt",
            PromptName::Task => "task documentation prompt",
            PromptName::History => "history update prompt",
            PromptName::Methodology => "YOLO methodology explanation",
        }
    }
}

impl fmt::Display for PromptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptName {
    type Err = YoloError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PromptName::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = PromptName::ALL.iter().map(|p| p.as_str()).collect();
                YoloError::Usage(format!(
                    "unknown prompt '{s}': expected one of {}",
                    names.join(", ")
                ))
            })
    }
}

pub const METHODOLOGY: &str = "# The YOLO Methodology

## Principles

1. Never delete. Superseded work is marked `deprecated`.
2. Keep the full history: every change lands in HISTORY.yml and CHANGELOG.md.
3. Make relationships explicit: every task names its feature, every feature its epic.

## Layout

yolo/
  epics/          strategic initiatives (E001.md, E002.md, ...)
  features/       deliverable capabilities (F001.md, ...)
  tasks/          units of implementation work (T001.md, ...)
  relationships/  reserved for cross-item links
  settings/       project configuration and prompts

Root files: README.md (overview), STRATEGY.md (long-term direction),
WISHES.md (ideas not yet planned), LLM_INSTRUCTIONS.md (rules for assistants),
HISTORY.yml (machine history) and CHANGELOG.md (human history).

## Work items

Each item is one Markdown file titled `# [ID] name` with Overview, Status,
Dependencies, Acceptance Criteria and Notes sections. The block between
`<!-- YOLO-LINKS-START -->` and `<!-- YOLO-LINKS-END -->` under
`## Relationships` is maintained by yolo; edit everything else freely.

Statuses: planned, in-progress, completed, deprecated.

## Workflow

- `yolo init` sets up the layout and seeds history from git.
- `yolo epic|feature|task <description>` adds linked work items.
- `yolo commit` writes a conventional commit, syncs, and records history.
- `yolo graph` shows the epic/feature/task graph in the browser.
";

/// The eight prompts. Missing keys in the user file fall back to the
/// built-in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodologyPrompts {
    pub standard_documentation: String,
    pub update_changelog: String,
    pub update_readme: String,
    pub epic_documentation: String,
    pub feature_documentation: String,
    pub task_documentation: String,
    pub update_history: String,
    pub methodology: String,
}

impl Default for MethodologyPrompts {
    fn default() -> Self {
        Self {
            standard_documentation: "# Standard Documentation\n\
                Document this change following the YOLO methodology:\n\
                - what changed and why, in plain language\n\
                - usage examples where they help\n\
                - pitfalls and how to avoid them\n\
                - links to the epics, features and tasks involved\n"
                .into(),
            update_changelog: "# Changelog Update\n\
                Update CHANGELOG.md following the YOLO methodology:\n\
                - append, never rewrite earlier entries\n\
                - group changes under the version and date\n\
                - one heading per conventional commit type\n\
                - reference the work items each change belongs to\n"
                .into(),
            update_readme: "# README Update\n\
                Update README.md following the YOLO methodology:\n\
                - project overview and current status\n\
                - installation and quick start\n\
                - pointers to yolo/ for epics, features and tasks\n"
                .into(),
            epic_documentation: "# Epic Documentation\n\
                Document this epic following the YOLO methodology:\n\
                - high-level overview and business value\n\
                - success criteria\n\
                - the features it groups\n\
                - dependencies and risks\n"
                .into(),
            feature_documentation: "# Feature Documentation\n\
                Document this feature following the YOLO methodology:\n\
                - purpose and scope\n\
                - parent epic\n\
                - technical design and acceptance criteria\n\
                - the tasks that implement it\n"
                .into(),
            task_documentation: "# Task Documentation\n\
                Document this task following the YOLO methodology:\n\
                - specific objective\n\
                - parent feature\n\
                - implementation steps\n\
                - acceptance criteria and dependencies\n"
                .into(),
            update_history: "# History Update\n\
                Append to HISTORY.yml following the YOLO methodology:\n\
                - never edit earlier records\n\
                - one change per commit with type, scope, subject and files\n\
                - note breaking changes and migrations\n"
                .into(),
            methodology: METHODOLOGY.into(),
        }
    }
}

impl MethodologyPrompts {
    pub fn load(dirs: &UserDirs) -> Result<Self> {
        let path = dirs.methodology_prompts_file();
        match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::default()),
            Ok(text) => serde_yaml::from_str(&text).map_err(|e| YoloError::InvalidConfig {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the user file with the built-in prompts.
    pub fn reset(dirs: &UserDirs) -> Result<PathBuf> {
        let path = dirs.methodology_prompts_file();
        let data = serde_yaml::to_string(&Self::default())?;
        io::atomic_write(&path, data.as_bytes())?;
        Ok(path)
    }

    pub fn get(&self, name: PromptName) -> &str {
        match name {
            PromptName::Standard => &self.standard_documentation,
            PromptName::Changelog => &self.update_changelog,
            PromptName::Readme => &self.update_readme,
            PromptName::Epic => &self.epic_documentation,
            PromptName::Feature => &self.feature_documentation,
            PromptName::Task => &self.task_documentation,
            PromptName::History => &self.update_history,
            PromptName::Methodology => &self.methodology,
        }
    }
}

// ---------------------------------------------------------------------------
// Project prompts
// ---------------------------------------------------------------------------

/// `yolo/settings/prompts.yml`: per-project guidance appended to document
/// generation prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectPrompts {
    pub epic: String,
    pub feature: String,
    pub task: String,
    pub readme: String,
}

impl Default for ProjectPrompts {
    fn default() -> Self {
        Self {
            epic: "Focus on business value and measurable success criteria.".into(),
            feature: "Describe user-visible behavior and how it will be verified.".into(),
            task: "Keep steps concrete enough to finish in a day or two.".into(),
            readme: "Write for a new contributor seeing the project for the first time.".into(),
        }
    }
}

impl ProjectPrompts {
    pub fn path(root: &Path) -> PathBuf {
        root.join(paths::PROMPTS_FILE)
    }

    /// Missing file means defaults; a malformed one is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::default()),
            Ok(text) => serde_yaml::from_str(&text).map_err(|e| YoloError::InvalidConfig {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn for_kind(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Epic => &self.epic,
            ItemKind::Feature => &self.feature,
            ItemKind::Task => &self.task,
        }
    }
}
