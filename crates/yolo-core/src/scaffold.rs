use crate::config::ProjectConfig;
use crate::error::Result;
use crate::history::{self, SeedReport};
use crate::io;
use crate::paths;
use crate::prompts::ProjectPrompts;
use crate::vcs::Vcs;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use yolo_llm::ProviderKind;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub project_name: String,
    pub provider: ProviderKind,
}

impl InitOptions {
    /// Name the project after its directory.
    pub fn for_root(root: &Path) -> Self {
        let project_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "project".to_string());
        Self {
            project_name,
            provider: ProviderKind::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
    /// Files left alone because they already existed.
    pub kept: Vec<PathBuf>,
    pub history: SeedReport,
}

const README_BODY: &str = "Project created with the YOLO methodology.\n\n\
    ## Overview\n\n\
    Epics, features and tasks live under `yolo/`. Run `yolo explain` for the methodology.\n";

pub fn default_readme(project_name: &str) -> String {
    format!("# {project_name}\n\n{README_BODY}")
}

/// True when `content` is still the README that `init` wrote, whatever
/// title it was given.
pub fn is_default_readme(content: &str) -> bool {
    let body = match content.split_once('\n') {
        Some((title, body)) if title.starts_with("# ") => body,
        _ => return false,
    };
    body.trim() == README_BODY.trim()
}

const STRATEGY: &str = "# Project Strategy\n\n\
    Long-term goals, architectural decisions and the reasoning behind them.\n";

const WISHES: &str = "# Project Wishes\n\n\
    Ideas and improvements that are not planned yet.\n";

const LLM_INSTRUCTIONS: &str = "# Instructions for AI Assistants\n\n\
    1. Never delete documentation; mark superseded items as `deprecated`.\n\
    2. Record every change in HISTORY.yml and CHANGELOG.md.\n\
    3. Keep relationships explicit: tasks name their feature, features their epic.\n\
    4. Do not edit between `<!-- YOLO-LINKS-START -->` and `<!-- YOLO-LINKS-END -->`; yolo maintains that block.\n\
    5. Use conventional commit messages.\n";

const YOLO_README: &str = "# YOLO Documentation\n\n\
    - `epics/`: strategic initiatives (`E001.md`, ...)\n\
    - `features/`: capabilities within an epic (`F001.md`, ...)\n\
    - `tasks/`: implementation work within a feature (`T001.md`, ...)\n\
    - `relationships/`: reserved\n\
    - `settings/`: `config.yml` and `prompts.yml`\n";

/// Lay out the YOLO tree under `root`. Existing files are never
/// overwritten, so running it twice is harmless.
pub fn init_project(
    root: &Path,
    options: &InitOptions,
    vcs: Option<&dyn Vcs>,
    date: NaiveDate,
) -> Result<InitReport> {
    let mut report = InitReport::default();
    for dir in paths::REQUIRED_DIRS {
        io::ensure_dir(&root.join(dir))?;
    }

    let config = ProjectConfig {
        project_name: options.project_name.clone(),
        ai_provider: options.provider.as_str().to_string(),
        use_conventional_commits: true,
    };
    let files: Vec<(&str, String)> = vec![
        (paths::README_FILE, default_readme(&options.project_name)),
        (paths::WISHES_FILE, WISHES.to_string()),
        (paths::STRATEGY_FILE, STRATEGY.to_string()),
        (paths::LLM_INSTRUCTIONS_FILE, LLM_INSTRUCTIONS.to_string()),
        (paths::YOLO_README_FILE, YOLO_README.to_string()),
        (
            paths::PROMPTS_FILE,
            serde_yaml::to_string(&ProjectPrompts::default())?,
        ),
        (paths::PROJECT_CONFIG_FILE, serde_yaml::to_string(&config)?),
    ];

    for (name, content) in files {
        let path = root.join(name);
        if io::create_new(&path, content.as_bytes())? {
            tracing::debug!(path = %path.display(), "created");
            report.created.push(path);
        } else {
            report.kept.push(path);
        }
    }

    report.history = history::seed(root, vcs, date)?;
    report.created.extend(report.history.written.iter().cloned());
    tracing::info!(created = report.created.len(), "project initialized");
    Ok(report)
}
