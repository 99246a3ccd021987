//! `sprint.current.md`: a running journal of the current sprint.

use crate::error::{Result, YoloError};
use crate::io;
use crate::paths;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

const SEPARATOR_WIDTH: usize = 80;

pub fn sprint_path(root: &Path) -> PathBuf {
    root.join(paths::SPRINT_FILE)
}

fn entry(text: &str, at: NaiveDateTime) -> Result<String> {
    if text.trim().is_empty() {
        return Err(YoloError::Usage("no content provided".into()));
    }
    Ok(format!(
        "## Sprint Update - {}\n\n{text}",
        at.format("%Y-%m-%d %H:%M:%S")
    ))
}

/// Start a new journal. Fails if one already exists.
pub fn init(root: &Path, text: &str, at: NaiveDateTime) -> Result<PathBuf> {
    let path = sprint_path(root);
    let content = entry(text, at)?;
    if !io::create_new(&path, content.as_bytes())? {
        return Err(YoloError::Usage(format!(
            "{} already exists; use 'update' to add to it",
            paths::SPRINT_FILE
        )));
    }
    tracing::info!(path = %path.display(), "sprint started");
    Ok(path)
}

/// Append an entry below a separator. Fails if there is no journal yet.
pub fn update(root: &Path, text: &str, at: NaiveDateTime) -> Result<PathBuf> {
    let path = sprint_path(root);
    let content = entry(text, at)?;
    if !path.is_file() {
        return Err(YoloError::Usage(format!(
            "{} not found; use 'init' to start a sprint",
            paths::SPRINT_FILE
        )));
    }
    let separator = "-".repeat(SEPARATOR_WIDTH);
    io::append_text(&path, &format!("\n\n{separator}\n\n{content}"))?;
    tracing::info!(path = %path.display(), "sprint updated");
    Ok(path)
}
