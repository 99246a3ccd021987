//! `HISTORY.yml` and `CHANGELOG.md`: both append-only.

use crate::conventional::{capitalize, CommitMessage, CommitType};
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::vcs::{LogEntry, Vcs};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const INITIAL_VERSION: &str = "0.1.0";
pub const CHANGELOG_HEADER: &str = "# Changelog\n";
pub const NO_IMPACT: &str = "No impact specified";
pub const STATUS_IMPLEMENTED: &str = "implemented";
const OTHER_TYPE: &str = "other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub version: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub status: String,
}

impl Change {
    /// Changelog line text: description, falling back to the subject.
    pub fn summary(&self) -> &str {
        self.description
            .as_deref()
            .or(self.subject.as_deref())
            .unwrap_or_default()
    }

    pub fn from_commit(message: &CommitMessage, files: Vec<String>) -> Self {
        Self {
            kind: message.kind.as_str().to_string(),
            scope: message.scope.clone(),
            subject: Some(message.subject.clone()),
            body: message.body.clone(),
            files,
            status: STATUS_IMPLEMENTED.to_string(),
            ..Default::default()
        }
    }
}

impl HistoryRecord {
    pub fn new(version: impl Into<String>, date: NaiveDate, changes: Vec<Change>) -> Self {
        Self {
            version: version.into(),
            date: date.format("%Y-%m-%d").to_string(),
            changes,
        }
    }

    /// The record written when a project starts without usable history.
    pub fn initial(date: NaiveDate) -> Self {
        Self::new(
            INITIAL_VERSION,
            date,
            vec![Change {
                kind: CommitType::Chore.as_str().to_string(),
                description: Some("initialize YOLO methodology".to_string()),
                status: STATUS_IMPLEMENTED.to_string(),
                ..Default::default()
            }],
        )
    }
}

// ---------------------------------------------------------------------------
// Commit subjects
// ---------------------------------------------------------------------------

/// Split a log subject into a change. `type(scope): rest` yields the type and
/// scope; anything else is type `other`. A parenthesized suffix of `rest` is
/// the impact.
pub fn change_from_subject(subject: &str, files: Vec<String>) -> Change {
    let (kind, scope, rest) = split_subject(subject);
    let (description, impact) = match rest.strip_suffix(')').and_then(|r| r.rsplit_once('(')) {
        Some((text, impact)) if !text.trim().is_empty() => {
            (text.trim().to_string(), impact.trim().to_string())
        }
        _ => (rest.trim().to_string(), NO_IMPACT.to_string()),
    };
    Change {
        kind,
        scope,
        description: Some(description),
        impact: Some(impact),
        files,
        status: STATUS_IMPLEMENTED.to_string(),
        ..Default::default()
    }
}

fn split_subject(subject: &str) -> (String, Option<String>, &str) {
    let other = (OTHER_TYPE.to_string(), None, subject);
    let Some((prefix, rest)) = subject.split_once(':') else {
        return other;
    };
    let prefix = prefix.trim().trim_end_matches('!');
    let (kind, scope) = match prefix.split_once('(') {
        Some((kind, scope)) => match scope.strip_suffix(')') {
            Some(scope) => (kind, Some(scope.trim().to_string())),
            None => return other,
        },
        None => (prefix, None),
    };
    let valid = !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return other;
    }
    (
        kind.to_ascii_lowercase(),
        scope.filter(|s| !s.is_empty()),
        rest.trim_start(),
    )
}

/// One record covering every commit, oldest first.
pub fn record_from_log(log: &[LogEntry], date: NaiveDate) -> HistoryRecord {
    let changes = log
        .iter()
        .map(|entry| change_from_subject(&entry.subject, entry.files.clone()))
        .collect();
    HistoryRecord::new(INITIAL_VERSION, date, changes)
}

// ---------------------------------------------------------------------------
// CHANGELOG rendering
// ---------------------------------------------------------------------------

/// Markdown for one record, grouped by type in changelog order. Types
/// outside the conventional set land in a trailing `Other` group.
pub fn render_changelog_section(record: &HistoryRecord) -> String {
    let mut out = format!("## [{}] - {}\n\n", record.version, record.date);

    let mut push_group = |heading: &str, changes: Vec<&Change>| {
        if changes.is_empty() {
            return;
        }
        out.push_str(&format!("### {heading}\n"));
        for change in changes {
            out.push_str(&format!("- {}\n", change.summary()));
            if let Some(impact) = change.impact.as_deref().filter(|i| *i != NO_IMPACT) {
                out.push_str(&format!("  - Impact: {impact}\n"));
            }
        }
        out.push('\n');
    };

    for kind in CommitType::ALL {
        let group = record
            .changes
            .iter()
            .filter(|c| c.kind == kind.as_str())
            .collect();
        push_group(&kind.heading(), group);
    }
    let others = record
        .changes
        .iter()
        .filter(|c| c.kind.parse::<CommitType>().is_err())
        .collect();
    push_group(&capitalize(OTHER_TYPE), others);
    out
}

pub fn render_changelog(records: &[HistoryRecord]) -> String {
    let mut out = format!("{CHANGELOG_HEADER}\n");
    for record in records {
        out.push_str(&render_changelog_section(record));
    }
    out
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

pub fn load(root: &Path) -> Result<Vec<HistoryRecord>> {
    let path = paths::history_path(root);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&text)?)
}

pub fn latest_version(root: &Path) -> Result<Option<String>> {
    Ok(load(root)?.pop().map(|r| r.version))
}

fn record_yaml(record: &HistoryRecord) -> Result<String> {
    Ok(serde_yaml::to_string(std::slice::from_ref(record))?)
}

/// Append `record` to both files. Existing bytes are never rewritten.
pub fn append_record(root: &Path, record: &HistoryRecord) -> Result<()> {
    let history = paths::history_path(root);
    let mut text = record_yaml(record)?;
    let needs_newline = std::fs::read(&history)
        .map(|bytes| !bytes.is_empty() && !bytes.ends_with(b"\n"))
        .unwrap_or(false);
    if needs_newline {
        text.insert(0, '\n');
    }
    io::append_text(&history, &text)?;

    let changelog = paths::changelog_path(root);
    io::write_if_missing(&changelog, format!("{CHANGELOG_HEADER}\n").as_bytes())?;
    io::append_text(&changelog, &render_changelog_section(record))?;
    tracing::info!(version = %record.version, "history appended");
    Ok(())
}

/// What [`seed`] did.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub written: Vec<PathBuf>,
    pub commits: usize,
    /// Problems reading history; seeding still wrote the default record.
    pub errors: Vec<String>,
}

/// Create `HISTORY.yml` and `CHANGELOG.md` when missing: from the commit log
/// when there is one, otherwise from the initial record. Never overwrites
/// and never fails on a bad log.
pub fn seed(root: &Path, vcs: Option<&dyn Vcs>, date: NaiveDate) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let log = match vcs.filter(|v| v.has_repo()) {
        Some(vcs) => match vcs.log() {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(error = %e, "reading the commit log failed");
                report.errors.push(e.to_string());
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    report.commits = log.len();
    let record = if log.is_empty() {
        HistoryRecord::initial(date)
    } else {
        record_from_log(&log, date)
    };

    let history = paths::history_path(root);
    if io::create_new(&history, record_yaml(&record)?.as_bytes())? {
        report.written.push(history);
    }
    let changelog = paths::changelog_path(root);
    let rendered = render_changelog(std::slice::from_ref(&record));
    if io::create_new(&changelog, rendered.as_bytes())? {
        report.written.push(changelog);
    }
    Ok(report)
}
