use crate::error::{Result, YoloError};
use crate::io;
use crate::paths;
use crate::types::{ItemId, ItemKind, Status};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const LINKS_START: &str = "<!-- YOLO-LINKS-START -->";
pub const LINKS_END: &str = "<!-- YOLO-LINKS-END -->";
pub const RELATIONSHIPS_HEADING: &str = "## Relationships";

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// A parsed work-item file. The file is the source of truth; this is a
/// read-only view of it.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub path: PathBuf,
    #[serde(skip)]
    pub content: String,
}

impl WorkItem {
    pub fn kind(&self) -> ItemKind {
        self.id.kind()
    }

    /// Parse a work-item document.
    ///
    /// - id and title come from the `# [<ID>] <title>` line
    /// - description is the first `## Description` block (falling back to
    ///   `## Overview`) up to the next heading
    /// - status comes from `## Status: <value>` or a `- Current Status: <value>`
    ///   bullet; a missing status reads as `planned`, an unknown one is an error
    pub fn parse(path: &Path, content: &str) -> Result<WorkItem> {
        let (id, title) = parse_title(content).ok_or_else(|| {
            YoloError::InvalidId(format!("{}: missing '# [ID] title' line", path.display()))
        })?;
        let description = section(content, "Description")
            .or_else(|| section(content, "Overview"))
            .unwrap_or_default()
            .trim()
            .to_string();
        let status = match parse_status(content) {
            Some(raw) => raw.parse()?,
            None => Status::default(),
        };
        Ok(WorkItem {
            id,
            title,
            description,
            status,
            path: path.to_path_buf(),
            content: content.to_string(),
        })
    }

    /// Body of the first `## <heading>` section, if present.
    pub fn section(&self, heading: &str) -> Option<&str> {
        section(&self.content, heading)
    }

    /// Text between the relationship sentinels, exclusive.
    pub fn links_block(&self) -> Option<&str> {
        let start = self.content.find(LINKS_START)? + LINKS_START.len();
        let end = self.content[start..].find(LINKS_END)? + start;
        Some(&self.content[start..end])
    }
}

fn parse_title(content: &str) -> Option<(ItemId, String)> {
    let line = content
        .lines()
        .map(str::trim_end)
        .find(|l| l.starts_with("# "))?;
    let rest = line.trim_start_matches('#').trim_start();
    let rest = rest.strip_prefix('[')?;
    let close = rest.find(']')?;
    let id: ItemId = rest[..close].trim().parse().ok()?;
    let title = rest[close + 1..].trim().to_string();
    Some((id, title))
}

fn is_heading(line: &str) -> bool {
    line.starts_with("# ") || line.starts_with("## ")
}

fn section<'a>(content: &'a str, heading: &str) -> Option<&'a str> {
    let mut offset = 0;
    let mut body_start = None;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end();
        match body_start {
            None => {
                if let Some(rest) = trimmed.strip_prefix("## ") {
                    if rest.trim() == heading {
                        body_start = Some(offset + line.len());
                    }
                }
            }
            Some(start) => {
                if is_heading(trimmed) {
                    return Some(&content[start..offset]);
                }
            }
        }
        offset += line.len();
    }
    body_start.map(|start| &content[start.min(content.len())..])
}

fn parse_status(content: &str) -> Option<&str> {
    for line in content.lines() {
        let trimmed = line.trim();
        let value = trimmed
            .strip_prefix("## Status:")
            .or_else(|| trimmed.strip_prefix("- Current Status:"));
        if let Some(value) = value {
            let value = value.trim().trim_matches(|c| c == '*' || c == '`').trim();
            return Some(value.split_whitespace().next().unwrap_or(value));
        }
    }
    None
}

/// Rewrite the fenced relationship region of `content` with `block`, which
/// must itself carry both sentinels.
///
/// Without a fenced region the block is inserted under an existing
/// `## Relationships` heading, or appended after a blank line with its own
/// heading. Bytes outside the fenced region are never altered.
pub fn replace_links_block(content: &str, block: &str) -> String {
    if let Some(updated) = io::splice_between_markers(content, LINKS_START, LINKS_END, block) {
        return updated;
    }

    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == RELATIONSHIPS_HEADING && line.ends_with('\n') {
            let mut out = String::with_capacity(content.len() + block.len() + 1);
            out.push_str(&content[..offset]);
            out.push_str(block);
            out.push('\n');
            out.push_str(&content[offset..]);
            return out;
        }
    }

    let mut out = content.to_string();
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(RELATIONSHIPS_HEADING);
    out.push('\n');
    out.push_str(block);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// WorkItemStore
// ---------------------------------------------------------------------------

/// One Markdown file per item under `yolo/{epics,features,tasks}/`.
#[derive(Debug, Clone)]
pub struct WorkItemStore {
    root: PathBuf,
}

impl WorkItemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &ItemId) -> PathBuf {
        paths::item_path(&self.root, id)
    }

    pub fn exists(&self, id: &ItemId) -> bool {
        self.path_of(id).is_file()
    }

    /// Every parseable item of the given kinds, in kind order then id order.
    /// Files that fail to parse are logged and skipped.
    pub fn load_all(&self, kinds: &[ItemKind]) -> Result<Vec<WorkItem>> {
        let mut items = Vec::new();
        for kind in kinds {
            items.extend(self.list_by_kind(*kind)?);
        }
        Ok(items)
    }

    pub fn list_by_kind(&self, kind: ItemKind) -> Result<Vec<WorkItem>> {
        let dir = paths::kind_dir(&self.root, kind);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable work item");
                    continue;
                }
            };
            match WorkItem::parse(&path, &content) {
                Ok(item) if item.kind() == kind => items.push(item),
                Ok(item) => tracing::warn!(
                    path = %path.display(),
                    id = %item.id,
                    "skipping work item filed under the wrong kind"
                ),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable work item")
                }
            }
        }
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    pub fn read_raw(&self, id: &ItemId) -> Result<String> {
        match std::fs::read_to_string(self.path_of(id)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(YoloError::ItemNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read(&self, id: &ItemId) -> Result<WorkItem> {
        let content = self.read_raw(id)?;
        WorkItem::parse(&self.path_of(id), &content)
    }

    pub fn write(&self, id: &ItemId, content: &str) -> Result<PathBuf> {
        let path = self.path_of(id);
        io::atomic_write(&path, content.as_bytes())?;
        tracing::debug!(%id, path = %path.display(), "wrote work item");
        Ok(path)
    }

    /// Swap the fenced relationship region of `id`'s file for `block`.
    pub fn replace_relationship_block(&self, id: &ItemId, block: &str) -> Result<()> {
        let content = self.read_raw(id)?;
        let updated = replace_links_block(&content, block);
        if updated != content {
            io::atomic_write(&self.path_of(id), updated.as_bytes())?;
        }
        Ok(())
    }
}
