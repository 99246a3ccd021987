//! Version-control adapter. Everything the engine needs from git goes
//! through [`Vcs`]; [`Git`] shells out to the `git` binary.

use crate::error::{Result, YoloError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Diff lines kept in a [`ChangeSummary`].
pub const MAX_DIFF_LINES: usize = 50;
pub const TRUNCATION_MARKER: &str = "… (truncated)";
const MAX_STAT_FILES: usize = 5;

/// Bounded description of the working tree. This is the only form of the
/// changes a completion ever sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub staged: String,
    pub unstaged: String,
    pub untracked: Vec<String>,
    pub diff: String,
    /// Every path touched, staged or not.
    pub files: Vec<String>,
}

impl ChangeSummary {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.staged.is_empty() {
            out.push_str("Staged changes:\n");
            out.push_str(&self.staged);
            out.push('\n');
        }
        if !self.unstaged.is_empty() {
            out.push_str("Unstaged changes:\n");
            out.push_str(&self.unstaged);
            out.push('\n');
        }
        if !self.untracked.is_empty() {
            out.push_str("Untracked files:\n");
            for path in &self.untracked {
                out.push_str("  ");
                out.push_str(path);
                out.push('\n');
            }
        }
        if !self.diff.is_empty() {
            out.push_str("\nDiff:\n");
            out.push_str(&self.diff);
            out.push('\n');
        }
        out
    }
}

/// One commit from [`Vcs::log`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub hash: String,
    pub author: String,
    /// RFC 3339.
    pub date: String,
    pub subject: String,
    pub files: Vec<String>,
}

pub trait Vcs {
    fn has_repo(&self) -> bool;
    fn has_changes(&self) -> Result<bool>;
    fn has_remote(&self) -> Result<bool>;
    fn summarize(&self) -> Result<ChangeSummary>;
    /// Stage everything, untracked files included.
    fn stage(&self) -> Result<()>;
    fn commit(&self, message: &str) -> Result<()>;
    fn pull(&self) -> Result<()>;
    fn push(&self) -> Result<()>;
    fn current_branch(&self) -> Result<String>;
    /// Commits oldest first. An empty repository yields an empty log.
    fn log(&self) -> Result<Vec<LogEntry>>;
}

// ---------------------------------------------------------------------------
// git
// ---------------------------------------------------------------------------

pub struct Git {
    root: PathBuf,
    bin: PathBuf,
}

impl Git {
    /// Fails with `GitNotInstalled` when no `git` is on PATH.
    pub fn open(root: &Path) -> Result<Self> {
        let bin = which::which("git").map_err(|_| YoloError::GitNotInstalled)?;
        Ok(Self {
            root: root.to_path_buf(),
            bin,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run git and return stdout. A non-zero exit carries the combined
    /// stdout and stderr.
    fn run(&self, args: &[&str]) -> Result<String> {
        tracing::debug!(?args, "git");
        let output = Command::new(&self.bin)
            .args(args)
            .current_dir(&self.root)
            .output()?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(YoloError::Vcs {
                command: args.first().copied().unwrap_or_default().to_string(),
                output: combined.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn succeeds(&self, args: &[&str]) -> bool {
        self.run(args).is_ok()
    }

    fn first_remote(&self) -> Result<String> {
        let remotes = self.run(&["remote"])?;
        remotes
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| YoloError::Vcs {
                command: "remote".into(),
                output: "no remote configured".into(),
            })
    }
}

impl Vcs for Git {
    fn has_repo(&self) -> bool {
        self.succeeds(&["rev-parse", "--is-inside-work-tree"])
    }

    fn has_changes(&self) -> Result<bool> {
        Ok(!self.run(&["status", "--porcelain"])?.trim().is_empty())
    }

    fn has_remote(&self) -> Result<bool> {
        Ok(!self.run(&["remote"])?.trim().is_empty())
    }

    fn summarize(&self) -> Result<ChangeSummary> {
        let staged = self.run(&["diff", "--cached", "--numstat"])?;
        let unstaged = self.run(&["diff", "--numstat"])?;
        let untracked = self.run(&["ls-files", "--others", "--exclude-standard"])?;
        let mut diff = self.run(&["diff", "--cached", "--unified=1"])?;
        diff.push_str(&self.run(&["diff", "--unified=1"])?);

        let untracked: Vec<String> = untracked
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        let mut files = numstat_paths(&staged);
        files.extend(numstat_paths(&unstaged));
        files.extend(untracked.iter().cloned());
        files.sort();
        files.dedup();

        Ok(ChangeSummary {
            staged: format_numstat(&staged),
            unstaged: format_numstat(&unstaged),
            untracked,
            diff: truncate_diff(&diff, MAX_DIFF_LINES),
            files,
        })
    }

    fn stage(&self) -> Result<()> {
        self.run(&["add", "-A"]).map(drop)
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).map(drop)
    }

    fn pull(&self) -> Result<()> {
        let remote = self.first_remote()?;
        let branch = self.current_branch()?;
        self.run(&["pull", &remote, &branch]).map(drop)
    }

    fn push(&self) -> Result<()> {
        let remote = self.first_remote()?;
        let branch = self.current_branch()?;
        self.run(&["push", &remote, &branch]).map(drop)
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    fn log(&self) -> Result<Vec<LogEntry>> {
        if !self.succeeds(&["rev-parse", "--verify", "--quiet", "HEAD"]) {
            return Ok(Vec::new());
        }
        let raw = self.run(&[
            "log",
            "--reverse",
            "--name-only",
            "--pretty=format:%x1e%H%x1f%an%x1f%aI%x1f%s",
        ])?;
        Ok(parse_log(&raw))
    }
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

/// Parse `git log --name-only` output written with record separator `\x1e`
/// and field separator `\x1f`.
pub fn parse_log(raw: &str) -> Vec<LogEntry> {
    raw.split('\x1e')
        .filter_map(|record| {
            let mut lines = record.lines();
            let header = lines.next()?;
            let mut fields = header.splitn(4, '\x1f');
            let hash = fields.next()?.trim();
            if hash.is_empty() {
                return None;
            }
            Some(LogEntry {
                hash: hash.to_string(),
                author: fields.next().unwrap_or_default().to_string(),
                date: fields.next().unwrap_or_default().to_string(),
                subject: fields.next().unwrap_or_default().to_string(),
                files: lines
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Render `--numstat` output as `path (+a/-r)` lines, at most five, followed
/// by a total. Binary files show as `bin` and count as zero lines.
pub fn format_numstat(raw: &str) -> String {
    let mut lines = Vec::new();
    let (mut added, mut removed, mut files) = (0u64, 0u64, 0usize);
    for line in raw.lines() {
        let mut parts = line.splitn(3, '\t');
        let (Some(a), Some(r), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let a_n: u64 = a.parse().unwrap_or(0);
        let r_n: u64 = r.parse().unwrap_or(0);
        added += a_n;
        removed += r_n;
        files += 1;
        if lines.len() < MAX_STAT_FILES {
            let shown = |n: &str| if n == "-" { "bin".to_string() } else { n.to_string() };
            lines.push(format!("  {path} (+{}/-{})", shown(a), shown(r)));
        }
    }
    if files == 0 {
        return String::new();
    }
    if files > MAX_STAT_FILES {
        lines.push(format!("  ... and {} more files", files - MAX_STAT_FILES));
    }
    lines.push(format!("  Total: +{added}/-{removed} across {files} files"));
    lines.join("\n")
}

fn numstat_paths(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|l| l.splitn(3, '\t').nth(2))
        .map(str::to_string)
        .collect()
}

/// Keep the first `max_lines` lines of `diff`, marking the cut.
pub fn truncate_diff(diff: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = diff.lines().collect();
    if lines.len() <= max_lines {
        return lines.join("\n");
    }
    let mut out = lines[..max_lines].join("\n");
    out.push('\n');
    out.push_str(TRUNCATION_MARKER);
    out
}
