use crate::error::{Result, YoloError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use yolo_llm::Schema;

pub const COMMIT_FUNCTION: &str = "generate_commit_message";
pub const MAX_SUBJECT_LEN: usize = 72;

const REFS_TRAILER: &str = "Refs: ";
const CO_AUTHOR_TRAILER: &str = "Co-authored-by: ";

/// Conventional-commit types, in changelog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
}

impl CommitType {
    pub const ALL: [CommitType; 10] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Build,
        CommitType::Ci,
        CommitType::Chore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
        }
    }

    /// Changelog group heading: `Feat`, `Fix`, ...
    pub fn heading(self) -> String {
        capitalize(self.as_str())
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = YoloError;

    fn from_str(s: &str) -> Result<Self> {
        CommitType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| YoloError::InvalidCommitMessage(format!("unknown commit type '{s}'")))
    }
}

/// A structured conventional commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    #[serde(rename = "type")]
    pub kind: CommitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub breaking: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub co_authors: Vec<String>,
}

impl CommitMessage {
    pub fn new(kind: CommitType, subject: impl Into<String>) -> Self {
        Self {
            kind,
            scope: None,
            subject: subject.into(),
            body: None,
            breaking: false,
            issue_refs: Vec::new(),
            co_authors: Vec::new(),
        }
    }

    /// `type(scope)!: subject`
    pub fn header(&self) -> String {
        let mut out = self.kind.as_str().to_string();
        if let Some(scope) = self.scope.as_deref().filter(|s| !s.is_empty()) {
            out.push('(');
            out.push_str(scope);
            out.push(')');
        }
        if self.breaking {
            out.push('!');
        }
        out.push_str(": ");
        out.push_str(&self.subject);
        out
    }

    pub fn format(&self) -> String {
        let mut out = self.header();
        if let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            out.push_str("\n\n");
            out.push_str(body);
        }

        let mut trailers = Vec::new();
        if !self.issue_refs.is_empty() {
            trailers.push(format!("{REFS_TRAILER}{}", self.issue_refs.join(", ")));
        }
        for author in &self.co_authors {
            trailers.push(format!("{CO_AUTHOR_TRAILER}{author}"));
        }
        if !trailers.is_empty() {
            out.push_str("\n\n");
            out.push_str(&trailers.join("\n"));
        }
        out
    }

    /// Clean up model output: trimmed single-line subject without a trailing
    /// period, capped at 72 characters; blank optionals become `None`.
    /// `Refs:` and `Co-authored-by:` paragraphs at the end of the body move
    /// into the trailer fields, so [`parse_conventional`] reads back exactly
    /// what [`CommitMessage::format`] writes.
    pub fn tidy(mut self) -> Result<Self> {
        let mut subject = self.subject.lines().next().unwrap_or("").trim().to_string();
        if let Some((cut, _)) = subject.char_indices().nth(MAX_SUBJECT_LEN) {
            subject.truncate(cut);
        }
        let subject = subject
            .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
            .to_string();
        if subject.is_empty() {
            return Err(YoloError::InvalidCommitMessage("empty subject".into()));
        }
        self.subject = subject;

        self.scope = self
            .scope
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(scope) = &self.scope {
            if scope.contains(['(', ')', ':', '\n']) {
                return Err(YoloError::InvalidCommitMessage(format!(
                    "scope '{scope}' may not contain parentheses, colons or line breaks"
                )));
            }
        }

        let mut refs = Vec::new();
        let mut authors = Vec::new();
        if let Some(body) = self.body.take() {
            let mut body = body.trim().to_string();
            let mut folded = Vec::new();
            loop {
                let mut paragraphs: Vec<&str> = body.split("\n\n").collect();
                if !paragraphs.last().is_some_and(|p| is_trailers(p)) {
                    break;
                }
                folded.extend(paragraphs.pop().map(str::to_string));
                body = paragraphs.join("\n\n").trim().to_string();
            }
            for line in folded.iter().rev().flat_map(|p| p.lines()) {
                if let Some(list) = line.strip_prefix(REFS_TRAILER) {
                    refs.push(list.to_string());
                } else if let Some(author) = line.strip_prefix(CO_AUTHOR_TRAILER) {
                    authors.push(author.to_string());
                }
            }
            self.body = Some(body).filter(|b| !b.is_empty());
        }
        refs.append(&mut self.issue_refs);
        authors.append(&mut self.co_authors);
        self.issue_refs = refs
            .iter()
            .flat_map(|r| r.split([',', '\n']))
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        self.co_authors = authors
            .iter()
            .flat_map(|a| a.lines())
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Ok(self)
    }
}

/// A paragraph made only of `Refs:` and `Co-authored-by:` lines.
fn is_trailers(paragraph: &str) -> bool {
    !paragraph.is_empty()
        && paragraph
            .lines()
            .all(|l| l.starts_with(REFS_TRAILER) || l.starts_with(CO_AUTHOR_TRAILER))
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Parse text produced by [`CommitMessage::format`]. A final paragraph made
/// only of trailer lines is read as trailers; round trips are exact for
/// messages that went through [`CommitMessage::tidy`].
pub fn parse_conventional(text: &str) -> Result<CommitMessage> {
    let invalid = |reason: &str| YoloError::InvalidCommitMessage(reason.to_string());
    let (header, rest) = match text.split_once('\n') {
        Some((header, rest)) => (header, Some(rest)),
        None => (text, None),
    };

    let (prefix, subject) = header
        .split_once(": ")
        .ok_or_else(|| invalid("missing ': ' after the type"))?;
    let (prefix, breaking) = match prefix.strip_suffix('!') {
        Some(p) => (p, true),
        None => (prefix, false),
    };
    let (kind, scope) = match prefix.split_once('(') {
        Some((kind, scope)) => {
            let scope = scope
                .strip_suffix(')')
                .ok_or_else(|| invalid("unterminated scope"))?;
            (kind, Some(scope.to_string()))
        }
        None => (prefix, None),
    };
    let mut message = CommitMessage::new(kind.parse()?, subject);
    message.scope = scope;
    message.breaking = breaking;

    let Some(rest) = rest else {
        return Ok(message);
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let mut paragraphs: Vec<&str> = rest.split("\n\n").collect();
    if paragraphs.last().is_some_and(|p| is_trailers(p)) {
        let trailers = paragraphs.pop().unwrap_or_default();
        for line in trailers.lines() {
            if let Some(refs) = line.strip_prefix(REFS_TRAILER) {
                message
                    .issue_refs
                    .extend(refs.split(", ").map(str::to_string));
            } else if let Some(author) = line.strip_prefix(CO_AUTHOR_TRAILER) {
                message.co_authors.push(author.to_string());
            }
        }
    }
    let body = paragraphs.join("\n\n");
    if !body.is_empty() {
        message.body = Some(body);
    }
    Ok(message)
}

/// Schema bound as the `generate_commit_message` function.
pub fn commit_message_schema() -> Schema {
    let types: Vec<&str> = CommitType::ALL.iter().map(|t| t.as_str()).collect();
    Schema::object()
        .describe("Generate a conventional commit message for the current changes")
        .property(
            "type",
            Schema::string()
                .describe("Conventional commit type")
                .one_of_strings(&types),
        )
        .property(
            "scope",
            Schema::string().describe("Optional area of the codebase affected"),
        )
        .property(
            "subject",
            Schema::string().describe(
                "Imperative summary, at most 72 characters, no trailing period",
            ),
        )
        .property(
            "body",
            Schema::string().describe("Optional longer explanation of what and why"),
        )
        .property(
            "breaking",
            Schema::boolean().describe("True when the change breaks compatibility"),
        )
        .property(
            "issue_refs",
            Schema::array(Schema::string()).describe("Referenced issue ids"),
        )
        .property(
            "co_authors",
            Schema::array(Schema::string()).describe("Co-authors as 'Name <email>'"),
        )
        .require(&["type", "subject"])
}
