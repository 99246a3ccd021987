//! Commit composition: change report → conventional message → commit →
//! optional sync → history update → documentation commit.

use crate::conventional::{commit_message_schema, parse_conventional, CommitMessage, COMMIT_FUNCTION};
use crate::error::YoloError;
use crate::explainer::ErrorExplainer;
use crate::history::{self, Change, HistoryRecord};
use crate::vcs::Vcs;
use chrono::NaiveDate;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use yolo_llm::{complete_as, CompletionService};

pub const DOC_COMMIT_SUBJECT: &str = "docs: update YOLO documentation";

const SYSTEM_PROMPT: &str = "You write conventional commit messages. Pick the single best type \
(feat, fix, docs, style, refactor, perf, test, build, ci, chore), an optional short scope, and an \
imperative subject of at most 72 characters without a trailing period. Add a body only when the \
change needs explanation. Mark breaking changes.";

/// Steps of one commit run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Analyze,
    Propose,
    Stage,
    Commit,
    Pull,
    Push,
    DocUpdate,
    DocCommit,
}

impl Step {
    /// Short human context for error reports.
    pub fn context(self) -> &'static str {
        match self {
            Step::Analyze => "analyzing changes",
            Step::Propose => "proposing a commit message",
            Step::Stage => "staging changes",
            Step::Commit => "committing",
            Step::Pull => "pulling from remote",
            Step::Push => "pushing to remote",
            Step::DocUpdate => "updating HISTORY.yml and CHANGELOG.md",
            Step::DocCommit => "committing documentation",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.context())
    }
}

/// A failed run: the step, the underlying error and, for sync failures, the
/// explainer's reading of it.
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct CommitFailure {
    pub step: Step,
    #[source]
    pub source: YoloError,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Skip pull and push.
    pub no_sync: bool,
    /// Continue past a failed pull.
    pub force: bool,
    /// Use this message instead of asking for one. Must be conventional.
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommitReport {
    pub message: CommitMessage,
    pub formatted: String,
    pub synced: bool,
    /// Explanation of a pull failure that `force` carried past.
    pub pull_warning: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// Nothing to commit.
    Clean,
    Committed(CommitReport),
}

pub struct CommitComposer<'a> {
    root: &'a Path,
    vcs: &'a dyn Vcs,
    completion: &'a dyn CompletionService,
}

impl<'a> CommitComposer<'a> {
    pub fn new(root: &'a Path, vcs: &'a dyn Vcs, completion: &'a dyn CompletionService) -> Self {
        Self {
            root,
            vcs,
            completion,
        }
    }

    pub fn run(&self, options: &CommitOptions, date: NaiveDate) -> Result<CommitOutcome, CommitFailure> {
        let fail = |step: Step| move |source: YoloError| CommitFailure {
            step,
            source,
            explanation: None,
        };

        if !self.vcs.has_changes().map_err(fail(Step::Analyze))? {
            tracing::info!("working tree clean");
            return Ok(CommitOutcome::Clean);
        }
        let summary = self.vcs.summarize().map_err(fail(Step::Analyze))?;

        let message = match &options.message {
            Some(text) => parse_conventional(text.trim()),
            None => self.propose(&summary.render()),
        }
        .and_then(CommitMessage::tidy)
        .map_err(fail(Step::Propose))?;
        let formatted = message.format();
        tracing::debug!(%formatted, "commit message");

        self.vcs.stage().map_err(fail(Step::Stage))?;
        self.vcs.commit(&formatted).map_err(fail(Step::Commit))?;
        tracing::info!(subject = %message.subject, "committed");

        let mut synced = false;
        let mut pull_warning = None;
        let wants_sync = !options.no_sync && self.vcs.has_remote().map_err(fail(Step::Pull))?;
        if wants_sync {
            if let Err(e) = self.vcs.pull() {
                let explanation = self.explain(&e, Step::Pull);
                if !options.force {
                    return Err(CommitFailure {
                        step: Step::Pull,
                        source: e,
                        explanation: Some(explanation),
                    });
                }
                tracing::warn!(error = %e, "pull failed, continuing because of --force");
                pull_warning = Some(explanation);
            }
            if let Err(e) = self.vcs.push() {
                let explanation = self.explain(&e, Step::Push);
                return Err(CommitFailure {
                    step: Step::Push,
                    source: e,
                    explanation: Some(explanation),
                });
            }
            synced = true;
        }

        let version = history::latest_version(self.root)
            .map_err(fail(Step::DocUpdate))?
            .unwrap_or_else(|| history::INITIAL_VERSION.to_string());
        let record = HistoryRecord::new(
            version,
            date,
            vec![Change::from_commit(&message, summary.files.clone())],
        );
        history::append_record(self.root, &record).map_err(fail(Step::DocUpdate))?;

        self.vcs.stage().map_err(fail(Step::DocCommit))?;
        self.vcs
            .commit(&format!("{DOC_COMMIT_SUBJECT}\n\n{formatted}"))
            .map_err(fail(Step::DocCommit))?;

        Ok(CommitOutcome::Committed(CommitReport {
            message,
            formatted,
            synced,
            pull_warning,
        }))
    }

    fn propose(&self, changes: &str) -> crate::Result<CommitMessage> {
        let user = format!("Write a commit message for these changes:\n\n{changes}");
        Ok(complete_as::<CommitMessage>(
            self.completion,
            SYSTEM_PROMPT,
            &user,
            &commit_message_schema(),
            COMMIT_FUNCTION,
        )?)
    }

    fn explain(&self, error: &YoloError, step: Step) -> String {
        ErrorExplainer::new(self.completion).explain(&error.to_string(), step.context())
    }
}
