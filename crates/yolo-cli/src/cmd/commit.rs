use super::Session;
use anyhow::Context;
use std::path::Path;
use yolo_core::composer::{CommitComposer, CommitOptions, CommitOutcome};
use yolo_core::explainer::ErrorExplainer;
use yolo_core::vcs::{Git, Vcs};

pub fn run(root: &Path, no_sync: bool, force: bool, message: Option<String>) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    let git = Git::open(root)?;
    if !git.has_repo() {
        anyhow::bail!("{} is not a git repository", root.display());
    }
    if !git.has_changes().context("reading the working tree")? {
        println!("Nothing to commit.");
        return Ok(());
    }
    // A message given on the command line needs no model.
    let completion = match message {
        Some(_) => session.completion_or_offline()?,
        None => session.completion()?,
    };

    let options = CommitOptions {
        no_sync,
        force,
        message,
    };
    let today = chrono::Local::now().date_naive();
    let outcome = match CommitComposer::new(root, &git, completion.as_ref()).run(&options, today) {
        Ok(outcome) => outcome,
        Err(failure) => {
            let raw = failure.source.to_string();
            let explanation = failure.explanation.clone().or_else(|| {
                ErrorExplainer::new(completion.as_ref())
                    .analyze(&raw, failure.step.context())
                    .map(|e| e.to_string())
            });
            // The composer hands back the raw error when analysis failed.
            if let Some(explanation) = explanation.filter(|e| *e != raw) {
                eprintln!("{explanation}");
            }
            let step = failure.step.context();
            return Err(anyhow::Error::new(failure.source)).context(step);
        }
    };

    match outcome {
        CommitOutcome::Clean => println!("Nothing to commit."),
        CommitOutcome::Committed(report) => {
            println!("Committed: {}", report.formatted);
            if let Some(warning) = &report.pull_warning {
                eprintln!("warning: pull failed, pushed anyway\n{warning}");
            }
            if report.synced {
                println!("Synced with remote.");
            } else if !no_sync {
                println!("No remote configured; skipped sync.");
            }
            println!("Updated HISTORY.yml and committed documentation.");
        }
    }
    Ok(())
}
