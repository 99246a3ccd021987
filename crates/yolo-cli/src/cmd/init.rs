use super::{explained, text_or_stdin, Session};
use anyhow::Context;
use std::path::Path;
use yolo_core::materializer::Materializer;
use yolo_core::planner::PlanSynthesizer;
use yolo_core::scaffold::{init_project, InitOptions};
use yolo_core::vcs::{Git, Vcs};

pub fn run(root: &Path, describe: Option<&str>) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    println!("Initializing YOLO in: {}", root.display());

    let options = InitOptions {
        provider: session.config.provider()?,
        ..InitOptions::for_root(root)
    };
    let git = match Git::open(root) {
        Ok(git) => Some(git),
        Err(e) => {
            tracing::warn!(error = %e, "history will not be read from git");
            None
        }
    };
    let today = chrono::Local::now().date_naive();
    let report = init_project(root, &options, git.as_ref().map(|g| g as &dyn Vcs), today)
        .context("scaffolding the project")?;

    for path in &report.created {
        println!("  created: {}", relative(root, path));
    }
    for path in &report.kept {
        println!("  exists:  {}", relative(root, path));
    }
    if report.history.commits > 0 {
        println!("  history: {} commits ingested", report.history.commits);
    }
    for error in &report.history.errors {
        eprintln!("  warning: {error}");
    }

    if let Some(describe) = describe {
        let description = match describe {
            "-" => text_or_stdin(&[])?,
            text => text.to_string(),
        };
        plan(&session, description.trim())?;
    }

    println!("\nYOLO initialized.");
    Ok(())
}

/// Synthesize a plan from `description` and write it out.
fn plan(session: &Session, description: &str) -> anyhow::Result<()> {
    if description.is_empty() {
        anyhow::bail!("--describe needs a project description");
    }
    let completion = session.completion()?;
    let synthesis = PlanSynthesizer::new(completion.as_ref())
        .synthesize(description)
        .context("generating the project plan")
        .map_err(|e| explained(completion.as_ref(), e, "generating the project plan"))?;
    if synthesis.fell_back {
        eprintln!("warning: the model's plan could not be used; wrote the starter plan instead");
    }
    if let Some(advisory) = &synthesis.advisory {
        eprintln!("{advisory}");
    }

    let mut project = synthesis.project;
    let report = Materializer::new(completion.as_ref(), &session.root)
        .with_guidance(session.guidance()?)
        .materialize(&mut project, chrono::Utc::now());
    println!("\n{report}");
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
