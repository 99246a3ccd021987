use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use yolo_core::composer::{CommitComposer, CommitOptions, CommitOutcome};
use yolo_core::history;
use yolo_core::materializer::Materializer;
use yolo_core::planner::PlanSynthesizer;
use yolo_core::relationships::{ItemRef, RelationshipManager, Relationships};
use yolo_core::scaffold::{init_project, InitOptions};
use yolo_core::store::WorkItemStore;
use yolo_core::vcs::{Git, Vcs};
use yolo_llm::scripted::ScriptedCompletion;
use yolo_llm::ProviderKind;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A fresh repository, or `None` when git is unavailable.
fn repo() -> Option<TempDir> {
    let dir = TempDir::new().unwrap();
    let p = dir.path();
    let ok = git(p, &["init", "-q"])
        && git(p, &["config", "user.name", "Test"])
        && git(p, &["config", "user.email", "test@example.com"])
        && git(p, &["config", "commit.gpgsign", "false"]);
    ok.then_some(dir)
}

fn commit_file(dir: &Path, name: &str, subject: &str) {
    std::fs::write(dir.join(name), subject).unwrap();
    assert!(git(dir, &["add", "-A"]));
    assert!(git(dir, &["commit", "-q", "-m", subject]));
}

#[test]
fn init_ingests_conventional_history() {
    let Some(dir) = repo() else {
        return;
    };
    let root = dir.path();
    commit_file(root, "login.rs", "feat(auth): add login");
    commit_file(root, "npe.rs", "fix: npe");
    commit_file(root, "README", "docs: readme");

    let vcs = Git::open(root).unwrap();
    let options = InitOptions {
        project_name: "shop".into(),
        provider: ProviderKind::OpenAi,
    };
    let report = init_project(root, &options, Some(&vcs), day()).unwrap();
    assert_eq!(report.history.commits, 3);

    let changelog = std::fs::read_to_string(root.join("CHANGELOG.md")).unwrap();
    let feat = changelog.find("### Feat\n- add login").unwrap();
    let fix = changelog.find("### Fix\n- npe").unwrap();
    let docs = changelog.find("### Docs\n- readme").unwrap();
    assert!(feat < fix && fix < docs, "{changelog}");

    let records = history::load(root).unwrap();
    assert_eq!(records[0].version, "0.1.0");
    assert_eq!(records[0].changes.len(), 3);
    assert_eq!(records[0].changes[0].files, ["login.rs"]);
}

#[test]
fn fallback_plan_materializes_with_linked_items() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    init_project(root, &InitOptions::for_root(root), None, day()).unwrap();

    let svc = ScriptedCompletion::new()
        .text("{ not json")
        .text("## Overview\nSetup.")
        .text("## Overview\nInfra.")
        .text("## Overview\nInit.")
        .text("# New Project\n\nAn online shop.");
    let synthesis = PlanSynthesizer::new(&svc).synthesize("an online shop").unwrap();
    assert!(synthesis.fell_back);
    let mut project = synthesis.project;
    assert_eq!(project.name, "New Project");

    let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let report = Materializer::new(&svc, root).materialize(&mut project, now);
    assert!(report.failures.is_empty(), "{report}");
    assert_eq!(report.written(), 3);
    assert!(report.readme_written, "scaffold README is replaced");
    assert_eq!(svc.remaining(), 0);

    let store = WorkItemStore::new(root);
    let feature = store.read(&"F001".parse().unwrap()).unwrap();
    let rels = Relationships::parse(feature.links_block().unwrap());
    assert_eq!(rels.parent_epic.unwrap().title, "Project Setup");
    assert_eq!(rels.tasks[0].title, "Project Initialization");
}

#[test]
fn relationship_updates_are_idempotent_and_local() {
    let dir = TempDir::new().unwrap();
    let store = WorkItemStore::new(dir.path());
    let id = "T007".parse().unwrap();
    let before = "# [T007] Refunds\n\n## Notes\nKeep me.\n\n## Relationships\n\
                  <!-- YOLO-LINKS-START -->\n<!-- YOLO-LINKS-END -->\n\nTrailing text.\n";
    store.write(&id, before).unwrap();

    let svc = ScriptedCompletion::new();
    let manager = RelationshipManager::new(&svc, &store);
    let rels = Relationships {
        parent_epic: Some(ItemRef::new("E001".parse().unwrap(), "Core")),
        parent_feature: Some(ItemRef::new("F002".parse().unwrap(), "Payments")),
        ..Relationships::default()
    };
    manager.update_relationships(&id, &rels).unwrap();
    let once = store.read_raw(&id).unwrap();
    manager.update_relationships(&id, &rels).unwrap();
    let twice = store.read_raw(&id).unwrap();
    assert_eq!(once, twice);

    assert!(once.contains(
        "## Relationships\n<!-- YOLO-LINKS-START -->\n- Parent Epic: [E001] Core\n\
         - Parent Feature: [F002] Payments\n<!-- YOLO-LINKS-END -->"
    ));
    assert!(once.starts_with("# [T007] Refunds\n\n## Notes\nKeep me.\n\n## Relationships\n"));
    assert!(once.ends_with("<!-- YOLO-LINKS-END -->\n\nTrailing text.\n"));
}

#[test]
fn commit_without_remote_records_history() {
    let Some(dir) = repo() else {
        return;
    };
    let root = dir.path();
    commit_file(root, "a.txt", "chore: start");
    std::fs::write(root.join("b.txt"), "new\n").unwrap();

    let vcs = Git::open(root).unwrap();
    let svc = ScriptedCompletion::new().structured(json!({
        "type": "feat",
        "scope": "files",
        "subject": "add b.",
    }));
    let outcome = CommitComposer::new(root, &vcs, &svc)
        .run(&CommitOptions::default(), day())
        .unwrap();
    let CommitOutcome::Committed(report) = outcome else {
        panic!("expected a commit");
    };
    assert_eq!(report.formatted, "feat(files): add b");
    assert!(!report.synced);

    let log = vcs.log().unwrap();
    let subjects: Vec<&str> = log.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(
        subjects,
        ["chore: start", "feat(files): add b", "docs: update YOLO documentation"]
    );
    assert!(!vcs.has_changes().unwrap());

    let records = history::load(root).unwrap();
    assert_eq!(records.last().unwrap().changes[0].subject.as_deref(), Some("add b"));
}
