//! Turns a synthesized [`Project`] into work-item files and a README.
//!
//! Failures are collected per file and returned in a [`MaterializeReport`];
//! one bad document never stops the rest.

use crate::error::{Result, YoloError};
use crate::id;
use crate::io;
use crate::model::Project;
use crate::paths::{self, UserDirs};
use crate::planner;
use crate::prompts::{MethodologyPrompts, ProjectPrompts, PromptName};
use crate::relationships::{ItemRef, RelationshipManager, Relationships};
use crate::scaffold;
use crate::store::{replace_links_block, WorkItemStore, LINKS_END, LINKS_START};
use crate::types::{ItemId, ItemKind, Status};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use yolo_llm::CompletionService;

const DOC_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Document prompts
// ---------------------------------------------------------------------------

/// Guidance mixed into every document prompt.
#[derive(Debug, Clone, Default)]
pub struct DocumentGuidance {
    pub methodology: MethodologyPrompts,
    pub project: ProjectPrompts,
}

impl DocumentGuidance {
    pub fn load(dirs: &UserDirs, root: &Path) -> Result<Self> {
        Ok(Self {
            methodology: MethodologyPrompts::load(dirs)?,
            project: ProjectPrompts::load(root)?,
        })
    }

    fn for_kind(&self, kind: ItemKind) -> String {
        let name = match kind {
            ItemKind::Epic => PromptName::Epic,
            ItemKind::Feature => PromptName::Feature,
            ItemKind::Task => PromptName::Task,
        };
        let mut text = self.methodology.get(name).trim().to_string();
        let extra = self.project.for_kind(kind).trim();
        if !extra.is_empty() {
            text.push_str("\n\nProject guidance: ");
            text.push_str(extra);
        }
        text
    }
}

/// Everything needed to write one work-item document.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub status: Status,
    /// Parents from the epic down.
    pub parents: Vec<ItemRef>,
}

fn skeleton(draft: &ItemDraft) -> String {
    format!(
        "# [{id}] {name}\n\
         ## Overview\n\
         ## Status\n\
         \x20 - Current Status: {status}\n\
         \x20 - Priority: <low|medium|high>\n\
         \x20 - Timeline: <estimated duration>\n\
         ## Dependencies\n\
         ## Acceptance Criteria\n\
         ## Notes\n\
         ## Relationships\n\
         {LINKS_START}\n\
         {LINKS_END}\n",
        id = draft.id,
        name = draft.name,
        status = draft.status,
    )
}

/// Ask for the document of `draft` and tidy the reply so it always opens
/// with the title line and carries an (empty) relationship block.
pub fn render_document(
    completion: &dyn CompletionService,
    guidance: &DocumentGuidance,
    draft: &ItemDraft,
) -> Result<String> {
    let kind = draft.id.kind();
    let system = format!(
        "You write project documentation following the YOLO methodology.\n\n{}\n\n\
         Reply with Markdown only, using exactly this skeleton and filling every section. \
         Leave the lines between the two HTML comments empty.\n\n{}",
        guidance.for_kind(kind),
        skeleton(draft),
    );
    let mut user = format!(
        "{label} {id}: {name}\n\n{description}",
        label = kind.label(),
        id = draft.id,
        name = draft.name,
        description = draft.description,
    );
    for parent in &draft.parents {
        user.push_str(&format!(
            "\n\nParent {}: [{}] {}",
            parent.id.kind(),
            parent.id,
            parent.title
        ));
    }

    let reply = completion.complete(&system, &user, DOC_TEMPERATURE)?;
    Ok(tidy_document(&reply, draft))
}

fn tidy_document(reply: &str, draft: &ItemDraft) -> String {
    let mut text = strip_fence(reply).trim().to_string();
    let title = format!("# [{}] {}", draft.id, draft.name);
    let has_title = text
        .lines()
        .next()
        .is_some_and(|l| l.trim_start().starts_with(&format!("# [{}]", draft.id)));
    if !has_title {
        text = format!("{title}\n\n{text}");
    }
    text.push('\n');
    replace_links_block(&text, &Relationships::default().render())
}

/// Models like to wrap Markdown in a code fence.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => return trimmed,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct MaterializeReport {
    pub epics: usize,
    pub features: usize,
    pub tasks: usize,
    pub readme_written: bool,
    pub failures: Vec<Failure>,
}

impl MaterializeReport {
    pub fn written(&self) -> usize {
        self.epics + self.features + self.tasks
    }

    fn fail(&mut self, path: PathBuf, reason: impl fmt::Display) {
        let reason = reason.to_string();
        tracing::warn!(path = %path.display(), %reason, "materialization step failed");
        self.failures.push(Failure { path, reason });
    }

    fn count(&mut self, kind: ItemKind) {
        match kind {
            ItemKind::Epic => self.epics += 1,
            ItemKind::Feature => self.features += 1,
            ItemKind::Task => self.tasks += 1,
        }
    }
}

impl fmt::Display for MaterializeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Created {} epics, {} features, {} tasks",
            self.epics, self.features, self.tasks
        )?;
        if self.readme_written {
            writeln!(f, "Wrote README.md")?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "{} failures:", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  {}: {}", failure.path.display(), failure.reason)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Materializer
// ---------------------------------------------------------------------------

pub struct Materializer<'a> {
    completion: &'a dyn CompletionService,
    store: WorkItemStore,
    guidance: DocumentGuidance,
}

impl<'a> Materializer<'a> {
    pub fn new(completion: &'a dyn CompletionService, root: impl Into<PathBuf>) -> Self {
        Self {
            completion,
            store: WorkItemStore::new(root),
            guidance: DocumentGuidance::default(),
        }
    }

    pub fn with_guidance(mut self, guidance: DocumentGuidance) -> Self {
        self.guidance = guidance;
        self
    }

    /// Write every item of `project`, the README overview and the
    /// relationship blocks. Plan ids are renumbered to follow the items
    /// already on disk, and an existing item file is never replaced. Stamps
    /// the project with `now` first.
    pub fn materialize(&self, project: &mut Project, now: DateTime<Utc>) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        let root = self.store.root();
        for dir in [paths::YOLO_DIR, paths::EPICS_DIR, paths::FEATURES_DIR, paths::TASKS_DIR] {
            let path = root.join(dir);
            if let Err(e) = io::ensure_dir(&path) {
                report.fail(path, e);
            }
        }

        if let Err(e) = self.follow_existing(project) {
            report.fail(root.join(paths::YOLO_DIR), e);
            return report;
        }

        project.stamp(now);
        let mut written: Vec<ItemId> = Vec::new();
        for draft in drafts(project) {
            let path = self.store.path_of(&draft.id);
            match self.write_draft(&draft, &path) {
                Ok(()) => {
                    report.count(draft.id.kind());
                    written.push(draft.id);
                }
                Err(e) => report.fail(path, e),
            }
        }

        match self.write_overview(project) {
            Ok(wrote) => report.readme_written = wrote,
            Err(e) => report.fail(root.join(paths::README_FILE), e),
        }

        let manager = RelationshipManager::new(self.completion, &self.store);
        for (id, rels) in plan_relationships(project) {
            if !written.contains(&id) {
                continue;
            }
            if let Err(e) = manager.update_relationships(&id, &rels) {
                report.fail(self.store.path_of(&id), e);
            }
        }

        tracing::info!(
            written = report.written(),
            failures = report.failures.len(),
            "plan materialized"
        );
        report
    }

    /// Renumber `project` so its ids start after the highest ones on disk.
    fn follow_existing(&self, project: &mut Project) -> Result<()> {
        let root = self.store.root();
        let mut taken = [0u16; 3];
        for (slot, kind) in taken.iter_mut().zip(ItemKind::ALL) {
            *slot = id::highest(root, kind)?.map_or(0, |id| id.number());
        }
        let [epics, features, tasks] = taken;
        if taken != [0; 3] {
            tracing::info!(epics, features, tasks, "numbering plan after existing items");
        }
        planner::normalize_after(project, |kind| match kind {
            ItemKind::Epic => epics,
            ItemKind::Feature => features,
            ItemKind::Task => tasks,
        })
    }

    /// Claim the draft's file, then fill it with the rendered document. A
    /// file that already exists is left alone and reported.
    fn write_draft(&self, draft: &ItemDraft, path: &Path) -> Result<()> {
        if !io::create_new(path, b"")? {
            return Err(YoloError::ItemExists(draft.id.to_string()));
        }
        let result = render_document(self.completion, &self.guidance, draft)
            .and_then(|doc| self.store.write(&draft.id, &doc));
        if let Err(e) = result {
            if let Err(rm) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %rm, "could not release claimed file");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Write the README overview unless the user already has their own.
    fn write_overview(&self, project: &Project) -> Result<bool> {
        let path = self.store.root().join(paths::README_FILE);
        match std::fs::read_to_string(&path) {
            Ok(existing) if !scaffold::is_default_readme(&existing) => {
                tracing::debug!("keeping existing README.md");
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut epics = String::new();
        for epic in &project.epics {
            epics.push_str(&format!("- [{}] {}: {}\n", epic.id, epic.name, epic.description));
        }
        let system = format!(
            "{}\n\nWrite the project's README.md. Start with `# <project name>`, then an overview, \
             the epics with their IDs, and how to find details under yolo/. Reply with Markdown only.\n\n\
             Project guidance: {}",
            self.guidance.methodology.get(PromptName::Readme).trim(),
            self.guidance.project.readme.trim(),
        );
        let user = format!(
            "Project: {}\n\n{}\n\nEpics:\n{epics}",
            project.name, project.description
        );
        let reply = self.completion.complete(&system, &user, DOC_TEMPERATURE)?;
        let mut text = strip_fence(&reply).trim().to_string();
        text.push('\n');
        io::atomic_write(&path, text.as_bytes())?;
        Ok(true)
    }
}

/// Drafts for every item with a well-formed id, epics first.
fn drafts(project: &Project) -> Vec<ItemDraft> {
    let mut out = Vec::new();
    for epic in &project.epics {
        let Ok(epic_id) = epic.id.parse::<ItemId>() else {
            tracing::warn!(id = %epic.id, "skipping epic with malformed id");
            continue;
        };
        let epic_ref = ItemRef::new(epic_id, epic.name.clone());
        out.push(ItemDraft {
            id: epic_id,
            name: epic.name.clone(),
            description: epic.description.clone(),
            status: epic.status,
            parents: Vec::new(),
        });
        for feature in &epic.features {
            let Ok(feature_id) = feature.id.parse::<ItemId>() else {
                tracing::warn!(id = %feature.id, "skipping feature with malformed id");
                continue;
            };
            let feature_ref = ItemRef::new(feature_id, feature.name.clone());
            out.push(ItemDraft {
                id: feature_id,
                name: feature.name.clone(),
                description: feature.description.clone(),
                status: feature.status,
                parents: vec![epic_ref.clone()],
            });
            for task in &feature.tasks {
                let Ok(task_id) = task.id.parse::<ItemId>() else {
                    tracing::warn!(id = %task.id, "skipping task with malformed id");
                    continue;
                };
                out.push(ItemDraft {
                    id: task_id,
                    name: task.name.clone(),
                    description: task.description.clone(),
                    status: task.status,
                    parents: vec![epic_ref.clone(), feature_ref.clone()],
                });
            }
        }
    }
    out
}

/// Relationship blocks implied by the plan's nesting.
pub fn plan_relationships(project: &Project) -> Vec<(ItemId, Relationships)> {
    let mut out = Vec::new();
    for epic in &project.epics {
        let Ok(epic_id) = epic.id.parse::<ItemId>() else {
            continue;
        };
        let epic_ref = ItemRef::new(epic_id, epic.name.clone());
        let mut epic_rels = Relationships::default();
        for feature in &epic.features {
            let Ok(feature_id) = feature.id.parse::<ItemId>() else {
                continue;
            };
            let feature_ref = ItemRef::new(feature_id, feature.name.clone());
            epic_rels.add_child(feature_ref.clone());

            let mut feature_rels = Relationships {
                parent_epic: Some(epic_ref.clone()),
                ..Relationships::default()
            };
            for task in &feature.tasks {
                let Ok(task_id) = task.id.parse::<ItemId>() else {
                    continue;
                };
                feature_rels.add_child(ItemRef::new(task_id, task.name.clone()));
                out.push((
                    task_id,
                    Relationships {
                        parent_epic: Some(epic_ref.clone()),
                        parent_feature: Some(feature_ref.clone()),
                        ..Relationships::default()
                    },
                ));
            }
            out.push((feature_id, feature_rels));
        }
        out.push((epic_id, epic_rels));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::canonical_fallback;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use yolo_llm::scripted::ScriptedCompletion;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    fn draft(id: &str) -> ItemDraft {
        ItemDraft {
            id: id.parse().unwrap(),
            name: "Checkout".into(),
            description: "Pay for things".into(),
            status: Status::Planned,
            parents: vec![ItemRef::new("E001".parse().unwrap(), "Shop")],
        }
    }

    #[test]
    fn document_gets_title_and_links_block() {
        let svc = ScriptedCompletion::new().text("```markdown\n## Overview\nPay.\n```");
        let doc = render_document(&svc, &DocumentGuidance::default(), &draft("F001")).unwrap();
        assert!(doc.starts_with("# [F001] Checkout\n\n## Overview\nPay.\n"));
        assert!(doc.contains(&format!("## Relationships\n{LINKS_START}\n{LINKS_END}\n")));

        let call = &svc.calls()[0];
        assert!(call.system.contains("- Current Status: planned"));
        assert!(call.system.contains("# Feature Documentation"));
        assert!(call.user.contains("Parent epic: [E001] Shop"));
    }

    #[test]
    fn document_keeps_model_title_and_block() {
        let reply = format!("# [F001] Checkout flow\n\n## Relationships\n{LINKS_START}\nstale\n{LINKS_END}\n");
        let svc = ScriptedCompletion::new().text(reply);
        let doc = render_document(&svc, &DocumentGuidance::default(), &draft("F001")).unwrap();
        assert!(doc.starts_with("# [F001] Checkout flow\n"));
        assert!(!doc.contains("stale"));
    }

    #[test]
    fn materializes_fallback_plan() {
        let dir = TempDir::new().unwrap();
        let svc = ScriptedCompletion::new()
            .text("## Overview\nSetup.")
            .text("## Overview\nInfra.")
            .text("## Overview\nInit.")
            .text("# New Project\n\nOverview.");
        let mut project = canonical_fallback("build a shop");

        let report = Materializer::new(&svc, dir.path()).materialize(&mut project, now());
        assert!(report.failures.is_empty(), "{report}");
        assert_eq!((report.epics, report.features, report.tasks), (1, 1, 1));
        assert!(report.readme_written);
        assert_eq!(project.epics[0].created_at, Some(now()));

        let store = WorkItemStore::new(dir.path());
        let task = store.read(&"T001".parse().unwrap()).unwrap();
        assert_eq!(
            task.links_block().unwrap(),
            "\n- Parent Epic: [E001] Project Setup\n- Parent Feature: [F001] Basic Infrastructure\n"
        );
        let epic = store.read(&"E001".parse().unwrap()).unwrap();
        assert!(epic.links_block().unwrap().contains("  - [F001] Basic Infrastructure"));
        let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(readme, "# New Project\n\nOverview.\n");
    }

    #[test]
    fn failures_are_collected_and_custom_readme_kept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# Mine\n\nHands off.\n").unwrap();
        let svc = ScriptedCompletion::new()
            .text("epic doc")
            .failure("rate limited")
            .text("task doc");
        let mut project = canonical_fallback("x");

        let report = Materializer::new(&svc, dir.path()).materialize(&mut project, now());
        assert_eq!((report.epics, report.features, report.tasks), (1, 0, 1));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("yolo/features/F001.md"));
        assert!(!report.readme_written);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "# Mine\n\nHands off.\n"
        );
        assert!(report.to_string().contains("1 failures:"));
    }

    #[test]
    fn existing_items_keep_their_files_and_numbers() {
        let dir = TempDir::new().unwrap();
        let store = WorkItemStore::new(dir.path());
        let mine = "# [E001] My hand-written epic\n\n## Overview\nKeep me.\n";
        store.write(&"E001".parse().unwrap(), mine).unwrap();
        let svc = ScriptedCompletion::new()
            .text("## Overview\nSetup.")
            .text("## Overview\nInfra.")
            .text("## Overview\nInit.")
            .text("# New Project\n");
        let mut project = canonical_fallback("x");

        let report = Materializer::new(&svc, dir.path()).materialize(&mut project, now());
        assert!(report.failures.is_empty(), "{report}");
        assert_eq!(report.written(), 3);
        assert_eq!(store.read_raw(&"E001".parse().unwrap()).unwrap(), mine);
        assert_eq!(project.epics[0].id, "E002");
        assert_eq!(project.epics[0].features[0].epic_id, "E002");

        let epic = store.read(&"E002".parse().unwrap()).unwrap();
        assert_eq!(epic.title, "Project Setup");
        let feature = store.read(&"F001".parse().unwrap()).unwrap();
        assert!(feature
            .links_block()
            .unwrap()
            .contains("- Parent Epic: [E002] Project Setup"));
    }

    #[test]
    fn taken_file_is_reported_not_replaced() {
        let dir = TempDir::new().unwrap();
        let store = WorkItemStore::new(dir.path());
        let id = "F001".parse().unwrap();
        store.write(&id, "# [F001] Mine\n").unwrap();
        let svc = ScriptedCompletion::new();
        let materializer = Materializer::new(&svc, dir.path());

        let err = materializer
            .write_draft(&draft("F001"), &store.path_of(&id))
            .unwrap_err();
        assert!(matches!(err, YoloError::ItemExists(ref taken) if taken == "F001"));
        assert_eq!(store.read_raw(&id).unwrap(), "# [F001] Mine\n");
        assert!(svc.calls().is_empty());
    }

    #[test]
    fn failed_render_releases_the_claimed_file() {
        let dir = TempDir::new().unwrap();
        let svc = ScriptedCompletion::new().failure("rate limited");
        let materializer = Materializer::new(&svc, dir.path());
        let path = dir.path().join("yolo/features/F001.md");

        assert!(materializer.write_draft(&draft("F001"), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn plan_relationships_follow_nesting() {
        let project = canonical_fallback("x");
        let rels = plan_relationships(&project);
        let (id, feature) = rels.iter().find(|(id, _)| id.to_string() == "F001").unwrap();
        assert_eq!(id.kind(), ItemKind::Feature);
        assert_eq!(feature.parent_epic.as_ref().unwrap().title, "Project Setup");
        assert_eq!(feature.tasks[0].title, "Project Initialization");
    }
}
