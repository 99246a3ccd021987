//! Plan synthesis: free-form description in, validated epic → feature → task
//! tree out.

use crate::error::{Result, YoloError};
use crate::model::{self, Epic, Feature, Issue, Project, Task};
use crate::types::{ItemId, ItemKind, Status};
use std::collections::{HashMap, HashSet};
use yolo_llm::{complete_as, CompletionError, CompletionService, Schema};

pub const PLAN_FUNCTION: &str = "generate_project_plan";
pub const DEFAULT_PROJECT_NAME: &str = "New Project";

const SYSTEM_PROMPT: &str = "You are a senior technical project planner. Break the project \
description into a hierarchy of epics, features and tasks.\n\
- Epics are large strategic initiatives, features are deliverable capabilities within an epic, \
tasks are concrete units of implementation work within a feature.\n\
- Give every item a short name and a one or two sentence description.\n\
- Number items per type with zero-padded ids: epics E001, E002, ...; features F001, F002, ...; \
tasks T001, T002, ... Ids are unique across the whole project, not per parent.\n\
- Every item starts with status \"planned\".\n\
- Set each feature's epic_id to its epic and each task's feature_id to its feature.";

fn status_schema() -> Schema {
    Schema::string().one_of_strings(&["planned", "in-progress", "completed"])
}

/// Schema bound as the `generate_project_plan` function.
pub fn plan_schema() -> Schema {
    let task = Schema::object()
        .property("id", Schema::string().describe("Task id, T followed by three digits"))
        .property("feature_id", Schema::string())
        .property("name", Schema::string())
        .property("description", Schema::string())
        .property("status", status_schema())
        .require(&["id", "name", "description", "status"]);
    let feature = Schema::object()
        .property("id", Schema::string().describe("Feature id, F followed by three digits"))
        .property("epic_id", Schema::string())
        .property("name", Schema::string())
        .property("description", Schema::string())
        .property("status", status_schema())
        .property("tasks", Schema::array(Schema::reference("task")))
        .require(&["id", "name", "description", "status", "tasks"]);
    let epic = Schema::object()
        .property("id", Schema::string().describe("Epic id, E followed by three digits"))
        .property("name", Schema::string())
        .property("description", Schema::string())
        .property("status", status_schema())
        .property("features", Schema::array(Schema::reference("feature")))
        .require(&["id", "name", "description", "status", "features"]);

    Schema::object()
        .describe("Generate a structured project plan with epics, features and tasks")
        .property("name", Schema::string().describe("Project name"))
        .property("description", Schema::string().describe("Project description"))
        .property("epics", Schema::array(Schema::reference("epic")))
        .require(&["name", "description", "epics"])
        .define("epic", epic)
        .define("feature", feature)
        .define("task", task)
}

/// The plan used whenever the model's answer cannot be used.
pub fn canonical_fallback(description: &str) -> Project {
    Project {
        name: DEFAULT_PROJECT_NAME.to_string(),
        description: description.to_string(),
        epics: fallback_epics(),
        ..Default::default()
    }
}

fn fallback_epics() -> Vec<Epic> {
    vec![Epic {
        id: "E001".into(),
        name: "Project Setup".into(),
        description: "Initial project setup and configuration".into(),
        status: Status::Planned,
        features: vec![Feature {
            id: "F001".into(),
            epic_id: "E001".into(),
            name: "Basic Infrastructure".into(),
            description: "Set up basic project infrastructure and dependencies".into(),
            status: Status::Planned,
            tasks: vec![Task {
                id: "T001".into(),
                feature_id: "F001".into(),
                name: "Project Initialization".into(),
                description: "Initialize project structure and configuration".into(),
                status: Status::Planned,
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }]
}

/// Result of one synthesis run.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub project: Project,
    /// Problems found in the model's plan before it was normalized.
    pub issues: Vec<Issue>,
    /// Model-written advice about `issues`, when there were any.
    pub advisory: Option<String>,
    /// True when the canonical fallback replaced the model's plan.
    pub fell_back: bool,
}

pub struct PlanSynthesizer<'a> {
    completion: &'a dyn CompletionService,
}

impl<'a> PlanSynthesizer<'a> {
    pub fn new(completion: &'a dyn CompletionService) -> Self {
        Self { completion }
    }

    /// Turn `description` into a plan. Unusable model output yields the
    /// canonical fallback; transport and credential failures are returned.
    pub fn synthesize(&self, description: &str) -> Result<Synthesis> {
        let user = format!("Create a project plan for:\n\n{description}");
        let parsed = complete_as::<Project>(
            self.completion,
            SYSTEM_PROMPT,
            &user,
            &plan_schema(),
            PLAN_FUNCTION,
        );

        let (mut project, mut fell_back) = match parsed {
            Ok(project) => (project, false),
            Err(CompletionError::ShapeMismatch { reason, .. }) => {
                tracing::warn!(%reason, "plan output unusable, using the fallback plan");
                (canonical_fallback(description), true)
            }
            Err(CompletionError::Json(e)) => {
                tracing::warn!(error = %e, "plan output unusable, using the fallback plan");
                (canonical_fallback(description), true)
            }
            Err(e) => return Err(e.into()),
        };

        if project.name.trim().is_empty() {
            project.name = DEFAULT_PROJECT_NAME.to_string();
        }
        if project.description.trim().is_empty() {
            project.description = description.to_string();
        }
        if project.epics.is_empty() {
            project.epics = fallback_epics();
            fell_back = true;
        }

        let issues = model::validate(&project);
        let advisory = if issues.is_empty() {
            None
        } else {
            Some(self.advise(&project, &issues))
        };
        normalize(&mut project)?;

        Ok(Synthesis {
            project,
            issues,
            advisory,
            fell_back,
        })
    }

    fn advise(&self, project: &Project, issues: &[Issue]) -> String {
        let listing: Vec<String> = issues.iter().map(|i| format!("- {i}")).collect();
        let listing = listing.join("\n");
        let plan = serde_json::to_string_pretty(project).unwrap_or_default();
        let user = format!(
            "Project plan:\n{plan}\n\nValidation problems:\n{listing}\n\n\
             Explain briefly what each problem means for the team and how to fix it."
        );
        match self.completion.complete(
            "You review software project plans. Be concise and practical.",
            &user,
            0.3,
        ) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) | Err(_) => format!("The plan had validation problems:\n{listing}"),
        }
    }
}

/// Make a plan structurally sound: dense ids in document order, plan
/// statuses, back-references matching nesting, dependencies that resolve
/// and do not cycle.
pub fn normalize(project: &mut Project) -> Result<()> {
    normalize_after(project, |_| 0)
}

/// [`normalize`], numbering each kind after `taken(kind)`, the highest
/// number already in use for it.
pub fn normalize_after(project: &mut Project, taken: impl Fn(ItemKind) -> u16) -> Result<()> {
    let epics = renumber(
        ItemKind::Epic,
        project.epics.iter_mut().map(|e| &mut e.id).collect(),
        taken(ItemKind::Epic),
    )?;
    let features = renumber(
        ItemKind::Feature,
        project
            .epics
            .iter_mut()
            .flat_map(|e| e.features.iter_mut())
            .map(|f| &mut f.id)
            .collect(),
        taken(ItemKind::Feature),
    )?;
    let tasks = renumber(
        ItemKind::Task,
        project
            .epics
            .iter_mut()
            .flat_map(|e| e.features.iter_mut())
            .flat_map(|f| f.tasks.iter_mut())
            .map(|t| &mut t.id)
            .collect(),
        taken(ItemKind::Task),
    )?;

    for epic in &mut project.epics {
        remap(&mut epic.dependencies, &epics);
        if !epic.status.is_plan_status() {
            epic.status = Status::Planned;
        }
        for feature in &mut epic.features {
            remap(&mut feature.dependencies, &features);
            feature.epic_id = epic.id.clone();
            if !feature.status.is_plan_status() {
                feature.status = Status::Planned;
            }
            for task in &mut feature.tasks {
                remap(&mut task.dependencies, &tasks);
                task.feature_id = feature.id.clone();
                if !task.status.is_plan_status() {
                    task.status = Status::Planned;
                }
            }
        }
    }

    prune_dependencies(
        project
            .epics
            .iter_mut()
            .map(|e| (e.id.as_str(), &mut e.dependencies))
            .collect(),
    );
    prune_dependencies(
        project
            .epics
            .iter_mut()
            .flat_map(|e| e.features.iter_mut())
            .map(|f| (f.id.as_str(), &mut f.dependencies))
            .collect(),
    );
    prune_dependencies(
        project
            .epics
            .iter_mut()
            .flat_map(|e| e.features.iter_mut())
            .flat_map(|f| f.tasks.iter_mut())
            .map(|t| (t.id.as_str(), &mut t.dependencies))
            .collect(),
    );
    Ok(())
}

/// Number `ids` densely in document order, starting after `after`. Returns
/// what each original id became; for a repeated id the first occurrence wins.
fn renumber(kind: ItemKind, ids: Vec<&mut String>, after: u16) -> Result<HashMap<String, String>> {
    let mut renamed = HashMap::with_capacity(ids.len());
    for (offset, id) in ids.into_iter().enumerate() {
        let fresh = u16::try_from(offset + 1)
            .ok()
            .and_then(|n| after.checked_add(n))
            .and_then(|n| ItemId::new(kind, n).ok())
            .ok_or_else(|| YoloError::IdSpaceExhausted(kind.to_string()))?
            .to_string();
        if *id != fresh {
            tracing::debug!(old = %id, new = %fresh, "renumbered plan item");
        }
        let old = std::mem::replace(id, fresh.clone());
        renamed.entry(old).or_insert(fresh);
    }
    Ok(renamed)
}

/// Point dependencies at renumbered ids, dropping ones that name nothing in
/// the plan.
fn remap(dependencies: &mut Vec<String>, renamed: &HashMap<String, String>) {
    *dependencies = dependencies
        .iter()
        .filter_map(|d| renamed.get(d).cloned())
        .collect();
}

/// Drop self, repeated and unknown dependencies, then accept the rest in
/// document order, skipping any that would close a cycle.
fn prune_dependencies(nodes: Vec<(&str, &mut Vec<String>)>) {
    let known: HashSet<String> = nodes.iter().map(|(id, _)| id.to_string()).collect();
    let mut accepted: HashMap<String, Vec<String>> = HashMap::new();
    for (id, deps) in nodes {
        let mut unique = HashSet::new();
        deps.retain(|d| known.contains(d) && d.as_str() != id && unique.insert(d.clone()));

        let mut kept: Vec<String> = Vec::with_capacity(deps.len());
        for dep in std::mem::take(deps) {
            kept.push(dep);
            if let Err(e) = model::check_new_dependencies(id, &kept, &accepted) {
                let dropped = kept.pop().unwrap_or_default();
                tracing::debug!(%id, dependency = %dropped, error = %e, "dropping dependency that closes a cycle");
            }
        }
        accepted.insert(id.to_string(), kept.clone());
        *deps = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yolo_llm::scripted::ScriptedCompletion;

    fn all_statuses(p: &Project) -> Vec<Status> {
        let mut out = Vec::new();
        for e in &p.epics {
            out.push(e.status);
            for f in &e.features {
                out.push(f.status);
                out.extend(f.tasks.iter().map(|t| t.status));
            }
        }
        out
    }

    #[test]
    fn malformed_output_yields_canonical_fallback() {
        let svc = ScriptedCompletion::new().text("{\"name\": \"Shop\", \"epics\": [");
        let synthesis = PlanSynthesizer::new(&svc).synthesize("A shop").unwrap();
        let p = &synthesis.project;
        assert!(synthesis.fell_back);
        assert_eq!(p.name, "New Project");
        assert_eq!(p.description, "A shop");
        assert_eq!(p.epics.len(), 1);
        assert_eq!(p.epics[0].id, "E001");
        assert_eq!(p.epics[0].name, "Project Setup");
        assert_eq!(p.epics[0].features[0].id, "F001");
        assert_eq!(p.epics[0].features[0].name, "Basic Infrastructure");
        assert_eq!(p.epics[0].features[0].tasks[0].id, "T001");
        assert_eq!(p.epics[0].features[0].tasks[0].name, "Project Initialization");
        assert!(all_statuses(p).iter().all(|s| *s == Status::Planned));
        assert!(synthesis.issues.is_empty());
        assert_eq!(svc.calls()[0].function.as_deref(), Some(PLAN_FUNCTION));
    }

    #[test]
    fn well_formed_plan_is_kept() {
        let svc = ScriptedCompletion::new().structured(json!({
            "name": "Shop",
            "description": "Sell things",
            "epics": [{
                "id": "E001", "name": "Catalog", "description": "d", "status": "planned",
                "features": [{
                    "id": "F001", "epic_id": "E001", "name": "Search", "description": "d",
                    "status": "planned",
                    "tasks": [{"id": "T001", "feature_id": "F001", "name": "Index", "description": "d", "status": "planned"}]
                }]
            }]
        }));
        let synthesis = PlanSynthesizer::new(&svc).synthesize("A shop").unwrap();
        assert!(!synthesis.fell_back);
        assert!(synthesis.advisory.is_none());
        assert_eq!(synthesis.project.name, "Shop");
        assert_eq!(synthesis.project.epics[0].features[0].tasks[0].name, "Index");
        assert!(synthesis.project.created_at.is_none());
    }

    #[test]
    fn minimums_are_enforced() {
        let svc = ScriptedCompletion::new().structured(json!({
            "name": "", "description": "", "epics": []
        }));
        let synthesis = PlanSynthesizer::new(&svc).synthesize("Build a CLI").unwrap();
        assert_eq!(synthesis.project.name, "New Project");
        assert_eq!(synthesis.project.description, "Build a CLI");
        assert_eq!(synthesis.project.epics[0].name, "Project Setup");
        assert!(synthesis.fell_back);
    }

    #[test]
    fn bad_ids_are_reported_then_normalized() {
        let svc = ScriptedCompletion::new()
            .structured(json!({
                "name": "Shop", "description": "x",
                "epics": [
                    {"id": "EPIC-1", "name": "A", "description": "d", "status": "planned", "features": [
                        {"id": "F001", "epic_id": "E777", "name": "B", "description": "d", "status": "in-progress", "tasks": [
                            {"id": "T001", "name": "C", "description": "d", "status": "completed"},
                            {"id": "T001", "name": "D", "description": "d", "status": "planned"}
                        ]}
                    ]},
                    {"id": "E001", "name": "Z", "description": "d", "status": "planned", "features": []}
                ]
            }))
            .text("Renumber your items.");
        let synthesis = PlanSynthesizer::new(&svc).synthesize("shop").unwrap();
        assert!(!synthesis.issues.is_empty());
        assert_eq!(synthesis.advisory.as_deref(), Some("Renumber your items."));

        let p = &synthesis.project;
        assert_eq!(p.epics[0].id, "E001");
        assert_eq!(p.epics[1].id, "E002");
        let feature = &p.epics[0].features[0];
        assert_eq!(feature.epic_id, "E001");
        let task_ids: Vec<&str> = feature.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(task_ids, ["T001", "T002"]);
        assert!(feature.tasks.iter().all(|t| t.feature_id == "F001"));
        assert!(model::validate(p).is_empty());
    }

    #[test]
    fn gapped_ids_are_reported_then_made_dense() {
        let svc = ScriptedCompletion::new()
            .structured(json!({
                "name": "Shop", "description": "x",
                "epics": [
                    {"id": "E003", "name": "A", "description": "d", "status": "planned", "features": [
                        {"id": "F007", "epic_id": "E003", "name": "B", "description": "d", "status": "planned", "tasks": [
                            {"id": "T005", "feature_id": "F007", "name": "C", "description": "d", "status": "planned"},
                            {"id": "T009", "feature_id": "F007", "name": "D", "description": "d", "status": "planned",
                             "dependencies": ["T005"]}
                        ]}
                    ]},
                    {"id": "E004", "name": "Z", "description": "d", "status": "planned", "dependencies": ["E003"], "features": []}
                ]
            }))
            .text("Number from one.");
        let synthesis = PlanSynthesizer::new(&svc).synthesize("shop").unwrap();
        assert!(synthesis
            .issues
            .iter()
            .any(|i| matches!(i, Issue::NotSequential { kind: ItemKind::Epic, .. })));

        let p = &synthesis.project;
        let epic_ids: Vec<&str> = p.epics.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(epic_ids, ["E001", "E002"]);
        assert_eq!(p.epics[1].dependencies, ["E001"]);
        let feature = &p.epics[0].features[0];
        assert_eq!((feature.id.as_str(), feature.epic_id.as_str()), ("F001", "E001"));
        let task_ids: Vec<&str> = feature.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(task_ids, ["T001", "T002"]);
        assert_eq!(feature.tasks[1].dependencies, ["T001"]);
        assert!(model::validate(p).is_empty());
    }

    #[test]
    fn normalize_after_continues_past_taken_numbers() {
        let mut p = canonical_fallback("x");
        p.epics[0].features[0].tasks.push(Task {
            id: "T002".into(),
            name: "Second".into(),
            dependencies: vec!["T001".into()],
            ..Default::default()
        });
        normalize_after(&mut p, |kind| match kind {
            ItemKind::Epic => 4,
            ItemKind::Feature => 0,
            ItemKind::Task => 10,
        })
        .unwrap();
        assert_eq!(p.epics[0].id, "E005");
        let feature = &p.epics[0].features[0];
        assert_eq!((feature.id.as_str(), feature.epic_id.as_str()), ("F001", "E005"));
        assert_eq!(feature.tasks[0].id, "T011");
        assert_eq!(feature.tasks[1].id, "T012");
        assert_eq!(feature.tasks[1].dependencies, ["T011"]);
        assert!(feature.tasks.iter().all(|t| t.feature_id == "F001"));
    }

    #[test]
    fn normalize_after_refuses_to_run_out_of_ids() {
        let mut p = canonical_fallback("x");
        let err = normalize_after(&mut p, |kind| if kind == ItemKind::Task { 999 } else { 0 }).unwrap_err();
        assert!(matches!(err, YoloError::IdSpaceExhausted(_)));
    }

    #[test]
    fn advisory_falls_back_to_issue_list() {
        let svc = ScriptedCompletion::new()
            .structured(json!({
                "name": "Shop", "description": "x",
                "epics": [{"id": "bad", "name": "A", "description": "d", "status": "planned", "features": []}]
            }))
            .failure("offline");
        let synthesis = PlanSynthesizer::new(&svc).synthesize("shop").unwrap();
        let advisory = synthesis.advisory.unwrap();
        assert!(advisory.contains("epic id 'bad'"), "{advisory}");
    }

    #[test]
    fn transport_errors_propagate() {
        let svc = ScriptedCompletion::new().failure("connection refused");
        assert!(PlanSynthesizer::new(&svc).synthesize("x").is_err());
    }

    #[test]
    fn normalize_breaks_cycles_and_drops_unknown_dependencies() {
        let mut p = canonical_fallback("x");
        p.epics.push(Epic {
            id: "E002".into(),
            name: "Two".into(),
            dependencies: vec!["E001".into(), "E404".into(), "E002".into()],
            ..Default::default()
        });
        p.epics[0].dependencies = vec!["E002".into()];
        normalize(&mut p).unwrap();
        assert!(model::validate(&p).is_empty());
        let total: usize = p.epics.iter().map(|e| e.dependencies.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn schema_accepts_the_fallback_plan() {
        let value = serde_json::to_value(canonical_fallback("x")).unwrap();
        plan_schema().validate(&value).unwrap();
    }
}
