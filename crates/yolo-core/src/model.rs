use crate::error::{Result, YoloError};
use crate::types::{ItemId, ItemKind, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A synthesized project plan: epics → features → tasks.
///
/// Ids are kept as plain strings here because they come straight from a model
/// reply; [`validate`] reports the ones that are not well-formed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub epics: Vec<Epic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub epic_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub feature_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn feature_count(&self) -> usize {
        self.epics.iter().map(|e| e.features.len()).sum()
    }

    pub fn task_count(&self) -> usize {
        self.epics
            .iter()
            .flat_map(|e| &e.features)
            .map(|f| f.tasks.len())
            .sum()
    }

    /// Stamp every item. Only the materializer calls this, at write time.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
        for epic in &mut self.epics {
            epic.created_at.get_or_insert(now);
            epic.updated_at = Some(now);
            for feature in &mut epic.features {
                feature.created_at.get_or_insert(now);
                feature.updated_at = Some(now);
                for task in &mut feature.tasks {
                    task.created_at.get_or_insert(now);
                    task.updated_at = Some(now);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    EmptyName,
    NoEpics,
    MalformedId { kind: ItemKind, id: String },
    DuplicateId { id: String },
    NotSequential { kind: ItemKind, expected: String, found: String },
    StatusNotAllowed { id: String, status: Status },
    ParentMismatch { id: String, declared: String, actual: String },
    UnknownDependency { id: String, dependency: String },
    DependencyCycle { path: Vec<String> },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::EmptyName => write!(f, "project name is empty"),
            Issue::NoEpics => write!(f, "project has no epics"),
            Issue::MalformedId { kind, id } => {
                write!(f, "{kind} id '{id}' does not match {}NNN", kind.prefix())
            }
            Issue::DuplicateId { id } => write!(f, "id {id} is used more than once"),
            Issue::NotSequential {
                kind,
                expected,
                found,
            } => write!(f, "{kind} ids are not sequential: expected {expected}, found {found}"),
            Issue::StatusNotAllowed { id, status } => {
                write!(f, "{id} has status '{status}', which a new plan may not use")
            }
            Issue::ParentMismatch {
                id,
                declared,
                actual,
            } => write!(f, "{id} declares parent '{declared}' but is nested under {actual}"),
            Issue::UnknownDependency { id, dependency } => {
                write!(f, "{id} depends on unknown item '{dependency}'")
            }
            Issue::DependencyCycle { path } => write!(f, "dependency cycle: {}", path.join(" -> ")),
        }
    }
}

/// Check statuses, id format, uniqueness and numbering from 001 without
/// gaps, parent back-references and within-kind dependencies. Returns every issue found; an empty list means
/// the plan is valid.
pub fn validate(project: &Project) -> Vec<Issue> {
    let mut issues = Vec::new();
    if project.name.trim().is_empty() {
        issues.push(Issue::EmptyName);
    }
    if project.epics.is_empty() {
        issues.push(Issue::NoEpics);
    }

    let mut seen = HashSet::new();
    let mut check_id = |kind: ItemKind, id: &str, issues: &mut Vec<Issue>| {
        if !ItemId::is_valid_for(id, kind) {
            issues.push(Issue::MalformedId {
                kind,
                id: id.to_string(),
            });
        } else if !seen.insert(id.to_string()) {
            issues.push(Issue::DuplicateId { id: id.to_string() });
        }
    };
    let check_status = |id: &str, status: Status, issues: &mut Vec<Issue>| {
        if !status.is_plan_status() {
            issues.push(Issue::StatusNotAllowed {
                id: id.to_string(),
                status,
            });
        }
    };

    for epic in &project.epics {
        check_id(ItemKind::Epic, &epic.id, &mut issues);
        check_status(&epic.id, epic.status, &mut issues);
        for feature in &epic.features {
            check_id(ItemKind::Feature, &feature.id, &mut issues);
            check_status(&feature.id, feature.status, &mut issues);
            if !feature.epic_id.is_empty() && feature.epic_id != epic.id {
                issues.push(Issue::ParentMismatch {
                    id: feature.id.clone(),
                    declared: feature.epic_id.clone(),
                    actual: epic.id.clone(),
                });
            }
            for task in &feature.tasks {
                check_id(ItemKind::Task, &task.id, &mut issues);
                check_status(&task.id, task.status, &mut issues);
                if !task.feature_id.is_empty() && task.feature_id != feature.id {
                    issues.push(Issue::ParentMismatch {
                        id: task.id.clone(),
                        declared: task.feature_id.clone(),
                        actual: feature.id.clone(),
                    });
                }
            }
        }
    }

    let epics: Vec<(&str, &[String])> = project
        .epics
        .iter()
        .map(|e| (e.id.as_str(), e.dependencies.as_slice()))
        .collect();
    let features: Vec<(&str, &[String])> = project
        .epics
        .iter()
        .flat_map(|e| &e.features)
        .map(|f| (f.id.as_str(), f.dependencies.as_slice()))
        .collect();
    let tasks: Vec<(&str, &[String])> = project
        .epics
        .iter()
        .flat_map(|e| &e.features)
        .flat_map(|f| &f.tasks)
        .map(|t| (t.id.as_str(), t.dependencies.as_slice()))
        .collect();
    for (kind, nodes) in [
        (ItemKind::Epic, &epics),
        (ItemKind::Feature, &features),
        (ItemKind::Task, &tasks),
    ] {
        check_sequence(kind, nodes.iter().map(|(id, _)| *id), &mut issues);
    }
    for nodes in [epics, features, tasks] {
        check_dependencies(&nodes, &mut issues);
    }

    issues
}

/// Well-formed ids of `kind` must read 001, 002, ... in document order.
/// Reports the first id out of place.
fn check_sequence<'a>(kind: ItemKind, ids: impl Iterator<Item = &'a str>, issues: &mut Vec<Issue>) {
    for (n, id) in (1u16..).zip(ids) {
        let Ok(expected) = ItemId::new(kind, n) else {
            return;
        };
        let expected = expected.to_string();
        if ItemId::is_valid_for(id, kind) && id != expected {
            issues.push(Issue::NotSequential {
                kind,
                expected,
                found: id.to_string(),
            });
            return;
        }
    }
}

fn check_dependencies(nodes: &[(&str, &[String])], issues: &mut Vec<Issue>) {
    let known: HashSet<&str> = nodes.iter().map(|(id, _)| *id).collect();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for (id, deps) in nodes {
        for dep in deps.iter() {
            if known.contains(dep.as_str()) {
                edges.entry(*id).or_default().push(dep.as_str());
            } else {
                issues.push(Issue::UnknownDependency {
                    id: id.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    if let Some(path) = find_cycle(nodes.iter().map(|(id, _)| *id), &edges) {
        issues.push(Issue::DependencyCycle { path });
    }
}

/// Depth-first search over `edges`; returns the first cycle found as a path
/// that starts and ends on the same node.
pub fn find_cycle<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    edges: &HashMap<&'a str, Vec<&'a str>>,
) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        node: &'a str,
        edges: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                path.push(node.to_string());
                return Some(path);
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        stack.push(node);
        for &next in edges.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(next, edges, marks, stack) {
                return Some(cycle);
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    for node in nodes {
        if let Some(cycle) = visit(node, edges, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

/// Refuse `dependencies` for `id` when they would close a cycle among
/// `existing` (id → dependencies) items of the same kind.
pub fn check_new_dependencies(
    id: &str,
    dependencies: &[String],
    existing: &HashMap<String, Vec<String>>,
) -> Result<()> {
    let mut edges: HashMap<&str, Vec<&str>> = existing
        .iter()
        .map(|(k, v)| (k.as_str(), v.iter().map(String::as_str).collect()))
        .collect();
    edges.insert(id, dependencies.iter().map(String::as_str).collect());
    match find_cycle([id], &edges) {
        Some(path) => Err(YoloError::DependencyCycle(path.join(" -> "))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Project {
        Project {
            name: "Shop".into(),
            description: "Sell things".into(),
            epics: vec![Epic {
                id: "E001".into(),
                name: "Core".into(),
                features: vec![Feature {
                    id: "F001".into(),
                    epic_id: "E001".into(),
                    name: "Cart".into(),
                    tasks: vec![Task {
                        id: "T001".into(),
                        feature_id: "F001".into(),
                        name: "Model".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn valid_plan_has_no_issues() {
        assert!(validate(&plan()).is_empty());
    }

    #[test]
    fn reports_malformed_and_duplicate_ids() {
        let mut p = plan();
        p.epics[0].features[0].id = "FEAT-1".into();
        p.epics.push(Epic {
            id: "E001".into(),
            ..Default::default()
        });
        let issues = validate(&p);
        assert!(issues.contains(&Issue::MalformedId {
            kind: ItemKind::Feature,
            id: "FEAT-1".into()
        }));
        assert!(issues.contains(&Issue::DuplicateId { id: "E001".into() }));
    }

    #[test]
    fn reports_gaps_in_numbering() {
        let mut p = plan();
        p.epics[0].id = "E003".into();
        p.epics[0].features[0].epic_id = "E003".into();
        p.epics[0].features[0].tasks[0].id = "T005".into();
        let issues = validate(&p);
        assert!(issues.contains(&Issue::NotSequential {
            kind: ItemKind::Epic,
            expected: "E001".into(),
            found: "E003".into()
        }));
        assert!(issues
            .iter()
            .any(|i| i.to_string() == "task ids are not sequential: expected T001, found T005"));
        assert!(!issues
            .iter()
            .any(|i| matches!(i, Issue::NotSequential { kind: ItemKind::Feature, .. })));
    }

    #[test]
    fn reports_parent_mismatch_and_deprecated_status() {
        let mut p = plan();
        p.epics[0].features[0].tasks[0].feature_id = "F009".into();
        p.epics[0].status = Status::Deprecated;
        let issues = validate(&p);
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::ParentMismatch { declared, .. } if declared == "F009")));
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::StatusNotAllowed { .. })));
    }

    #[test]
    fn detects_dependency_cycles_within_a_kind() {
        let mut p = plan();
        p.epics.push(Epic {
            id: "E002".into(),
            dependencies: vec!["E001".into()],
            ..Default::default()
        });
        p.epics[0].dependencies = vec!["E002".into()];
        let issues = validate(&p);
        let cycle = issues
            .iter()
            .find_map(|i| match i {
                Issue::DependencyCycle { path } => Some(path.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
    }

    #[test]
    fn unknown_dependencies_are_reported() {
        let mut p = plan();
        p.epics[0].features[0].dependencies = vec!["T001".into()];
        let issues = validate(&p);
        assert!(issues.contains(&Issue::UnknownDependency {
            id: "F001".into(),
            dependency: "T001".into()
        }));
    }

    #[test]
    fn check_new_dependencies_rejects_cycles() {
        let existing = HashMap::from([
            ("F001".to_string(), vec!["F002".to_string()]),
            ("F002".to_string(), vec![]),
        ]);
        assert!(check_new_dependencies("F002", &["F001".to_string()], &existing).is_err());
        assert!(check_new_dependencies("F003", &["F001".to_string()], &existing).is_ok());
    }

    #[test]
    fn deserializes_sparse_model_output() {
        let p: Project = serde_json::from_str(
            r#"{"name":"X","epics":[{"id":"E001","name":"A","features":[{"id":"F001","name":"B"}]}]}"#,
        )
        .unwrap();
        assert_eq!(p.epics[0].status, Status::Planned);
        assert_eq!(p.feature_count(), 1);
        assert_eq!(p.task_count(), 0);
    }

    #[test]
    fn stamp_sets_timestamps_everywhere() {
        let mut p = plan();
        let now = Utc::now();
        p.stamp(now);
        assert_eq!(p.epics[0].features[0].tasks[0].updated_at, Some(now));
        assert_eq!(p.created_at, Some(now));
    }
}
