//! The epic/feature/task graph, loaded from the work-item files.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use yolo_core::history;
use yolo_core::store::{WorkItem, WorkItemStore};
use yolo_core::types::{ItemId, ItemKind};

static ITEM_REF: OnceLock<Regex> = OnceLock::new();

fn item_ref_re() -> &'static Regex {
    ITEM_REF.get_or_init(|| Regex::new(r"\b[EFT]\d{3}\b").unwrap())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphNode {
    /// `<type>-<n>`, e.g. `epic-1`.
    pub id: String,
    /// The work-item id, e.g. `E001`.
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    pub content: String,
    pub links: Vec<String>,
    pub status: String,
    pub version: String,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

pub fn node_id(id: &ItemId) -> String {
    format!("{}-{}", id.kind(), id.number())
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<String, GraphNode>,
}

impl Graph {
    /// Read every work item under `root`. Unparseable files are skipped by
    /// the store.
    pub fn load(root: &Path) -> yolo_core::Result<Graph> {
        let items = WorkItemStore::new(root).load_all(&ItemKind::ALL)?;
        let version = history::latest_version(root)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not read HISTORY.yml");
                None
            })
            .unwrap_or_else(|| history::INITIAL_VERSION.to_string());

        let known: HashSet<ItemId> = items.iter().map(|i| i.id).collect();
        let mut nodes = BTreeMap::new();
        for item in &items {
            let node = GraphNode {
                id: node_id(&item.id),
                item_id: item.id.to_string(),
                kind: item.kind(),
                title: item.title.clone(),
                content: item.content.clone(),
                links: links_of(item, &known),
                status: item.status.to_string(),
                version: version.clone(),
                modified: modified(&item.path),
            };
            nodes.insert(node.id.clone(), node);
        }
        tracing::info!(nodes = nodes.len(), "graph loaded");
        Ok(Graph { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Look a node up by node id (`epic-1`) or work-item id (`E001`).
    pub fn get(&self, key: &str) -> Option<&GraphNode> {
        if let Some(node) = self.nodes.get(key) {
            return Some(node);
        }
        let id: ItemId = key.parse().ok()?;
        self.nodes.get(&node_id(&id))
    }

    pub fn links(&self) -> Vec<GraphLink> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.links.iter().map(|target| GraphLink {
                    source: node.id.clone(),
                    target: target.clone(),
                })
            })
            .collect()
    }
}

/// Node ids mentioned in the Dependencies section and relationship block,
/// in order of first mention.
fn links_of(item: &WorkItem, known: &HashSet<ItemId>) -> Vec<String> {
    let sources = [item.section("Dependencies"), item.links_block()];
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for text in sources.into_iter().flatten() {
        for m in item_ref_re().find_iter(text) {
            let Ok(id) = m.as_str().parse::<ItemId>() else {
                continue;
            };
            if id == item.id || !known.contains(&id) || !seen.insert(id) {
                continue;
            }
            links.push(node_id(&id));
        }
    }
    links
}

fn modified(path: &Path) -> Option<DateTime<Utc>> {
    let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(mtime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, id: &str, body: &str) {
        let store = WorkItemStore::new(root);
        store.write(&id.parse().unwrap(), body).unwrap();
    }

    #[test]
    fn node_ids_drop_padding() {
        assert_eq!(node_id(&"E001".parse().unwrap()), "epic-1");
        assert_eq!(node_id(&"T042".parse().unwrap()), "task-42");
    }

    #[test]
    fn links_come_from_dependencies_and_relationships() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "F001",
            "# [F001] Cart\n\n## Dependencies\n- F002 and [E009]\n- F001\n\n## Notes\nSee T001.\n\n\
             ## Relationships\n<!-- YOLO-LINKS-START -->\n- Parent Epic: [E001] Shop\n<!-- YOLO-LINKS-END -->\n",
        );
        write(dir.path(), "F002", "# [F002] Payments\n");
        write(dir.path(), "E001", "# [E001] Shop\n");
        write(dir.path(), "T001", "# [T001] Button\n");

        let graph = Graph::load(dir.path()).unwrap();
        let cart = graph.get("F001").unwrap();
        assert_eq!(cart.links, ["feature-2", "epic-1"]);
        assert_eq!(cart.version, "0.1.0");
        assert!(cart.modified.is_some());
        assert_eq!(graph.get("feature-1").unwrap().title, "Cart");
        assert!(graph.get("feature-9").is_none());
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn serializes_type_field() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "E001", "# [E001] Shop\n\n## Status: completed\n");
        let graph = Graph::load(dir.path()).unwrap();
        let value = serde_json::to_value(graph.get("epic-1").unwrap()).unwrap();
        assert_eq!(value["type"], "epic");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["item_id"], "E001");
    }
}
