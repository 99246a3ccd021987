use crate::error::{Result, YoloError};
use crate::id;
use crate::materializer::{render_document, DocumentGuidance, ItemDraft};
use crate::relationships::{ItemRef, RelationshipManager, Relationships};
use crate::store::{WorkItem, WorkItemStore};
use crate::types::{ItemKind, Status};
use std::path::PathBuf;
use yolo_llm::CompletionService;

const MAX_TITLE_LEN: usize = 60;

/// What [`Authoring::create`] wrote.
#[derive(Debug, Clone)]
pub struct AuthorReport {
    pub item: ItemRef,
    /// Ancestors of the new item, epic first.
    pub parents: Vec<ItemRef>,
    /// Ancestors that did not exist before and were created for this item.
    pub created_parents: Vec<ItemRef>,
    pub children: Vec<ItemRef>,
}

/// Adds a single epic, feature or task to an existing project and links it
/// into the hierarchy.
pub struct Authoring<'a> {
    completion: &'a dyn CompletionService,
    store: WorkItemStore,
    guidance: DocumentGuidance,
}

impl<'a> Authoring<'a> {
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

    fn manager(&self) -> RelationshipManager<'_> {
        RelationshipManager::new(self.completion, &self.store)
    }

    /// Create a `kind` item from `description`: find or create its parent,
    /// write its document, then create the suggested children.
    pub fn create(&self, kind: ItemKind, description: &str) -> Result<AuthorReport> {
        let description = description.trim();
        if description.is_empty() {
            return Err(YoloError::Usage(format!("a {kind} needs a description")));
        }
        let name = title_from(description);

        let mut created_parents = Vec::new();
        let parents = self.place(kind, description, &mut created_parents)?;
        let item = self.write_item(kind, &name, description, &parents)?;
        tracing::info!(id = %item.id, "created {kind}");

        let mut children = Vec::new();
        if let Some(child_kind) = kind.child() {
            let mut lineage = parents.clone();
            lineage.push(item.clone());
            for title in self.manager().suggest_children(kind, description)? {
                children.push(self.write_item(child_kind, &title, &title, &lineage)?);
            }
        }

        Ok(AuthorReport {
            item,
            parents,
            created_parents,
            children,
        })
    }

    /// Ancestors for a new `kind` item, creating missing ones on the way.
    fn place(
        &self,
        kind: ItemKind,
        description: &str,
        created: &mut Vec<ItemRef>,
    ) -> Result<Vec<ItemRef>> {
        let Some(parent_kind) = kind.parent() else {
            return Ok(Vec::new());
        };
        let existing = self.store.list_by_kind(parent_kind)?;
        let choice = self
            .manager()
            .find_or_create_parent(kind, description, &existing)?;

        if let Some(parent) = choice.parent {
            let mut chain = ancestors_of(&parent);
            chain.push(ItemRef::from(&parent));
            return Ok(chain);
        }

        let mut chain = self.place(parent_kind, description, created)?;
        let parent = self.write_item(parent_kind, &title_from(description), description, &chain)?;
        tracing::info!(id = %parent.id, "created parent {parent_kind}");
        created.push(parent.clone());
        chain.push(parent);
        Ok(chain)
    }

    /// Reserve an id, write the document and wire the relationship blocks
    /// of the item and its direct parent.
    fn write_item(
        &self,
        kind: ItemKind,
        name: &str,
        description: &str,
        parents: &[ItemRef],
    ) -> Result<ItemRef> {
        let (id, path) = id::reserve(self.store.root(), kind)?;
        let draft = ItemDraft {
            id,
            name: name.to_string(),
            description: description.to_string(),
            status: Status::Planned,
            parents: parents.to_vec(),
        };
        let doc = match render_document(self.completion, &self.guidance, &draft) {
            Ok(doc) => doc,
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %rm, "could not release reserved id");
                }
                return Err(e);
            }
        };
        self.store.write(&id, &doc)?;

        let rels = Relationships {
            parent_epic: parents.iter().find(|r| r.id.kind() == ItemKind::Epic).cloned(),
            parent_feature: parents
                .iter()
                .find(|r| r.id.kind() == ItemKind::Feature)
                .cloned(),
            ..Relationships::default()
        };
        let manager = self.manager();
        manager.update_relationships(&id, &rels)?;
        let item = ItemRef::new(id, name);
        if let Some(parent) = parents.last() {
            manager.link_child(&parent.id, item.clone())?;
        }
        Ok(item)
    }
}

fn ancestors_of(parent: &WorkItem) -> Vec<ItemRef> {
    if parent.kind() != ItemKind::Feature {
        return Vec::new();
    }
    parent
        .links_block()
        .map(Relationships::parse)
        .and_then(|rels| rels.parent_epic)
        .into_iter()
        .collect()
}

/// A short title from the first line of a description.
pub fn title_from(description: &str) -> String {
    let line = description
        .lines()
        .map(|l| l.trim().trim_start_matches(['#', '-', '*']).trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let line = line.trim_end_matches('.');
    if line.chars().count() <= MAX_TITLE_LEN {
        return line.to_string();
    }
    let cut: String = line.chars().take(MAX_TITLE_LEN).collect();
    match cut.rfind(' ') {
        Some(space) if space > 0 => cut[..space].trim_end().to_string(),
        _ => cut,
    }
}
