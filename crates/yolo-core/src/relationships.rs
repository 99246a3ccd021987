use crate::error::{Result, YoloError};
use crate::store::{WorkItem, WorkItemStore, LINKS_END, LINKS_START};
use crate::types::{ItemId, ItemKind};
use yolo_llm::CompletionService;

const MAX_CHILDREN: usize = 5;

// ---------------------------------------------------------------------------
// Relationship block
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: ItemId,
    pub title: String,
}

impl ItemRef {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl From<&WorkItem> for ItemRef {
    fn from(item: &WorkItem) -> Self {
        Self::new(item.id, item.title.clone())
    }
}

/// Contents of a relationship block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub parent_epic: Option<ItemRef>,
    pub parent_feature: Option<ItemRef>,
    pub features: Vec<ItemRef>,
    pub tasks: Vec<ItemRef>,
}

impl Relationships {
    pub fn is_empty(&self) -> bool {
        self.parent_epic.is_none()
            && self.parent_feature.is_none()
            && self.features.is_empty()
            && self.tasks.is_empty()
    }

    /// Every id mentioned in the block.
    pub fn ids(&self) -> Vec<ItemId> {
        self.parent_epic
            .iter()
            .chain(&self.parent_feature)
            .chain(&self.features)
            .chain(&self.tasks)
            .map(|r| r.id)
            .collect()
    }

    /// Add `child` to the list matching its kind unless it is already there.
    pub fn add_child(&mut self, child: ItemRef) -> bool {
        let list = match child.id.kind() {
            ItemKind::Feature => &mut self.features,
            ItemKind::Task => &mut self.tasks,
            ItemKind::Epic => return false,
        };
        if list.iter().any(|r| r.id == child.id) {
            return false;
        }
        list.push(child);
        list.sort_by_key(|r| r.id);
        true
    }

    /// Render the fenced block, sentinels included. Deterministic, so writing
    /// the same relationships twice yields identical bytes.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(LINKS_START);
        out.push('\n');

        let has_parents = self.parent_epic.is_some() || self.parent_feature.is_some();
        if let Some(epic) = &self.parent_epic {
            out.push_str(&format!("- Parent Epic: [{}] {}\n", epic.id, epic.title));
        }
        if let Some(feature) = &self.parent_feature {
            out.push_str(&format!("- Parent Feature: [{}] {}\n", feature.id, feature.title));
        }

        let has_children = !self.features.is_empty() || !self.tasks.is_empty();
        if has_parents && has_children {
            out.push('\n');
        }
        for (label, list) in [("Features", &self.features), ("Tasks", &self.tasks)] {
            if list.is_empty() {
                continue;
            }
            out.push_str(&format!("- {label}:\n"));
            for r in list {
                out.push_str(&format!("  - [{}] {}\n", r.id, r.title));
            }
        }

        out.push_str(LINKS_END);
        out
    }

    /// Read a block back. Accepts the text between (or including) the
    /// sentinels; lines it does not recognise are ignored.
    pub fn parse(block: &str) -> Relationships {
        #[derive(Clone, Copy)]
        enum List {
            None,
            Features,
            Tasks,
        }

        let mut rels = Relationships::default();
        let mut current = List::None;
        for line in block.lines() {
            let indented = line.starts_with("  ") || line.starts_with('\t');
            let trimmed = line.trim();
            let Some(rest) = trimmed.strip_prefix("- ") else {
                continue;
            };

            if !indented {
                if let Some(r) = rest.strip_prefix("Parent Epic:").and_then(parse_ref) {
                    rels.parent_epic = Some(r);
                    current = List::None;
                } else if let Some(r) = rest.strip_prefix("Parent Feature:").and_then(parse_ref) {
                    rels.parent_feature = Some(r);
                    current = List::None;
                } else if rest == "Features:" {
                    current = List::Features;
                } else if rest == "Tasks:" {
                    current = List::Tasks;
                }
                continue;
            }

            if let Some(r) = parse_ref(rest) {
                match current {
                    List::Features => rels.features.push(r),
                    List::Tasks => rels.tasks.push(r),
                    List::None => {}
                }
            }
        }
        rels
    }
}

fn parse_ref(text: &str) -> Option<ItemRef> {
    let text = text.trim().strip_prefix('[')?;
    let close = text.find(']')?;
    let id: ItemId = text[..close].parse().ok()?;
    Some(ItemRef::new(id, text[close + 1..].trim()))
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Outcome of [`RelationshipManager::find_or_create_parent`].
#[derive(Debug, Clone, Default)]
pub struct ParentChoice {
    pub parent: Option<WorkItem>,
    pub create_new: bool,
}

/// Proposes parents and children for work items and owns the relationship
/// block of every item file.
pub struct RelationshipManager<'a> {
    completion: &'a dyn CompletionService,
    store: &'a WorkItemStore,
}

impl<'a> RelationshipManager<'a> {
    pub fn new(completion: &'a dyn CompletionService, store: &'a WorkItemStore) -> Self {
        Self { completion, store }
    }

    /// Ask which of `existing` should parent a new `kind` item, or whether a
    /// new parent is needed. Epics never have a parent; with no candidates a
    /// new parent is needed without consulting the model.
    pub fn find_or_create_parent(
        &self,
        kind: ItemKind,
        description: &str,
        existing: &[WorkItem],
    ) -> Result<ParentChoice> {
        let Some(parent_kind) = kind.parent() else {
            return Ok(ParentChoice::default());
        };
        let candidates: Vec<&WorkItem> = existing.iter().filter(|i| i.kind() == parent_kind).collect();
        if candidates.is_empty() {
            return Ok(ParentChoice {
                parent: None,
                create_new: true,
            });
        }

        let mut listing = String::new();
        for item in &candidates {
            listing.push_str(&format!(
                "[{}] {}\nStatus: {}\n{}\n\n",
                item.id, item.title, item.status, item.description
            ));
        }
        let system = format!(
            "You organize a software project's work items into epics, features and tasks. \
             Pick the existing {parent} that best contains a new {kind}. Reply with only \
             that {parent}'s ID (for example {example}), or the single word NEW if none fits.",
            parent = parent_kind,
            kind = kind,
            example = ItemId::first(parent_kind),
        );
        let user = format!(
            "New {kind}:\n{description}\n\nExisting {parent}s:\n{listing}",
            parent = parent_kind
        );

        let reply = self.completion.complete(&system, &user, 0.2)?;
        Ok(interpret_parent_reply(&reply, parent_kind, &candidates))
    }

    /// Three to five titles for children of a new `kind` item. Tasks have no
    /// children.
    pub fn suggest_children(&self, kind: ItemKind, description: &str) -> Result<Vec<String>> {
        let Some(child_kind) = kind.child() else {
            return Ok(Vec::new());
        };
        let system = format!(
            "You break software work down. Suggest 3 to 5 {child}s that together deliver \
             the given {kind}. Reply with one short {child} title per line and nothing else.",
            child = child_kind,
            kind = kind,
        );
        let reply = self.completion.complete(&system, description, 0.7)?;
        Ok(parse_titles(&reply))
    }

    /// Rewrite `id`'s relationship block with `relationships`.
    pub fn update_relationships(&self, id: &ItemId, relationships: &Relationships) -> Result<()> {
        self.store
            .replace_relationship_block(id, &relationships.render())?;
        tracing::debug!(%id, "relationships updated");
        Ok(())
    }

    /// Relationships currently recorded in `id`'s file.
    pub fn relationships_of(&self, id: &ItemId) -> Result<Relationships> {
        let item = self.store.read(id)?;
        Ok(item
            .links_block()
            .map(Relationships::parse)
            .unwrap_or_default())
    }

    /// Record `child` in `parent`'s block, keeping whatever else is there.
    pub fn link_child(&self, parent: &ItemId, child: ItemRef) -> Result<()> {
        if !self.store.exists(parent) {
            return Err(YoloError::ParentNotFound {
                child: child.id.to_string(),
                parent: parent.to_string(),
            });
        }
        let mut rels = self.relationships_of(parent)?;
        if rels.add_child(child) {
            self.update_relationships(parent, &rels)?;
        }
        Ok(())
    }
}

fn interpret_parent_reply(reply: &str, parent_kind: ItemKind, candidates: &[&WorkItem]) -> ParentChoice {
    let reply = reply.trim();
    let first_word = reply
        .split(|c: char| c.is_whitespace() || c == '.' || c == ',')
        .next()
        .unwrap_or("");
    if first_word.eq_ignore_ascii_case("new") {
        return ParentChoice {
            parent: None,
            create_new: true,
        };
    }

    let mentioned = reply
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter_map(|token| token.parse::<ItemId>().ok())
        .find(|id| id.kind() == parent_kind);
    match mentioned.and_then(|id| candidates.iter().find(|c| c.id == id)) {
        Some(parent) => ParentChoice {
            parent: Some((*parent).clone()),
            create_new: false,
        },
        None => {
            tracing::warn!(%reply, "parent suggestion did not name a known item");
            ParentChoice::default()
        }
    }
}

fn parse_titles(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(['-', '*', '•']).trim_start();
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            let line = match line[digits..].chars().next() {
                Some('.') | Some(')') if digits > 0 => line[digits + 1..].trim_start(),
                _ => line,
            };
            line.trim_matches('"').trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_CHILDREN)
        .collect()
}
