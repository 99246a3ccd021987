use super::{explained, text_or_stdin, Session};
use crate::output::print_json;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use yolo_core::authoring::{AuthorReport, Authoring};
use yolo_core::relationships::ItemRef;
use yolo_core::types::ItemKind;

#[derive(Serialize)]
struct ItemJson {
    id: String,
    title: String,
}

impl From<&ItemRef> for ItemJson {
    fn from(item: &ItemRef) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title.clone(),
        }
    }
}

fn list(items: &[ItemRef]) -> Vec<ItemJson> {
    items.iter().map(ItemJson::from).collect()
}

fn line(item: &ItemRef) -> String {
    format!("[{}] {}", item.id, item.title)
}

pub fn run(root: &Path, kind: ItemKind, description: &[String], json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    session.require_initialized()?;
    let description = text_or_stdin(description)?;
    let completion = session.completion()?;

    let context = format!("creating a new {}", kind.as_str());
    let report = Authoring::new(completion.as_ref(), root)
        .with_guidance(session.guidance()?)
        .create(kind, description.trim())
        .with_context(|| context.clone())
        .map_err(|e| explained(completion.as_ref(), e, &context))?;

    if json {
        return print_report_json(&report);
    }
    for parent in &report.created_parents {
        println!("  created parent: {}", line(parent));
    }
    println!("Created {}: {}", kind.label(), line(&report.item));
    if let Some(parent) = report.parents.last() {
        println!("  linked to: {}", line(parent));
    }
    for child in &report.children {
        println!("  created child: {}", line(child));
    }
    Ok(())
}

fn print_report_json(report: &AuthorReport) -> anyhow::Result<()> {
    print_json(&serde_json::json!({
        "item": ItemJson::from(&report.item),
        "parents": list(&report.parents),
        "created_parents": list(&report.created_parents),
        "children": list(&report.children),
    }))
}
