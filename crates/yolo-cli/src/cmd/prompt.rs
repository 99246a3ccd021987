use super::Session;
use crate::output::{print_json, print_table};
use std::path::Path;
use yolo_core::prompts::{MethodologyPrompts, PromptName};

/// `prompt <name>`, `prompt list` or `prompt reset`.
pub fn run(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    match name {
        "list" => list(json),
        "reset" => reset(root),
        _ => print(root, name),
    }
}

pub fn print(root: &Path, name: &str) -> anyhow::Result<()> {
    let name: PromptName = name.parse()?;
    let session = Session::load(root)?;
    println!("{}", session.prompt(name)?);
    Ok(())
}

fn list(json: bool) -> anyhow::Result<()> {
    if json {
        let names: Vec<_> = PromptName::ALL
            .iter()
            .map(|p| serde_json::json!({ "name": p.as_str(), "summary": p.summary() }))
            .collect();
        return print_json(&names);
    }
    let rows = PromptName::ALL
        .iter()
        .map(|p| vec![p.as_str().to_string(), p.summary().to_string()])
        .collect();
    print_table(&["NAME", "DESCRIPTION"], rows);
    Ok(())
}

fn reset(root: &Path) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    let path = MethodologyPrompts::reset(session.dirs())?;
    println!("Restored default prompts in {}", path.display());
    Ok(())
}
