use crate::error::Result;
use crate::paths;
use crate::store::WorkItemStore;
use crate::types::ItemKind;
use std::path::Path;
use yolo_llm::CompletionService;

const ASK_TEMPERATURE: f32 = 0.5;
/// Per-file cap on context pulled from README and STRATEGY.
const MAX_DOC_CHARS: usize = 4000;

const SYSTEM_PROMPT: &str = "You are a senior engineer on this project. Answer the developer's \
question using the project context when it is relevant. Be concise and end with up to three \
concrete next steps.";

/// README, STRATEGY and the work-item list, as plain text.
pub fn project_context(root: &Path) -> Result<String> {
    let mut out = String::new();
    for name in [paths::README_FILE, paths::STRATEGY_FILE] {
        match std::fs::read_to_string(root.join(name)) {
            Ok(text) if !text.trim().is_empty() => {
                let text: String = text.chars().take(MAX_DOC_CHARS).collect();
                out.push_str(&format!("=== {name} ===\n{}\n\n", text.trim_end()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    let items = WorkItemStore::new(root).load_all(&ItemKind::ALL)?;
    if !items.is_empty() {
        out.push_str("=== Work items ===\n");
        for item in &items {
            out.push_str(&format!("[{}] {} ({})\n", item.id, item.title, item.status));
        }
    }
    Ok(out)
}

/// Answer `question` with the project as context.
pub fn ask(completion: &dyn CompletionService, root: &Path, question: &str) -> Result<String> {
    let context = project_context(root)?;
    let user = if context.is_empty() {
        question.to_string()
    } else {
        format!("Project context:\n{context}\nQuestion: {question}")
    };
    let answer = completion.complete(SYSTEM_PROMPT, &user, ASK_TEMPERATURE)?;
    Ok(answer.trim().to_string())
}
