use super::Session;
use std::path::Path;
use yolo_core::explainer::ErrorExplainer;
use yolo_core::prompts::PromptName;

/// Without text, print the methodology. With text, explain it as an error.
pub fn run(root: &Path, text: &[String]) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    if text.is_empty() {
        println!("{}", session.prompt(PromptName::Methodology)?);
        return Ok(());
    }

    let completion = session.completion()?;
    let error = text.join(" ");
    match ErrorExplainer::new(completion.as_ref()).analyze(&error, "error reported by the user") {
        Some(explanation) => {
            println!("{explanation}");
            Ok(())
        }
        None => anyhow::bail!("could not analyze the error; see the log for details"),
    }
}
