use super::{explained, Session};
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, question: &[String]) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    let completion = session.completion()?;
    let question = question.join(" ");
    let answer = yolo_core::ask::ask(completion.as_ref(), root, &question)
        .context("answering the question")
        .map_err(|e| explained(completion.as_ref(), e, "answering a question about the project"))?;
    println!("{answer}");
    Ok(())
}
