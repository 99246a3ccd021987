use serde::{Deserialize, Serialize};
use std::fmt;
use yolo_llm::{complete_as, CompletionService, Schema};

pub const EXPLAIN_FUNCTION: &str = "analyze_error";

const SYSTEM_PROMPT: &str = "You help developers understand failures of version-control and \
project tooling. Explain errors in plain language and give concrete, ordered steps to fix them.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub problem: String,
    pub explanation: String,
    #[serde(default)]
    pub solutions: Vec<String>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Problem: {}\n", self.problem)?;
        writeln!(f, " Explanation: {}\n", self.explanation)?;
        writeln!(f, " Solutions:")?;
        for (i, solution) in self.solutions.iter().enumerate() {
            writeln!(f, "{}. {solution}", i + 1)?;
        }
        Ok(())
    }
}

pub fn explanation_schema() -> Schema {
    Schema::object()
        .describe("Explain an error and how to fix it")
        .property("problem", Schema::string().describe("Brief description of the issue"))
        .property(
            "explanation",
            Schema::string().describe("User-friendly explanation of what went wrong"),
        )
        .property(
            "solutions",
            Schema::array(Schema::string()).describe("Step-by-step solutions"),
        )
        .require(&["problem", "explanation", "solutions"])
}

/// Reinterprets failures through the completion service. Never fails itself.
pub struct ErrorExplainer<'a> {
    completion: &'a dyn CompletionService,
}

impl<'a> ErrorExplainer<'a> {
    pub fn new(completion: &'a dyn CompletionService) -> Self {
        Self { completion }
    }

    /// `None` when the analysis itself could not be produced.
    pub fn analyze(&self, error: &str, context: &str) -> Option<Explanation> {
        let user = format!("Context: {context}\nError: {error}");
        match complete_as::<Explanation>(
            self.completion,
            SYSTEM_PROMPT,
            &user,
            &explanation_schema(),
            EXPLAIN_FUNCTION,
        ) {
            Ok(explanation) => Some(explanation),
            Err(e) => {
                tracing::debug!(error = %e, "error analysis unavailable");
                None
            }
        }
    }

    /// The formatted analysis, or `error` unchanged when analysis fails.
    pub fn explain(&self, error: &str, context: &str) -> String {
        match self.analyze(error, context) {
            Some(explanation) => explanation.to_string(),
            None => error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yolo_llm::scripted::ScriptedCompletion;

    #[test]
    fn formats_three_sections() {
        let svc = ScriptedCompletion::new().structured(json!({
            "problem": "Pull rejected",
            "explanation": "The remote has commits you do not have.",
            "solutions": ["Run git pull --rebase", "Retry the commit"]
        }));
        let text = ErrorExplainer::new(&svc).explain("! [rejected]", "pulling from remote");
        assert_eq!(
            text,
            " Problem: Pull rejected\n\n \
             Explanation: The remote has commits you do not have.\n\n \
             Solutions:\n1. Run git pull --rebase\n2. Retry the commit\n"
        );
        let call = &svc.calls()[0];
        assert!(call.user.contains("Context: pulling from remote"));
        assert!(call.user.contains("Error: ! [rejected]"));
        assert_eq!(call.function.as_deref(), Some(EXPLAIN_FUNCTION));
    }

    #[test]
    fn failed_analysis_returns_original_error() {
        let svc = ScriptedCompletion::new().failure("offline");
        assert_eq!(
            ErrorExplainer::new(&svc).explain("fatal: not a git repository", "staging"),
            "fatal: not a git repository"
        );

        let bad_shape = ScriptedCompletion::new().structured(json!({"problem": "x"}));
        assert!(ErrorExplainer::new(&bad_shape).analyze("e", "c").is_none());
    }
}
