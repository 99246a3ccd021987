use super::text_or_stdin;
use clap::Subcommand;
use std::path::Path;
use yolo_core::sprint;

#[derive(Subcommand)]
pub enum SprintSubcommand {
    /// The running sprint journal
    Current {
        #[command(subcommand)]
        action: CurrentAction,
    },
}

#[derive(Subcommand)]
pub enum CurrentAction {
    /// Start sprint.current.md (text from arguments or stdin)
    Init { text: Vec<String> },

    /// Append an update to sprint.current.md (text from arguments or stdin)
    Update { text: Vec<String> },
}

pub fn run(root: &Path, subcmd: SprintSubcommand) -> anyhow::Result<()> {
    let SprintSubcommand::Current { action } = subcmd;
    let now = chrono::Local::now().naive_local();
    let path = match action {
        CurrentAction::Init { text } => sprint::init(root, &text_or_stdin(&text)?, now)?,
        CurrentAction::Update { text } => sprint::update(root, &text_or_stdin(&text)?, now)?,
    };
    println!("Updated {}", path.display());
    Ok(())
}
