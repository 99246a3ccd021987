mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{ai::AiSubcommand, sprint::SprintSubcommand};
use std::path::PathBuf;
use yolo_core::config::UserConfig;
use yolo_core::paths::UserDirs;
use yolo_core::types::ItemKind;

#[derive(Parser)]
#[command(
    name = "yolo",
    about = "Plan, document and commit with the YOLO methodology",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from yolo/ or .git/)
    #[arg(long, global = true, env = "YOLO_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the YOLO layout in the current project
    Init {
        /// Describe the project to generate a plan of epics, features and tasks ("-" reads stdin)
        #[arg(long, value_name = "TEXT")]
        describe: Option<String>,
    },

    /// Ask a question about the project
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Commit all changes with a generated conventional message and sync
    Commit {
        /// Skip pull and push
        #[arg(long)]
        no_sync: bool,

        /// Push even when the pull fails
        #[arg(long)]
        force: bool,

        /// Use this conventional message instead of generating one
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Serve the epic/feature/task graph
    Graph {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Directory holding the graph UI (default: yolo/web)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },

    /// Explain the methodology, or an error message
    Explain { text: Vec<String> },

    /// Create an epic
    Epic { description: Vec<String> },

    /// Create a feature under an epic
    Feature { description: Vec<String> },

    /// Create a task under a feature
    Task { description: Vec<String> },

    /// Keep a sprint journal in sprint.current.md
    Sprint {
        #[command(subcommand)]
        subcommand: SprintSubcommand,
    },

    /// Print a methodology prompt, or `list` / `reset` them
    Prompt { name: String },

    /// Print a methodology prompt
    Rp { name: String },

    /// Configure the completion provider
    Ai {
        #[command(subcommand)]
        subcommand: AiSubcommand,
    },

    /// Print the version
    Version,

    /// Toggle developer mode (debug logging)
    Dev,
}

fn main() {
    let cli = Cli::parse();

    let dev_mode = UserDirs::discover()
        .and_then(UserConfig::load)
        .map(|c| c.dev_mode())
        .unwrap_or(false);
    let default_level = match &cli.command {
        _ if dev_mode => tracing::Level::DEBUG,
        Commands::Graph { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { describe } => cmd::init::run(&root, describe.as_deref()),
        Commands::Ask { question } => cmd::ask::run(&root, &question),
        Commands::Commit {
            no_sync,
            force,
            message,
        } => cmd::commit::run(&root, no_sync, force, message),
        Commands::Graph {
            port,
            static_dir,
            no_open,
        } => cmd::graph::run(&root, port, static_dir, no_open),
        Commands::Explain { text } => cmd::explain::run(&root, &text),
        Commands::Epic { description } => cmd::item::run(&root, ItemKind::Epic, &description, cli.json),
        Commands::Feature { description } => {
            cmd::item::run(&root, ItemKind::Feature, &description, cli.json)
        }
        Commands::Task { description } => cmd::item::run(&root, ItemKind::Task, &description, cli.json),
        Commands::Sprint { subcommand } => cmd::sprint::run(&root, subcommand),
        Commands::Prompt { name } => cmd::prompt::run(&root, &name, cli.json),
        Commands::Rp { name } => cmd::prompt::print(&root, &name),
        Commands::Ai { subcommand } => cmd::ai::run(&root, subcommand, cli.json),
        Commands::Version => cmd::version::run(cli.json),
        Commands::Dev => cmd::dev::run(&root),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
