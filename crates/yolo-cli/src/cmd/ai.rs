use super::Session;
use crate::output::print_json;
use clap::Subcommand;
use std::path::Path;
use yolo_llm::ProviderKind;

#[derive(Subcommand)]
pub enum AiSubcommand {
    /// Store the provider, key and model in the user config
    Config {
        /// openai, anthropic, mistral or compatible
        #[arg(long)]
        provider: String,
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        model: Option<String>,
        /// Endpoint for OpenAI-compatible servers
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Show the active provider and where its key comes from
    Status,
}

pub fn run(root: &Path, subcmd: AiSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AiSubcommand::Config {
            provider,
            api_key,
            model,
            base_url,
        } => configure(root, &provider, &api_key, model, base_url),
        AiSubcommand::Status => status(root, json),
    }
}

fn configure(
    root: &Path,
    provider: &str,
    api_key: &str,
    model: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<()> {
    let kind: ProviderKind = provider.parse()?;
    if api_key.trim().is_empty() {
        anyhow::bail!("--api-key must not be empty");
    }
    let mut session = Session::load(root)?;
    session
        .config
        .configure_provider(kind, api_key, model, base_url)?;
    println!(
        "Saved {kind} settings to {}",
        session.dirs().settings_file().display()
    );
    Ok(())
}

fn status(root: &Path, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    let provider = session.config.provider_config()?;
    let (_, source) = session
        .config
        .resolve_key(provider.kind, |name| std::env::var(name).ok());
    let editor = session.config.editor();

    if json {
        return print_json(&serde_json::json!({
            "provider": provider.kind.as_str(),
            "model": provider.model(),
            "base_url": provider.base_url(),
            "key_source": source.as_str(),
            "editor": editor,
            "dev_mode": session.config.dev_mode(),
        }));
    }
    println!("Provider:  {}", provider.kind);
    println!("Model:     {}", provider.model());
    println!("Endpoint:  {}", provider.base_url());
    println!("API key:   {}", source.as_str());
    println!("Editor:    {editor}");
    if session.config.dev_mode() {
        println!("Dev mode:  on");
    }
    Ok(())
}
