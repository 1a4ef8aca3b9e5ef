use anyhow::Result;
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use doplhy_core::{
    load_default, ChatBackend, Config, Conversation, FileCredentialStore, GeminiClient,
    KnowledgeSource,
};

mod app;
mod handler;
mod textedit;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "doplhy")]
#[command(about = "Paste a story, then ask a friendly chat bot questions about it")]
struct Cli {
    /// Default knowledge base: a file path or an http(s) URL
    #[arg(long)]
    kb: Option<String>,
    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,
    /// Remember --kb and --model in the config file for later runs
    #[arg(long)]
    save: bool,
}

/// Send logs to `<cache_dir>/doplhy/doplhy.log`; the terminal belongs to the UI.
fn init_logging() -> Result<PathBuf> {
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("doplhy");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("doplhy.log");

    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
    let filter = EnvFilter::try_from_env("DOPLHY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(log_path)
}

impl Cli {
    /// Copy the flags that were given over the config values.
    fn override_config(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(kb) = &self.kb {
            config.knowledge_source = Some(kb.clone());
        }
    }
}

/// Store the command-line choices as new defaults. A failed write only loses the defaults.
fn remember_choices(config: &mut Config, cli: &Cli) {
    cli.override_config(config);
    match config.save() {
        Ok(()) => info!("saved defaults to config"),
        Err(e) => warn!(error = %e, "could not save config"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging()?;

    let mut config = Config::load_or_default();
    if cli.save {
        remember_choices(&mut config, &cli);
    }
    let model = cli.model.unwrap_or_else(|| config.model().to_string());
    let source = KnowledgeSource::parse(cli.kb.as_deref().unwrap_or(config.knowledge_source()));
    info!(%model, %source, log = %log_path.display(), "starting doplhy");

    let knowledge = load_default(&source).await;

    let backend: Arc<dyn ChatBackend> = Arc::new(GeminiClient::new(config.api_base()));
    let store = FileCredentialStore::default_location()?;
    let conversation = Conversation::new(backend, Box::new(store), model, knowledge);
    let mut app = App::new(conversation);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
