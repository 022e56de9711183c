use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use pathquran_core::config::config_dir;
use pathquran_core::{AppState, Config, Corpus, Explainer, JsonFileStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod handler;
mod layout;
mod tui;
mod ui;

use app::App;
use cli::Commands;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "pathquran", version)]
#[command(about = "Read the Quran with tafsir and AI verse explanations in the terminal")]
struct Cli {
    /// Directory holding surah.json and the text tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log diagnostics to stderr (subcommands only)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.command.is_none() || cli.verbose {
        "info"
    } else {
        "off"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if cli.command.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    // The TUI owns the terminal, so logs go to a file
    let log_file = config_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("pathquran.log"))?;
        Ok(file)
    });

    // Without a log file the reader runs silently
    if let Ok(file) = log_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        Config::new()
    });
    let data_dir = config.resolve_data_dir(cli.data_dir.as_deref())?;

    let store = JsonFileStore::open_default_or_memory();
    let mut state = AppState::load(store);

    match cli.command {
        Some(command) => cli::run(command, &config, &mut state, &data_dir).await,
        None => {
            let corpus = Corpus::load(&data_dir).await?;
            run_tui(corpus, state, Explainer::from_config(&config)).await
        }
    }
}

async fn run_tui(corpus: Corpus, state: AppState, explainer: Explainer) -> Result<()> {
    info!(chapters = corpus.chapter_count(), "starting reader");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(corpus, state, explainer);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.shutdown().await;
    tui::restore()?;
    result
}
