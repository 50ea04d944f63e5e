use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use codelearner_core::{Config, Theme};
use tracing::{error, info, warn};

mod app;
mod handler;
mod input;
mod logging;
mod tui;
mod ui;

use app::{App, Overrides};
use tui::{EventHandler, Tui};

/// Loading animation and background results advance on this beat.
const TICK_RATE: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "codelearner")]
#[command(about = "Terminal client for CodeLearner: chat, word search and code exercises")]
struct Cli {
    /// Backend base URL (overrides CODELEARNER_API_URL and the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Write logs to this file instead of the default location
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Start with this colour theme (dark or light)
    #[arg(long, value_parser = parse_theme)]
    theme: Option<Theme>,
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    Theme::from_str(s).ok_or_else(|| format!("unknown theme '{s}', expected dark or light"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = logging::init(cli.log_file)?;
    info!(path = %log_path.display(), "logging initialised");

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {e:#}");
        Config::new()
    });

    let mut events = EventHandler::new(TICK_RATE);
    let overrides = Overrides {
        api_url: cli.api_url,
        theme: cli.theme,
    };
    let mut app = App::new(&config, overrides, events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        error!("application error: {e:#}");
    }
    info!("exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event)?;
        app.poll_tasks().await;
    }
    Ok(())
}
