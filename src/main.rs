use std::fs::{self, File};
use std::sync::Mutex;
use anyhow::{Context, Result};
use thinkchat_core::Config;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

/// Log to a file; stderr belongs to the terminal UI.
fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .context("Could not find cache directory")?
        .join("thinkchat");
    fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("thinkchat.log"))?;

    let filter = EnvFilter::try_from_env("THINKCHAT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logging is best effort; the chat works without it
    let _ = init_logging();

    let config = Config::load()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not load config, using defaults");
            Config::new()
        })
        .with_env();
    tracing::info!(base_url = %config.base_url, model = %config.model, "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender());

    let result = run(&mut terminal, &mut events, &mut app).await;

    app.stop();
    if let Some(task) = app.stream_task.take() {
        let _ = task.await;
    }
    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
    }
    Ok(())
}
