use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use anyhow::{anyhow, Result};
use askdb_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const DEFAULT_LOG_FILTER: &str = "askdb_core=info,askdb_tui=info";

/// Log to a file under the data dir; the terminal belongs to the TUI.
///
/// Filter precedence: `log_filter` from config (or `ASKDB_LOG`), then
/// `RUST_LOG`, then [`DEFAULT_LOG_FILTER`].
fn init_logging(config: &Config) -> Result<()> {
    let Some(data_dir) = dirs::data_local_dir() else {
        return Ok(());
    };
    let log_dir = data_dir.join("askdb");
    fs::create_dir_all(&log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("askdb.log"))?;

    let filter = match config.log_filter.as_deref() {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| anyhow!("Could not initialize logging: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_or_init()?;
    init_logging(&config)?;
    tracing::info!(endpoint = %config.endpoint, "starting askdb");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &config).await;

    tui::restore()?;
    if let Err(err) = &result {
        tracing::error!(error = %err, "askdb exited with an error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, config: &Config) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender())?;
    events.watch_store(app.view.subscribe());

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event)?;
    }

    Ok(())
}
