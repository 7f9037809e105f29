mod app;
mod backend;
mod cli;
mod handlers;
mod oauth;
mod ui;

use std::{io, sync::Arc};

use app::App;
use clap::Parser;
use clubhub::{SessionResolver, routes::Route};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use handlers::handle_key_event;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use ui::ui;
use url::Url;

use crate::{backend::create_services, cli::Cli};

const LOG_FILE: &str = "clubhub.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Log to a file; the terminal belongs to the UI
    let data_dir = cli.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log)?)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let redirect_url = Url::parse(&cli.redirect_url)?;
    let services = Arc::new(create_services(&cli).await?);

    let (callback_tx, callback_rx) = mpsc::unbounded_channel();
    if let Err(e) = oauth::listen(&redirect_url, callback_tx).await {
        tracing::warn!(error = %e, "could not start the OAuth callback listener");
    }

    let resolver = SessionResolver::start(services.identity(), services.store(), redirect_url);
    let start = Route::from_path(&cli.route).unwrap_or_else(|| {
        tracing::info!(route = %cli.route, "unknown route; opening the landing page");
        Route::Landing
    });
    let mut app = App::new(resolver, services.clone(), start, callback_rx);

    // Setup terminal for TUI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.resolver.dispose();
    if let Err(e) = services.save().await {
        tracing::error!(error = %e, "failed to save in-memory backend");
        eprintln!("Failed to save data: {e}");
    }

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    // Redraw often enough for banners and the welcome panel to expire on time
    let mut tick = tokio::time::interval(tokio::time::Duration::from_millis(250));

    loop {
        app.poll_updates().await;
        terminal.draw(|f| ui(f, app))?;

        // Handle all available events first, then wait for the next tick
        let mut handled_event = false;

        // Process all available events without blocking
        while event::poll(std::time::Duration::from_millis(0))? {
            if let Ok(Event::Key(key)) = event::read() {
                handled_event = true;
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code, key.modifiers).await;
                }
            }
        }

        if app.should_quit {
            break;
        }

        if !handled_event {
            tokio::select! {
                _ = tick.tick() => {}
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(50)) => {
                    // Small delay to prevent busy waiting
                }
            }
        }
    }
    Ok(())
}
