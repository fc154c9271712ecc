mod app;
mod config;
mod router;
mod session;
mod state;
mod theme;
mod ui;
mod view;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use config::{Args, Config};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use session::SocketSession;
use std::{fs::OpenOptions, io, sync::Mutex};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args(Args::parse())?;
    init_logging(&config)?;
    info!(event = "monitor_start", endpoint = %config.node_url);

    let (session, session_rx) = SocketSession::connect(&config.node_url);
    let mut app = App::new(session);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, session_rx).await;
    app.shutdown().await;
    restore_terminal(&mut terminal)?;

    if let Err(err) = result {
        eprintln!("atlas-monitor: {err}");
    }
    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    } else if config.log_stdout {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut session_rx: mpsc::Receiver<session::SessionEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut session_live = true;

    loop {
        terminal.draw(|f| ui::render(f, app))?;
        if app.should_quit() {
            break;
        }
        tokio::select! {
            maybe_event = session_rx.recv(), if session_live => {
                match maybe_event {
                    Some(event) => app.on_session_event(event),
                    None => session_live = false,
                }
            }
            maybe_input = events.next() => {
                match maybe_input {
                    Some(Ok(Event::Key(key))) => {
                        if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            app.handle_key(key);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("read terminal input"),
                    None => break,
                }
            }
        }
    }
    Ok(())
}
