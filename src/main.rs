mod api;
mod app;
mod client;
mod config;
mod events;
mod logging;
mod models;
mod notes;
mod prompts;
mod server;
mod sse;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, prelude::*};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use api::OpenAiClient;
use app::{App, PendingGeneration};
use client::{DiffSource, HttpDiffSource, NoteClient};
use events::AppEvent;
use models::{AppConfig, Mode, NoteKey};
use server::RelayState;

#[derive(Debug, Parser)]
#[command(name = "diff-digest", version, about = "Release notes for merged pull requests")]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the note generation relay
    Serve {
        /// Address to bind, overriding `server.bind_addr`
        #[arg(long)]
        bind: Option<String>,
    },
    /// Browse pull requests and stream notes in the terminal (default)
    Ui,
}

/// Handles the UI needs to start background work
struct Services {
    notes: NoteClient,
    diffs: Arc<dyn DiffSource>,
    per_page: u32,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    /// Latest generation task per note
    generations: HashMap<NoteKey, JoinHandle<()>>,
}

impl Services {
    /// Remember the task streaming `key`, aborting the one it replaces
    fn track_generation(&mut self, key: NoteKey, task: JoinHandle<()>) {
        self.generations.retain(|_, running| !running.is_finished());
        if let Some(previous) = self.generations.insert(key, task) {
            previous.abort();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    match cli.command.unwrap_or(Command::Ui) {
        Command::Serve { bind } => run_server(&config, bind).await,
        Command::Ui => run_ui(&config).await,
    }
}

async fn run_server(config: &AppConfig, bind: Option<String>) -> Result<()> {
    logging::init_console(&config.server.log_level);

    let api_key = config::resolve_api_key(&config.provider);
    let provider = OpenAiClient::new(&config.provider, api_key).with_context(|| {
        format!(
            "Failed to create provider client (set {} or provider.api_key)",
            config::API_KEY_ENV
        )
    })?;
    tracing::info!(model = provider.model(), "Provider configured");

    let addr: SocketAddr = bind
        .as_deref()
        .unwrap_or(&config.server.bind_addr)
        .parse()
        .context("Invalid bind address")?;

    let state = RelayState::new(
        Arc::new(provider),
        Duration::from_secs(config.server.idle_timeout),
    );
    server::serve(addr, state).await
}

async fn run_ui(config: &AppConfig) -> Result<()> {
    logging::init_file(config::get_log_dir()?, &config.server.log_level);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut services = Services {
        notes: NoteClient::new(&config.client.relay_url, config.client.request_timeout)?,
        diffs: Arc::new(HttpDiffSource::new(
            config.client.diff_source_url.clone(),
            config.client.request_timeout,
        )?),
        per_page: config.client.per_page,
        event_tx,
        generations: HashMap::new(),
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();
    let res = run_app(&mut terminal, &mut app, &mut services, &mut event_rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn spawn_fetch(
    source: Arc<dyn DiffSource>,
    page: u32,
    per_page: u32,
    event_tx: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let event = match source.fetch_page(page, per_page).await {
            Ok(result) => AppEvent::DiffsLoaded { page, result },
            Err(e) => {
                tracing::warn!(page, "Failed to fetch diffs: {e}");
                AppEvent::DiffsFailed(e.to_string())
            }
        };
        let _ = event_tx.send(event);
    })
}

fn spawn_generation(
    client: NoteClient,
    pending: PendingGeneration,
    event_tx: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let PendingGeneration {
            key,
            generation,
            diff,
        } = pending;
        client.generate(key, generation, &diff, &event_tx).await;
    })
}

fn start_generation(app: &mut App, mode: Mode, services: &mut Services) {
    if let Some(pending) = app.begin_generation(mode) {
        tracing::info!(
            diff_id = %pending.key.diff_id,
            mode = mode.label(),
            generation = pending.generation,
            "Generating notes"
        );
        let key = pending.key.clone();
        let task = spawn_generation(services.notes.clone(), pending, services.event_tx.clone());
        services.track_generation(key, task);
    }
}

fn handle_keyboard_input(
    app: &mut App,
    key: KeyCode,
    modifiers: KeyModifiers,
    services: &mut Services,
) {
    match key {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            if app.exit_pending {
                app.quit();
            } else {
                app.exit_pending = true;
            }
            return;
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else if app.exit_pending {
                app.exit_pending = false;
            }
            return;
        }
        _ if app.exit_pending => {
            // Any other key cancels pending exit
            app.exit_pending = false;
        }
        _ => {}
    }

    if app.show_help {
        if key == KeyCode::Char('h') && modifiers.contains(KeyModifiers::CONTROL) {
            app.toggle_help();
        }
        return;
    }

    match key {
        KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Char('h') if modifiers.contains(KeyModifiers::CONTROL) => app.toggle_help(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Char('f') => {
            if let Some(page) = app.begin_refresh() {
                spawn_fetch(
                    Arc::clone(&services.diffs),
                    page,
                    services.per_page,
                    services.event_tx.clone(),
                );
            }
        }
        KeyCode::Char('n') => {
            if let Some(page) = app.begin_load_more() {
                spawn_fetch(
                    Arc::clone(&services.diffs),
                    page,
                    services.per_page,
                    services.event_tx.clone(),
                );
            }
        }
        KeyCode::Char('d') => start_generation(app, Mode::Developer, services),
        KeyCode::Char('m') => start_generation(app, Mode::Marketing, services),
        KeyCode::Char('D') => app.toggle_notes(Mode::Developer),
        KeyCode::Char('M') => app.toggle_notes(Mode::Marketing),
        _ => {}
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    services: &mut Services,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // Apply everything the background tasks reported since the last frame
        while let Ok(app_event) = event_rx.try_recv() {
            app.handle_event(app_event);
        }

        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_keyboard_input(app, key.code, key.modifiers, services);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
