// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::info;

mod api;
mod app;
mod data;
mod events;
mod persist;
mod settings;
mod source;
mod ticker;
mod ui;

use api::{ApiClient, ApiError};
use app::{App, View};
use data::{DeviceRecord, Reading, SensorCatalog};
use persist::{FileStore, StatePort};
use settings::Settings;
use source::MqttSource;
use ticker::Ticker;

#[derive(Parser, Debug)]
#[command(name = "fleet-doctor")]
#[command(about = "Realtime TUI dashboard for IoT device fleet telemetry")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// REST backend base URL (overrides settings)
    #[arg(long)]
    api_url: Option<String>,

    /// MQTT broker URL, e.g. mqtt://broker:1883 (overrides settings)
    #[arg(long)]
    broker_url: Option<String>,

    /// Heartbeat TTL in seconds (overrides settings)
    #[arg(long)]
    ttl: Option<u64>,

    /// Log file for tracing output (the terminal belongs to the TUI)
    #[arg(long, default_value = "fleet-doctor.log")]
    log_file: PathBuf,
}

/// Result of an asynchronous REST fetch, delivered back to the app loop.
enum FetchOutcome {
    Snapshot(Result<Vec<DeviceRecord>, ApiError>),
    Readings {
        device_id: String,
        result: Result<Vec<Reading>, ApiError>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(url) = args.api_url {
        settings.api_url = url;
    }
    if let Some(url) = args.broker_url {
        settings.broker_url = url;
    }
    if let Some(ttl) = args.ttl {
        settings.heartbeat_ttl_secs = ttl;
    }

    info!(api = %settings.api_url, broker = %settings.broker_url, "starting fleet-doctor");

    let rt = tokio::runtime::Runtime::new()?;

    let state_port: Arc<dyn StatePort> = Arc::new(FileStore::open()?);
    let api = ApiClient::builder()
        .endpoint(&settings.api_url)
        .build(state_port.clone());

    // Initial REST bootstrap: authenticate, sensor catalog, device snapshot.
    let (catalog, devices) = rt.block_on(bootstrap(&api, &settings))?;

    // The push connection is session-scoped: one connect here, one shutdown
    // at teardown, never in between.
    let push_source = rt.block_on(async { MqttSource::connect(&settings) })?;

    let mut app = App::new(
        Box::new(push_source),
        state_port,
        catalog,
        settings.ttl(),
        Utc::now(),
    );
    app.set_snapshot(devices, Utc::now());

    // Liveness changes with elapsed time alone; the ticker forces periodic
    // recomputation even with zero messages. Session-scoped as well.
    let mut ticker = Ticker::start(rt.handle(), settings.refresh_period());

    let result = run_tui(&mut app, &api, rt.handle(), &mut ticker);

    // Session teardown, in order: cancel the ticker, then the connection.
    ticker.stop();
    app.shutdown_source();

    result
}

/// Authenticate (if needed) and fetch the session's reference data.
async fn bootstrap(api: &ApiClient, settings: &Settings) -> Result<(SensorCatalog, Vec<DeviceRecord>)> {
    if !api.has_token() {
        login(api, settings).await?;
    }

    // A stored token may have expired; one re-login resolves that.
    let sensors = match api.sensors().await {
        Ok(sensors) => sensors,
        Err(ApiError::Unauthorized) => {
            login(api, settings).await?;
            api.sensors().await.context("fetching sensor catalog")?
        }
        Err(e) => return Err(e).context("fetching sensor catalog"),
    };

    let devices = api.devices().await.context("fetching device snapshot")?;
    info!(devices = devices.len(), sensors = sensors.len(), "snapshot loaded");

    Ok((SensorCatalog::new(sensors), devices))
}

async fn login(api: &ApiClient, settings: &Settings) -> Result<()> {
    let (Some(username), Some(password)) = (&settings.api_username, &settings.api_password) else {
        bail!(
            "API authentication required: set api_username/api_password \
             (or FLEET_API_USERNAME/FLEET_API_PASSWORD)"
        );
    };
    api.login(username, password).await.context("login failed")
}

/// Run the TUI around the prepared app.
fn run_tui(
    app: &mut App,
    api: &ApiClient,
    handle: &tokio::runtime::Handle,
    ticker: &mut Ticker,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, app, api, handle, ticker);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    api: &ApiClient,
    handle: &tokio::runtime::Handle,
    ticker: &mut Ticker,
) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    // Results of in-flight REST fetches come back through this channel, so
    // all state mutation stays on this thread.
    let (fetch_tx, mut fetch_rx) = mpsc::channel::<FetchOutcome>(8);

    while app.running {
        let now = Utc::now();

        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered =
                    ratatui::layout::Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0], now);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Devices => ui::devices::render(frame, app, chunks[2], now),
                View::Sensors => ui::sensors::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area, now);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for terminal events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }

        // Drain the push channel and drive elapsed-time transitions
        let now = Utc::now();
        app.pump_messages(now);
        app.tick(now);
        if ticker.try_tick() {
            app.refresh_liveness(now);
        }

        // Start requested REST fetches in the background
        if app.take_refresh_request() {
            let api = api.clone();
            let tx = fetch_tx.clone();
            handle.spawn(async move {
                let result = api.devices().await;
                let _ = tx.send(FetchOutcome::Snapshot(result)).await;
            });
        }
        if let Some(device_id) = app.take_backfill_request() {
            let api = api.clone();
            let tx = fetch_tx.clone();
            let end = Utc::now();
            let start = end - chrono::Duration::hours(1);
            handle.spawn(async move {
                let result = api.readings(&device_id, start, end, "1m").await;
                let _ = tx.send(FetchOutcome::Readings { device_id, result }).await;
            });
        }

        // Apply completed fetches
        while let Ok(outcome) = fetch_rx.try_recv() {
            match outcome {
                FetchOutcome::Snapshot(result) => app.apply_snapshot_result(result, Utc::now()),
                FetchOutcome::Readings { device_id, result } => {
                    app.apply_backfill_result(&device_id, result)
                }
            }
        }
    }

    Ok(())
}

fn init_logging(path: &Path) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
