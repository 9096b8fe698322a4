mod app;
mod ui;

use anyhow::{Context, Result};
use app::*;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    execute,
};
use paylink_sync::checkpoint::{CheckpointStore, FileCheckpointStore};
use paylink_sync::config::{load_config, save_config, SyncConfig};
use paylink_sync::snapshot::{list_snapshots, read_snapshot};
use paylink_sync::{logging, SyncReport, Synchronizer};
use ratatui::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "paylink-sync", version, about = "Export newly paid checkout sessions for a set of payment links")]
struct Cli {
    /// Directory holding the checkpoint and snapshots.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Default)]
struct SourceArgs {
    /// Payment link to poll; repeat for several. Replaces the configured set.
    #[arg(long = "link")]
    links: Vec<String>,
    /// Use random demo sessions instead of the live provider. Demo state is
    /// kept under `<data-dir>/mock`.
    #[arg(long)]
    mock: bool,
    #[arg(long)]
    api_base: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one synchronization pass and print the result as JSON.
    Run(SourceArgs),
    /// Sync on an interval with a live terminal dashboard.
    Watch {
        #[command(flatten)]
        source: SourceArgs,
        /// Seconds between passes.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show the stored checkpoint and the snapshots written so far.
    Status,
    /// Write the config file used by later runs.
    Configure {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long = "link")]
        links: Vec<String>,
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn resolve_config(data_dir: Option<PathBuf>, source: &SourceArgs) -> SyncConfig {
    let mut config = load_config().unwrap_or_default();
    config.apply_env();
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if !source.links.is_empty() {
        config.payment_links = source.links.clone();
    }
    if let Some(base) = &source.api_base {
        config.api_base = base.clone();
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(source) => {
            logging::init_tracing();
            let config = resolve_config(cli.data_dir, &source);
            run_once(&config, source.mock).await
        }
        Command::Watch { source, interval } => {
            let mut config = resolve_config(cli.data_dir, &source);
            if let Some(secs) = interval {
                config.poll_interval_secs = secs;
            }
            logging::init_file_tracing(&config.log_path())
                .with_context(|| format!("opening log file {}", config.log_path().display()))?;
            let sync = Synchronizer::from_config(&config, source.mock)?;
            watch(sync, config.poll_interval_secs.max(1)).await
        }
        Command::Status => {
            logging::init_tracing();
            let config = resolve_config(cli.data_dir, &SourceArgs::default());
            print_status(&config).await
        }
        Command::Configure { api_key, links, interval } => {
            logging::init_tracing();
            let mut config = load_config().unwrap_or_default();
            if let Some(dir) = cli.data_dir {
                config.data_dir = dir;
            }
            if let Some(key) = api_key {
                config.api_key = key;
            }
            if !links.is_empty() {
                config.payment_links = links;
            }
            if let Some(secs) = interval {
                config.poll_interval_secs = secs;
            }
            let path = save_config(&config)?;
            info!(path = %path.display(), "config saved");
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn run_once(config: &SyncConfig, mock: bool) -> Result<()> {
    let outcome = match Synchronizer::from_config(config, mock) {
        Ok(sync) => sync.run().await,
        Err(e) => Err(e),
    }
    .map_err(anyhow::Error::from);

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "sync failed");
            SyncReport::failure(&e)
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_status(config: &SyncConfig) -> Result<()> {
    let store = FileCheckpointStore::in_dir(&config.data_dir);
    let last_run = store.read().await?;
    if last_run == 0 {
        println!("checkpoint: none (next run exports full history)");
    } else {
        let at = chrono::DateTime::from_timestamp(last_run, 0)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("checkpoint: {} ({})", last_run, at);
    }

    let snapshots = list_snapshots(&config.data_dir).await?;
    println!("snapshots:  {} in {}", snapshots.len(), config.data_dir.display());
    for path in snapshots {
        match read_snapshot(&path).await {
            Ok(records) => println!("  {}  {} records", path.display(), records.len()),
            Err(e) => println!("  {}  unreadable: {}", path.display(), e),
        }
    }
    Ok(())
}

async fn watch(sync: Synchronizer, interval_secs: u64) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_dashboard(&mut terminal, sync, interval_secs).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        eprintln!("Error: {}", e);
    }
    result
}

async fn run_dashboard(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    sync: Synchronizer,
    interval_secs: u64,
) -> Result<()> {
    let mut app = App::new(
        sync.provider_name().to_string(),
        sync.links().map(str::to_string).collect(),
        interval_secs,
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();
    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel::<()>();
    let poll_handle = tokio::spawn(poll_sync(
        Arc::new(sync),
        tx,
        trigger_rx,
        Duration::from_secs(interval_secs),
    ));

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        while let Ok(ev) = rx.try_recv() {
            app.apply(ev);
        }
        app.tick = app.tick.wrapping_add(1);

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('r') if app.state == RunState::Idle => {
                        let _ = trigger_tx.send(());
                    }
                    _ => {}
                }
            }
        }
    }

    poll_handle.abort();
    Ok(())
}

/// Runs one pass per interval tick or manual trigger. Passes never overlap
/// because this single task awaits each one before waiting again.
async fn poll_sync(
    sync: Arc<Synchronizer>,
    tx: mpsc::UnboundedSender<SyncEvent>,
    mut trigger: mpsc::UnboundedReceiver<()>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            Some(()) = trigger.recv() => interval.reset(),
        }

        if tx.send(SyncEvent::Started).is_err() {
            return;
        }
        let report = match sync.run().await {
            Ok(report) => report,
            Err(e) => {
                let e = anyhow::Error::from(e);
                warn!(error = %e, "scheduled sync failed");
                SyncReport::failure(&e)
            }
        };
        if tx.send(SyncEvent::Finished(report)).is_err() {
            return;
        }
    }
}
