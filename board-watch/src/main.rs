//! Headless leaderboard page.
//!
//! Loads the ranking page over and over the way a browser tab would: restore
//! sort and auto-reload on load, poll `/timestamp`, save state and navigate
//! when the data changes. User actions come from stdin.

mod command;
mod page;
mod paths;

use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use board_sync::BackendKind;
use board_sync::BoardClient;
use board_sync::ReloadCoordinator;
use board_sync::SyncConfig;
use board_sync::backend;
use board_sync::coordinator::Navigator;
use board_sync::error::StoreError;
use board_sync::error::TransportError;
use board_sync::identity::CachedIdentity;
use board_sync::identity::resolve_login_label;
use board_sync::store::KeyValueStore;
use board_sync::store::SqliteStore;
use board_sync::tracker::HeaderClassTracker;
use clap::Parser;
use log::error;
use log::info;
use log::warn;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::io::Stdin;
use tokio::task::JoinHandle;
use url::Url;

use crate::command::Command;
use crate::page::HeadlessBrowser;
use crate::page::HeadlessTable;

#[derive(Parser, Debug)]
#[command(version, about = "Watch a leaderboard page and reload it when the data changes")]
struct Args {
    /// Page URL, optionally with autoreload/sortindex/desc parameters
    #[arg(long, default_value = "http://127.0.0.1:5000/")]
    url: Url,

    /// Server base URL for /timestamp and /verify (defaults to the page's root)
    #[arg(long)]
    server: Option<Url>,

    /// Number of columns in the ranking table
    #[arg(long, default_value_t = 5)]
    columns: usize,

    /// Where page state survives reloads: storage or query
    #[arg(long, default_value_t = BackendKind::Storage)]
    backend: BackendKind,

    /// Storage database (defaults to the user data directory)
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Poll period in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 900)]
    timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
enum WatchError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Client error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data directory; pass --storage")]
    NoDataDir,
}

/// Why a page ended.
enum PageEnd {
    Navigated,
    Closed,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    if let Err(e) = run(args).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() -> Result<(), WatchError> {
    let dir = paths::log_dir().ok_or(WatchError::NoDataDir)?;
    let path = paths::prepare_log(&dir)?;
    WriteLogger::init(LevelFilter::Debug, Config::default(), File::create(path)?)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(())
}

async fn open_store(path: Option<PathBuf>) -> Result<Arc<dyn KeyValueStore>, WatchError> {
    let path = match path {
        Some(path) => path,
        None => paths::storage_db().ok_or(WatchError::NoDataDir)?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Using storage at {}", path.display());
    Ok(Arc::new(SqliteStore::open(path).await?))
}

async fn run(args: Args) -> Result<(), WatchError> {
    let config = SyncConfig::new(args.columns)
        .with_backend(args.backend)
        .with_poll_interval(Duration::from_millis(args.interval_ms))
        .with_request_timeout(Duration::from_millis(args.timeout_ms));

    let server = match args.server {
        Some(server) => server,
        None => args.url.join("/")?,
    };
    let client = BoardClient::builder()
        .url(server)
        .timeout(config.request_timeout)
        .connect_timeout(config.request_timeout)
        .build()?;

    let store = open_store(args.storage).await?;
    let browser = HeadlessBrowser::new(args.url);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", command::USAGE);
    loop {
        match run_page(&config, &store, &browser, &client, &mut input).await? {
            PageEnd::Navigated => continue,
            PageEnd::Closed => break,
        }
    }
    Ok(())
}

/// Runs one page from load until it navigates away or stdin closes.
async fn run_page(
    config: &SyncConfig,
    store: &Arc<dyn KeyValueStore>,
    browser: &Arc<HeadlessBrowser>,
    client: &BoardClient,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<PageEnd, WatchError> {
    let table = HeadlessTable::new(config.column_count);
    let coordinator = Arc::new(ReloadCoordinator::new(
        config.clone(),
        backend::for_kind(config.backend, store.clone(), config.storage_keys.clone()),
        Arc::new(HeaderClassTracker::new(table.clone(), config.column_count)),
        browser.clone(),
    ));

    let restored = coordinator.restore_on_load().await;
    table.sort_by(restored.sort);
    let label = resolve_login_label(store.as_ref(), client).await;

    println!("page: {}", browser.location());
    println!("  sort: {}  auto-reload: {}  [{}]", restored.sort, restored.auto_reload, label);

    let page_token = coordinator.page_token();
    let poller = tokio::spawn(coordinator.clone().run_poller(Arc::new(client.clone())));

    let end = loop {
        let line = tokio::select! {
            _ = page_token.cancelled() => break PageEnd::Navigated,
            line = input.next_line() => line?,
        };
        let Some(line) = line else {
            break PageEnd::Closed;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Sort(sort)) => {
                if !table.sort_by(sort) {
                    println!("no column {}", sort.column);
                }
            }
            Ok(Command::AutoReload(enabled)) => {
                coordinator.set_auto_reload(enabled).await;
            }
            Ok(Command::Reload) => {
                coordinator.reload_now().await;
            }
            Ok(Command::Login {
                user_id,
                user_key,
                user_name,
            }) => {
                CachedIdentity::new(user_id, user_key, user_name)
                    .save(store.as_ref())
                    .await?;
                coordinator.reload_now().await;
            }
            Ok(Command::Logout) => {
                CachedIdentity::clear(store.as_ref()).await?;
                coordinator.reload_now().await;
            }
            Ok(Command::Status) => {
                let sort = table
                    .sort()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!(
                    "  sort: {}  auto-reload: {}  polling: {:?}",
                    sort,
                    coordinator.auto_reload(),
                    coordinator.poll_state().phase()
                );
            }
            Ok(Command::Quit) => break PageEnd::Closed,
            Err(message) => println!("{}", message),
        }
    };

    page_token.cancel();
    join_poller(poller).await;
    Ok(end)
}

/// Waits for a page's poll task. Returns `false` if it panicked or was
/// aborted.
async fn join_poller(poller: JoinHandle<()>) -> bool {
    match poller.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Poll task ended abnormally: {}", e);
            false
        }
    }
}
