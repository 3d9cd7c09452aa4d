pub mod audience;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod parser;
pub mod position;
pub mod rules;
pub mod state;
pub mod tailer;

pub use catalog::Catalog;
pub use config::AppConfig;
pub use engine::{FiredEvent, MatchSetup, Scheduler, Tick, TickReport};
pub use error::{CatalogError, ConfigurationError, EvaluationFault, OrderingViolation, PositionError};

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Logging: rolling log file under <app dir>/logs, rotated daily.
// ---------------------------------------------------------------------------

/// Install the global subscriber and panic hook. `RUST_LOG` wins over
/// `default_filter` when set.
pub fn init_logging(log_dir: &Path, default_filter: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "coach.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard flushes and stops the writer; it lives as long as the process.
    std::mem::forget(guard);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logging already initialised: {}", e))?;

    // Panics go through tracing so they end up in the log file too.
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!("PANIC at {}: {}", location, message);
    }));

    tracing::info!("Dota Coach Live starting — logs → {}", log_dir.display());
    Ok(())
}

pub fn history_db_path(app_dir: &Path) -> PathBuf {
    app_dir.join("history.sqlite")
}

// ---------------------------------------------------------------------------
// Pipeline: feed source -> parser -> engine -> dispatch
// ---------------------------------------------------------------------------

pub enum FeedSource {
    /// Follow a feed file that is still being written.
    Live(PathBuf),
    /// Read a recorded feed file once.
    Replay(PathBuf),
}

/// Run the whole pipeline until the feed ends, writing deliveries to `out`.
/// The engine runs on the calling task; everything else is spawned.
pub async fn run_pipeline<W>(
    cfg:    AppConfig,
    source: FeedSource,
    db:     Option<db::DbWriter>,
    out:    W,
) -> Result<()>
where
    W: Write + Send + 'static,
{
    let catalog = Arc::new(Catalog::load_or_builtin(cfg.catalog_path.as_deref())?);
    tracing::info!("Catalog loaded: {} rules", catalog.len());

    let (raw_tx, raw_rx)     = mpsc::channel::<String>(2048);
    let (event_tx, event_rx) = mpsc::channel::<parser::FeedEvent>(1024);
    let (fired_tx, fired_rx) = mpsc::channel::<FiredEvent>(128);

    let source_task = match source {
        FeedSource::Live(path)   => tokio::spawn(tailer::run(path, raw_tx)),
        FeedSource::Replay(path) => tokio::spawn(tailer::replay(path, raw_tx)),
    };
    tokio::spawn(parser::run(raw_rx, event_tx));
    let dispatcher    = dispatch::Dispatcher::from_config(&cfg);
    let dispatch_task = tokio::spawn(dispatch::run(fired_rx, dispatcher, out));

    let engine_result = engine::run(event_rx, fired_tx, catalog, cfg, db.clone()).await;

    // engine::run dropped its sender, so dispatch drains and stops
    dispatch_task.await??;
    if source_task.is_finished() {
        source_task.await??;
    } else {
        source_task.abort();
    }
    if let Some(db) = &db {
        db.flush().await?;
    }
    engine_result
}

fn open_history(cfg: &AppConfig, app_dir: &Path) -> Option<db::DbWriter> {
    if !cfg.record_history {
        return None;
    }
    match db::spawn_db_writer(&history_db_path(app_dir)) {
        Ok(writer) => Some(writer),
        Err(e) => {
            tracing::warn!("Match history disabled — could not open database: {}", e);
            None
        }
    }
}

/// Follow the configured feed until Ctrl-C.
pub async fn run_live(cfg: AppConfig, app_dir: &Path) -> Result<()> {
    let feed = cfg.feed_path.clone();
    let db = open_history(&cfg, app_dir);
    tracing::info!("Live mode: following {:?}", feed);

    tokio::select! {
        result = run_pipeline(cfg, FeedSource::Live(feed), db, std::io::stdout()) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted — shutting down");
            Ok(())
        }
    }
}

pub async fn run_replay(cfg: AppConfig, app_dir: &Path, file: PathBuf) -> Result<()> {
    let db = open_history(&cfg, app_dir);
    run_pipeline(cfg, FeedSource::Replay(file), db, std::io::stdout()).await
}
