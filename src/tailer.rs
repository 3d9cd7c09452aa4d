/// Follows the tick-feed file written by the game-state bridge, emitting new
/// lines as they are appended.
///
/// Uses the `notify` crate to detect modifications, then reads from the last
/// known byte offset. Only complete lines are emitted; a half-written line
/// stays in the file until its newline arrives.
///
/// Rotation: the bridge truncates the feed when a new match starts. If the
/// file is shorter than our offset we restart from byte 0.
use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, Sender};

pub struct TailerState {
    path:     PathBuf,
    position: u64,
}

impl TailerState {
    pub fn new(path: PathBuf) -> Self {
        Self { path, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Complete lines appended since the last call.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let file_len = match std::fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(_) => return Ok(Vec::new()), // not created yet
        };

        if file_len < self.position {
            tracing::info!("Tick feed truncated — restarting from byte 0");
            self.position = 0;
        }
        if file_len == self.position {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.position))?;
        let mut buf = Vec::with_capacity((file_len - self.position) as usize);
        file.take(file_len - self.position).read_to_end(&mut buf)?;

        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=last_newline];
        self.position += complete.len() as u64;

        Ok(String::from_utf8_lossy(complete)
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }
}

async fn forward(lines: Vec<String>, tx: &Sender<String>) -> bool {
    for line in lines {
        if tx.send(line).await.is_err() {
            return false; // pipeline shutting down
        }
    }
    true
}

pub async fn run(feed_path: PathBuf, tx: Sender<String>) -> Result<()> {
    tracing::info!("Tailer starting: {:?}", feed_path);

    let watch_dir = feed_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    // notify delivers on its own thread; bridge into the async side.
    let (fs_tx, mut fs_rx) = mpsc::channel::<notify::Result<Event>>(256);
    let config = notify::Config::default().with_poll_interval(Duration::from_millis(500));
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = fs_tx.blocking_send(res);
        },
        config,
    )?;
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    let mut state = TailerState::new(feed_path.clone());

    // Pick up anything written before we started
    if !forward(state.read_new_lines()?, &tx).await {
        return Ok(());
    }

    while let Some(res) = fs_rx.recv().await {
        match res {
            Ok(Event { kind: EventKind::Modify(_) | EventKind::Create(_), paths, .. }) => {
                if !paths.iter().any(|p| p.file_name() == feed_path.file_name()) {
                    continue;
                }
                match state.read_new_lines() {
                    Ok(lines) => {
                        if !forward(lines, &tx).await {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Tailer read error: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Watcher error: {}", e),
        }
    }

    tracing::info!("Tailer stopped");
    Ok(())
}

/// Read a finished feed file in one go (replay mode).
pub async fn replay(path: PathBuf, tx: Sender<String>) -> Result<()> {
    let raw = tokio::fs::read_to_string(&path).await?;
    tracing::info!("Replaying {:?} ({} bytes)", path, raw.len());
    forward(raw.lines().map(str::to_owned).collect(), &tx).await;
    Ok(())
}
