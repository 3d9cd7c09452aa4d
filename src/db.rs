/// SQLite match history: which rules fired, when, in which match.
///
/// Uses `rusqlite` with the `bundled` feature so SQLite is compiled in.
/// Message text is not stored; the catalog already has it and may change.
///
/// The writer runs on a dedicated `std::thread` (rusqlite::Connection is !Send
/// across await points) and receives commands via a bounded sync channel.
/// Callers hold a cheap `DbWriter` handle that is Clone + Send + Sync.
///
/// Read queries open their own short-lived read-only connection.
use crate::{engine::MatchSetup, rules::Category};
use anyhow::Result;
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Commands sent to the writer thread
// ---------------------------------------------------------------------------

pub enum DbCommand {
    InsertMatch {
        reply:      oneshot::Sender<Result<i64>>,
        started_at: i64,
        hero:       String,
        role:       String,
        team:       String,
        speed:      String,
    },
    EndMatch {
        match_id:   i64,
        ended_at:   i64,
        last_clock: Option<i32>,
    },
    InsertFired {
        match_id: i64,
        fired_at: i32,
        rule_id:  String,
        category: String,
    },
    /// Replies once every command queued before it has been applied.
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// DbWriter: cheap handle, Clone + Send + Sync
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DbWriter {
    tx: std::sync::mpsc::SyncSender<DbCommand>,
}

impl DbWriter {
    /// Insert a new match row; returns the auto-generated row id.
    pub async fn insert_match(&self, setup: &MatchSetup) -> Result<i64> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DbCommand::InsertMatch {
                reply:      reply_tx,
                started_at: unix_now(),
                hero:       setup.hero.clone(),
                role:       setup.role.to_string(),
                team:       setup.team.to_string(),
                speed:      setup.speed.to_string(),
            })
            .map_err(|_| anyhow::anyhow!("DB writer channel closed"))?;
        reply_rx.await.map_err(|_| anyhow::anyhow!("DB reply channel closed"))?
    }

    /// Close a match row (fire-and-forget).
    pub fn end_match(&self, match_id: i64, last_clock: Option<i32>) {
        let _ = self.tx.send(DbCommand::EndMatch { match_id, ended_at: unix_now(), last_clock });
    }

    /// Record one firing (fire-and-forget).
    pub fn insert_fired(&self, match_id: i64, fired_at: i32, rule_id: String, category: Category) {
        let _ = self.tx.send(DbCommand::InsertFired {
            match_id,
            fired_at,
            rule_id,
            category: category.to_string(),
        });
    }

    /// Wait until everything queued so far is on disk.
    pub async fn flush(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DbCommand::Flush { reply: reply_tx })
            .map_err(|_| anyhow::anyhow!("DB writer channel closed"))?;
        reply_rx.await.map_err(|_| anyhow::anyhow!("DB reply channel closed"))
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(DbCommand::Shutdown);
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// spawn_db_writer: initialises SQLite and starts the writer thread
// ---------------------------------------------------------------------------

/// Initialise SQLite at `db_path`, apply the schema, and spawn the writer
/// thread. Returns a `DbWriter` handle that can be cloned freely.
pub fn spawn_db_writer(db_path: &Path) -> Result<DbWriter> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    apply_schema(&conn)?;

    let (tx, rx) = std::sync::mpsc::sync_channel::<DbCommand>(512);

    std::thread::spawn(move || db_writer_loop(rx, conn));

    tracing::info!("SQLite writer started at {:?}", db_path);
    Ok(DbWriter { tx })
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        PRAGMA synchronous   = NORMAL;

        CREATE TABLE IF NOT EXISTS matches (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at  INTEGER NOT NULL,
            ended_at    INTEGER,
            hero        TEXT    NOT NULL,
            role        TEXT    NOT NULL,
            team        TEXT    NOT NULL,
            speed       TEXT    NOT NULL,
            last_clock  INTEGER
        );

        CREATE TABLE IF NOT EXISTS fired_events (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id   INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            fired_at   INTEGER NOT NULL,
            rule_id    TEXT    NOT NULL,
            category   TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_fired_match ON fired_events(match_id);
        CREATE INDEX IF NOT EXISTS idx_fired_rule  ON fired_events(rule_id);
    ")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Writer loop (runs on its own std::thread)
// ---------------------------------------------------------------------------

fn db_writer_loop(rx: std::sync::mpsc::Receiver<DbCommand>, conn: Connection) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            DbCommand::InsertMatch { reply, started_at, hero, role, team, speed } => {
                let result = conn
                    .execute(
                        "INSERT INTO matches (started_at, hero, role, team, speed) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![started_at, hero, role, team, speed],
                    )
                    .map(|_| conn.last_insert_rowid())
                    .map_err(anyhow::Error::from);
                let _ = reply.send(result);
            }

            DbCommand::EndMatch { match_id, ended_at, last_clock } => {
                if let Err(e) = conn.execute(
                    "UPDATE matches SET ended_at = ?1, last_clock = ?2 WHERE id = ?3",
                    params![ended_at, last_clock, match_id],
                ) {
                    tracing::warn!("DB end_match error: {}", e);
                }
            }

            DbCommand::InsertFired { match_id, fired_at, rule_id, category } => {
                if let Err(e) = conn.execute(
                    "INSERT INTO fired_events (match_id, fired_at, rule_id, category) VALUES (?1, ?2, ?3, ?4)",
                    params![match_id, fired_at, rule_id, category],
                ) {
                    tracing::warn!("DB insert_fired error: {}", e);
                }
            }

            DbCommand::Flush { reply } => {
                let _ = reply.send(());
            }

            DbCommand::Shutdown => break,
        }
    }
    tracing::debug!("SQLite writer stopped");
}

// ---------------------------------------------------------------------------
// History queries (read-only connection)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub id:          i64,
    pub started_at:  i64,
    pub hero:        String,
    pub role:        String,
    pub team:        String,
    pub speed:       String,
    pub last_clock:  Option<i32>,
    pub hints_fired: u32,
}

/// Most recent matches first.
pub fn match_history(db_path: &Path, limit: u32) -> Result<Vec<MatchSummary>> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(
        "SELECT m.id, m.started_at, m.hero, m.role, m.team, m.speed, m.last_clock,
                (SELECT COUNT(*) FROM fired_events f WHERE f.match_id = m.id)
         FROM matches m
         ORDER BY m.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(MatchSummary {
            id:          row.get(0)?,
            started_at:  row.get(1)?,
            hero:        row.get(2)?,
            role:        row.get(3)?,
            team:        row.get(4)?,
            speed:       row.get(5)?,
            last_clock:  row.get(6)?,
            hints_fired: row.get(7)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// (fired_at, rule_id) for one match, in firing order.
pub fn fired_in_match(db_path: &Path, match_id: i64) -> Result<Vec<(i32, String)>> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(
        "SELECT fired_at, rule_id FROM fired_events WHERE match_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![match_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
