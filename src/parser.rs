/// Parses tick-feed lines into typed `FeedEvent`s.
///
/// The game-state bridge writes one JSON object per line:
///
///   {"type":"match_start","hero":"Crystal Maiden","role":"support","team":"radiant",
///    "enemies":["Axe","Sniper"],"speed":"normal"}
///   {"type":"tick","now":-90}
///   {"type":"tick","now":75,"position":{"x":-6200.0,"y":-6900.0}}
///   {"type":"tick","now":76,"role":"mid"}
///   {"type":"match_end","now":2410}
///
/// Blank lines and lines starting with `#` are skipped so replay files can be
/// annotated by hand. Anything else that does not parse is logged and dropped.
use crate::{
    audience::Role,
    engine::Tick,
    position::Team,
    rules::GameSpeed,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    MatchStart {
        hero:    String,
        role:    Role,
        team:    Team,
        #[serde(default)]
        enemies: Vec<String>,
        #[serde(default)]
        speed:   GameSpeed,
    },
    Tick(Tick),
    MatchEnd {
        #[serde(default)]
        now: Option<i32>,
    },
}

pub fn parse_line(line: &str) -> Option<FeedEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Skipping unreadable feed line ({}): {}", e, truncate(line, 120));
            None
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

pub async fn run(mut rx: Receiver<String>, tx: Sender<FeedEvent>) -> Result<()> {
    while let Some(line) = rx.recv().await {
        if let Some(event) = parse_line(&line) {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }
    Ok(())
}
