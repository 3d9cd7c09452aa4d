/// Dispatch sink: turns fired events into what the player actually sees and
/// hears: a voice clip, a chat line, and the icon for the hint feed.
///
/// The scheduler hands over the payload untouched; everything about
/// presentation (which channels are on, where audio lives, how the clock
/// reads) is decided here. Deliveries are written as JSON lines so the UI
/// process, or a terminal, can consume them.
use crate::{
    config::AppConfig,
    engine::FiredEvent,
    rules::{Category, Icon},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc::Receiver;

/// Event name carried on every delivery line.
pub const EVENT_HINT: &str = "coach:hint";

const RECENT_CAP: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub event:    String,
    pub rule_id:  String,
    pub category: Category,
    pub fired_at: i32,
    /// Game clock as shown in the HUD, e.g. "-0:45" or "12:00".
    pub clock:    String,
    pub text:     String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio:    Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon:     Option<Icon>,
}

pub struct Dispatcher {
    voice_enabled: bool,
    chat_enabled:  bool,
    audio_dir:     Option<PathBuf>,
    recent:        VecDeque<Delivery>,
}

impl Dispatcher {
    pub fn new(voice_enabled: bool, chat_enabled: bool, audio_dir: Option<PathBuf>) -> Self {
        Self { voice_enabled, chat_enabled, audio_dir, recent: VecDeque::new() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.voice_enabled, config.chat_enabled, config.audio_dir.clone())
    }

    pub fn deliver(&mut self, fired: &FiredEvent) -> Delivery {
        let payload = &fired.payload;

        let audio = match (&payload.audio_key, self.voice_enabled) {
            (Some(key), true) => Some(match &self.audio_dir {
                Some(dir) => dir.join(format!("{}.mp3", key)),
                None      => PathBuf::from(format!("{}.mp3", key)),
            }),
            _ => None,
        };

        let delivery = Delivery {
            event:    EVENT_HINT.to_owned(),
            rule_id:  fired.rule_id.clone(),
            category: fired.category,
            fired_at: fired.fired_at,
            clock:    format_clock(fired.fired_at),
            text:     payload.text.clone(),
            chat:     self.chat_enabled.then(|| payload.chat_text().to_owned()),
            audio,
            icon:     payload.icon.clone(),
        };

        self.recent.push_back(delivery.clone());
        if self.recent.len() > RECENT_CAP {
            self.recent.pop_front();
        }
        delivery
    }

    /// Most recent deliveries, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Delivery> {
        self.recent.iter()
    }
}

/// `m:ss` with a leading minus before the horn.
pub fn format_clock(seconds: i32) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.unsigned_abs();
    format!("{}{}:{:02}", sign, abs / 60, abs % 60)
}

// ---------------------------------------------------------------------------
// Dispatch task
// ---------------------------------------------------------------------------

pub async fn run<W: Write>(
    mut fired_rx:   Receiver<FiredEvent>,
    mut dispatcher: Dispatcher,
    mut out:        W,
) -> Result<()> {
    while let Some(fired) = fired_rx.recv().await {
        let delivery = dispatcher.deliver(&fired);
        tracing::info!("[{}] {} — {}", delivery.clock, delivery.rule_id, delivery.text);
        serde_json::to_writer(&mut out, &delivery)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }
    Ok(())
}
