/// Firing schedules: when a rule becomes eligible to fire.
///
/// The catalog describes timing as `fire_times` (one value or a list) plus an
/// optional `repeat_interval` / `repetition_limit`. Those shapes collapse into
/// exactly one `FireSchedule` variant when the rule is loaded, so the
/// scheduler never has to inspect raw catalog fields again.
///
/// All times are signed game-clock seconds; negative values are pre-horn.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Game-speed variant of the match. Turbo swaps in a rule's alternate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSpeed {
    #[default]
    Normal,
    Turbo,
}

impl FromStr for GameSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(GameSpeed::Normal),
            "turbo"  => Ok(GameSpeed::Turbo),
            other    => Err(format!("unknown game speed '{}'", other)),
        }
    }
}

impl fmt::Display for GameSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameSpeed::Normal => "normal",
            GameSpeed::Turbo  => "turbo",
        })
    }
}

/// Raw `fire_times` value as written in the catalog: `fire_times = 90` or
/// `fire_times = [180, 480]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FireTimes {
    One(i32),
    Many(Vec<i32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FireSchedule {
    /// Fires once, at or after `at`.
    Once { at: i32 },
    /// Fires once per entry; entries are strictly increasing.
    List { times: Vec<i32> },
    /// Fires at `first`, then every `interval` seconds, at most `limit` times.
    Repeating {
        first:    i32,
        interval: u32,
        limit:    Option<u32>,
    },
}

impl FireSchedule {
    /// Collapse a catalog timing shape into a schedule.
    pub fn from_shape(
        times:    &FireTimes,
        interval: Option<i64>,
        limit:    Option<i64>,
    ) -> Result<Self, String> {
        let interval = interval.map(|i| positive("repeat_interval", i)).transpose()?;
        let limit    = limit.map(|l| positive("repetition_limit", l)).transpose()?;

        let schedule = match (times, interval) {
            (FireTimes::One(at), None) => {
                if limit.is_some() {
                    return Err("repetition_limit requires repeat_interval".to_owned());
                }
                FireSchedule::Once { at: *at }
            }
            (FireTimes::One(first), Some(interval)) => FireSchedule::Repeating {
                first: *first,
                interval,
                limit,
            },
            (FireTimes::Many(_), Some(_)) => {
                return Err("a list of fire times cannot also have repeat_interval".to_owned());
            }
            (FireTimes::Many(list), None) => {
                if limit.is_some() {
                    return Err("repetition_limit requires repeat_interval".to_owned());
                }
                FireSchedule::List { times: list.clone() }
            }
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Structural checks for schedules built in code rather than parsed.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            FireSchedule::Once { .. } => Ok(()),
            FireSchedule::List { times } => {
                if times.is_empty() {
                    return Err("fire_times list must not be empty".to_owned());
                }
                if times.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(format!("fire_times must be strictly increasing, got {:?}", times));
                }
                Ok(())
            }
            FireSchedule::Repeating { interval, limit, .. } => {
                if *interval == 0 {
                    return Err("repeat_interval must be positive".to_owned());
                }
                if *limit == Some(0) {
                    return Err("repetition_limit must be positive".to_owned());
                }
                Ok(())
            }
        }
    }

    /// First eligible time. Only `None` for an (invalid) empty list.
    pub fn first_time(&self) -> Option<i32> {
        match self {
            FireSchedule::Once { at }              => Some(*at),
            FireSchedule::List { times }           => times.first().copied(),
            FireSchedule::Repeating { first, .. }  => Some(*first),
        }
    }

    /// Upper bound on firings, `None` when unbounded.
    pub fn max_firings(&self) -> Option<u32> {
        match self {
            FireSchedule::Once { .. }             => Some(1),
            FireSchedule::List { times }          => Some(times.len() as u32),
            FireSchedule::Repeating { limit, .. } => *limit,
        }
    }
}

fn positive(field: &str, value: i64) -> Result<u32, String> {
    if value <= 0 {
        return Err(format!("{} must be positive, got {}", field, value));
    }
    u32::try_from(value).map_err(|_| format!("{} is too large: {}", field, value))
}
