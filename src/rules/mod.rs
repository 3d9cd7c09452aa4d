pub mod payload;
pub mod schedule;

pub use payload::{Icon, Payload};
pub use schedule::{FireSchedule, FireTimes, GameSpeed};

use crate::{
    audience::{self, AudienceTag, Role},
    error::ConfigurationError,
    position::PositionPredicate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Grouping used by the UI to switch whole families of hints on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BountyRunes,
    PowerRunes,
    WisdomRunes,
    WaterRunes,
    LotusPools,
    Tormentors,
    Roshan,
    Stacking,
    Pulling,
    Wards,
    Smoke,
    Outposts,
    NeutralItems,
    DayNight,
    Laning,
    Tips,
    OwnHero,
    EnemyHero,
}

impl Category {
    pub const ALL: [Category; 18] = [
        Category::BountyRunes,
        Category::PowerRunes,
        Category::WisdomRunes,
        Category::WaterRunes,
        Category::LotusPools,
        Category::Tormentors,
        Category::Roshan,
        Category::Stacking,
        Category::Pulling,
        Category::Wards,
        Category::Smoke,
        Category::Outposts,
        Category::NeutralItems,
        Category::DayNight,
        Category::Laning,
        Category::Tips,
        Category::OwnHero,
        Category::EnemyHero,
    ];

    /// Hero-scoped categories require `subject_hero`; all others forbid it.
    pub fn is_hero_scoped(self) -> bool {
        matches!(self, Category::OwnHero | Category::EnemyHero)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::BountyRunes  => "bounty_runes",
            Category::PowerRunes   => "power_runes",
            Category::WisdomRunes  => "wisdom_runes",
            Category::WaterRunes   => "water_runes",
            Category::LotusPools   => "lotus_pools",
            Category::Tormentors   => "tormentors",
            Category::Roshan       => "roshan",
            Category::Stacking     => "stacking",
            Category::Pulling      => "pulling",
            Category::Wards        => "wards",
            Category::Smoke        => "smoke",
            Category::Outposts     => "outposts",
            Category::NeutralItems => "neutral_items",
            Category::DayNight     => "day_night",
            Category::Laning       => "laning",
            Category::Tips         => "tips",
            Category::OwnHero      => "own_hero",
            Category::EnemyHero    => "enemy_hero",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// One coaching hint: what to say, to whom, when, and optionally where.
/// Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub id:             String,
    pub category:       Category,
    /// Hero this rule talks about (own hero or an enemy, per category).
    pub subject_hero:   Option<String>,
    pub schedule:       FireSchedule,
    /// Replaces `schedule` wholesale when the match runs in turbo.
    pub turbo_schedule: Option<FireSchedule>,
    pub audience:       Vec<AudienceTag>,
    pub position:       Option<PositionPredicate>,
    /// Seconds after an eligibility opens during which the hint is still
    /// worth saying. `None` = until the match ends.
    pub window:         Option<u32>,
    pub payload:        Payload,
}

impl Rule {
    pub fn new(
        id:       impl Into<String>,
        category: Category,
        schedule: FireSchedule,
        audience: Vec<AudienceTag>,
        payload:  Payload,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            subject_hero: None,
            schedule,
            turbo_schedule: None,
            audience,
            position: None,
            window: None,
            payload,
        }
    }

    pub fn for_hero(mut self, hero: impl Into<String>) -> Self {
        self.subject_hero = Some(hero.into());
        self
    }

    pub fn with_turbo(mut self, schedule: FireSchedule) -> Self {
        self.turbo_schedule = Some(schedule);
        self
    }

    pub fn with_position(mut self, predicate: PositionPredicate) -> Self {
        self.position = Some(predicate);
        self
    }

    pub fn with_window(mut self, seconds: u32) -> Self {
        self.window = Some(seconds);
        self
    }

    /// The schedule that governs instances created for `speed`.
    pub fn schedule_for(&self, speed: GameSpeed) -> &FireSchedule {
        match (speed, &self.turbo_schedule) {
            (GameSpeed::Turbo, Some(turbo)) => turbo,
            _ => &self.schedule,
        }
    }

    pub fn is_relevant_to(&self, role: Role) -> bool {
        audience::is_relevant(&self.audience, role)
    }

    pub fn is_about(&self, hero: &str) -> bool {
        self.subject_hero
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case(hero))
    }

    /// Shape checks shared by parsed and hand-built rules.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let fail = |reason: String| ConfigurationError::new(self.id.clone(), reason);

        if self.id.trim().is_empty() {
            return Err(fail("id must not be empty".to_owned()));
        }
        if self.audience.is_empty() {
            return Err(fail("audience must not be empty".to_owned()));
        }
        if self.payload.text.trim().is_empty() {
            return Err(fail("text must not be empty".to_owned()));
        }
        match (self.category.is_hero_scoped(), &self.subject_hero) {
            (true, None) => {
                return Err(fail(format!("category '{}' requires a hero", self.category)));
            }
            (false, Some(hero)) => {
                return Err(fail(format!(
                    "category '{}' is global but names hero '{}'",
                    self.category, hero
                )));
            }
            _ => {}
        }
        if self.window == Some(0) {
            return Err(fail("window must be positive".to_owned()));
        }
        self.schedule.validate().map_err(&fail)?;
        if let Some(turbo) = &self.turbo_schedule {
            turbo.validate().map_err(|e| fail(format!("turbo: {}", e)))?;
        }
        if self.audience.contains(&AudienceTag::InLane) && self.category != Category::EnemyHero {
            tracing::warn!(
                "Rule '{}' uses IN_LANE outside enemy_hero — it will match every role",
                self.id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn once(at: i32) -> FireSchedule {
        FireSchedule::Once { at }
    }

    #[test]
    fn category_names_round_trip() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>(), Ok(c));
        }
        assert!("creeps".parse::<Category>().is_err());
    }

    #[test]
    fn turbo_schedule_replaces_normal() {
        let rule = Rule::new("r", Category::Tips, once(600), vec![AudienceTag::All], Payload::text("hi"))
            .with_turbo(once(300));
        assert_eq!(rule.schedule_for(GameSpeed::Normal), &once(600));
        assert_eq!(rule.schedule_for(GameSpeed::Turbo), &once(300));

        let plain = Rule::new("p", Category::Tips, once(600), vec![AudienceTag::All], Payload::text("hi"));
        assert_eq!(plain.schedule_for(GameSpeed::Turbo), &once(600));
    }

    #[test]
    fn hero_scope_is_enforced() {
        let global = Rule::new("g", Category::Roshan, once(0), vec![AudienceTag::All], Payload::text("x"));
        assert!(global.validate().is_ok());
        assert!(global.clone().for_hero("Axe").validate().is_err());

        let own = Rule::new("o", Category::OwnHero, once(0), vec![AudienceTag::All], Payload::text("x"));
        let err = own.validate().unwrap_err();
        assert_eq!(err.rule_id, "o");
        assert!(own.for_hero("Axe").validate().is_ok());
    }

    #[test]
    fn is_about_ignores_case() {
        let rule = Rule::new("e", Category::EnemyHero, once(0), vec![AudienceTag::InLane], Payload::text("x"))
            .for_hero("Crystal Maiden");
        assert!(rule.is_about("crystal maiden"));
        assert!(!rule.is_about("Lina"));
    }

    #[test]
    fn rejects_empty_text_and_zero_window() {
        let rule = Rule::new("t", Category::Tips, once(0), vec![AudienceTag::All], Payload::text("  "));
        assert!(rule.validate().is_err());
        let rule = Rule::new("w", Category::Tips, once(0), vec![AudienceTag::All], Payload::text("x"))
            .with_window(0);
        assert!(rule.validate().is_err());
    }
}
