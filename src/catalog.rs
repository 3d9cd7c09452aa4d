/// Message catalog: the ordered, immutable list of coaching rules.
///
/// Catalogs are TOML files with one `[[rule]]` table per hint. The default
/// catalog is embedded at compile time from `data/catalog.toml`; a user
/// catalog path in `AppConfig` replaces it wholesale.
///
/// Loading is all-or-nothing: the first malformed rule rejects the whole
/// file with a `ConfigurationError` naming that rule. Declaration order is
/// preserved because it is the scheduler's tie-break order.
use crate::{
    audience::{self, Role},
    error::{CatalogError, ConfigurationError},
    position::{Area, PositionPredicate, Team},
    rules::{Category, FireSchedule, FireTimes, Icon, Payload, Rule},
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Embedded default catalog
// ---------------------------------------------------------------------------

const BUILTIN_TOML: &str = include_str!("../data/catalog.toml");

static BUILTIN: Lazy<Result<Catalog, String>> =
    Lazy::new(|| Catalog::from_toml_str(BUILTIN_TOML).map_err(|e| e.to_string()));

// ---------------------------------------------------------------------------
// TOML deserialization structs (private)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TomlCatalog {
    #[serde(default, rename = "rule")]
    rules: Vec<TomlRule>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRule {
    id:                    Option<String>,
    category:              Option<String>,
    hero:                  Option<String>,
    fire_times:            Option<FireTimes>,
    turbo_fire_times:      Option<FireTimes>,
    repeat_interval:       Option<i64>,
    turbo_repeat_interval: Option<i64>,
    repetition_limit:      Option<i64>,
    #[serde(default)]
    audience:              Vec<String>,
    position:              Option<TomlPosition>,
    window:                Option<i64>,
    text:                  Option<String>,
    short_text:            Option<String>,
    audio:                 Option<String>,
    icon:                  Option<Icon>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPosition {
    area: String,
    team: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn build_rule(index: usize, raw: TomlRule) -> Result<Rule, ConfigurationError> {
    let id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => return Err(ConfigurationError::new(format!("#{}", index), "missing id")),
    };
    let fail = |reason: String| ConfigurationError::new(id.clone(), reason);

    let category: Category = raw
        .category
        .as_deref()
        .ok_or_else(|| fail("missing category".to_owned()))?
        .parse()
        .map_err(&fail)?;

    let times = raw
        .fire_times
        .as_ref()
        .ok_or_else(|| fail("missing fire_times".to_owned()))?;
    let schedule = FireSchedule::from_shape(times, raw.repeat_interval, raw.repetition_limit)
        .map_err(&fail)?;

    // Turbo inherits the normal repeat interval unless it has its own.
    let turbo_schedule = match &raw.turbo_fire_times {
        Some(turbo_times) => {
            let interval = raw.turbo_repeat_interval.or(raw.repeat_interval);
            Some(
                FireSchedule::from_shape(turbo_times, interval, raw.repetition_limit)
                    .map_err(|e| fail(format!("turbo: {}", e)))?,
            )
        }
        None if raw.turbo_repeat_interval.is_some() => {
            return Err(fail("turbo_repeat_interval requires turbo_fire_times".to_owned()));
        }
        None => None,
    };

    let audience = audience::parse_audience(&id, &raw.audience)?;

    let position = raw
        .position
        .map(|p| -> Result<PositionPredicate, ConfigurationError> {
            let area: Area = p.area.parse().map_err(&fail)?;
            let team = p
                .team
                .as_deref()
                .map(str::parse::<Team>)
                .transpose()
                .map_err(&fail)?;
            Ok(PositionPredicate { area, team })
        })
        .transpose()?;

    let window = raw
        .window
        .map(|w| u32::try_from(w).ok().filter(|w| *w > 0))
        .map(|w| w.ok_or_else(|| fail("window must be a positive number of seconds".to_owned())))
        .transpose()?;

    let text = raw.text.ok_or_else(|| fail("missing text".to_owned()))?;

    let rule = Rule {
        id: id.clone(),
        category,
        subject_hero: raw.hero,
        schedule,
        turbo_schedule,
        audience,
        position,
        window,
        payload: Payload {
            text,
            short_text: raw.short_text,
            audio_key:  raw.audio,
            icon:       raw.icon,
        },
    };
    rule.validate()?;
    Ok(rule)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rules: Vec<Arc<Rule>>,
}

impl Catalog {
    /// Validate hand-built rules into a catalog (declaration order kept).
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::with_capacity(rules.len());
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.id.clone()) {
                return Err(ConfigurationError::new(rule.id.clone(), "duplicate rule id"));
            }
        }
        Ok(Self { rules: rules.into_iter().map(Arc::new).collect() })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: TomlCatalog = toml::from_str(raw)?;
        let rules = file
            .rules
            .into_iter()
            .enumerate()
            .map(|(i, r)| build_rule(i, r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rules(rules)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&raw)?;
        tracing::info!("Loaded {} rules from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// The catalog shipped inside the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        (*BUILTIN).clone().map_err(CatalogError::Builtin)
    }

    /// User catalog if a path is configured, otherwise the built-in one.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) if !p.as_os_str().is_empty() => Self::load(p),
            _ => Self::builtin(),
        }
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id).map(|r| r.as_ref())
    }

    pub fn in_category(&self, category: Category) -> Vec<&Rule> {
        self.iter().filter(|r| r.category == category).collect()
    }

    /// Own-hero hints for `hero` that reach at least one of `roles`.
    pub fn own_hero_rules(&self, hero: &str, roles: &[Role]) -> Vec<&Rule> {
        self.iter()
            .filter(|r| r.category == Category::OwnHero && r.is_about(hero))
            .filter(|r| audience::is_relevant_for_any(&r.audience, roles))
            .collect()
    }

    /// Enemy-hero hints for every hero in `roster`, in catalog order.
    pub fn enemy_hero_rules(&self, roster: &[String]) -> Vec<&Rule> {
        self.iter()
            .filter(|r| r.category == Category::EnemyHero)
            .filter(|r| roster.iter().any(|h| r.is_about(h)))
            .collect()
    }

    /// Hero-independent hints that reach at least one of `roles`.
    pub fn global_rules(&self, roles: &[Role]) -> Vec<&Rule> {
        self.iter()
            .filter(|r| !r.category.is_hero_scoped())
            .filter(|r| audience::is_relevant_for_any(&r.audience, roles))
            .collect()
    }

    /// Everything a player on `role` (and optionally playing `hero`) could hear,
    /// enemy-hero hints excluded since they depend on the draft.
    pub fn preview(&self, role: Role, hero: Option<&str>) -> Vec<&Rule> {
        self.iter()
            .filter(|r| match r.category {
                Category::EnemyHero => false,
                Category::OwnHero   => hero.is_some_and(|h| r.is_about(h)),
                _                   => true,
            })
            .filter(|r| r.is_relevant_to(role))
            .collect()
    }

    fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }
}
