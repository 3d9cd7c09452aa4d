/// Trigger scheduler: the "brain" of the pipeline.
///
/// One `Scheduler` per match. It owns every Rule Instance for that match and
/// answers one question per tick: what fires at `now` for this subject?
///
/// Per instance, per tick:
///   1. drop eligibilities whose validity window has passed
///   2. skip unless `now >= next_eligible`
///   3. audience gate (role of the subject on this tick)
///   4. position gate (may fault: logged, instance left untouched)
///   5. fire: emit the payload, advance the instance
///
/// Instances are visited in catalog order, so same-tick firings come out in
/// declaration order. `run` wraps the scheduler in an async task that consumes
/// the tick feed and forwards fired events to the dispatch sink.
use crate::{
    audience::Role,
    catalog::Catalog,
    config::AppConfig,
    db::DbWriter,
    error::{EvaluationFault, OrderingViolation},
    parser::FeedEvent,
    position::{MapPosition, Team},
    rules::{Category, GameSpeed, Payload},
    state::{InstanceSnapshot, RuleInstance},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything known when the match starts. Fixed for the match's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub hero:                String,
    pub role:                Role,
    pub team:                Team,
    #[serde(default)]
    pub enemy_heroes:        Vec<String>,
    #[serde(default)]
    pub speed:               GameSpeed,
    /// Categories switched off in the UI; no instances are created for them.
    #[serde(default)]
    pub disabled_categories: Vec<Category>,
}

/// Per-tick snapshot of the subject, produced by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Game clock in seconds; negative before the horn.
    pub now:      i32,
    /// Overrides the match role for this tick (e.g. after a lane swap).
    #[serde(default)]
    pub role:     Option<Role>,
    #[serde(default)]
    pub position: Option<MapPosition>,
}

impl Tick {
    pub fn at(now: i32) -> Self {
        Self { now, role: None, position: None }
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(MapPosition::new(x, y));
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredEvent {
    pub rule_id:  String,
    pub category: Category,
    pub payload:  Payload,
    pub fired_at: i32,
}

/// Result of one tick: what fired, and which instances could not be judged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub fired:  Vec<FiredEvent>,
    pub faults: Vec<EvaluationFault>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler {
    setup:     MatchSetup,
    instances: Vec<RuleInstance>,
    last_now:  Option<i32>,
}

impl Scheduler {
    /// Create one instance per rule that applies to this match: category
    /// enabled, and for hero categories, the hero is ours / in the enemy draft.
    pub fn new(catalog: &Catalog, setup: MatchSetup) -> Self {
        let instances: Vec<RuleInstance> = catalog
            .rules()
            .iter()
            .filter(|rule| !setup.disabled_categories.contains(&rule.category))
            .filter(|rule| match rule.category {
                Category::OwnHero   => rule.is_about(&setup.hero),
                Category::EnemyHero => setup.enemy_heroes.iter().any(|h| rule.is_about(h)),
                _                   => true,
            })
            .map(|rule| RuleInstance::new(Arc::clone(rule), setup.speed))
            .collect();

        tracing::info!(
            "Scheduler ready: {} of {} rules for {} ({}, {}, {})",
            instances.len(),
            catalog.len(),
            setup.hero,
            setup.role,
            setup.team,
            setup.speed,
        );

        Self { setup, instances, last_now: None }
    }

    pub fn setup(&self) -> &MatchSetup {
        &self.setup
    }

    /// Evaluate every instance at `tick.now`.
    ///
    /// Ticks must not go backwards; an older `now` is rejected before any
    /// state is touched. Repeating the previous `now` is allowed and cannot
    /// re-fire anything, since firing always moves past `now`.
    pub fn evaluate(&mut self, tick: &Tick) -> Result<TickReport, OrderingViolation> {
        if let Some(last) = self.last_now {
            if tick.now < last {
                return Err(OrderingViolation { now: tick.now, last });
            }
        }
        self.last_now = Some(tick.now);

        let now  = tick.now;
        let role = tick.role.unwrap_or(self.setup.role);
        let team = self.setup.team;
        let mut report = TickReport::default();

        for inst in &mut self.instances {
            while inst.window_lapsed(now) {
                inst.lapse();
            }
            if !inst.is_due(now) {
                continue;
            }

            let rule = inst.rule();
            if !rule.is_relevant_to(role) {
                continue;
            }
            if let Some(predicate) = &rule.position {
                match predicate.evaluate(tick.position, team) {
                    Ok(true)  => {}
                    Ok(false) => continue,
                    Err(source) => {
                        let fault = EvaluationFault { rule_id: rule.id.clone(), source };
                        tracing::warn!("{} — will retry next tick", fault);
                        report.faults.push(fault);
                        continue;
                    }
                }
            }

            let event = FiredEvent {
                rule_id:  rule.id.clone(),
                category: rule.category,
                payload:  rule.payload.clone(),
                fired_at: now,
            };
            inst.record_fire(now);
            tracing::debug!(
                "Rule '{}' fired at {}s (count {}, next {}s{})",
                event.rule_id,
                now,
                inst.fired_count(),
                inst.next_eligible(),
                if inst.is_exhausted() { ", exhausted" } else { "" },
            );
            report.fired.push(event);
        }

        Ok(report)
    }

    pub fn snapshot(&self) -> Vec<InstanceSnapshot> {
        self.instances.iter().map(RuleInstance::snapshot).collect()
    }

    /// Earliest clock value at which something could fire, if anything is left.
    pub fn next_due(&self) -> Option<i32> {
        self.instances
            .iter()
            .filter(|i| !i.is_exhausted())
            .map(RuleInstance::next_eligible)
            .min()
    }

    pub fn pending_count(&self) -> usize {
        self.instances.iter().filter(|i| !i.is_exhausted()).count()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_finished(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn last_now(&self) -> Option<i32> {
        self.last_now
    }
}

// ---------------------------------------------------------------------------
// Main engine task
// ---------------------------------------------------------------------------

/// Consumes feed events, drives one scheduler per match, and forwards fired
/// events. Returns an error on an out-of-order tick; the feed producer is
/// broken at that point and continuing would only hide it.
pub async fn run(
    mut feed_rx: Receiver<FeedEvent>,
    fired_tx:    Sender<FiredEvent>,
    catalog:     Arc<Catalog>,
    config:      AppConfig,
    db:          Option<DbWriter>,
) -> Result<()> {
    let mut current: Option<(Scheduler, Option<i64>)> = None;

    while let Some(event) = feed_rx.recv().await {
        match event {
            FeedEvent::MatchStart { hero, role, team, enemies, speed } => {
                if let Some((old, match_id)) = current.take() {
                    tracing::warn!("Match start without match end — discarding previous match");
                    finish_match(&db, match_id, old.last_now());
                }
                let setup = MatchSetup {
                    hero,
                    role,
                    team,
                    enemy_heroes: enemies,
                    speed,
                    disabled_categories: config.disabled_categories.clone(),
                };
                let match_id = match &db {
                    Some(db) => match db.insert_match(&setup).await {
                        Ok(id) => Some(id),
                        Err(e) => {
                            tracing::warn!("Could not record match start: {}", e);
                            None
                        }
                    },
                    None => None,
                };
                current = Some((Scheduler::new(&catalog, setup), match_id));
            }

            FeedEvent::Tick(tick) => {
                let Some((scheduler, match_id)) = current.as_mut() else {
                    tracing::debug!("Tick at {}s outside a match — ignored", tick.now);
                    continue;
                };
                let report = scheduler.evaluate(&tick).map_err(|e| {
                    tracing::error!("{}", e);
                    anyhow::Error::from(e)
                })?;

                for fired in report.fired {
                    if let (Some(db), Some(id)) = (&db, *match_id) {
                        db.insert_fired(id, fired.fired_at, fired.rule_id.clone(), fired.category);
                    }
                    if fired_tx.send(fired).await.is_err() {
                        return Ok(());
                    }
                }
            }

            FeedEvent::MatchEnd { now } => match current.take() {
                Some((scheduler, match_id)) => {
                    tracing::info!(
                        "Match ended at {:?}s — {} of {} instances still pending",
                        now.or(scheduler.last_now()),
                        scheduler.pending_count(),
                        scheduler.instance_count(),
                    );
                    finish_match(&db, match_id, now.or(scheduler.last_now()));
                }
                None => tracing::debug!("Match end outside a match — ignored"),
            },
        }
    }

    if let Some((scheduler, match_id)) = current.take() {
        finish_match(&db, match_id, scheduler.last_now());
    }
    Ok(())
}

fn finish_match(db: &Option<DbWriter>, match_id: Option<i64>, last_clock: Option<i32>) {
    if let (Some(db), Some(id)) = (db, match_id) {
        db.end_match(id, last_clock);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::AudienceTag;
    use crate::position::{Area, PositionPredicate};
    use crate::rules::{FireSchedule, Rule};

    fn setup(role: Role, team: Team) -> MatchSetup {
        MatchSetup {
            hero:                "Crystal Maiden".to_owned(),
            role,
            team,
            enemy_heroes:        vec!["Axe".to_owned(), "Sniper".to_owned()],
            speed:               GameSpeed::Normal,
            disabled_categories: vec![],
        }
    }

    fn rule(id: &str, schedule: FireSchedule, audience: Vec<AudienceTag>) -> Rule {
        Rule::new(id, Category::Tips, schedule, audience, Payload::text(format!("{} text", id)))
    }

    fn catalog(rules: Vec<Rule>) -> Catalog {
        Catalog::from_rules(rules).expect("valid test catalog")
    }

    /// Drive `ticks` and return (now, rule_id) for every firing.
    fn drive(scheduler: &mut Scheduler, ticks: &[Tick]) -> Vec<(i32, String)> {
        let mut out = Vec::new();
        for tick in ticks {
            let report = scheduler.evaluate(tick).expect("ticks in order");
            out.extend(report.fired.into_iter().map(|f| (f.fired_at, f.rule_id)));
        }
        out
    }

    fn at(times: &[i32]) -> Vec<Tick> {
        times.iter().map(|t| Tick::at(*t)).collect()
    }

    #[test]
    fn list_rule_fires_once_per_entry() {
        let cat = catalog(vec![rule(
            "stack",
            FireSchedule::List { times: vec![180, 480] },
            vec![AudienceTag::RoleSupport],
        )]);
        let mut s = Scheduler::new(&cat, setup(Role::Support, Team::Radiant));

        let fired = drive(&mut s, &at(&[0, 60, 180, 181, 480, 481]));
        assert_eq!(fired, vec![(180, "stack".to_owned()), (480, "stack".to_owned())]);
        assert!(s.is_finished());
    }

    #[test]
    fn repetition_limit_caps_firings() {
        let cat = catalog(vec![rule(
            "tormentor",
            FireSchedule::Repeating { first: 600, interval: 600, limit: Some(3) },
            vec![AudienceTag::All],
        )]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Dire));

        let fired: Vec<i32> = drive(&mut s, &at(&[600, 1200, 1800, 2400])).into_iter().map(|f| f.0).collect();
        assert_eq!(fired, vec![600, 1200, 1800]);
        assert_eq!(s.snapshot()[0].fired_count, 3);
    }

    #[test]
    fn other_teams_lane_never_fires() {
        let pull = rule("pull", FireSchedule::Repeating { first: 75, interval: 60, limit: None }, vec![AudienceTag::RoleSupport])
            .with_position(PositionPredicate::for_team(Area::BottomLane, Team::Radiant));
        let cat = catalog(vec![pull]);
        let mut s = Scheduler::new(&cat, setup(Role::Support, Team::Dire));

        // Standing in the bottom lane the whole game changes nothing for Dire
        let ticks: Vec<Tick> = (0..3000).step_by(5).map(|t| Tick::at(t).with_position(0.0, -7000.0)).collect();
        assert!(drive(&mut s, &ticks).is_empty());
    }

    #[test]
    fn gated_rule_retries_until_predicate_holds() {
        let pull = rule("pull", FireSchedule::Once { at: 75 }, vec![AudienceTag::RoleSupport])
            .with_position(PositionPredicate::new(Area::SafeLane));
        let cat = catalog(vec![pull]);
        let mut s = Scheduler::new(&cat, setup(Role::Support, Team::Radiant));

        let ticks = [
            Tick::at(75).with_position(0.0, 0.0),   // mid
            Tick::at(76).with_position(0.0, 0.0),
            Tick::at(90).with_position(0.0, -7000.0), // radiant safe lane
            Tick::at(91).with_position(0.0, -7000.0),
        ];
        assert_eq!(drive(&mut s, &ticks), vec![(90, "pull".to_owned())]);
    }

    #[test]
    fn audience_is_checked_per_tick() {
        let cat = catalog(vec![rule("mid-only", FireSchedule::Once { at: 10 }, vec![AudienceTag::RoleMid])]);
        let mut s = Scheduler::new(&cat, setup(Role::Support, Team::Radiant));

        assert!(drive(&mut s, &at(&[10, 20])).is_empty());
        // Role swap mid-game: the pending eligibility is still there
        let fired = drive(&mut s, &[Tick::at(30).with_role(Role::Mid)]);
        assert_eq!(fired, vec![(30, "mid-only".to_owned())]);
    }

    #[test]
    fn support_or_core_audience() {
        let tags = vec![AudienceTag::RoleSupport, AudienceTag::RoleCore];
        for role in Role::ALL {
            let cat = catalog(vec![rule("both", FireSchedule::Once { at: 0 }, tags.clone())]);
            let mut s = Scheduler::new(&cat, setup(role, Team::Radiant));
            assert_eq!(drive(&mut s, &at(&[0])).len(), 1, "role {}", role);
        }

        let cat = catalog(vec![rule("sup-carry", FireSchedule::Once { at: 0 }, vec![AudienceTag::RoleSupport, AudienceTag::RoleCarry])]);
        let mut s = Scheduler::new(&cat, setup(Role::Mid, Team::Radiant));
        assert!(drive(&mut s, &at(&[0, 100])).is_empty());
    }

    #[test]
    fn same_tick_firings_keep_catalog_order() {
        let cat = catalog(vec![
            rule("c", FireSchedule::Once { at: 0 }, vec![AudienceTag::All]),
            rule("a", FireSchedule::Once { at: -10 }, vec![AudienceTag::All]),
            rule("b", FireSchedule::List { times: vec![-5, 50] }, vec![AudienceTag::All]),
        ]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));
        let ids: Vec<String> = drive(&mut s, &at(&[0])).into_iter().map(|f| f.1).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn pre_horn_times_fire() {
        let cat = catalog(vec![rule("draft", FireSchedule::Once { at: -75 }, vec![AudienceTag::All])]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));
        assert_eq!(drive(&mut s, &at(&[-90, -75, -60])), vec![(-75, "draft".to_owned())]);
    }

    #[test]
    fn out_of_order_tick_is_rejected() {
        let cat = catalog(vec![rule("x", FireSchedule::Once { at: 100 }, vec![AudienceTag::All])]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));

        s.evaluate(&Tick::at(50)).unwrap();
        // Same clock value again is fine
        s.evaluate(&Tick::at(50)).unwrap();
        let err = s.evaluate(&Tick::at(40)).unwrap_err();
        assert_eq!(err, OrderingViolation { now: 40, last: 50 });
        // Rejected tick did not move the clock
        assert_eq!(s.last_now(), Some(50));
    }

    #[test]
    fn repeated_now_never_double_fires() {
        let cat = catalog(vec![rule("r", FireSchedule::Repeating { first: 0, interval: 30, limit: None }, vec![AudienceTag::All])]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));
        assert_eq!(drive(&mut s, &at(&[0, 0, 0])).len(), 1);
    }

    #[test]
    fn firing_times_strictly_increase() {
        let cat = catalog(vec![
            rule("rep", FireSchedule::Repeating { first: -30, interval: 45, limit: None }, vec![AudienceTag::All]),
            rule("list", FireSchedule::List { times: vec![10, 11, 12, 300] }, vec![AudienceTag::All]),
        ]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));
        let ticks: Vec<Tick> = (-60..900).step_by(13).map(Tick::at).collect();
        let fired = drive(&mut s, &ticks);

        for id in ["rep", "list"] {
            let times: Vec<i32> = fired.iter().filter(|f| f.1 == id).map(|f| f.0).collect();
            assert!(!times.is_empty());
            assert!(times.windows(2).all(|w| w[0] < w[1]), "{}: {:?}", id, times);
        }
    }

    #[test]
    fn missing_position_is_a_fault_not_a_consumption() {
        let ward = rule("ward", FireSchedule::Once { at: 0 }, vec![AudienceTag::All])
            .with_position(PositionPredicate::new(Area::OwnJungle));
        let cat = catalog(vec![ward]);
        let mut s = Scheduler::new(&cat, setup(Role::Support, Team::Radiant));

        let report = s.evaluate(&Tick::at(0)).unwrap();
        assert!(report.fired.is_empty());
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].rule_id, "ward");
        assert_eq!(s.pending_count(), 1);

        // Position shows up a tick later: radiant jungle cell (7, 4)
        let report = s.evaluate(&Tick::at(1).with_position(-500.0, -3500.0)).unwrap();
        assert_eq!(report.fired.len(), 1);
        assert!(report.faults.is_empty());
    }

    #[test]
    fn validity_window_drops_stale_hints() {
        let bounty = rule("bounty", FireSchedule::List { times: vec![0, 180] }, vec![AudienceTag::RoleSupport])
            .with_window(20);
        let cat = catalog(vec![bounty]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));

        // Carry never qualifies; by 21s the first eligibility is gone
        drive(&mut s, &at(&[0, 10, 21]));
        assert_eq!(s.snapshot()[0].next_eligible, 180);

        // Jump far past both windows; nothing fires, instance is spent
        let fired = drive(&mut s, &[Tick::at(400).with_role(Role::Support)]);
        assert!(fired.is_empty());
        assert!(s.is_finished());
    }

    #[test]
    fn hero_rules_follow_the_draft() {
        let rules = vec![
            Rule::new("own-cm", Category::OwnHero, FireSchedule::Once { at: 0 }, vec![AudienceTag::All], Payload::text("cm"))
                .for_hero("crystal maiden"),
            Rule::new("own-lina", Category::OwnHero, FireSchedule::Once { at: 0 }, vec![AudienceTag::All], Payload::text("lina"))
                .for_hero("Lina"),
            Rule::new("vs-axe", Category::EnemyHero, FireSchedule::Once { at: 0 }, vec![AudienceTag::InLane], Payload::text("axe"))
                .for_hero("Axe"),
            Rule::new("vs-pudge", Category::EnemyHero, FireSchedule::Once { at: 0 }, vec![AudienceTag::InLane], Payload::text("pudge"))
                .for_hero("Pudge"),
        ];
        let cat = catalog(rules);
        let s = Scheduler::new(&cat, setup(Role::Support, Team::Radiant));
        let ids: Vec<String> = s.snapshot().into_iter().map(|i| i.rule_id).collect();
        assert_eq!(ids, vec!["own-cm", "vs-axe"]);
    }

    #[test]
    fn disabled_categories_are_not_instantiated() {
        let cat = catalog(vec![
            rule("tip", FireSchedule::Once { at: 0 }, vec![AudienceTag::All]),
            Rule::new("rosh", Category::Roshan, FireSchedule::Once { at: 0 }, vec![AudienceTag::All], Payload::text("rosh")),
        ]);
        let mut cfg = setup(Role::Carry, Team::Radiant);
        cfg.disabled_categories = vec![Category::Tips];
        let mut s = Scheduler::new(&cat, cfg);
        assert_eq!(drive(&mut s, &at(&[0])), vec![(0, "rosh".to_owned())]);
    }

    #[test]
    fn turbo_uses_alternate_table() {
        let r = rule("rune", FireSchedule::Once { at: 600 }, vec![AudienceTag::All])
            .with_turbo(FireSchedule::Once { at: 300 });
        let cat = catalog(vec![r]);
        let mut cfg = setup(Role::Carry, Team::Radiant);
        cfg.speed = GameSpeed::Turbo;
        let mut s = Scheduler::new(&cat, cfg);
        assert_eq!(drive(&mut s, &at(&[300, 600])), vec![(300, "rune".to_owned())]);
    }

    #[test]
    fn loading_twice_gives_identical_schedulers() {
        let a = Catalog::builtin().unwrap();
        let b = Catalog::builtin().unwrap();
        let sa = Scheduler::new(&a, setup(Role::Support, Team::Dire));
        let sb = Scheduler::new(&b, setup(Role::Support, Team::Dire));
        assert_eq!(sa.snapshot(), sb.snapshot());
        assert!(sa.instance_count() > 0);
    }

    #[test]
    fn next_due_tracks_earliest_pending() {
        let cat = catalog(vec![
            rule("late", FireSchedule::Once { at: 900 }, vec![AudienceTag::All]),
            rule("early", FireSchedule::List { times: vec![60, 1200] }, vec![AudienceTag::All]),
        ]);
        let mut s = Scheduler::new(&cat, setup(Role::Carry, Team::Radiant));
        assert_eq!(s.next_due(), Some(60));
        drive(&mut s, &at(&[60]));
        assert_eq!(s.next_due(), Some(900));
    }

    #[tokio::test]
    async fn engine_task_forwards_fired_events() {
        let cat = Arc::new(catalog(vec![
            rule("tip", FireSchedule::List { times: vec![0, 60] }, vec![AudienceTag::All]),
        ]));
        let (feed_tx, feed_rx) = tokio::sync::mpsc::channel(16);
        let (fired_tx, mut fired_rx) = tokio::sync::mpsc::channel(16);

        let task = tokio::spawn(run(feed_rx, fired_tx, cat, AppConfig::default(), None));

        // Ticks before the match starts are ignored
        feed_tx.send(FeedEvent::Tick(Tick::at(0))).await.unwrap();
        feed_tx
            .send(FeedEvent::MatchStart {
                hero:    "Sniper".to_owned(),
                role:    Role::Carry,
                team:    Team::Dire,
                enemies: vec![],
                speed:   GameSpeed::Normal,
            })
            .await
            .unwrap();
        feed_tx.send(FeedEvent::Tick(Tick::at(0))).await.unwrap();
        feed_tx.send(FeedEvent::Tick(Tick::at(61))).await.unwrap();
        feed_tx.send(FeedEvent::MatchEnd { now: Some(62) }).await.unwrap();
        drop(feed_tx);

        task.await.unwrap().unwrap();

        let first = fired_rx.recv().await.unwrap();
        let second = fired_rx.recv().await.unwrap();
        assert_eq!((first.fired_at, second.fired_at), (0, 61));
        assert!(fired_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn engine_task_fails_loudly_on_clock_rewind() {
        let cat = Arc::new(catalog(vec![rule("tip", FireSchedule::Once { at: 0 }, vec![AudienceTag::All])]));
        let (feed_tx, feed_rx) = tokio::sync::mpsc::channel(16);
        let (fired_tx, _fired_rx) = tokio::sync::mpsc::channel(16);
        let task = tokio::spawn(run(feed_rx, fired_tx, cat, AppConfig::default(), None));

        feed_tx
            .send(FeedEvent::MatchStart {
                hero:    "Sniper".to_owned(),
                role:    Role::Carry,
                team:    Team::Dire,
                enemies: vec![],
                speed:   GameSpeed::Normal,
            })
            .await
            .unwrap();
        feed_tx.send(FeedEvent::Tick(Tick::at(100))).await.unwrap();
        feed_tx.send(FeedEvent::Tick(Tick::at(99))).await.unwrap();
        drop(feed_tx);

        let err = task.await.unwrap().unwrap_err();
        assert!(err.downcast_ref::<OrderingViolation>().is_some());
    }
}
