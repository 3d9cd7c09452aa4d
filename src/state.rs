/// Per-match firing state for one rule: the Rule Instance state machine.
///
///   Pending ──(due ∧ gates hold)──▶ fire ──▶ Pending (next time) | Exhausted
///      │
///      └──(window lapsed)──▶ advance without firing ──▶ Pending | Exhausted
///
/// All state lives in instances owned by a single `Scheduler`.
/// No locking is needed because a scheduler is only ever driven by one caller.
use crate::rules::{FireSchedule, GameSpeed, Rule};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Pending,
    Exhausted,
}

/// Read-only view of an instance for tooling and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSnapshot {
    pub rule_id:       String,
    pub next_eligible: i32,
    pub fired_count:   u32,
    pub last_fired_at: Option<i32>,
    pub status:        InstanceStatus,
}

#[derive(Debug, Clone)]
pub struct RuleInstance {
    rule:          Arc<Rule>,
    /// Fixed at creation from the match's game speed; never swapped.
    schedule:      FireSchedule,
    next_eligible: i32,
    /// Index of the entry `next_eligible` came from (list schedules only).
    cursor:        usize,
    fired_count:   u32,
    last_fired_at: Option<i32>,
    exhausted:     bool,
}

impl RuleInstance {
    pub fn new(rule: Arc<Rule>, speed: GameSpeed) -> Self {
        let schedule = rule.schedule_for(speed).clone();
        // An empty list cannot pass catalog validation; treat it as spent.
        let (next_eligible, exhausted) = match schedule.first_time() {
            Some(t) => (t, false),
            None    => (i32::MAX, true),
        };
        Self {
            rule,
            schedule,
            next_eligible,
            cursor: 0,
            fired_count: 0,
            last_fired_at: None,
            exhausted,
        }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn schedule(&self) -> &FireSchedule {
        &self.schedule
    }

    pub fn next_eligible(&self) -> i32 {
        self.next_eligible
    }

    pub fn fired_count(&self) -> u32 {
        self.fired_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// `now >= next_eligible`, never `==`: a missed tick must not lose the hint.
    pub fn is_due(&self, now: i32) -> bool {
        !self.exhausted && now >= self.next_eligible
    }

    /// The current eligibility is older than the rule's validity window.
    pub fn window_lapsed(&self, now: i32) -> bool {
        match self.rule.window {
            Some(w) if !self.exhausted => i64::from(now) > i64::from(self.next_eligible) + i64::from(w),
            _ => false,
        }
    }

    /// Drop the current eligibility without firing and move to the next one.
    pub fn lapse(&mut self) {
        if self.exhausted {
            return;
        }
        tracing::debug!(
            "Rule '{}' lapsed its window at {}s without firing",
            self.rule.id, self.next_eligible
        );
        self.step(None);
    }

    /// Record a firing at `now` and compute the next eligibility. Entries and
    /// repeat occurrences at or before `now` are consumed with this firing.
    pub fn record_fire(&mut self, now: i32) {
        debug_assert!(self.is_due(now));
        self.fired_count += 1;
        self.last_fired_at = Some(now);

        if let FireSchedule::Repeating { limit: Some(limit), .. } = self.schedule {
            if self.fired_count >= limit {
                self.exhausted = true;
                return;
            }
        }
        self.step(Some(now));
    }

    /// Advance to the next eligibility strictly after `floor` (or just the
    /// next one when `floor` is `None`).
    fn step(&mut self, floor: Option<i32>) {
        let floor = floor.map(i64::from).unwrap_or(i64::from(self.next_eligible));
        match &self.schedule {
            FireSchedule::Once { .. } => {
                self.exhausted = true;
            }
            FireSchedule::List { times } => {
                let mut cursor = self.cursor + 1;
                while cursor < times.len() && i64::from(times[cursor]) <= floor {
                    cursor += 1;
                }
                match times.get(cursor) {
                    Some(t) => {
                        self.cursor = cursor;
                        self.next_eligible = *t;
                    }
                    None => self.exhausted = true,
                }
            }
            FireSchedule::Repeating { interval, .. } => {
                let interval = i64::from(*interval);
                let mut next = i64::from(self.next_eligible) + interval;
                if next <= floor {
                    // Skip whole missed periods in one go
                    let missed = (floor - next) / interval + 1;
                    next += missed * interval;
                }
                match i32::try_from(next) {
                    Ok(n) => self.next_eligible = n,
                    Err(_) => self.exhausted = true,
                }
            }
        }
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            rule_id:       self.rule.id.clone(),
            next_eligible: self.next_eligible,
            fired_count:   self.fired_count,
            last_fired_at: self.last_fired_at,
            status: if self.exhausted { InstanceStatus::Exhausted } else { InstanceStatus::Pending },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::AudienceTag;
    use crate::rules::{Category, Payload};

    fn instance(schedule: FireSchedule) -> RuleInstance {
        let rule = Rule::new("r", Category::Tips, schedule, vec![AudienceTag::All], Payload::text("x"));
        RuleInstance::new(Arc::new(rule), GameSpeed::Normal)
    }

    #[test]
    fn one_shot_exhausts_after_firing() {
        let mut inst = instance(FireSchedule::Once { at: -60 });
        assert!(!inst.is_due(-61));
        assert!(inst.is_due(-60));
        inst.record_fire(-60);
        assert!(inst.is_exhausted());
        assert!(!inst.is_due(1000));
        assert_eq!(inst.snapshot().status, InstanceStatus::Exhausted);
    }

    #[test]
    fn list_walks_entries() {
        let mut inst = instance(FireSchedule::List { times: vec![180, 480] });
        assert_eq!(inst.next_eligible(), 180);
        inst.record_fire(180);
        assert_eq!(inst.next_eligible(), 480);
        assert!(!inst.is_due(181));
        inst.record_fire(480);
        assert!(inst.is_exhausted());
        assert_eq!(inst.fired_count(), 2);
    }

    #[test]
    fn late_fire_consumes_passed_list_entries() {
        let mut inst = instance(FireSchedule::List { times: vec![100, 200, 300, 400] });
        inst.record_fire(310);
        assert_eq!(inst.next_eligible(), 400);
        assert_eq!(inst.fired_count(), 1);
    }

    #[test]
    fn repeating_respects_limit() {
        let mut inst = instance(FireSchedule::Repeating { first: 600, interval: 600, limit: Some(3) });
        for t in [600, 1200, 1800] {
            assert!(inst.is_due(t));
            inst.record_fire(t);
        }
        assert!(inst.is_exhausted());
        assert_eq!(inst.fired_count(), 3);
    }

    #[test]
    fn repeating_skips_missed_periods() {
        let mut inst = instance(FireSchedule::Repeating { first: 0, interval: 120, limit: None });
        inst.record_fire(500);
        // 120, 240, 360, 480 are all in the past
        assert_eq!(inst.next_eligible(), 600);
        assert!(!inst.is_due(599));
    }

    #[test]
    fn next_eligible_never_decreases() {
        let mut inst = instance(FireSchedule::Repeating { first: -90, interval: 45, limit: None });
        let mut last = inst.next_eligible();
        for now in (-90..2000).step_by(7) {
            if inst.is_due(now) {
                inst.record_fire(now);
            }
            assert!(inst.next_eligible() >= last);
            last = inst.next_eligible();
        }
    }

    #[test]
    fn window_lapse_moves_on_without_counting() {
        let rule = Rule::new(
            "w",
            Category::BountyRunes,
            FireSchedule::List { times: vec![100, 200] },
            vec![AudienceTag::All],
            Payload::text("x"),
        )
        .with_window(30);
        let mut inst = RuleInstance::new(Arc::new(rule), GameSpeed::Normal);

        assert!(!inst.window_lapsed(130));
        assert!(inst.window_lapsed(131));
        inst.lapse();
        assert_eq!(inst.next_eligible(), 200);
        assert_eq!(inst.fired_count(), 0);
        inst.lapse();
        assert!(inst.is_exhausted());
    }

    #[test]
    fn turbo_schedule_fixed_at_creation() {
        let rule = Rule::new(
            "t",
            Category::Tips,
            FireSchedule::Once { at: 600 },
            vec![AudienceTag::All],
            Payload::text("x"),
        )
        .with_turbo(FireSchedule::Once { at: 300 });
        let rule = Arc::new(rule);
        assert_eq!(RuleInstance::new(rule.clone(), GameSpeed::Turbo).next_eligible(), 300);
        assert_eq!(RuleInstance::new(rule, GameSpeed::Normal).next_eligible(), 600);
    }
}
