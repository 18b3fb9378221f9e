//! The prediction session: one owner for every piece of mutable state.
//!
//! Each feed event runs extraction, observation recording, verification,
//! the periodic rule refresh and finally the prediction gate, in that order.
//! Events must be handled one at a time; the single-pending-prediction lock
//! relies on it.

pub mod announce;
pub mod prediction;
pub mod rotation;
pub mod session;
pub mod status;
pub mod verify;

pub use prediction::{Pacing, Prediction, PredictionStatus, Proposal, Refusal};
pub use rotation::{Rotation, RotationBlock};
pub use session::{SessionWindow, SessionWindows};
pub use status::StatusReport;
pub use verify::{MAX_RESOLUTION_OFFSET, Verdict};

use chrono::{DateTime, Duration, Utc};
use tracing::{Level, event};

use crate::extract::{Extractor, GameEvent, Markers};
use crate::history::{ObservationStore, RecordOutcome};
use crate::policy::{MatchScope, RuleKind, StaticRules, TriggerMatcher};
use crate::rules::{ActiveRuleSet, Quarantine, RulePool, select_active};

pub const DEFAULT_REFRESH_MINUTES: i64 = 30;
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 5;
pub const DEFAULT_QUARANTINE_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sessions: SessionWindows,
    pub refresh_interval: Duration,
    /// Pause imposed on new predictions after a rule is quarantined.
    pub cooldown: Duration,
    /// `None` keeps entries until a refill releases them.
    pub quarantine_ttl: Option<Duration>,
    pub match_scope: MatchScope,
    /// Periodic refreshes switch learned mode on.
    pub auto_activate_learned: bool,
    pub markers: Markers,
    pub static_rules: StaticRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sessions: SessionWindows::default(),
            refresh_interval: Duration::minutes(DEFAULT_REFRESH_MINUTES),
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
            quarantine_ttl: Some(Duration::minutes(DEFAULT_QUARANTINE_TTL_MINUTES)),
            match_scope: MatchScope::default(),
            auto_activate_learned: true,
            markers: Markers::default(),
            static_rules: StaticRules::default(),
        }
    }
}

/// Egress requests produced while handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Announce { target: u32, text: String },
    Edit { target: u32, handle: u64, text: String },
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    extractor: Extractor,
    store: ObservationStore,
    pool: RulePool,
    active: ActiveRuleSet,
    quarantine: Quarantine,
    ledger: Vec<Prediction>,
    pacing: Pacing,
    learned_mode: bool,
    last_refresh: Option<DateTime<Utc>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            extractor: Extractor::new(config.markers.clone()),
            config,
            store: ObservationStore::new(),
            pool: RulePool::default(),
            active: ActiveRuleSet::default(),
            quarantine: Quarantine::new(),
            ledger: Vec::new(),
            pacing: Pacing::default(),
            learned_mode: false,
            last_refresh: None,
        }
    }

    /// Processes one feed message. `is_edit` only changes logging.
    pub fn handle(&mut self, text: &str, is_edit: bool, now: DateTime<Utc>) -> Vec<Action> {
        let Some(game) = self.extractor.extract(text) else {
            event!(
                target: "suitcast_core::engine",
                Level::TRACE,
                is_edit,
                "message carries no game data"
            );
            return Vec::new();
        };

        let recorded = self.store.record(game.number(), game.first_card(), now);
        if let RecordOutcome::Observed(obs) = recorded {
            event!(
                target: "suitcast_core::engine",
                Level::INFO,
                game = game.number(),
                trigger = %obs.trigger,
                result = %obs.result_suit,
                observations = self.store.observations().len(),
                "collected trigger outcome"
            );
        }

        let mut actions = Vec::new();
        if let Some(action) = self.verify(&game, is_edit, now) {
            actions.push(action);
        }

        self.expire_quarantine(now);
        self.maybe_refresh(now);

        match self.evaluate(Some(&game), now) {
            Ok(proposal) => actions.push(self.commit(proposal, now)),
            Err(reason) => event!(
                target: "suitcast_core::engine",
                Level::DEBUG,
                game = game.number(),
                %reason,
                "no prediction"
            ),
        }
        actions
    }

    /// Runs the prediction gate without committing anything.
    ///
    /// Preconditions are checked in a fixed priority order and the first
    /// failing one is reported.
    pub fn evaluate(
        &self,
        game: Option<&GameEvent>,
        now: DateTime<Utc>,
    ) -> Result<Proposal, Refusal> {
        if !self.config.sessions.contains(now) {
            return Err(Refusal::OutsideSession);
        }
        if let Some(pending) = self.pending() {
            return Err(Refusal::PredictionPending {
                target: pending.target,
            });
        }
        if let Some(until) = self.pacing.cooling_down(now) {
            return Err(Refusal::CoolingDown { until });
        }
        let Some(game) = game else {
            return Err(Refusal::NoGameNumber);
        };
        if !self.pacing.gap_ok(game.number()) {
            return Err(Refusal::TooSoon {
                last: self.pacing.last_predicted.unwrap_or_default(),
                number: game.number(),
            });
        }

        // learned mode never falls back to the static table
        let matched = if self.learned_mode {
            self.active.find(game.cards(), self.config.match_scope)
        } else {
            self.config
                .static_rules
                .find(game.cards(), self.config.match_scope)
        };
        let Some(matched) = matched else {
            return Err(Refusal::NoMatch);
        };

        if self.pacing.repeats(matched.suit) {
            return Err(Refusal::RepeatedSuit {
                suit: matched.suit,
            });
        }

        if matched.kind == RuleKind::Learned {
            self.pacing
                .rotation
                .admit(matched.suit, matched.trigger, &self.active)
                .map_err(|block| match block {
                    RotationBlock::ThinSuit { available } => Refusal::ThinSuit {
                        suit: matched.suit,
                        available,
                    },
                    RotationBlock::Spent => Refusal::TriggerSpent {
                        suit: matched.suit,
                        trigger: matched.trigger,
                    },
                })?;
        }

        Ok(Proposal::new(
            game.number(),
            matched.suit,
            matched.trigger,
            matched.kind,
        ))
    }

    fn commit(&mut self, proposal: Proposal, now: DateTime<Utc>) -> Action {
        self.ledger.push(Prediction {
            source: proposal.source,
            target: proposal.target,
            suit: proposal.suit,
            trigger: proposal.trigger,
            kind: proposal.kind,
            status: PredictionStatus::Pending,
            issued_at: now,
            resolution_offset: None,
            handle: None,
        });
        self.pacing.note_issued(proposal.source, proposal.suit);
        if proposal.kind == RuleKind::Learned {
            self.pacing
                .rotation
                .note_used(proposal.suit, proposal.trigger, &self.active);
        }
        event!(
            target: "suitcast_core::engine",
            Level::INFO,
            source = proposal.source,
            target_game = proposal.target,
            suit = %proposal.suit,
            trigger = %proposal.trigger,
            kind = ?proposal.kind,
            "prediction issued"
        );
        Action::Announce {
            target: proposal.target,
            text: announce::pending_text(proposal.target, proposal.suit),
        }
    }

    fn verify(&mut self, game: &GameEvent, is_edit: bool, now: DateTime<Utc>) -> Option<Action> {
        let verdict = verify::resolve(&self.ledger, game)?;
        let prediction = &mut self.ledger[verdict.index];
        prediction.status = verdict.status;
        prediction.resolution_offset = Some(verdict.offset);
        let resolved = prediction.clone();

        event!(
            target: "suitcast_core::engine",
            Level::INFO,
            target_game = resolved.target,
            game = game.number(),
            offset = verdict.offset,
            status = ?verdict.status,
            suit = %resolved.suit,
            is_edit,
            "prediction resolved"
        );

        if verdict.status == PredictionStatus::Lost && resolved.kind == RuleKind::Learned {
            self.quarantine_rule(&resolved, now);
        }

        match resolved.handle {
            Some(handle) => Some(Action::Edit {
                target: resolved.target,
                handle,
                text: announce::status_text(&resolved),
            }),
            None => {
                event!(
                    target: "suitcast_core::engine",
                    Level::WARN,
                    target_game = resolved.target,
                    "resolved prediction was never announced; no edit emitted"
                );
                None
            }
        }
    }

    fn quarantine_rule(&mut self, lost: &Prediction, now: DateTime<Utc>) {
        let entry = self.quarantine.insert(lost.suit, lost.trigger, now);
        self.pacing.cooldown_until = Some(now + self.config.cooldown);
        event!(
            target: "suitcast_core::rules",
            Level::INFO,
            trigger = %entry.trigger,
            suit = %entry.suit,
            strikes = entry.strikes,
            "rule quarantined after loss"
        );
        self.reselect();
    }

    fn expire_quarantine(&mut self, now: DateTime<Utc>) {
        let Some(ttl) = self.config.quarantine_ttl else {
            return;
        };
        let expired = self.quarantine.expire(now, ttl);
        if expired.is_empty() {
            return;
        }
        for entry in &expired {
            event!(
                target: "suitcast_core::rules",
                Level::INFO,
                trigger = %entry.trigger,
                suit = %entry.suit,
                "quarantine expired"
            );
        }
        self.reselect();
    }

    fn reselect(&mut self) {
        self.active = select_active(&self.pool, &mut self.quarantine).active;
    }

    /// Refreshes rules when the refresh interval elapsed since the last run.
    pub fn maybe_refresh(&mut self, now: DateTime<Utc>) -> bool {
        let due = self
            .last_refresh
            .is_none_or(|last| now - last >= self.config.refresh_interval);
        due && self.refresh_rules(now, self.config.auto_activate_learned)
    }

    /// Recomputes the pool and the active set; no-op below the minimum data.
    pub fn refresh_rules(&mut self, now: DateTime<Utc>, activate: bool) -> bool {
        let Some(pool) = RulePool::recompute(self.store.observations()) else {
            event!(
                target: "suitcast_core::rules",
                Level::DEBUG,
                observations = self.store.observations().len(),
                "not enough observations to rank rules"
            );
            return false;
        };
        self.pool = pool;
        self.reselect();
        self.pacing.rotation = Rotation::default();
        self.last_refresh = Some(now);
        if activate && !self.learned_mode {
            self.learned_mode = true;
            event!(target: "suitcast_core::rules", Level::INFO, "learned mode activated");
        }
        event!(
            target: "suitcast_core::rules",
            Level::INFO,
            pool = self.pool.len(),
            active = self.active.len(),
            quarantined = self.quarantine.len(),
            "rules refreshed"
        );
        true
    }

    pub fn set_learned_mode(&mut self, enabled: bool) {
        self.learned_mode = enabled;
    }

    /// Records the transport handle of a delivered announcement.
    pub fn attach_handle(&mut self, target: u32, handle: u64) -> bool {
        match self
            .ledger
            .iter_mut()
            .rev()
            .find(|prediction| prediction.target == target)
        {
            Some(prediction) => {
                prediction.handle = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Clears everything learned or predicted; configuration is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
        event!(target: "suitcast_core::engine", Level::INFO, "engine state reset");
    }

    pub fn status(&self, now: DateTime<Utc>) -> StatusReport {
        StatusReport::capture(self, now)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    pub fn pool(&self) -> &RulePool {
        &self.pool
    }

    pub fn active_rules(&self) -> &ActiveRuleSet {
        &self.active
    }

    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.ledger
    }

    pub fn pending(&self) -> Option<&Prediction> {
        self.ledger.iter().find(|prediction| prediction.is_pending())
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    pub fn learned_mode(&self) -> bool {
        self.learned_mode
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        config: EngineConfig,
        store: ObservationStore,
        pool: RulePool,
        active: ActiveRuleSet,
        quarantine: Quarantine,
        ledger: Vec<Prediction>,
        pacing: Pacing,
        learned_mode: bool,
        last_refresh: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            extractor: Extractor::new(config.markers.clone()),
            config,
            store,
            pool,
            active,
            quarantine,
            ledger,
            pacing,
            learned_mode,
            last_refresh,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> EngineConfig {
        EngineConfig {
            sessions: SessionWindows::always(),
            ..EngineConfig::default()
        }
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn static_rule_issues_prediction() {
        let mut engine = Engine::new(config());
        let actions = engine.handle("#N100. ⏰ (9♣ 2♦)", false, at(0));
        assert_eq!(
            actions,
            vec![Action::Announce {
                target: 102,
                text: announce::pending_text(102, crate::model::suit::Suit::Hearts),
            }]
        );
        let pending = engine.pending().expect("pending");
        assert_eq!(pending.kind, RuleKind::Static);
        assert_eq!(pending.source, 100);
    }

    #[test]
    fn outside_session_refuses_first() {
        let mut cfg = config();
        cfg.sessions = SessionWindows::new(
            vec![SessionWindow::new(0, 1)],
            chrono::FixedOffset::east_opt(0).unwrap(),
        );
        let engine = Engine::new(cfg);
        let game = GameEvent::new(10, vec!["9♣".parse().unwrap()], true).unwrap();
        assert_eq!(engine.evaluate(Some(&game), at(0)), Err(Refusal::OutsideSession));
    }

    #[test]
    fn learned_mode_without_rules_stays_silent() {
        let mut engine = Engine::new(config());
        engine.set_learned_mode(true);
        assert!(engine.handle("#N100. (9♣)", false, at(0)).is_empty());
        assert!(engine.pending().is_none());

        let game = GameEvent::new(104, vec!["9♣".parse().unwrap()], true).unwrap();
        assert_eq!(engine.evaluate(Some(&game), at(1)), Err(Refusal::NoMatch));
    }

    #[test]
    fn unannounced_resolution_emits_no_edit() {
        let mut engine = Engine::new(config());
        engine.handle("#N100. (9♣)", false, at(0));
        let actions = engine.handle("#N102. ✅ (A♥)", false, at(1));
        assert!(actions.iter().all(|a| !matches!(a, Action::Edit { .. })));
        assert_eq!(engine.predictions()[0].status, PredictionStatus::Won);
    }

    #[test]
    fn reset_clears_learned_state() {
        let mut engine = Engine::new(config());
        engine.handle("#N100. (9♣)", false, at(0));
        engine.set_learned_mode(true);
        engine.reset();
        assert!(engine.predictions().is_empty());
        assert!(!engine.learned_mode());
        assert!(engine.store().history().is_empty());
    }
}
