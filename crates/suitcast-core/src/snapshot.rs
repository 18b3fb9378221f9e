//! Whole-engine checkpoints stored as a single JSON document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{Level, event};

use crate::engine::{Engine, EngineConfig, Pacing, Prediction};
use crate::history::{HistoryEntry, Observation, ObservationStore};
use crate::rules::{ActiveRuleSet, Quarantine, RulePool};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
}

/// Names of the pieces of state dropped while restoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub discarded: Vec<&'static str>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.discarded.is_empty()
    }

    fn discard(&mut self, field: &'static str, reason: &dyn std::fmt::Display) {
        event!(
            target: "suitcast_core::snapshot",
            Level::WARN,
            field,
            %reason,
            "discarding persisted state"
        );
        self.discarded.push(field);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSnapshot {
    pub version: u32,
    pub history: BTreeMap<u32, HistoryEntry>,
    pub collected: BTreeSet<u32>,
    pub observations: Vec<Observation>,
    pub pool: RulePool,
    pub active: ActiveRuleSet,
    pub quarantine: Quarantine,
    pub predictions: Vec<Prediction>,
    pub pacing: Pacing,
    pub learned_mode: bool,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl EngineSnapshot {
    pub fn capture(engine: &Engine) -> Self {
        let store = engine.store();
        Self {
            version: SNAPSHOT_VERSION,
            history: store.history().clone(),
            collected: store.collected().clone(),
            observations: store.observations().to_vec(),
            pool: engine.pool().clone(),
            active: engine.active_rules().clone(),
            quarantine: engine.quarantine().clone(),
            predictions: engine.predictions().to_vec(),
            pacing: engine.pacing().clone(),
            learned_mode: engine.learned_mode(),
            last_refresh: engine.last_refresh(),
        }
    }

    /// Rebuilds an engine, re-establishing bounds the document may violate.
    pub fn restore(self, config: EngineConfig) -> Engine {
        let mut pacing = self.pacing;
        pacing.trim();
        Engine::from_parts(
            config,
            ObservationStore::from_parts(self.history, self.collected, self.observations),
            RulePool::from_rules(self.pool.rules().to_vec()),
            ActiveRuleSet::from_rules(self.active.rules().to_vec()),
            Quarantine::from_entries(self.quarantine.entries().to_vec()),
            single_pending(self.predictions),
            pacing,
            self.learned_mode,
            self.last_refresh,
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<(Self, RestoreReport), SnapshotError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(value))
    }

    /// Field-by-field restore: damaged fields fall back to their defaults.
    pub fn from_value(value: Value) -> (Self, RestoreReport) {
        let mut report = RestoreReport::default();
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                report.discard("document", &format!("expected an object, found {}", kind(&other)));
                return (Self::default(), report);
            }
        };

        let snapshot = Self {
            version: field(&mut map, "version", &mut report),
            history: field(&mut map, "history", &mut report),
            collected: field(&mut map, "collected", &mut report),
            observations: field(&mut map, "observations", &mut report),
            pool: field(&mut map, "pool", &mut report),
            active: field(&mut map, "active", &mut report),
            quarantine: field(&mut map, "quarantine", &mut report),
            predictions: field(&mut map, "predictions", &mut report),
            pacing: field(&mut map, "pacing", &mut report),
            learned_mode: field(&mut map, "learned_mode", &mut report),
            last_refresh: field(&mut map, "last_refresh", &mut report),
        };
        if snapshot.version > SNAPSHOT_VERSION {
            event!(
                target: "suitcast_core::snapshot",
                Level::WARN,
                version = snapshot.version,
                supported = SNAPSHOT_VERSION,
                "snapshot written by a newer version"
            );
        }
        (snapshot, report)
    }
}

fn field<T>(map: &mut Map<String, Value>, key: &'static str, report: &mut RestoreReport) -> T
where
    T: DeserializeOwned + Default,
{
    match map.remove(key) {
        None | Some(Value::Null) => T::default(),
        Some(raw) => serde_json::from_value(raw).unwrap_or_else(|err| {
            report.discard(key, &err);
            T::default()
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Keeps only the newest pending prediction; older pending entries are dropped.
fn single_pending(mut predictions: Vec<Prediction>) -> Vec<Prediction> {
    let Some(newest) = predictions.iter().rposition(Prediction::is_pending) else {
        return predictions;
    };
    let before = predictions.len();
    let mut index = 0;
    predictions.retain(|prediction| {
        let keep = !prediction.is_pending() || index == newest;
        index += 1;
        keep
    });
    if predictions.len() != before {
        event!(
            target: "suitcast_core::snapshot",
            Level::WARN,
            dropped = before - predictions.len(),
            "restored ledger held several pending predictions"
        );
    }
    predictions
}
