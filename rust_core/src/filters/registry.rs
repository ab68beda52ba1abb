//! Filter field registry.
//!
//! Maps a condition's `field` key to a typed accessor over `EnrichedGameLog`.
//! Adding a filterable field means adding one `FieldDef` entry below.

use crate::error::{EngineError, Result};
use crate::models::{EnrichedGameLog, FilterOperator, Sport};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Prefix for stat fields, e.g. "stat:pts". Bare stat keys are accepted too.
pub const STAT_PREFIX: &str = "stat:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Bool,
    Text,
}

/// A field value read from a record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

pub type Accessor = fn(&EnrichedGameLog) -> Option<FieldValue>;

/// One registered filter field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub accessor: Accessor,
}

impl FieldDef {
    /// Operators this field accepts
    pub fn supports(&self, operator: FilterOperator) -> bool {
        match self.kind {
            FieldKind::Number => true,
            FieldKind::Bool => matches!(operator, FilterOperator::Eq | FilterOperator::Neq),
            FieldKind::Text => !operator.is_ordering(),
        }
    }
}

fn num(v: f64) -> Option<FieldValue> {
    Some(FieldValue::Number(v))
}

/// Context fields shared by every sport.
pub static CONTEXT_FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "is_home",
        label: "Home game",
        kind: FieldKind::Bool,
        accessor: |r| Some(FieldValue::Bool(r.game.is_home)),
    },
    FieldDef {
        key: "is_back_to_back",
        label: "Back-to-back",
        kind: FieldKind::Bool,
        accessor: |r| Some(FieldValue::Bool(r.game.is_back_to_back)),
    },
    FieldDef {
        key: "rest_days",
        label: "Days of rest",
        kind: FieldKind::Number,
        accessor: |r| r.game.rest_days.and_then(|d| num(d as f64)),
    },
    FieldDef {
        key: "opponent",
        label: "Opponent",
        kind: FieldKind::Text,
        accessor: |r| Some(FieldValue::Text(r.game.opponent.clone())),
    },
    FieldDef {
        key: "team",
        label: "Team",
        kind: FieldKind::Text,
        accessor: |r| Some(FieldValue::Text(r.team.clone())),
    },
    FieldDef {
        key: "sport",
        label: "Sport",
        kind: FieldKind::Text,
        accessor: |r| Some(FieldValue::Text(r.sport.as_str().to_string())),
    },
    FieldDef {
        key: "opponent_def_rank",
        label: "Opponent defensive rank",
        kind: FieldKind::Number,
        accessor: |r| r.opponent_def_rank.and_then(|d| num(d as f64)),
    },
    FieldDef {
        key: "season",
        label: "Season",
        kind: FieldKind::Number,
        accessor: |r| num(r.season as f64),
    },
    FieldDef {
        key: "month",
        label: "Month",
        kind: FieldKind::Number,
        accessor: |r| num(r.month() as f64),
    },
    FieldDef {
        key: "day_of_week",
        label: "Day of week (0 = Mon)",
        kind: FieldKind::Number,
        accessor: |r| num(r.day_of_week() as f64),
    },
    FieldDef {
        key: "minutes",
        label: "Minutes played",
        kind: FieldKind::Number,
        accessor: |r| r.game.minutes.and_then(num),
    },
    FieldDef {
        key: "spread",
        label: "Team spread",
        kind: FieldKind::Number,
        accessor: |r| r.spread.and_then(num),
    },
    FieldDef {
        key: "game_total",
        label: "Game total",
        kind: FieldKind::Number,
        accessor: |r| r.game_total.and_then(num),
    },
    FieldDef {
        key: "temperature",
        label: "Temperature (F)",
        kind: FieldKind::Number,
        accessor: |r| r.weather.as_ref().and_then(|w| num(w.temperature_f)),
    },
    FieldDef {
        key: "wind_mph",
        label: "Wind (mph)",
        kind: FieldKind::Number,
        accessor: |r| r.weather.as_ref().and_then(|w| num(w.wind_mph)),
    },
];

/// Stat fields resolve dynamically against the record's stat map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedField {
    Context(&'static FieldDef),
    Stat(String),
}

impl ResolvedField {
    pub fn kind(&self) -> FieldKind {
        match self {
            ResolvedField::Context(def) => def.kind,
            ResolvedField::Stat(_) => FieldKind::Number,
        }
    }

    pub fn supports(&self, operator: FilterOperator) -> bool {
        match self {
            ResolvedField::Context(def) => def.supports(operator),
            ResolvedField::Stat(_) => true,
        }
    }

    /// Read the field; `None` when the record lacks it
    pub fn read(&self, record: &EnrichedGameLog) -> Option<FieldValue> {
        match self {
            ResolvedField::Context(def) => (def.accessor)(record),
            ResolvedField::Stat(key) => record.game.stat(key).map(FieldValue::Number),
        }
    }
}

impl PartialEq for FieldDef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FieldDef {}

fn index() -> &'static FxHashMap<&'static str, &'static FieldDef> {
    static INDEX: OnceLock<FxHashMap<&'static str, &'static FieldDef>> = OnceLock::new();
    INDEX.get_or_init(|| CONTEXT_FIELDS.iter().map(|f| (f.key, f)).collect())
}

/// Every stat key any supported sport logs
fn is_known_stat(key: &str) -> bool {
    [Sport::NBA, Sport::MLB, Sport::NFL]
        .iter()
        .any(|s| s.stat_keys().contains(&key))
}

/// Look up a field, returning `None` for unknown keys.
pub fn lookup_field(key: &str) -> Option<ResolvedField> {
    if let Some(def) = index().get(key) {
        return Some(ResolvedField::Context(*def));
    }
    let stat = key.strip_prefix(STAT_PREFIX).unwrap_or(key);
    if is_known_stat(stat) {
        return Some(ResolvedField::Stat(stat.to_string()));
    }
    None
}

/// Strict lookup used when validating filters before they are saved.
pub fn resolve_field(key: &str) -> Result<ResolvedField> {
    lookup_field(key).ok_or_else(|| EngineError::UnknownField(key.to_string()))
}

/// Strict check that a field accepts an operator.
pub fn check_operator(key: &str, operator: FilterOperator) -> Result<ResolvedField> {
    let field = resolve_field(key)?;
    if !field.supports(operator) {
        return Err(EngineError::IncompatibleOperator {
            field: key.to_string(),
            operator: operator.to_string(),
        });
    }
    Ok(field)
}

/// All context field keys, for filter-builder UIs
pub fn context_field_keys() -> Vec<&'static str> {
    CONTEXT_FIELDS.iter().map(|f| f.key).collect()
}
