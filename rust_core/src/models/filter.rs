//! User-defined filter definitions.
//!
//! These are persisted as JSON rows by the web layer and deserialized before
//! reaching the backtest engine. Evaluation lives in `crate::filters`.

use super::{BetDirection, Sport};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    In,
    NotIn,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Between => "between",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
        }
    }

    /// Operators that only make sense against ordered (numeric) values
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            FilterOperator::Gt
                | FilterOperator::Gte
                | FilterOperator::Lt
                | FilterOperator::Lte
                | FilterOperator::Between
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar as it appears in condition JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Right-hand side of a condition: a scalar or a list (for between/in/not_in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    List(Vec<ScalarValue>),
    Scalar(ScalarValue),
}

impl ConditionValue {
    pub fn number(n: f64) -> Self {
        ConditionValue::Scalar(ScalarValue::Number(n))
    }

    pub fn boolean(b: bool) -> Self {
        ConditionValue::Scalar(ScalarValue::Bool(b))
    }

    pub fn text(s: &str) -> Self {
        ConditionValue::Scalar(ScalarValue::Text(s.to_string()))
    }

    pub fn range(low: f64, high: f64) -> Self {
        ConditionValue::List(vec![ScalarValue::Number(low), ScalarValue::Number(high)])
    }

    pub fn texts(items: &[&str]) -> Self {
        ConditionValue::List(
            items
                .iter()
                .map(|s| ScalarValue::Text(s.to_string()))
                .collect(),
        )
    }
}

/// One clause of a user-defined rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    /// Registry key (see `filters::registry`)
    pub field: String,
    pub operator: FilterOperator,
    pub value: ConditionValue,
}

impl FilterCondition {
    pub fn new(field: &str, operator: FilterOperator, value: ConditionValue) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }
}

/// Ordered, AND-combined list of conditions plus the prop being tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFilter {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub sport: Sport,
    /// Stat the filter bets on (e.g. "pts")
    pub stat_key: String,
    /// Prop line; a game is a hit when the stat clears it in `direction`
    pub line: f64,
    #[serde(default)]
    pub direction: BetDirection,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl CustomFilter {
    pub fn new(
        name: &str,
        sport: Sport,
        stat_key: &str,
        line: f64,
        direction: BetDirection,
    ) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            sport,
            stat_key: stat_key.to_string(),
            line,
            direction,
            conditions: Vec::new(),
            owner_id: None,
        }
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}
