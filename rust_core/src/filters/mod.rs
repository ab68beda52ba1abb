//! Filter condition evaluation.
//!
//! Conditions are AND-combined. A malformed condition (unknown field,
//! operator the field can't take, value of the wrong shape) evaluates to
//! `false` so one bad clause excludes records instead of aborting a run.

pub mod registry;

use crate::error::Result;
use crate::models::{
    ConditionValue, CustomFilter, EnrichedGameLog, FilterCondition, FilterOperator, ScalarValue,
};
use registry::{lookup_field, FieldValue, ResolvedField};
use tracing::debug;

/// Tolerance for numeric equality on stat values
const NUMERIC_EPSILON: f64 = 1e-9;

fn scalar_matches(actual: &FieldValue, expected: &ScalarValue) -> Option<bool> {
    match (actual, expected) {
        (FieldValue::Number(a), ScalarValue::Number(e)) => Some((a - e).abs() < NUMERIC_EPSILON),
        (FieldValue::Bool(a), ScalarValue::Bool(e)) => Some(a == e),
        (FieldValue::Text(a), ScalarValue::Text(e)) => Some(a.eq_ignore_ascii_case(e)),
        _ => None,
    }
}

fn expect_number(value: &ConditionValue) -> Option<f64> {
    match value {
        ConditionValue::Scalar(ScalarValue::Number(n)) => Some(*n),
        _ => None,
    }
}

fn expect_range(value: &ConditionValue) -> Option<(f64, f64)> {
    match value {
        ConditionValue::List(items) if items.len() == 2 => match (&items[0], &items[1]) {
            (ScalarValue::Number(a), ScalarValue::Number(b)) => Some((a.min(*b), a.max(*b))),
            _ => None,
        },
        _ => None,
    }
}

/// Core operator semantics. `None` means the pairing is malformed.
fn apply_operator(
    actual: &FieldValue,
    operator: FilterOperator,
    value: &ConditionValue,
) -> Option<bool> {
    match operator {
        FilterOperator::Eq | FilterOperator::Neq => {
            let expected = match value {
                ConditionValue::Scalar(s) => s,
                ConditionValue::List(_) => return None,
            };
            let eq = scalar_matches(actual, expected)?;
            Some(if operator == FilterOperator::Eq { eq } else { !eq })
        }
        FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
            let a = match actual {
                FieldValue::Number(a) => *a,
                _ => return None,
            };
            let e = expect_number(value)?;
            Some(match operator {
                FilterOperator::Gt => a > e,
                FilterOperator::Gte => a >= e,
                FilterOperator::Lt => a < e,
                _ => a <= e,
            })
        }
        FilterOperator::Between => {
            let a = match actual {
                FieldValue::Number(a) => *a,
                _ => return None,
            };
            let (low, high) = expect_range(value)?;
            Some(a >= low && a <= high)
        }
        FilterOperator::In | FilterOperator::NotIn => {
            let items = match value {
                ConditionValue::List(items) => items,
                ConditionValue::Scalar(_) => return None,
            };
            let mut found = false;
            for item in items {
                if scalar_matches(actual, item)? {
                    found = true;
                    break;
                }
            }
            Some(if operator == FilterOperator::In { found } else { !found })
        }
    }
}

/// Evaluate one condition against a record, failing closed.
pub fn evaluate_condition(condition: &FilterCondition, record: &EnrichedGameLog) -> bool {
    let field = match lookup_field(&condition.field) {
        Some(f) => f,
        None => {
            debug!("Unknown filter field '{}', excluding record", condition.field);
            return false;
        }
    };
    evaluate_resolved(&field, condition, record)
}

fn evaluate_resolved(
    field: &ResolvedField,
    condition: &FilterCondition,
    record: &EnrichedGameLog,
) -> bool {
    if !field.supports(condition.operator) {
        debug!(
            "Operator {} not valid for field '{}', excluding record",
            condition.operator, condition.field
        );
        return false;
    }
    // A record without the field can't satisfy a clause about it
    let actual = match field.read(record) {
        Some(v) => v,
        None => return false,
    };
    match apply_operator(&actual, condition.operator, &condition.value) {
        Some(result) => result,
        None => {
            debug!(
                "Malformed value for {} {} {:?}, excluding record",
                condition.field, condition.operator, condition.value
            );
            false
        }
    }
}

/// A filter with its conditions resolved against the registry once.
///
/// Unknown fields resolve to `None` and make every record fail.
pub struct CompiledFilter<'a> {
    conditions: Vec<(Option<ResolvedField>, &'a FilterCondition)>,
}

impl<'a> CompiledFilter<'a> {
    pub fn new(conditions: &'a [FilterCondition]) -> Self {
        Self {
            conditions: conditions
                .iter()
                .map(|c| (lookup_field(&c.field), c))
                .collect(),
        }
    }

    /// Conditions whose field isn't registered
    pub fn unknown_fields(&self) -> Vec<&str> {
        self.conditions
            .iter()
            .filter(|(f, _)| f.is_none())
            .map(|(_, c)| c.field.as_str())
            .collect()
    }

    pub fn matches(&self, record: &EnrichedGameLog) -> bool {
        self.conditions.iter().all(|(field, condition)| match field {
            Some(f) => evaluate_resolved(f, condition, record),
            None => false,
        })
    }
}

/// True when every condition passes (AND). No conditions match everything.
pub fn matches_all(conditions: &[FilterCondition], record: &EnrichedGameLog) -> bool {
    conditions.iter().all(|c| evaluate_condition(c, record))
}

/// Strictly validate a filter definition before it is saved.
pub fn validate_filter(filter: &CustomFilter) -> Result<()> {
    registry::resolve_field(&filter.stat_key)?;
    for condition in &filter.conditions {
        registry::check_operator(&condition.field, condition.operator)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameLogEntry, Sport};
    use crate::error::EngineError;
    use chrono::NaiveDate;

    fn record() -> EnrichedGameLog {
        let mut game = GameLogEntry::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "BOS")
            .with_stat("pts", 28.0)
            .with_stat("reb", 9.0);
        game.is_home = true;
        game.rest_days = Some(2);
        EnrichedGameLog {
            player_id: "p1".to_string(),
            player_name: "Test Player".to_string(),
            team: "NYK".to_string(),
            sport: Sport::NBA,
            season: 2024,
            game,
            opponent_def_rank: Some(27),
            spread: Some(-4.5),
            game_total: None,
            weather: None,
        }
    }

    fn cond(field: &str, op: FilterOperator, value: ConditionValue) -> FilterCondition {
        FilterCondition::new(field, op, value)
    }

    /// Evaluate a single condition against the fixture record
    fn holds(field: &str, op: FilterOperator, value: ConditionValue) -> bool {
        evaluate_condition(&cond(field, op, value), &record())
    }

    #[test]
    fn test_basic_operators() {
        assert!(holds("is_home", FilterOperator::Eq, ConditionValue::boolean(true)));
        assert!(holds("rest_days", FilterOperator::Gte, ConditionValue::number(2.0)));
        assert!(!holds("rest_days", FilterOperator::Gt, ConditionValue::number(2.0)));
        assert!(holds("stat:pts", FilterOperator::Lt, ConditionValue::number(30.0)));
        assert!(holds("spread", FilterOperator::Lte, ConditionValue::number(-3.0)));
        assert!(holds("opponent", FilterOperator::Neq, ConditionValue::text("MIA")));
    }

    #[test]
    fn test_between_inclusive_any_order() {
        let between = FilterOperator::Between;
        assert!(holds("opponent_def_rank", between, ConditionValue::range(30.0, 27.0)));
        assert!(!holds("opponent_def_rank", between, ConditionValue::range(1.0, 10.0)));
    }

    #[test]
    fn test_in_and_not_in_case_insensitive() {
        assert!(holds("opponent", FilterOperator::In, ConditionValue::texts(&["bos", "mil"])));
        assert!(!holds("opponent", FilterOperator::NotIn, ConditionValue::texts(&["BOS"])));
    }

    #[test]
    fn test_malformed_conditions_fail_closed() {
        // unknown field
        assert!(!holds("vibes", FilterOperator::Eq, ConditionValue::boolean(true)));
        // ordering op on a bool
        assert!(!holds("is_home", FilterOperator::Gt, ConditionValue::number(0.0)));
        // type mismatch
        assert!(!holds("rest_days", FilterOperator::Eq, ConditionValue::text("two")));
        // neq with a type mismatch must not flip to true
        assert!(!holds("rest_days", FilterOperator::Neq, ConditionValue::text("two")));
        // between needs exactly two numbers
        assert!(!holds("rest_days", FilterOperator::Between, ConditionValue::number(2.0)));
        // missing field on the record
        assert!(!holds("game_total", FilterOperator::Gt, ConditionValue::number(200.0)));
    }

    #[test]
    fn test_and_combination() {
        let r = record();
        let good = vec![
            cond("is_home", FilterOperator::Eq, ConditionValue::boolean(true)),
            cond("opponent_def_rank", FilterOperator::Gte, ConditionValue::number(20.0)),
        ];
        assert!(matches_all(&good, &r));
        assert!(CompiledFilter::new(&good).matches(&r));

        let mut bad = good.clone();
        bad.push(cond("nonsense", FilterOperator::Eq, ConditionValue::number(1.0)));
        assert!(!matches_all(&bad, &r));
        let compiled = CompiledFilter::new(&bad);
        assert!(!compiled.matches(&r));
        assert_eq!(compiled.unknown_fields(), vec!["nonsense"]);

        assert!(matches_all(&[], &r));
    }

    #[test]
    fn test_validate_filter_is_strict() {
        let filter = CustomFilter::new("x", Sport::NBA, "pts", 20.5, Default::default())
            .with_condition(cond("is_home", FilterOperator::Gt, ConditionValue::number(1.0)));
        assert!(matches!(
            validate_filter(&filter),
            Err(EngineError::IncompatibleOperator { .. })
        ));
    }
}
