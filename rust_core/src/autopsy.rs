//! Post-game autopsy of a missed prop.
//!
//! Runs a fixed-priority rule cascade to explain the miss, then grades the
//! decision separately from the outcome: injuries and blowouts are never
//! held against the pick.

use crate::convergence::FACTOR_COUNT;
use crate::models::{BetDirection, Sport};
use crate::utils::round_to;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes below this share of the player's average count as a restriction
const MINUTES_RESTRICTION_RATIO: f64 = 0.75;

/// Minutes below this share make the restriction the primary cause
const SEVERE_RESTRICTION_RATIO: f64 = 0.60;

const NBA_FOUL_TROUBLE: u8 = 5;

/// Line movement (points) against the pick that marks sharp money
const SHARP_MOVE: f64 = 1.0;

const NARROW_MISS: f64 = 2.0;

/// Convergence below this is a weak signal
const WEAK_SIGNAL: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseKind {
    Blowout,
    InGameInjury,
    MinuteRestriction,
    FoulTrouble,
    LineupChange,
    BackToBack,
    Variance,
    SharpLine,
    WeakSignal,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CauseSeverity {
    Primary,
    Contributing,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopsyCause {
    pub kind: CauseKind,
    pub severity: CauseSeverity,
    pub label: String,
    pub detail: String,
    /// Could this have been known before the bet was placed?
    pub was_knowable: bool,
}

impl AutopsyCause {
    fn new(
        kind: CauseKind,
        severity: CauseSeverity,
        label: &str,
        detail: String,
        was_knowable: bool,
    ) -> Self {
        Self {
            kind,
            severity,
            label: label.to_string(),
            detail,
            was_knowable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessGrade {
    A,
    B,
    C,
    D,
    F,
}

impl ProcessGrade {
    fn from_rank(rank: u8) -> Self {
        match rank {
            0 => ProcessGrade::A,
            1 => ProcessGrade::B,
            2 => ProcessGrade::C,
            3 => ProcessGrade::D,
            _ => ProcessGrade::F,
        }
    }

    fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ProcessGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What happened in the game, plus what the model said beforehand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopsyInput {
    pub sport: Sport,
    pub stat_key: String,
    pub line: f64,
    pub actual: f64,
    #[serde(default)]
    pub direction: BetDirection,
    /// Factors that agreed with the pick
    pub convergence_score: u8,
    #[serde(default)]
    pub minutes_played: Option<f64>,
    #[serde(default)]
    pub avg_minutes: Option<f64>,
    /// Restriction reported before tip-off
    #[serde(default)]
    pub restriction_announced: bool,
    /// Final score differential for the player's team
    #[serde(default)]
    pub final_margin: Option<i32>,
    #[serde(default)]
    pub left_with_injury: bool,
    #[serde(default)]
    pub fouls: Option<u8>,
    #[serde(default)]
    pub lineup_change: bool,
    #[serde(default)]
    pub is_back_to_back: bool,
    #[serde(default)]
    pub opening_line: Option<f64>,
    #[serde(default)]
    pub closing_line: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetAutopsy {
    pub stat_key: String,
    pub line: f64,
    pub actual: f64,
    pub direction: BetDirection,
    /// Distance on the wrong side of the line (negative if the bet won)
    pub miss_margin: f64,
    /// Never empty
    pub causes: Vec<AutopsyCause>,
    pub was_unlucky: bool,
    /// 0..=100, higher means the process was sound and the outcome wasn't
    pub unluck_score: u8,
    pub process_grade: ProcessGrade,
    pub would_bet_again: bool,
    pub summary: String,
}

fn blowout_margin(sport: Sport) -> i32 {
    match sport {
        Sport::NBA => 20,
        Sport::NFL => 21,
        Sport::MLB => 7,
    }
}

/// The rule cascade, in priority order.
fn classify_causes(input: &AutopsyInput, miss_margin: f64) -> Vec<AutopsyCause> {
    let mut causes = Vec::new();

    if let Some(margin) = input.final_margin {
        if margin.abs() >= blowout_margin(input.sport) {
            causes.push(AutopsyCause::new(
                CauseKind::Blowout,
                CauseSeverity::Primary,
                "Blowout",
                format!("Game decided by {} - starters sat late", margin.abs()),
                false,
            ));
        }
    }

    if input.left_with_injury {
        causes.push(AutopsyCause::new(
            CauseKind::InGameInjury,
            CauseSeverity::Primary,
            "In-game injury",
            "Left the game injured".to_string(),
            false,
        ));
    }

    let blowout_or_injury = !causes.is_empty();
    if let (Some(played), Some(avg)) = (input.minutes_played, input.avg_minutes) {
        if !blowout_or_injury && avg > 0.0 && played < avg * MINUTES_RESTRICTION_RATIO {
            let severity = if played < avg * SEVERE_RESTRICTION_RATIO {
                CauseSeverity::Primary
            } else {
                CauseSeverity::Contributing
            };
            causes.push(AutopsyCause::new(
                CauseKind::MinuteRestriction,
                severity,
                "Minutes restriction",
                format!("Played {:.0} minutes vs a {:.1} average", played, avg),
                input.restriction_announced,
            ));
        }
    }

    if input.sport == Sport::NBA {
        if let Some(fouls) = input.fouls {
            if fouls >= NBA_FOUL_TROUBLE {
                causes.push(AutopsyCause::new(
                    CauseKind::FoulTrouble,
                    CauseSeverity::Contributing,
                    "Foul trouble",
                    format!("Picked up {} fouls", fouls),
                    false,
                ));
            }
        }
    }

    if input.lineup_change {
        causes.push(AutopsyCause::new(
            CauseKind::LineupChange,
            CauseSeverity::Contributing,
            "Lineup change",
            "Rotation changed from the lineup the pick assumed".to_string(),
            true,
        ));
    }

    if input.is_back_to_back && input.direction == BetDirection::Over {
        causes.push(AutopsyCause::new(
            CauseKind::BackToBack,
            CauseSeverity::Minor,
            "Back-to-back",
            "Tired legs on the second night".to_string(),
            true,
        ));
    }

    if miss_margin.abs() <= NARROW_MISS {
        let severity = if causes.is_empty() {
            CauseSeverity::Primary
        } else {
            CauseSeverity::Minor
        };
        causes.push(AutopsyCause::new(
            CauseKind::Variance,
            severity,
            "Narrow miss",
            format!("Missed by {}", round_to(miss_margin, 1)),
            false,
        ));
    }

    if let (Some(open), Some(close)) = (input.opening_line, input.closing_line) {
        let against = match input.direction {
            BetDirection::Over => open - close,
            BetDirection::Under => close - open,
        };
        if against >= SHARP_MOVE {
            causes.push(AutopsyCause::new(
                CauseKind::SharpLine,
                CauseSeverity::Contributing,
                "Sharp line movement",
                format!("Line moved {} -> {} against the pick", open, close),
                true,
            ));
        }
    }

    if input.convergence_score < WEAK_SIGNAL {
        causes.push(AutopsyCause::new(
            CauseKind::WeakSignal,
            CauseSeverity::Contributing,
            "Weak signal",
            format!(
                "Only {}/{} factors agreed",
                input.convergence_score, FACTOR_COUNT
            ),
            true,
        ));
    }

    if causes.is_empty() {
        causes.push(AutopsyCause::new(
            CauseKind::Regression,
            CauseSeverity::Primary,
            "Regression",
            "No specific cause - normal game-to-game variance".to_string(),
            false,
        ));
    }

    if !causes.iter().any(|c| c.severity == CauseSeverity::Primary) {
        causes[0].severity = CauseSeverity::Primary;
    }

    causes
}

fn unluck_score(miss_margin: f64, convergence: u8, causes: &[AutopsyCause]) -> u8 {
    let mut score: i32 = 50;

    let m = miss_margin.abs();
    score += if m <= 0.5 {
        30
    } else if m <= 1.0 {
        20
    } else if m <= NARROW_MISS {
        10
    } else if m > 5.0 {
        -10
    } else {
        0
    };

    score += if convergence >= 6 {
        15
    } else if convergence >= 5 {
        10
    } else if convergence <= 2 {
        -15
    } else if convergence <= 3 {
        -10
    } else {
        0
    };

    score += 5 * causes.iter().filter(|c| !c.was_knowable).count() as i32;
    score.clamp(0, 100) as u8
}

/// Base grade from convergence, one letter lower per avoidable cause.
/// Convergence under 3 is always an F.
fn process_grade(convergence: u8, knowable_causes: usize) -> ProcessGrade {
    if convergence < 3 {
        return ProcessGrade::F;
    }
    let base = match convergence {
        c if c >= 6 => ProcessGrade::A,
        5 => ProcessGrade::B,
        4 => ProcessGrade::C,
        _ => ProcessGrade::D,
    };
    let degraded = (base.rank() as usize + knowable_causes).min(ProcessGrade::D.rank() as usize);
    ProcessGrade::from_rank(degraded as u8)
}

/// Explain a missed prop and grade the decision behind it.
pub fn generate_autopsy(input: &AutopsyInput) -> BetAutopsy {
    let miss_margin = input.direction.miss_margin(input.actual, input.line);
    let causes = classify_causes(input, miss_margin);

    let knowable = causes.iter().filter(|c| c.was_knowable).count();
    let external = causes
        .iter()
        .any(|c| matches!(c.kind, CauseKind::Blowout | CauseKind::InGameInjury));

    let was_unlucky =
        (miss_margin.abs() <= NARROW_MISS && input.convergence_score >= 5) || external;
    let unluck_score = unluck_score(miss_margin, input.convergence_score, &causes);
    let process_grade = process_grade(input.convergence_score, knowable);
    let would_bet_again = process_grade <= ProcessGrade::B || unluck_score >= 60;

    let primary = causes
        .iter()
        .find(|c| c.severity == CauseSeverity::Primary)
        .map(|c| c.label.as_str())
        .unwrap_or("Regression");
    let summary = format!(
        "{} {} {} finished at {} ({}). Process grade {}, unluck {}/100{}",
        match input.direction {
            BetDirection::Over => "Over",
            BetDirection::Under => "Under",
        },
        input.line,
        input.stat_key,
        input.actual,
        primary,
        process_grade,
        unluck_score,
        if would_bet_again { " - bet it again." } else { "." }
    );

    BetAutopsy {
        stat_key: input.stat_key.clone(),
        line: input.line,
        actual: input.actual,
        direction: input.direction,
        miss_margin: round_to(miss_margin, 2),
        causes,
        was_unlucky,
        unluck_score,
        process_grade,
        would_bet_again,
        summary,
    }
}
