//! Multi-factor convergence scoring for player props.
//!
//! Seven independent rules each look at one angle of a prop (recent form,
//! season average, matchup, rest, venue, weather, head-to-head) and emit an
//! over/under/neutral signal with a plain-English detail. The verdict is a
//! majority vote over the non-neutral signals.

use crate::config::ConvergenceConfig;
use crate::models::{GameLogEntry, MatchupContext, Sport};
use crate::stats::{mean, prop_spectrum, PropSpectrum};
use crate::streaks::{evaluate_hit_rate, HitRateResult};
use crate::utils::round_to;
use serde::{Deserialize, Serialize};

/// Number of factors every evaluation produces
pub const FACTOR_COUNT: usize = 7;

/// Minimum games in a home/away split before it is trusted
const MIN_SPLIT_GAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Over,
    Under,
    Neutral,
}

/// One scored signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceFactor {
    pub key: String,
    pub label: String,
    pub signal: Signal,
    /// 0..=1
    pub strength: f64,
    pub detail: String,
}

impl ConvergenceFactor {
    fn new(
        key: &'static str,
        label: &'static str,
        signal: Signal,
        strength: f64,
        detail: String,
    ) -> Self {
        let strength = if signal == Signal::Neutral {
            0.0
        } else {
            round_to(strength.clamp(0.0, 1.0), 3)
        };
        Self {
            key: key.to_string(),
            label: label.to_string(),
            signal,
            strength,
            detail,
        }
    }

    fn neutral(key: &'static str, label: &'static str, detail: &str) -> Self {
        Self::new(key, label, Signal::Neutral, 0.0, detail.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictDirection {
    #[serde(rename = "over")]
    Over,
    #[serde(rename = "under")]
    Under,
    #[serde(rename = "toss-up")]
    TossUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStrength {
    Strong,
    Lean,
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub direction: VerdictDirection,
    /// Factors agreeing with `direction` (0 for a toss-up)
    pub convergence_score: usize,
    pub total_factors: usize,
    pub over_count: usize,
    pub under_count: usize,
    pub neutral_count: usize,
    /// 0..=100
    pub confidence: f64,
    pub strength: VerdictStrength,
}

/// Everything needed to evaluate one prop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropCheckRequest {
    pub sport: Sport,
    pub stat_key: String,
    pub line: f64,
    /// Season game log, newest first
    pub games: Vec<GameLogEntry>,
    #[serde(default)]
    pub context: MatchupContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropCheckResult {
    pub stat_key: String,
    pub line: f64,
    pub last5: HitRateResult,
    pub last10: HitRateResult,
    pub season: HitRateResult,
    pub convergence: Vec<ConvergenceFactor>,
    pub verdict: Verdict,
    pub spectrum: PropSpectrum,
}

// ============================================================================
// Factor rules
// ============================================================================

/// Signal from an average relative to the line with a neutral band
fn average_signal(avg: f64, line: f64, margin_pct: f64) -> (Signal, f64) {
    let band = line.abs().max(1.0) * margin_pct;
    let diff = avg - line;
    let strength = diff.abs() / line.abs().max(1.0);
    if diff > band {
        (Signal::Over, strength)
    } else if diff < -band {
        (Signal::Under, strength)
    } else {
        (Signal::Neutral, 0.0)
    }
}

fn recent_form_factor(l10: &HitRateResult, config: &ConvergenceConfig) -> ConvergenceFactor {
    const KEY: &str = "recent_form";
    const LABEL: &str = "Recent form (L10)";
    if l10.window_games == 0 {
        return ConvergenceFactor::neutral(KEY, LABEL, "No recent games logged");
    }
    let detail = format!(
        "Cleared {} in {} of the last {} games ({:.0}%)",
        l10.threshold,
        l10.hit_count,
        l10.window_games,
        l10.hit_rate * 100.0
    );
    if l10.hit_rate >= config.hit_rate_over {
        ConvergenceFactor::new(KEY, LABEL, Signal::Over, l10.hit_rate, detail)
    } else if l10.hit_rate <= config.hit_rate_under {
        ConvergenceFactor::new(KEY, LABEL, Signal::Under, 1.0 - l10.hit_rate, detail)
    } else {
        ConvergenceFactor::new(KEY, LABEL, Signal::Neutral, 0.0, detail)
    }
}

fn season_average_factor(
    season: &HitRateResult,
    line: f64,
    config: &ConvergenceConfig,
) -> ConvergenceFactor {
    const KEY: &str = "season_average";
    const LABEL: &str = "Season average";
    if season.window_games == 0 {
        return ConvergenceFactor::neutral(KEY, LABEL, "No season history");
    }
    let (signal, strength) = average_signal(season.season_avg, line, config.average_margin_pct);
    let detail = format!(
        "Averaging {:.1} over {} games vs a line of {}",
        season.season_avg, season.window_games, line
    );
    ConvergenceFactor::new(KEY, LABEL, signal, strength, detail)
}

fn matchup_factor(sport: Sport, context: &MatchupContext) -> ConvergenceFactor {
    const KEY: &str = "matchup";
    const LABEL: &str = "Opponent defense";
    let rank = match context.opponent_def_rank {
        Some(r) if r > 0 => r,
        _ => {
            return ConvergenceFactor::neutral(KEY, LABEL, "Defensive rank unavailable");
        }
    };
    let teams = sport.team_count() as f64;
    let quartile = teams / 4.0;
    let r = rank as f64;

    if r > teams - quartile {
        // bottom quartile: 1.0 for the very worst defense
        let strength = 0.5 + 0.5 * (r - (teams - quartile)) / quartile;
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Over,
            strength,
            format!(
                "{} rank {} of {} defensively (bottom quartile)",
                context.opponent, rank, teams
            ),
        )
    } else if r <= quartile {
        let strength = 0.5 + 0.5 * (quartile - r + 1.0) / quartile;
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Under,
            strength,
            format!("{} rank {} of {} defensively (top quartile)", context.opponent, rank, teams),
        )
    } else {
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Neutral,
            0.0,
            format!(
                "{} rank {} of {} defensively (middle of the pack)",
                context.opponent, rank, teams
            ),
        )
    }
}

fn rest_factor(context: &MatchupContext) -> ConvergenceFactor {
    const KEY: &str = "rest";
    const LABEL: &str = "Rest";
    if context.is_back_to_back || context.rest_days == Some(0) {
        return ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Under,
            0.6,
            "Second night of a back-to-back".to_string(),
        );
    }
    match context.rest_days {
        Some(days) if days >= 3 => ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Over,
            0.4,
            format!("{} days of rest", days),
        ),
        Some(days) => ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Neutral,
            0.0,
            format!("Normal rest ({} days)", days),
        ),
        None => ConvergenceFactor::neutral(KEY, LABEL, "Rest days unknown"),
    }
}

fn venue_factor(
    games: &[GameLogEntry],
    stat_key: &str,
    line: f64,
    context: &MatchupContext,
    config: &ConvergenceConfig,
) -> ConvergenceFactor {
    const KEY: &str = "venue";
    const LABEL: &str = "Home/away split";
    let venue = if context.is_home { "home" } else { "away" };
    let split: Vec<f64> = games
        .iter()
        .filter(|g| g.is_home == context.is_home)
        .map(|g| g.stat_or_zero(stat_key))
        .collect();

    if split.len() < MIN_SPLIT_GAMES {
        return ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Neutral,
            0.0,
            format!("Only {} {} games logged", split.len(), venue),
        );
    }
    let avg = mean(&split);
    let (signal, strength) = average_signal(avg, line, config.average_margin_pct);
    ConvergenceFactor::new(
        KEY,
        LABEL,
        signal,
        strength,
        format!("Averaging {:.1} in {} {} games", avg, split.len(), venue),
    )
}

fn weather_factor(
    sport: Sport,
    context: &MatchupContext,
    config: &ConvergenceConfig,
) -> ConvergenceFactor {
    const KEY: &str = "weather";
    const LABEL: &str = "Weather";
    if !sport.weather_sensitive() {
        return ConvergenceFactor::neutral(KEY, LABEL, "Indoor sport");
    }
    let weather = match context.weather {
        Some(ref w) if !w.indoor => w,
        Some(_) => {
            return ConvergenceFactor::neutral(KEY, LABEL, "Dome / roof closed");
        }
        None => {
            return ConvergenceFactor::neutral(KEY, LABEL, "No forecast available");
        }
    };

    if weather.wind_mph >= config.high_wind_mph {
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Under,
            weather.wind_mph / 30.0,
            format!("{:.0} mph wind", weather.wind_mph),
        )
    } else if weather.precipitation {
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Under,
            0.4,
            "Rain or snow in the forecast".to_string(),
        )
    } else if weather.temperature_f <= config.cold_temp_f {
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Under,
            0.5,
            format!("Cold: {:.0}°F", weather.temperature_f),
        )
    } else if sport == Sport::MLB && weather.temperature_f >= config.hot_temp_f {
        // warm air carries the ball
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Over,
            0.5,
            format!("Hot: {:.0}°F", weather.temperature_f),
        )
    } else {
        ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Neutral,
            0.0,
            format!("{:.0}°F, {:.0} mph wind", weather.temperature_f, weather.wind_mph),
        )
    }
}

fn h2h_factor(
    games: &[GameLogEntry],
    stat_key: &str,
    line: f64,
    context: &MatchupContext,
    config: &ConvergenceConfig,
) -> ConvergenceFactor {
    const KEY: &str = "h2h";
    const LABEL: &str = "Head-to-head";
    let meetings: Vec<f64> = games
        .iter()
        .filter(|g| {
            !context.opponent.is_empty() && g.opponent.eq_ignore_ascii_case(&context.opponent)
        })
        .map(|g| g.stat_or_zero(stat_key))
        .collect();

    if meetings.len() < config.min_h2h_games {
        return ConvergenceFactor::new(
            KEY,
            LABEL,
            Signal::Neutral,
            0.0,
            format!("{} prior games vs {}", meetings.len(), context.opponent),
        );
    }
    let avg = mean(&meetings);
    let (signal, strength) = average_signal(avg, line, config.average_margin_pct);
    ConvergenceFactor::new(
        KEY,
        LABEL,
        signal,
        strength,
        format!("Averaging {:.1} in {} games vs {}", avg, meetings.len(), context.opponent),
    )
}

// ============================================================================
// Verdict
// ============================================================================

/// Evaluate all factors in their fixed order.
pub fn evaluate_factors(
    request: &PropCheckRequest,
    config: &ConvergenceConfig,
) -> Vec<ConvergenceFactor> {
    let l10 = evaluate_hit_rate(&request.games, &request.stat_key, request.line, 10);
    let season = evaluate_hit_rate(
        &request.games,
        &request.stat_key,
        request.line,
        request.games.len(),
    );
    let ctx = &request.context;

    vec![
        recent_form_factor(&l10, config),
        season_average_factor(&season, request.line, config),
        matchup_factor(request.sport, ctx),
        rest_factor(ctx),
        venue_factor(&request.games, &request.stat_key, request.line, ctx, config),
        weather_factor(request.sport, ctx, config),
        h2h_factor(&request.games, &request.stat_key, request.line, ctx, config),
    ]
}

/// Combine factors into a verdict.
///
/// `recent_hit_rate` supplies the magnitude term: how far recent form sits
/// from a coin flip, counted only when it leans the verdict's way.
pub fn score_convergence(factors: &[ConvergenceFactor], recent_hit_rate: f64) -> Verdict {
    let over_count = factors.iter().filter(|f| f.signal == Signal::Over).count();
    let under_count = factors.iter().filter(|f| f.signal == Signal::Under).count();
    let neutral_count = factors.len() - over_count - under_count;

    let (direction, convergence_score) = if over_count > under_count {
        (VerdictDirection::Over, over_count)
    } else if under_count > over_count {
        (VerdictDirection::Under, under_count)
    } else {
        (VerdictDirection::TossUp, 0)
    };

    let magnitude = match direction {
        VerdictDirection::Over => ((recent_hit_rate - 0.5) * 2.0).max(0.0),
        VerdictDirection::Under => ((0.5 - recent_hit_rate) * 2.0).max(0.0),
        VerdictDirection::TossUp => 0.0,
    };
    let agreement = if factors.is_empty() {
        0.0
    } else {
        convergence_score as f64 / factors.len() as f64
    };
    let confidence = round_to((agreement * 70.0 + magnitude.min(1.0) * 30.0).clamp(0.0, 100.0), 1);

    let strength = match direction {
        VerdictDirection::TossUp => VerdictStrength::Pass,
        _ if convergence_score >= 5 && confidence >= 60.0 => VerdictStrength::Strong,
        _ if convergence_score >= 3 => VerdictStrength::Lean,
        _ => VerdictStrength::Pass,
    };

    Verdict {
        direction,
        convergence_score,
        total_factors: factors.len(),
        over_count,
        under_count,
        neutral_count,
        confidence,
        strength,
    }
}

/// Full prop check: hit-rate windows, factors, verdict and spectrum.
pub fn check_prop(request: &PropCheckRequest, config: &ConvergenceConfig) -> PropCheckResult {
    let last5 = evaluate_hit_rate(&request.games, &request.stat_key, request.line, 5);
    let last10 = evaluate_hit_rate(&request.games, &request.stat_key, request.line, 10);
    let season = evaluate_hit_rate(
        &request.games,
        &request.stat_key,
        request.line,
        request.games.len(),
    );

    let factors = evaluate_factors(request, config);
    let verdict = score_convergence(&factors, last10.hit_rate);

    let values: Vec<f64> = request
        .games
        .iter()
        .map(|g| g.stat_or_zero(&request.stat_key))
        .collect();

    PropCheckResult {
        stat_key: request.stat_key.clone(),
        line: request.line,
        last5,
        last10,
        season,
        convergence: factors,
        verdict,
        spectrum: prop_spectrum(&values, request.line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherConditions;
    use chrono::NaiveDate;

    fn games(values: &[f64], opponent: &str) -> Vec<GameLogEntry> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let date = start - chrono::Duration::days(i as i64 * 2);
                let mut g = GameLogEntry::new(date, opponent).with_stat("pts", *v);
                g.is_home = i % 2 == 0;
                g
            })
            .collect()
    }

    fn request(values: &[f64], line: f64, context: MatchupContext) -> PropCheckRequest {
        PropCheckRequest {
            sport: Sport::NBA,
            stat_key: "pts".to_string(),
            line,
            games: games(values, "BOS"),
            context,
        }
    }

    #[test]
    fn test_always_seven_factors_and_counts_conserved() {
        let req = request(&[], 20.5, MatchupContext::default());
        let result = check_prop(&req, &ConvergenceConfig::default());
        assert_eq!(result.convergence.len(), FACTOR_COUNT);
        let v = &result.verdict;
        assert_eq!(v.over_count + v.under_count + v.neutral_count, FACTOR_COUNT);
        assert_eq!(v.direction, VerdictDirection::TossUp);
        assert_eq!(v.convergence_score, 0);
        assert_eq!(v.confidence, 0.0);
    }

    #[test]
    fn test_hot_scorer_soft_matchup_converges_over() {
        let context = MatchupContext {
            opponent: "BOS".to_string(),
            opponent_def_rank: Some(29),
            rest_days: Some(3),
            is_home: true,
            ..Default::default()
        };
        let values = [31.0, 28.0, 30.0, 27.0, 33.0, 29.0, 26.0, 32.0, 30.0, 28.0];
        let req = request(&values, 24.5, context);
        let result = check_prop(&req, &ConvergenceConfig::default());

        let v = &result.verdict;
        assert_eq!(v.direction, VerdictDirection::Over);
        // recent form, season avg, matchup, rest, venue, h2h all over; NBA weather neutral
        assert_eq!(v.convergence_score, 6);
        assert_eq!(v.under_count, 0);
        assert!(v.confidence > 80.0, "confidence {:.1}", v.confidence);
        assert_eq!(v.strength, VerdictStrength::Strong);
        assert!(v.convergence_score <= v.total_factors);
    }

    #[test]
    fn test_back_to_back_is_under_signal() {
        let context = MatchupContext {
            is_back_to_back: true,
            ..Default::default()
        };
        let f = rest_factor(&context);
        assert_eq!(f.signal, Signal::Under);
        assert!(!f.detail.is_empty());
    }

    #[test]
    fn test_tie_resolves_to_toss_up() {
        let factors = vec![
            ConvergenceFactor::new("a", "A", Signal::Over, 0.7, String::new()),
            ConvergenceFactor::new("b", "B", Signal::Under, 0.7, String::new()),
            ConvergenceFactor::new("c", "C", Signal::Neutral, 0.9, String::new()),
        ];
        let v = score_convergence(&factors, 0.9);
        assert_eq!(v.direction, VerdictDirection::TossUp);
        assert_eq!(v.strength, VerdictStrength::Pass);
        // neutral factors carry no strength
        assert_eq!(factors[2].strength, 0.0);
    }

    #[test]
    fn test_matchup_quartiles() {
        let mut ctx = MatchupContext {
            opponent: "MIA".to_string(),
            opponent_def_rank: Some(3),
            ..Default::default()
        };
        assert_eq!(matchup_factor(Sport::NBA, &ctx).signal, Signal::Under);
        ctx.opponent_def_rank = Some(15);
        assert_eq!(matchup_factor(Sport::NBA, &ctx).signal, Signal::Neutral);
        ctx.opponent_def_rank = Some(30);
        let f = matchup_factor(Sport::NBA, &ctx);
        assert_eq!(f.signal, Signal::Over);
        assert_eq!(f.strength, 1.0);
    }

    #[test]
    fn test_weather_only_outdoors() {
        let config = ConvergenceConfig::default();
        let windy = MatchupContext {
            weather: Some(WeatherConditions {
                temperature_f: 60.0,
                wind_mph: 22.0,
                precipitation: false,
                indoor: false,
            }),
            ..Default::default()
        };
        assert_eq!(weather_factor(Sport::NFL, &windy, &config).signal, Signal::Under);
        assert_eq!(weather_factor(Sport::NBA, &windy, &config).signal, Signal::Neutral);

        let mut dome = windy.clone();
        if let Some(ref mut w) = dome.weather {
            w.indoor = true;
        }
        assert_eq!(weather_factor(Sport::NFL, &dome, &config).signal, Signal::Neutral);
    }

    #[test]
    fn test_check_prop_is_idempotent() {
        let req = request(&[22.0, 18.0, 25.0, 30.0, 12.0], 20.5, MatchupContext::default());
        let config = ConvergenceConfig::default();
        assert_eq!(check_prop(&req, &config), check_prop(&req, &config));
    }
}
