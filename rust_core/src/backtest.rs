//! Historical backtest of a custom filter.
//!
//! This module provides:
//! - Filter replay over an enriched game-log corpus
//! - Flat one-unit staking at a fixed assumed price
//! - Equity curve, ROI, max drawdown, Sharpe ratio and Kelly fraction
//! - Sample-size classification and per-season breakdown
//!
//! A filter that matches nothing yields an all-zero result, never an error.

use crate::config::{EngineConfig, SampleSizeThresholds, DEFAULT_AMERICAN_ODDS};
use crate::filters::registry::STAT_PREFIX;
use crate::filters::CompiledFilter;
use crate::models::{BacktestSnapshot, CustomFilter, EnrichedGameLog};
use crate::stats::{mean, standard_deviation};
use crate::utils::odds::{american_to_payout, kelly_fraction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSize {
    Insufficient,
    Low,
    Moderate,
    High,
}

impl SampleSize {
    pub fn classify(games: u32, thresholds: &SampleSizeThresholds) -> Self {
        if games < thresholds.low_min {
            SampleSize::Insufficient
        } else if games < thresholds.moderate_min {
            SampleSize::Low
        } else if games < thresholds.high_min {
            SampleSize::Moderate
        } else {
            SampleSize::High
        }
    }

    /// The UI warns users below `Moderate`
    pub fn needs_warning(&self) -> bool {
        matches!(self, SampleSize::Insufficient | SampleSize::Low)
    }
}

/// One resolved bet on the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    /// 1-based position in chronological order
    pub game_number: u32,
    pub date: NaiveDate,
    pub player_id: String,
    pub player_name: String,
    pub opponent: String,
    pub value: f64,
    pub hit: bool,
    /// Profit for this bet alone
    pub profit: f64,
    pub cumulative_profit: f64,
    pub cumulative_roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonBreakdown {
    pub season: u16,
    pub games: u32,
    pub hits: u32,
    pub hit_rate: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub filter_name: String,
    pub total_games: u32,
    pub hits: u32,
    pub misses: u32,
    pub hit_rate: f64,
    /// Net units won
    pub profit: f64,
    pub roi: f64,
    /// Largest peak-to-trough decline in units
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub kelly_fraction: f64,
    pub half_kelly: f64,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub sample_size: SampleSize,
    /// Profit per unit on a win at the assumed price
    pub payout: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub seasons: Vec<SeasonBreakdown>,
}

impl BacktestResult {
    fn empty(filter_name: &str, payout: f64) -> Self {
        Self {
            filter_name: filter_name.to_string(),
            total_games: 0,
            hits: 0,
            misses: 0,
            hit_rate: 0.0,
            profit: 0.0,
            roi: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
            kelly_fraction: 0.0,
            half_kelly: 0.0,
            longest_win_streak: 0,
            longest_loss_streak: 0,
            sample_size: SampleSize::Insufficient,
            payout,
            equity_curve: Vec::new(),
            seasons: Vec::new(),
        }
    }

    /// Figures cached on a published strategy
    pub fn snapshot(&self) -> BacktestSnapshot {
        BacktestSnapshot {
            games: self.total_games,
            hits: self.hits,
            hit_rate: self.hit_rate,
            roi: self.roi,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOptions {
    /// Price assumed for every bet
    pub american_odds: f64,
    /// Scale Sharpe by sqrt(periods) when set; per-bet scale otherwise
    pub annualize_periods: Option<f64>,
    pub sample_size: SampleSizeThresholds,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            american_odds: DEFAULT_AMERICAN_ODDS,
            annualize_periods: None,
            sample_size: SampleSizeThresholds::default(),
        }
    }
}

impl BacktestOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            american_odds: config.odds.american_odds,
            annualize_periods: None,
            sample_size: config.sample_size.clone(),
        }
    }

    fn payout(&self) -> f64 {
        match american_to_payout(self.american_odds) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}; falling back to {}", e, DEFAULT_AMERICAN_ODDS);
                100.0 / -DEFAULT_AMERICAN_ODDS
            }
        }
    }
}

/// Largest peak-to-trough decline of a cumulative series, starting from 0.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut worst = 0.0_f64;
    for value in cumulative {
        peak = peak.max(*value);
        worst = worst.max(peak - value);
    }
    worst
}

/// Mean per-bet return over its population standard deviation.
///
/// Zero when there are fewer than two bets or returns don't vary.
pub fn sharpe_ratio(returns: &[f64], annualize_periods: Option<f64>) -> f64 {
    let sd = standard_deviation(returns);
    if sd <= f64::EPSILON {
        return 0.0;
    }
    let per_bet = mean(returns) / sd;
    match annualize_periods {
        Some(periods) if periods > 0.0 => per_bet * periods.sqrt(),
        _ => per_bet,
    }
}

fn longest_runs(hits: &[bool]) -> (u32, u32) {
    let (mut win, mut loss) = (0u32, 0u32);
    let (mut best_win, mut best_loss) = (0u32, 0u32);
    for hit in hits {
        if *hit {
            win += 1;
            loss = 0;
        } else {
            loss += 1;
            win = 0;
        }
        best_win = best_win.max(win);
        best_loss = best_loss.max(loss);
    }
    (best_win, best_loss)
}

/// Replay `filter` over `corpus`.
///
/// A record counts when it is the filter's sport, passes every condition and
/// has the filter's stat logged; records missing the stat are skipped, not
/// counted as misses. Equity is accumulated in date order regardless of the
/// corpus order.
pub fn run_backtest(
    filter: &CustomFilter,
    corpus: &[EnrichedGameLog],
    options: &BacktestOptions,
) -> BacktestResult {
    let payout = options.payout();
    let compiled = CompiledFilter::new(&filter.conditions);
    let stat_key = filter
        .stat_key
        .strip_prefix(STAT_PREFIX)
        .unwrap_or(&filter.stat_key);

    let unknown = compiled.unknown_fields();
    if !unknown.is_empty() {
        warn!(
            "Filter '{}' references unknown fields {:?}; it will match nothing",
            filter.name, unknown
        );
    }

    let mut matched: Vec<(&EnrichedGameLog, f64)> = Vec::new();
    let mut missing_stat = 0usize;
    for record in corpus {
        if record.sport != filter.sport || !compiled.matches(record) {
            continue;
        }
        match record.game.stat(stat_key) {
            Some(value) => matched.push((record, value)),
            None => missing_stat += 1,
        }
    }
    if missing_stat > 0 {
        debug!(
            "Filter '{}': skipped {} matching records without '{}' logged",
            filter.name, missing_stat, stat_key
        );
    }

    if matched.is_empty() {
        info!("Backtest '{}': no matching games", filter.name);
        return BacktestResult::empty(&filter.name, payout);
    }

    // Chronological, ties broken by player for a stable curve
    matched.sort_by(|(a, _), (b, _)| {
        a.game
            .date
            .cmp(&b.game.date)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let mut equity_curve = Vec::with_capacity(matched.len());
    let mut returns = Vec::with_capacity(matched.len());
    let mut flags = Vec::with_capacity(matched.len());
    let mut seasons: BTreeMap<u16, (u32, u32, f64)> = BTreeMap::new();
    let mut cumulative = 0.0;

    for (i, (record, value)) in matched.iter().enumerate() {
        let hit = filter.direction.is_hit(*value, filter.line);
        let profit = if hit { payout } else { -1.0 };
        cumulative += profit;
        let wagered = (i + 1) as f64;

        let season = seasons.entry(record.season).or_insert((0, 0, 0.0));
        season.0 += 1;
        if hit {
            season.1 += 1;
        }
        season.2 += profit;

        returns.push(profit);
        flags.push(hit);
        equity_curve.push(EquityPoint {
            game_number: (i + 1) as u32,
            date: record.game.date,
            player_id: record.player_id.clone(),
            player_name: record.player_name.clone(),
            opponent: record.game.opponent.clone(),
            value: *value,
            hit,
            profit,
            cumulative_profit: cumulative,
            cumulative_roi: cumulative / wagered,
        });
    }

    let total_games = equity_curve.len() as u32;
    let hits = flags.iter().filter(|h| **h).count() as u32;
    let hit_rate = hits as f64 / total_games as f64;
    let cumulative_series: Vec<f64> = equity_curve.iter().map(|p| p.cumulative_profit).collect();
    let kelly = kelly_fraction(hit_rate, payout);
    let (longest_win_streak, longest_loss_streak) = longest_runs(&flags);

    let result = BacktestResult {
        filter_name: filter.name.clone(),
        total_games,
        hits,
        misses: total_games - hits,
        hit_rate,
        profit: cumulative,
        roi: cumulative / total_games as f64,
        max_drawdown: max_drawdown(&cumulative_series),
        sharpe_ratio: sharpe_ratio(&returns, options.annualize_periods),
        kelly_fraction: kelly,
        half_kelly: kelly / 2.0,
        longest_win_streak,
        longest_loss_streak,
        sample_size: SampleSize::classify(total_games, &options.sample_size),
        payout,
        equity_curve,
        seasons: seasons
            .into_iter()
            .map(|(season, (games, hits, profit))| SeasonBreakdown {
                season,
                games,
                hits,
                hit_rate: hits as f64 / games as f64,
                roi: profit / games as f64,
            })
            .collect(),
    };

    info!(
        "Backtest '{}': {} games, {:.1}% hit rate, ROI {:+.1}%, max DD {:.2}u ({:?} sample)",
        result.filter_name,
        result.total_games,
        result.hit_rate * 100.0,
        result.roi * 100.0,
        result.max_drawdown,
        result.sample_size
    );

    result
}
