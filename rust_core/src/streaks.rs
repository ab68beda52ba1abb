//! Hit-rate and streak evaluation.
//!
//! This module provides:
//! - Windowed hit flags, hit rate and current streak for one stat series
//! - Roster-wide streak tracking with rayon
//! - Display filtering and sorting applied after per-player computation
//!
//! Game slices are ordered newest-first. A stat the player did not log is
//! treated as 0 here: it counts as a miss and pulls averages down.

use crate::models::GameLogEntry;
use crate::stats::mean;
use crate::utils::round_to;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Windowed hit-rate summary for one player, stat and threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRateResult {
    pub stat_key: String,
    pub threshold: f64,
    /// Number of games actually in the window (may be less than requested)
    pub window_games: usize,
    /// One flag per windowed game, newest first
    pub hit_games: Vec<bool>,
    pub hit_count: usize,
    pub hit_rate: f64,
    pub consecutive_streak: usize,
    /// Longest run of hits anywhere in the window
    pub max_streak: usize,
    pub window_avg: f64,
    pub season_avg: f64,
}

/// Count of hits from the front of `flags` until the first miss
pub fn current_streak(flags: &[bool]) -> usize {
    flags.iter().take_while(|hit| **hit).count()
}

/// Longest consecutive run of hits
pub fn max_streak(flags: &[bool]) -> usize {
    let mut best = 0;
    let mut run = 0;
    for hit in flags {
        if *hit {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// Evaluate a newest-first game series against `threshold` over the last
/// `window` games. A hit is strictly greater than the threshold.
pub fn evaluate_hit_rate(
    games: &[GameLogEntry],
    stat_key: &str,
    threshold: f64,
    window: usize,
) -> HitRateResult {
    let season: Vec<f64> = games.iter().map(|g| g.stat_or_zero(stat_key)).collect();
    let windowed = &season[..window.min(season.len())];

    let hit_games: Vec<bool> = windowed.iter().map(|v| *v > threshold).collect();
    let hit_count = hit_games.iter().filter(|h| **h).count();
    let hit_rate = if windowed.is_empty() {
        0.0
    } else {
        hit_count as f64 / windowed.len() as f64
    };

    HitRateResult {
        stat_key: stat_key.to_string(),
        threshold,
        window_games: windowed.len(),
        consecutive_streak: current_streak(&hit_games),
        max_streak: max_streak(&hit_games),
        hit_count,
        hit_rate,
        window_avg: round_to(mean(windowed), 2),
        season_avg: round_to(mean(&season), 2),
        hit_games,
    }
}

// ============================================================================
// Roster streak tracker
// ============================================================================

/// A player's full game history for the current season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameSeries {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    /// Newest first
    pub games: Vec<GameLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStreak {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    #[serde(flatten)]
    pub result: HitRateResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakSort {
    #[default]
    Streak,
    HitRate,
    WindowAvg,
}

/// Display-time selection over computed streaks
#[derive(Debug, Clone, Default)]
pub struct StreakQuery {
    pub team: Option<String>,
    /// Case-insensitive substring of the player name
    pub search: Option<String>,
    /// Teams with a game today, any case; `None` disables the filter
    pub playing_today: Option<HashSet<String>>,
    pub min_streak: usize,
    pub sort: StreakSort,
}

impl StreakQuery {
    fn matches(&self, streak: &PlayerStreak) -> bool {
        if let Some(ref team) = self.team {
            if !streak.team.eq_ignore_ascii_case(team) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !streak.player_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(ref today) = self.playing_today {
            if !today.iter().any(|t| t.eq_ignore_ascii_case(&streak.team)) {
                return false;
            }
        }
        streak.result.consecutive_streak >= self.min_streak
    }
}

fn compare_streaks(a: &PlayerStreak, b: &PlayerStreak, sort: StreakSort) -> Ordering {
    let primary = match sort {
        StreakSort::Streak => b
            .result
            .consecutive_streak
            .cmp(&a.result.consecutive_streak)
            .then(b.result.hit_rate.total_cmp(&a.result.hit_rate)),
        StreakSort::HitRate => b
            .result
            .hit_rate
            .total_cmp(&a.result.hit_rate)
            .then(b.result.consecutive_streak.cmp(&a.result.consecutive_streak)),
        StreakSort::WindowAvg => b.result.window_avg.total_cmp(&a.result.window_avg),
    };
    primary
        .then_with(|| a.player_name.cmp(&b.player_name))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Compute every player's streak, then filter and sort for display.
///
/// Streaks are evaluated on each player's own full history before any
/// filter runs, so filtering never breaks streak continuity.
pub fn track_streaks(
    players: &[PlayerGameSeries],
    stat_key: &str,
    threshold: f64,
    window: usize,
    query: &StreakQuery,
) -> Vec<PlayerStreak> {
    let mut streaks: Vec<PlayerStreak> = players
        .par_iter()
        .map(|p| PlayerStreak {
            player_id: p.player_id.clone(),
            player_name: p.player_name.clone(),
            team: p.team.clone(),
            result: evaluate_hit_rate(&p.games, stat_key, threshold, window),
        })
        .collect();

    streaks.retain(|s| query.matches(s));
    streaks.sort_by(|a, b| compare_streaks(a, b, query.sort));
    streaks
}
