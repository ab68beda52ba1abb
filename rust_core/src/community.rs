//! Community strategy library ranking.
//!
//! This module provides:
//! - Leaderboard sorts (hot, rising, top ROI, most followed, newest)
//! - Dense 1-based leaderboard ranks
//! - Author reputation points
//! - Publishing validation
//!
//! Sorting never mutates its input. `now` is passed in so results are a pure
//! function of the arguments.

use crate::config::{PublishingRules, RankingConfig};
use crate::error::{EngineError, Result};
use crate::filters::registry::lookup_field;
use crate::models::{PublicStrategy, StrategyDraft};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySort {
    #[default]
    Hot,
    Rising,
    TopRoi,
    MostFollowed,
    Newest,
}

fn age_hours(strategy: &PublicStrategy, now: DateTime<Utc>) -> f64 {
    ((now - strategy.published_at).num_seconds() as f64 / 3600.0).max(0.0)
}

/// Engagement plus live performance, decayed by age.
pub fn hot_score(strategy: &PublicStrategy, now: DateTime<Utc>, config: &RankingConfig) -> f64 {
    let live = &strategy.live_performance;
    let performance_bonus = if live.games >= config.min_live_games {
        (live.roi * 100.0).max(0.0)
    } else {
        0.0
    };
    let engagement = strategy.vote_score as f64 * config.vote_weight
        + strategy.follower_count as f64 * config.follower_weight
        + strategy.comment_count as f64 * config.comment_weight
        + performance_bonus;

    let age = age_hours(strategy, now) + config.hot_age_offset_hours;
    engagement / age.powf(config.hot_decay_exponent)
}

/// Votes and followers per day of age; zero once past the rising window.
pub fn rising_score(strategy: &PublicStrategy, now: DateTime<Utc>, config: &RankingConfig) -> f64 {
    let age_days = age_hours(strategy, now) / 24.0;
    if age_days > config.rising_window_days {
        return 0.0;
    }
    (strategy.vote_score as f64 + strategy.follower_count as f64) / age_days.max(1.0)
}

fn sort_score(
    strategy: &PublicStrategy,
    sort: StrategySort,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> f64 {
    match sort {
        StrategySort::Hot => hot_score(strategy, now, config),
        StrategySort::Rising => rising_score(strategy, now, config),
        StrategySort::TopRoi => strategy.live_performance.roi,
        StrategySort::MostFollowed => strategy.follower_count as f64,
        StrategySort::Newest => strategy.published_at.timestamp() as f64,
    }
}

/// Newer first, then id, so equal scores order deterministically
fn tie_break(a: &PublicStrategy, b: &PublicStrategy) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn scored(
    strategies: &[PublicStrategy],
    sort: StrategySort,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> Vec<(f64, PublicStrategy)> {
    let mut scored: Vec<(f64, PublicStrategy)> = strategies
        .iter()
        .filter(|s| {
            sort != StrategySort::TopRoi || s.live_performance.games >= config.min_live_games
        })
        .map(|s| (sort_score(s, sort, now, config), s.clone()))
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| tie_break(a, b)));
    scored
}

/// Sorted copy of `strategies`.
///
/// `TopRoi` drops strategies with too few live games to have a meaningful ROI.
pub fn sort_strategies(
    strategies: &[PublicStrategy],
    sort: StrategySort,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> Vec<PublicStrategy> {
    scored(strategies, sort, now, config)
        .into_iter()
        .map(|(_, s)| s)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based, dense
    pub rank: usize,
    pub score: f64,
    pub strategy: PublicStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityLeaderboard {
    pub sort: StrategySort,
    pub entries: Vec<LeaderboardEntry>,
    /// Strategies eligible for this sort before the limit was applied
    pub total_eligible: usize,
    pub generated_at: DateTime<Utc>,
}

/// Top `limit` strategies (config default when `None`) with ranks 1..=n.
pub fn build_leaderboard(
    strategies: &[PublicStrategy],
    sort: StrategySort,
    limit: Option<usize>,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> CommunityLeaderboard {
    let limit = limit.unwrap_or(config.leaderboard_limit);
    let ranked = scored(strategies, sort, now, config);
    let total_eligible = ranked.len();

    let entries = ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (score, strategy))| LeaderboardEntry {
            rank: i + 1,
            score,
            strategy,
        })
        .collect();

    CommunityLeaderboard {
        sort,
        entries,
        total_eligible,
        generated_at: now,
    }
}

// ============================================================================
// Reputation
// ============================================================================

const VOTE_POINTS: i64 = 2;
const FOLLOWER_POINTS: i64 = 3;
const PROFITABLE_LIVE_BONUS: i64 = 50;
const PROFITABLE_LIVE_MIN_GAMES: u32 = 20;
const DEEP_BACKTEST_BONUS: i64 = 20;
const DEEP_BACKTEST_MIN_GAMES: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationTier {
    Rookie,
    Sharp,
    Pro,
    Legend,
}

impl ReputationTier {
    pub fn from_points(points: i64) -> Self {
        match points {
            p if p >= 2000 => ReputationTier::Legend,
            p if p >= 500 => ReputationTier::Pro,
            p if p >= 100 => ReputationTier::Sharp,
            _ => ReputationTier::Rookie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorReputation {
    pub author_id: String,
    pub points: i64,
    pub strategies_published: usize,
    pub tier: ReputationTier,
}

/// Additive reputation over an author's published strategies.
pub fn compute_reputation(author_id: &str, strategies: &[PublicStrategy]) -> AuthorReputation {
    let mine: Vec<&PublicStrategy> = strategies
        .iter()
        .filter(|s| s.author_id == author_id)
        .collect();

    let points = mine
        .iter()
        .map(|s| {
            let live = &s.live_performance;
            let mut p =
                s.vote_score as i64 * VOTE_POINTS + s.follower_count as i64 * FOLLOWER_POINTS;
            if live.games >= PROFITABLE_LIVE_MIN_GAMES && live.is_profitable() {
                p += PROFITABLE_LIVE_BONUS;
            }
            if s.backtest.games >= DEEP_BACKTEST_MIN_GAMES {
                p += DEEP_BACKTEST_BONUS;
            }
            p
        })
        .sum();

    AuthorReputation {
        author_id: author_id.to_string(),
        points,
        strategies_published: mine.len(),
        tier: ReputationTier::from_points(points),
    }
}

// ============================================================================
// Publishing
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishValidation {
    pub valid: bool,
    /// Blocking problems
    pub errors: Vec<String>,
    /// Shown to the author but don't block
    pub warnings: Vec<String>,
}

/// Check a draft against the publishing rules.
pub fn validate_for_publishing(
    draft: &StrategyDraft,
    rules: &PublishingRules,
) -> PublishValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let name = draft.name.trim();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.chars().count() > rules.max_name_len {
        errors.push(format!("Name must be {} characters or fewer", rules.max_name_len));
    }

    if draft.description.trim().chars().count() < rules.min_description_len {
        errors.push(format!(
            "Description must be at least {} characters",
            rules.min_description_len
        ));
    }

    if draft.sport.is_none() {
        errors.push("Sport is required".to_string());
    }

    if draft.conditions.is_empty() {
        errors.push("At least one filter condition is required".to_string());
    }
    for condition in &draft.conditions {
        if lookup_field(&condition.field).is_none() {
            errors.push(format!("Unknown filter field: {}", condition.field));
        }
    }

    if draft.tags.len() < rules.min_tags || draft.tags.len() > rules.max_tags {
        errors.push(format!(
            "Between {} and {} tags are required",
            rules.min_tags, rules.max_tags
        ));
    }

    match draft.backtest {
        None => errors.push(format!(
            "Run a backtest with at least {} games before publishing",
            rules.min_backtest_games
        )),
        Some(ref bt) if bt.games < rules.min_backtest_games => errors.push(format!(
            "Backtest must cover at least {} games (has {})",
            rules.min_backtest_games, bt.games
        )),
        Some(ref bt) => {
            if bt.games < rules.warn_backtest_games {
                warnings.push(format!(
                    "Small sample: {} games. Results may not hold up",
                    bt.games
                ));
            }
            if bt.hit_rate < rules.warn_hit_rate {
                warnings.push(format!(
                    "Hit rate {:.1}% is below break-even territory",
                    bt.hit_rate * 100.0
                ));
            }
        }
    }

    PublishValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Create a public strategy from a draft that passes validation.
pub fn publish_strategy(
    draft: StrategyDraft,
    author_id: &str,
    now: DateTime<Utc>,
    rules: &PublishingRules,
) -> Result<PublicStrategy> {
    let validation = validate_for_publishing(&draft, rules);
    if !validation.valid {
        return Err(EngineError::PublishRejected(validation.errors));
    }
    let (sport, backtest) = match (draft.sport, draft.backtest) {
        (Some(sport), Some(backtest)) => (sport, backtest),
        _ => return Err(EngineError::PublishRejected(vec!["Incomplete draft".to_string()])),
    };

    let strategy = PublicStrategy {
        id: Uuid::new_v4(),
        author_id: author_id.to_string(),
        name: draft.name.trim().to_string(),
        description: draft.description.trim().to_string(),
        sport,
        tags: draft.tags,
        conditions: draft.conditions,
        backtest,
        live_performance: Default::default(),
        follower_count: 0,
        fork_count: 0,
        vote_score: 0,
        comment_count: 0,
        published_at: now,
    };
    info!("Published strategy '{}' ({}) by {}", strategy.name, strategy.id, author_id);
    Ok(strategy)
}
