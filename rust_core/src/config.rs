//! Tunable constants and environment loading for the analytics engine
//!
//! This module manages:
//! - Assumed bet price for backtests
//! - Sample-size classification thresholds
//! - Convergence factor thresholds
//! - Community ranking weights and decay
//! - Publishing rules

use crate::error::{EngineError, Result};
use std::env;
use std::str::FromStr;

/// Standard -110 juice on both sides of a prop
pub const DEFAULT_AMERICAN_ODDS: f64 = -110.0;

/// Hot score time-decay exponent (HN-style gravity)
pub const DEFAULT_HOT_DECAY_EXPONENT: f64 = 1.5;

/// Strategies need this many live games before ROI counts toward ranking
pub const DEFAULT_MIN_LIVE_GAMES: u32 = 10;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 25;

/// Read and parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsConfig {
    /// Price assumed for every simulated bet
    pub american_odds: f64,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            american_odds: DEFAULT_AMERICAN_ODDS,
        }
    }
}

/// Game-count boundaries for `SampleSize`.
///
/// `insufficient` < low_min <= `low` < moderate_min <= `moderate` < high_min <= `high`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSizeThresholds {
    pub low_min: u32,
    pub moderate_min: u32,
    pub high_min: u32,
}

impl Default for SampleSizeThresholds {
    fn default() -> Self {
        Self {
            low_min: 20,
            moderate_min: 50,
            high_min: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceConfig {
    /// L10 hit rate at or above this leans over
    pub hit_rate_over: f64,
    /// L10 hit rate at or below this leans under
    pub hit_rate_under: f64,
    /// Averages within this fraction of the line are neutral
    pub average_margin_pct: f64,
    /// Wind at or above this (mph) suppresses outdoor scoring
    pub high_wind_mph: f64,
    pub cold_temp_f: f64,
    pub hot_temp_f: f64,
    /// Minimum meetings before head-to-head history is trusted
    pub min_h2h_games: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            hit_rate_over: 0.60,
            hit_rate_under: 0.40,
            average_margin_pct: 0.05,
            high_wind_mph: 15.0,
            cold_temp_f: 40.0,
            hot_temp_f: 85.0,
            min_h2h_games: 2,
        }
    }
}

/// Community leaderboard weights. None of these are derived; they are tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub vote_weight: f64,
    pub follower_weight: f64,
    pub comment_weight: f64,
    pub hot_decay_exponent: f64,
    /// Added to age in hours before decay so brand-new posts don't divide by ~0
    pub hot_age_offset_hours: f64,
    pub rising_window_days: f64,
    pub min_live_games: u32,
    pub leaderboard_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            vote_weight: 2.0,
            follower_weight: 1.0,
            comment_weight: 0.5,
            hot_decay_exponent: DEFAULT_HOT_DECAY_EXPONENT,
            hot_age_offset_hours: 2.0,
            rising_window_days: 30.0,
            min_live_games: DEFAULT_MIN_LIVE_GAMES,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishingRules {
    pub max_name_len: usize,
    pub min_description_len: usize,
    pub min_tags: usize,
    pub max_tags: usize,
    pub min_backtest_games: u32,
    /// Below this the strategy publishes with a warning
    pub warn_backtest_games: u32,
    pub warn_hit_rate: f64,
}

impl Default for PublishingRules {
    fn default() -> Self {
        Self {
            max_name_len: 60,
            min_description_len: 20,
            min_tags: 1,
            max_tags: 5,
            min_backtest_games: 20,
            warn_backtest_games: 50,
            warn_hit_rate: 0.48,
        }
    }
}

/// All engine tunables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub odds: OddsConfig,
    pub sample_size: SampleSizeThresholds,
    pub convergence: ConvergenceConfig,
    pub ranking: RankingConfig,
    pub publishing: PublishingRules,
}

impl EngineConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Reads `.env` if present. Unset or unparseable values keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            odds: OddsConfig {
                american_odds: env_or("HEATCHECK_AMERICAN_ODDS", defaults.odds.american_odds),
            },
            sample_size: SampleSizeThresholds {
                low_min: env_or("HEATCHECK_SAMPLE_LOW_MIN", defaults.sample_size.low_min),
                moderate_min: env_or(
                    "HEATCHECK_SAMPLE_MODERATE_MIN",
                    defaults.sample_size.moderate_min,
                ),
                high_min: env_or("HEATCHECK_SAMPLE_HIGH_MIN", defaults.sample_size.high_min),
            },
            convergence: ConvergenceConfig {
                hit_rate_over: env_or(
                    "HEATCHECK_HIT_RATE_OVER",
                    defaults.convergence.hit_rate_over,
                ),
                hit_rate_under: env_or(
                    "HEATCHECK_HIT_RATE_UNDER",
                    defaults.convergence.hit_rate_under,
                ),
                ..defaults.convergence
            },
            ranking: RankingConfig {
                vote_weight: env_or("HEATCHECK_HOT_VOTE_WEIGHT", defaults.ranking.vote_weight),
                follower_weight: env_or(
                    "HEATCHECK_HOT_FOLLOWER_WEIGHT",
                    defaults.ranking.follower_weight,
                ),
                comment_weight: env_or(
                    "HEATCHECK_HOT_COMMENT_WEIGHT",
                    defaults.ranking.comment_weight,
                ),
                hot_decay_exponent: env_or(
                    "HEATCHECK_HOT_DECAY_EXPONENT",
                    defaults.ranking.hot_decay_exponent,
                ),
                leaderboard_limit: env_or(
                    "HEATCHECK_LEADERBOARD_LIMIT",
                    defaults.ranking.leaderboard_limit,
                ),
                ..defaults.ranking
            },
            publishing: defaults.publishing,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine's output meaningless
    pub fn validate(&self) -> Result<()> {
        crate::utils::odds::american_to_payout(self.odds.american_odds)?;

        let s = &self.sample_size;
        if !(s.low_min < s.moderate_min && s.moderate_min < s.high_min) {
            return Err(EngineError::Config(format!(
                "sample size thresholds must increase: {} < {} < {}",
                s.low_min, s.moderate_min, s.high_min
            )));
        }

        let c = &self.convergence;
        if !(0.0..=1.0).contains(&c.hit_rate_over)
            || !(0.0..=1.0).contains(&c.hit_rate_under)
            || c.hit_rate_under >= c.hit_rate_over
        {
            return Err(EngineError::Config(format!(
                "hit rate thresholds out of order: under {} / over {}",
                c.hit_rate_under, c.hit_rate_over
            )));
        }

        if self.ranking.hot_decay_exponent <= 0.0 {
            return Err(EngineError::Config(
                "hot decay exponent must be positive".to_string(),
            ));
        }
        if self.ranking.leaderboard_limit == 0 {
            return Err(EngineError::Config(
                "leaderboard limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
