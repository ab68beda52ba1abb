//! HeatCheck Core - sports prop analytics engine.
//!
//! This module provides:
//! - Statistics primitives and prop spectrum (KDE) for display
//! - Hit-rate and streak evaluation across player pools
//! - Multi-factor convergence scoring and prop verdicts
//! - Custom filter evaluation and historical backtesting
//! - Post-game bet autopsy
//! - Community strategy ranking, leaderboards and publishing validation
//! - Provider game-log normalization and an injectable-clock TTL cache
//!
//! Everything here is in-process computation; persistence and HTTP live in
//! the calling service.

pub mod autopsy;
pub mod backtest;
pub mod cache;
pub mod community;
pub mod config;
pub mod convergence;
pub mod error;
pub mod filters;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod stats;
pub mod streaks;
pub mod utils;

use rayon::prelude::*;

pub use autopsy::{generate_autopsy, AutopsyInput, BetAutopsy, ProcessGrade};
pub use backtest::{run_backtest, BacktestOptions, BacktestResult, SampleSize};
pub use community::{
    build_leaderboard, publish_strategy, sort_strategies, validate_for_publishing,
    CommunityLeaderboard, PublishValidation, StrategySort,
};
pub use config::EngineConfig;
pub use convergence::{check_prop, PropCheckRequest, PropCheckResult, Verdict};
pub use error::{EngineError, Result};
pub use models::*;
pub use streaks::{evaluate_hit_rate, track_streaks, HitRateResult, PlayerStreak, StreakQuery};

/// Evaluate many props in parallel (a slate of games).
///
/// Output order matches input order.
pub fn batch_check_props(
    requests: &[PropCheckRequest],
    config: &config::ConvergenceConfig,
) -> Vec<PropCheckResult> {
    requests
        .par_iter()
        .map(|request| check_prop(request, config))
        .collect()
}

/// Backtest several filters against one corpus in parallel.
pub fn batch_backtest(
    filters: &[CustomFilter],
    corpus: &[EnrichedGameLog],
    options: &BacktestOptions,
) -> Vec<BacktestResult> {
    filters
        .par_iter()
        .map(|filter| run_backtest(filter, corpus, options))
        .collect()
}
