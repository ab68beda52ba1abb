//! End-to-end scenarios across the engine's public API.

use anyhow::Result;
use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use heatcheck_core::autopsy::CauseKind;
use heatcheck_core::backtest::SampleSize;
use heatcheck_core::community::StrategySort;
use heatcheck_core::config::{ConvergenceConfig, EngineConfig, RankingConfig};
use heatcheck_core::models::{
    BacktestSnapshot, BetDirection, ConditionValue, CustomFilter, EnrichedGameLog,
    FilterCondition, FilterOperator, GameLogEntry, LivePerformance, MatchupContext,
    PublicStrategy, Sport, StrategyDraft,
};
use heatcheck_core::streaks::{PlayerGameSeries, StreakQuery, StreakSort};
use heatcheck_core::{
    build_leaderboard, check_prop, evaluate_hit_rate, generate_autopsy, ingest, publish_strategy,
    run_backtest, sort_strategies, track_streaks, validate_for_publishing, AutopsyInput,
    BacktestOptions, PropCheckRequest,
};
use uuid::Uuid;

// ============================================================================
// Fixtures
// ============================================================================

/// Newest-first series from oldest-first values, one game every other day.
fn series(oldest_first: &[f64], stat: &str) -> Vec<GameLogEntry> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut games: Vec<GameLogEntry> = oldest_first
        .iter()
        .enumerate()
        .map(|(i, v)| {
            GameLogEntry::new(start + Duration::days(i as i64 * 2), "PHX").with_stat(stat, *v)
        })
        .collect();
    games.reverse();
    games
}

fn corpus() -> Vec<EnrichedGameLog> {
    let mut out = Vec::new();
    for (p, name) in ["Luka Doncic", "Jalen Brunson"].iter().enumerate() {
        for g in 0..30u32 {
            let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap() + Duration::days(g as i64 * 3);
            let mut game = GameLogEntry::new(date, if g % 3 == 0 { "BOS" } else { "MIA" })
                .with_stat("pts", 18.0 + ((g * 7 + p as u32 * 3) % 17) as f64);
            game.is_home = g % 2 == 0;
            game.rest_days = Some((g % 3) as u8);
            game.is_back_to_back = g % 3 == 0;
            out.push(EnrichedGameLog {
                player_id: format!("p{}", p),
                player_name: name.to_string(),
                team: if p == 0 { "DAL" } else { "NYK" }.to_string(),
                sport: Sport::NBA,
                season: 2023,
                game,
                opponent_def_rank: Some(1 + (g % 30) as u16),
                spread: None,
                game_total: None,
                weather: None,
            });
        }
    }
    out
}

fn strategy(n: u128, published_at: chrono::DateTime<Utc>) -> PublicStrategy {
    PublicStrategy {
        id: Uuid::from_u128(n),
        author_id: format!("author-{}", n % 3),
        name: format!("Strategy {}", n),
        description: "Home overs after two days of rest".to_string(),
        sport: Sport::NBA,
        tags: vec!["nba".to_string()],
        conditions: vec![FilterCondition::new(
            "is_home",
            FilterOperator::Eq,
            ConditionValue::boolean(true),
        )],
        backtest: BacktestSnapshot {
            games: 80,
            hits: 46,
            hit_rate: 0.575,
            roi: 0.09,
        },
        live_performance: LivePerformance {
            games: (n as u32 * 4) % 25,
            hits: (n as u32 * 2) % 12,
            roi: (n as f64 - 5.0) / 50.0,
            units: n as f64 - 5.0,
        },
        follower_count: (n as u32 * 7) % 40,
        fork_count: 0,
        vote_score: (n as i32 * 5) % 23 - 4,
        comment_count: n as u32 % 6,
        published_at,
    }
}

fn autopsy_input(actual: f64, convergence: u8) -> AutopsyInput {
    AutopsyInput {
        sport: Sport::NBA,
        stat_key: "pts".to_string(),
        line: 25.5,
        actual,
        direction: BetDirection::Over,
        convergence_score: convergence,
        minutes_played: None,
        avg_minutes: None,
        restriction_announced: false,
        final_margin: None,
        left_with_injury: false,
        fouls: None,
        lineup_change: false,
        is_back_to_back: false,
        opening_line: None,
        closing_line: None,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_reference_window_hit_rate() {
    // most recent game is the last value (20)
    let games = series(&[25.0, 30.0, 18.0, 22.0, 27.0, 31.0, 19.0, 24.0, 28.0, 20.0], "pts");
    let result = evaluate_hit_rate(&games, "pts", 20.0, 10);

    assert_eq!(result.window_games, 10);
    // 25, 30, 22, 27, 31, 24, 28 clear 20; 18, 19 and 20 do not
    assert_eq!(result.hit_count, 7);
    assert_relative_eq!(result.hit_rate, 0.7);
    assert_eq!(result.consecutive_streak, 0);
    assert!(!result.hit_games[0]);
}

#[test]
fn test_backtest_with_no_matches_is_insufficient() {
    let filter = CustomFilter::new("Nobody", Sport::NBA, "pts", 20.5, BetDirection::Over)
        .with_condition(FilterCondition::new(
            "opponent",
            FilterOperator::Eq,
            ConditionValue::text("ZZZ"),
        ));
    let result = run_backtest(&filter, &corpus(), &BacktestOptions::default());

    assert_eq!(result.total_games, 0);
    assert_eq!(result.sample_size, SampleSize::Insufficient);
    assert_eq!(result.hit_rate, 0.0);
    assert_eq!(result.roi, 0.0);
    assert!(result.equity_curve.is_empty());
}

#[test]
fn test_empty_draft_fails_publishing() {
    let draft = StrategyDraft {
        name: String::new(),
        description: "ok".to_string(),
        ..Default::default()
    };
    let validation = validate_for_publishing(&draft, &EngineConfig::default().publishing);

    assert!(!validation.valid);
    let mut distinct = validation.errors.clone();
    distinct.sort();
    distinct.dedup();
    assert!(distinct.len() >= 4, "errors: {:?}", validation.errors);
}

#[test]
fn test_newest_sort_orders_by_publish_time() {
    let t1 = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
    let t2 = t1 + Duration::hours(5);
    let t3 = t2 + Duration::days(2);
    let input = vec![strategy(2, t2), strategy(3, t3), strategy(1, t1)];

    let sorted = sort_strategies(&input, StrategySort::Newest, t3, &RankingConfig::default());
    let order: Vec<_> = sorted.iter().map(|s| s.published_at).collect();
    assert_eq!(order, vec![t3, t2, t1]);
    // input untouched
    assert_eq!(input[0].published_at, t2);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_outputs_are_deterministic() -> Result<()> {
    let games = series(&[22.0, 31.0, 19.0, 27.0, 25.0, 30.0, 17.0, 28.0, 26.0, 29.0, 21.0], "pts");
    let request = PropCheckRequest {
        sport: Sport::NBA,
        stat_key: "pts".to_string(),
        line: 24.5,
        games,
        context: MatchupContext {
            opponent: "PHX".to_string(),
            opponent_def_rank: Some(27),
            rest_days: Some(2),
            is_home: true,
            ..Default::default()
        },
    };
    let config = ConvergenceConfig::default();
    let a = serde_json::to_string(&check_prop(&request, &config))?;
    let b = serde_json::to_string(&check_prop(&request, &config))?;
    assert_eq!(a, b);

    let filter = CustomFilter::new("Home", Sport::NBA, "pts", 24.5, BetDirection::Over)
        .with_condition(FilterCondition::new(
            "is_home",
            FilterOperator::Eq,
            ConditionValue::boolean(true),
        ));
    let data = corpus();
    let a = serde_json::to_string(&run_backtest(&filter, &data, &BacktestOptions::default()))?;
    let b = serde_json::to_string(&run_backtest(&filter, &data, &BacktestOptions::default()))?;
    assert_eq!(a, b);

    let input = autopsy_input(22.0, 5);
    assert_eq!(generate_autopsy(&input), generate_autopsy(&input));
    Ok(())
}

#[test]
fn test_hit_rate_bounds_and_streaks() {
    let patterns: [&[f64]; 4] = [
        &[],
        &[30.0],
        &[10.0, 30.0, 30.0, 30.0],
        &[30.0, 30.0, 10.0, 12.0, 30.0, 30.0, 30.0, 10.0, 30.0, 30.0, 30.0, 30.0],
    ];
    for values in patterns {
        let games = series(values, "pts");
        for window in [0usize, 1, 5, 10, 50] {
            let r = evaluate_hit_rate(&games, "pts", 20.0, window);
            assert!((0.0..=1.0).contains(&r.hit_rate));
            assert!(r.hit_count <= r.window_games);
            assert!(r.consecutive_streak <= r.hit_count);
            assert!(r.max_streak >= r.consecutive_streak);
            if r.hit_games.first() == Some(&false) {
                assert_eq!(r.consecutive_streak, 0);
            }
        }
    }
}

#[test]
fn test_backtest_conservation() {
    let filter = CustomFilter::new("All Luka", Sport::NBA, "pts", 24.5, BetDirection::Over)
        .with_condition(FilterCondition::new(
            "team",
            FilterOperator::Eq,
            ConditionValue::text("dal"),
        ));
    let result = run_backtest(&filter, &corpus(), &BacktestOptions::default());

    assert_eq!(result.total_games, 30);
    assert_eq!(result.hits + result.misses, result.total_games);
    assert_eq!(result.equity_curve.len(), result.total_games as usize);

    let summed: f64 = result.equity_curve.iter().map(|p| p.profit).sum();
    let last = result.equity_curve.last().map(|p| p.cumulative_profit).unwrap_or(0.0);
    assert_relative_eq!(summed, last, epsilon = 1e-9);
    assert_relative_eq!(result.profit, last, epsilon = 1e-9);

    let dates: Vec<_> = result.equity_curve.iter().map(|p| p.date).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);
    assert!(result.max_drawdown >= 0.0);
}

#[test]
fn test_autopsy_always_explains() {
    let mut inputs = Vec::new();
    for convergence in 0..=7u8 {
        for actual in [0.0, 12.0, 24.0, 25.0, 25.5, 40.0] {
            inputs.push(autopsy_input(actual, convergence));
        }
    }
    let mut blowout = autopsy_input(18.0, 6);
    blowout.final_margin = Some(31);
    inputs.push(blowout);

    for input in &inputs {
        let autopsy = generate_autopsy(input);
        assert!(!autopsy.causes.is_empty());
        assert!(autopsy.unluck_score <= 100);
    }

    let last = generate_autopsy(inputs.last().unwrap());
    assert_eq!(last.causes[0].kind, CauseKind::Blowout);
    assert!(last.was_unlucky);
}

#[test]
fn test_leaderboard_ranks_are_dense() {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let strategies: Vec<_> = (1..=12)
        .map(|n| strategy(n, base + Duration::hours(n as i64 * 6)))
        .collect();
    let now = base + Duration::days(5);
    let config = RankingConfig::default();

    for sort in [
        StrategySort::Hot,
        StrategySort::Rising,
        StrategySort::TopRoi,
        StrategySort::MostFollowed,
        StrategySort::Newest,
    ] {
        for limit in [1usize, 5, 25] {
            let board = build_leaderboard(&strategies, sort, Some(limit), now, &config);
            let expected = limit.min(board.total_eligible);
            let ranks: Vec<usize> = board.entries.iter().map(|e| e.rank).collect();
            assert_eq!(ranks, (1..=expected).collect::<Vec<_>>());
        }
    }
}

// ============================================================================
// Cross-module flows
// ============================================================================

#[test]
fn test_ingested_logs_feed_streak_tracker() {
    let rows: Vec<serde_json::Value> = (1..=8)
        .map(|d| {
            serde_json::json!({
                "gameDate": format!("2024-03-{:02}", d * 2),
                "opp": "lac",
                "stats": {"PTS": (20 + d).to_string()}
            })
        })
        .collect();
    let games = ingest::ingest_batch(Sport::NBA, &rows);
    assert_eq!(games.len(), 8);

    let players = vec![PlayerGameSeries {
        player_id: "1629029".to_string(),
        player_name: "Luka Doncic".to_string(),
        team: "DAL".to_string(),
        games,
    }];
    let query = StreakQuery {
        min_streak: 3,
        sort: StreakSort::Streak,
        ..Default::default()
    };
    let streaks = track_streaks(&players, "pts", 23.5, 10, &query);
    assert_eq!(streaks.len(), 1);
    // 24..=28 clear 23.5 in the five most recent games
    assert_eq!(streaks[0].result.consecutive_streak, 5);
}

#[test]
fn test_filter_round_trips_from_stored_json() -> Result<()> {
    let stored = r#"{
        "name": "Rested home scorers",
        "sport": "NBA",
        "statKey": "stat:pts",
        "line": 24.5,
        "direction": "over",
        "conditions": [
            {"field": "is_home", "operator": "eq", "value": true},
            {"field": "rest_days", "operator": "gte", "value": 1},
            {"field": "opponent", "operator": "in", "value": ["MIA", "BOS"]}
        ]
    }"#;
    let filter: CustomFilter = serde_json::from_str(stored)?;
    heatcheck_core::filters::validate_filter(&filter)?;

    let result = run_backtest(&filter, &corpus(), &BacktestOptions::default());
    assert!(result.total_games > 0);
    assert_eq!(result.hits + result.misses, result.total_games);
    Ok(())
}

#[test]
fn test_backtest_snapshot_publishes() -> Result<()> {
    let condition = FilterCondition::new("team", FilterOperator::Eq, ConditionValue::text("DAL"));
    let filter = CustomFilter::new("Luka overs", Sport::NBA, "pts", 24.5, BetDirection::Over)
        .with_condition(condition.clone());
    let result = run_backtest(&filter, &corpus(), &BacktestOptions::default());

    let draft = StrategyDraft {
        name: "Luka overs".to_string(),
        description: "Every Dallas game against a 24.5 point line".to_string(),
        sport: Some(Sport::NBA),
        conditions: vec![condition],
        tags: vec!["nba".to_string(), "points".to_string()],
        backtest: Some(result.snapshot()),
    };
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let published = publish_strategy(draft, "author-1", now, &EngineConfig::default().publishing)?;

    assert_eq!(published.backtest.games, result.total_games);
    assert_eq!(published.backtest.hits, result.hits);
    assert_eq!(published.published_at, now);
    Ok(())
}
