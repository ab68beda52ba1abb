//! Normalization boundary for upstream game logs.
//!
//! Provider payloads (ESPN box scores, MLB Stats API splits, scraped NBA
//! logs) arrive with loose shapes: aliased keys, numbers as strings,
//! "MM:SS" minutes. Everything is validated here so the analytics modules
//! only ever see `GameLogEntry` / `EnrichedGameLog`.
//!
//! Kickoff timestamps are converted to a schedule-local calendar date
//! (US Eastern by default) so a 7:30pm ET tip stored as 00:30Z the next day
//! lands on the right date for rest-day and back-to-back derivation.

use crate::error::{EngineError, Result};
use crate::models::{EnrichedGameLog, GameLogEntry, Sport};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const SOURCE: &str = "game_log";

/// UTC-5: league schedules are published in US Eastern time
const EASTERN_STANDARD_OFFSET_SECS: i32 = 5 * 3600;

/// Offset used to turn kickoff timestamps into schedule dates.
pub fn default_schedule_offset() -> FixedOffset {
    FixedOffset::west_opt(EASTERN_STANDARD_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Provider aliases for each canonical stat key, matched case-insensitively
static STAT_ALIASES: &[(Sport, &str, &[&str])] = &[
    (Sport::NBA, "pts", &["points", "PTS"]),
    (Sport::NBA, "reb", &["rebounds", "totReb", "REB"]),
    (Sport::NBA, "ast", &["assists", "AST"]),
    (Sport::NBA, "3pm", &["FG3M", "threePointFieldGoalsMade", "threes", "tpm"]),
    (Sport::NBA, "stl", &["steals", "STL"]),
    (Sport::NBA, "blk", &["blocks", "BLK"]),
    (Sport::MLB, "h", &["hits"]),
    (Sport::MLB, "hr", &["homeRuns"]),
    (Sport::MLB, "rbi", &["runsBattedIn"]),
    (Sport::MLB, "r", &["runs"]),
    (Sport::MLB, "sb", &["stolenBases"]),
    (Sport::MLB, "tb", &["totalBases"]),
    (Sport::MLB, "k", &["strikeOuts", "so", "strikeouts"]),
    (Sport::NFL, "passYd", &["passingYards", "passYds"]),
    (Sport::NFL, "passTd", &["passingTouchdowns", "passTds"]),
    (Sport::NFL, "rushYd", &["rushingYards", "rushYds"]),
    (Sport::NFL, "rushTd", &["rushingTouchdowns", "rushTds"]),
    (Sport::NFL, "recYd", &["receivingYards", "recYds"]),
    (Sport::NFL, "rec", &["receptions"]),
    (Sport::NFL, "recTd", &["receivingTouchdowns", "recTds"]),
];

/// Map a provider stat name onto the sport's canonical key.
pub fn canonical_stat_key(sport: Sport, raw: &str) -> Option<&'static str> {
    if let Some(key) = sport
        .stat_keys()
        .iter()
        .copied()
        .find(|k| k.eq_ignore_ascii_case(raw))
    {
        return Some(key);
    }
    STAT_ALIASES
        .iter()
        .filter(|(s, _, _)| *s == sport)
        .find(|(_, _, aliases)| aliases.iter().any(|a| a.eq_ignore_ascii_case(raw)))
        .map(|(_, key, _)| *key)
}

/// Loose upstream shape. Every field is optional so one bad field becomes a
/// precise ingest error instead of a generic serde failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGameLog {
    #[serde(default, alias = "gameDate", alias = "game_date")]
    pub date: Option<String>,
    #[serde(default, alias = "opp", alias = "opponentAbbreviation")]
    pub opponent: Option<String>,
    #[serde(default, alias = "is_home")]
    pub is_home: Option<bool>,
    /// "home"/"away", or ESPN's "vs"/"@"
    #[serde(default, alias = "home_away", alias = "atVs")]
    pub home_away: Option<String>,
    #[serde(default)]
    pub minutes: Option<Value>,
    #[serde(default, alias = "rest_days")]
    pub rest_days: Option<u8>,
    #[serde(default)]
    pub stats: Map<String, Value>,

    #[serde(default, alias = "player_id", alias = "athleteId")]
    pub player_id: Option<Value>,
    #[serde(default, alias = "player_name", alias = "displayName")]
    pub player_name: Option<String>,
    #[serde(default, alias = "teamAbbreviation")]
    pub team: Option<String>,
    #[serde(default)]
    pub season: Option<Value>,
    #[serde(default, alias = "opponent_def_rank")]
    pub opponent_def_rank: Option<u16>,
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default, alias = "overUnder")]
    pub game_total: Option<f64>,
}

/// Calendar date of a game in `offset`.
///
/// Zoned timestamps are shifted into `offset`; ESPN's seconds-less
/// "2024-01-15T00:30Z" counts as UTC. Timestamps without a zone are taken
/// as already local.
fn parse_date(raw: &str, offset: &FixedOffset) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(offset).date_naive());
    }

    let (naive, is_utc) = match trimmed.strip_suffix('Z') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(local) = NaiveDateTime::parse_from_str(naive, fmt) {
            if is_utc {
                let utc = Utc.from_utc_datetime(&local);
                return Some(utc.with_timezone(offset).date_naive());
            }
            return Some(local.date());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
}

/// Season from a provider value: 2023, "2023" or NBA-style "2023-24".
/// `None` when the value isn't a season at all.
fn parse_season(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => {
            let head = s.trim().split(|c: char| c == '-' || c == '/').next().unwrap_or("");
            head.trim().parse::<i64>().ok()
        }
        other => parse_number(other)
            .filter(|n| n.fract() == 0.0)
            .map(|n| n as i64),
    }
}

/// Numbers, numeric strings; `None` for anything else ("3-7", "--")
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// "34:30" -> 34.5, or a plain number
fn parse_minutes(value: &Value) -> Option<f64> {
    if let Value::String(s) = value {
        if let Some((m, sec)) = s.split_once(':') {
            let m: f64 = m.trim().parse().ok()?;
            let sec: f64 = sec.trim().parse().ok()?;
            return Some(m + sec / 60.0);
        }
    }
    parse_number(value)
}

fn parse_is_home(raw: &RawGameLog) -> bool {
    if let Some(home) = raw.is_home {
        return home;
    }
    match raw.home_away.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) => s == "home" || s == "vs" || s == "h",
        None => false,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validate one raw record into a `GameLogEntry`, dating it in US Eastern.
pub fn normalize_game_log(sport: Sport, raw: &RawGameLog) -> Result<GameLogEntry> {
    normalize_game_log_at(sport, raw, &default_schedule_offset())
}

/// Validate one raw record into a `GameLogEntry`, dating it in `offset`.
pub fn normalize_game_log_at(
    sport: Sport,
    raw: &RawGameLog,
    offset: &FixedOffset,
) -> Result<GameLogEntry> {
    let date_str = raw
        .date
        .as_deref()
        .ok_or_else(|| EngineError::ingest(SOURCE, "missing date"))?;
    let date = parse_date(date_str, offset).ok_or_else(|| {
        EngineError::ingest(SOURCE, format!("unparseable date '{}'", date_str))
    })?;

    let opponent = raw
        .opponent
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::ingest(SOURCE, "missing opponent"))?;

    let mut stats = BTreeMap::new();
    for (name, value) in &raw.stats {
        match (canonical_stat_key(sport, name), parse_number(value)) {
            (Some(key), Some(v)) => {
                stats.insert(key.to_string(), v);
            }
            (Some(key), None) => debug!("Dropping non-numeric {} value {:?}", key, value),
            (None, _) => {}
        }
    }

    Ok(GameLogEntry {
        date,
        opponent: opponent.to_ascii_uppercase(),
        stats,
        is_home: parse_is_home(raw),
        is_back_to_back: raw.rest_days == Some(0),
        rest_days: raw.rest_days,
        minutes: raw.minutes.as_ref().and_then(parse_minutes),
    })
}

/// Validate one raw record into an `EnrichedGameLog`, dating it in US Eastern.
pub fn normalize_enriched(sport: Sport, raw: &RawGameLog) -> Result<EnrichedGameLog> {
    normalize_enriched_at(sport, raw, &default_schedule_offset())
}

/// Validate one raw record into an `EnrichedGameLog`, dating it in `offset`.
pub fn normalize_enriched_at(
    sport: Sport,
    raw: &RawGameLog,
    offset: &FixedOffset,
) -> Result<EnrichedGameLog> {
    let game = normalize_game_log_at(sport, raw, offset)?;
    let player_id = raw
        .player_id
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| EngineError::ingest(SOURCE, "missing player id"))?;
    let player_name = raw
        .player_name
        .clone()
        .unwrap_or_else(|| player_id.clone());
    let team = raw
        .team
        .as_deref()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| EngineError::ingest(SOURCE, "missing team"))?;
    // an unreadable season label falls back to the game date
    let season = match raw.season.as_ref().and_then(parse_season) {
        Some(s) => u16::try_from(s).ok(),
        None => season_for(sport, game.date),
    }
    .ok_or_else(|| EngineError::ingest(SOURCE, "season out of range"))?;

    Ok(EnrichedGameLog {
        player_id,
        player_name,
        team,
        sport,
        season,
        game,
        opponent_def_rank: raw.opponent_def_rank,
        spread: raw.spread,
        game_total: raw.game_total,
        weather: None,
    })
}

/// Season label for a game date. NBA/NFL seasons that cross New Year are
/// labelled by the year they start in. `None` when the label doesn't fit a
/// `u16` (dates before year 1 or after 65535).
pub fn season_for(sport: Sport, date: NaiveDate) -> Option<u16> {
    let year = date.year();
    let label = match sport {
        Sport::MLB => year,
        Sport::NBA if date.month() < 8 => year - 1,
        Sport::NFL if date.month() < 6 => year - 1,
        _ => year,
    };
    u16::try_from(label).ok()
}

/// Sort newest-first and fill rest days / back-to-back from the schedule
/// where the provider left them out.
pub fn finalize_series(mut games: Vec<GameLogEntry>) -> Vec<GameLogEntry> {
    games.sort_by(|a, b| b.date.cmp(&a.date));
    for i in 0..games.len() {
        if games[i].rest_days.is_some() {
            continue;
        }
        if let Some(prev) = games.get(i + 1).map(|g| g.date) {
            let gap = (games[i].date - prev).num_days() - 1;
            if gap >= 0 {
                let rest = gap.min(u8::MAX as i64) as u8;
                games[i].rest_days = Some(rest);
                games[i].is_back_to_back = rest == 0;
            }
        }
    }
    games
}

/// Ingest a provider array, skipping bad rows. Output is newest-first.
pub fn ingest_batch(sport: Sport, rows: &[Value]) -> Vec<GameLogEntry> {
    ingest_batch_at(sport, rows, &default_schedule_offset())
}

/// `ingest_batch` with game dates taken in `offset`.
pub fn ingest_batch_at(sport: Sport, rows: &[Value], offset: &FixedOffset) -> Vec<GameLogEntry> {
    let mut games = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let parsed = RawGameLog::deserialize(row)
            .map_err(EngineError::from)
            .and_then(|raw| normalize_game_log_at(sport, &raw, offset));
        match parsed {
            Ok(game) => games.push(game),
            Err(e) => warn!("Skipping {} game log row {}: {}", sport.as_str(), i, e),
        }
    }
    finalize_series(games)
}
