// Shared models for the HeatCheck analytics engine
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod filter;
pub mod strategy;

pub use filter::*;
pub use strategy::*;

// ============================================================================
// Sport Enum
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    NBA,
    MLB,
    NFL,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::NBA => "NBA",
            Sport::MLB => "MLB",
            Sport::NFL => "NFL",
        }
    }

    /// Parse a sport code, case-insensitive.
    pub fn parse(code: &str) -> Option<Sport> {
        match code.trim().to_ascii_lowercase().as_str() {
            "nba" | "basketball" => Some(Sport::NBA),
            "mlb" | "baseball" => Some(Sport::MLB),
            "nfl" | "football" => Some(Sport::NFL),
            _ => None,
        }
    }

    /// Canonical stat keys tracked for this sport
    pub fn stat_keys(&self) -> &'static [&'static str] {
        match self {
            Sport::NBA => &["pts", "reb", "ast", "3pm", "stl", "blk"],
            Sport::MLB => &["h", "hr", "rbi", "r", "sb", "tb", "k"],
            Sport::NFL => &[
                "passYd", "passTd", "rushYd", "rushTd", "recYd", "rec", "recTd",
            ],
        }
    }

    /// Whether games are played outdoors often enough for weather to matter
    pub fn weather_sensitive(&self) -> bool {
        matches!(self, Sport::MLB | Sport::NFL)
    }

    /// Number of teams in the league (for defensive rank quartiles)
    pub fn team_count(&self) -> u16 {
        match self {
            Sport::NBA => 30,
            Sport::MLB => 30,
            Sport::NFL => 32,
        }
    }
}

// ============================================================================
// Game Logs
// ============================================================================

/// One player's statistical record for one game.
///
/// Produced by the ingest boundary and consumed read-only everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLogEntry {
    pub date: NaiveDate,
    pub opponent: String,
    /// stat key -> value; absent keys mean the stat was not logged
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default)]
    pub is_back_to_back: bool,
    #[serde(default)]
    pub rest_days: Option<u8>,
    #[serde(default)]
    pub minutes: Option<f64>,
}

impl GameLogEntry {
    pub fn new(date: NaiveDate, opponent: &str) -> Self {
        Self {
            date,
            opponent: opponent.to_string(),
            stats: BTreeMap::new(),
            is_home: false,
            is_back_to_back: false,
            rest_days: None,
            minutes: None,
        }
    }

    /// Builder helper for a single stat
    pub fn with_stat(mut self, key: &str, value: f64) -> Self {
        self.stats.insert(key.to_string(), value);
        self
    }

    /// Stat value if the player logged it
    pub fn stat(&self, key: &str) -> Option<f64> {
        self.stats.get(key).copied()
    }

    /// Stat value, treating an unlogged stat as 0 (used for streak/hit flags)
    pub fn stat_or_zero(&self, key: &str) -> f64 {
        self.stat(key).unwrap_or(0.0)
    }
}

/// Weather at first pitch / kickoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherConditions {
    pub temperature_f: f64,
    pub wind_mph: f64,
    #[serde(default)]
    pub precipitation: bool,
    /// Domed/closed-roof venues ignore weather entirely
    #[serde(default)]
    pub indoor: bool,
}

/// Game log plus the context the backtest filters select on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedGameLog {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    pub sport: Sport,
    pub season: u16,
    #[serde(flatten)]
    pub game: GameLogEntry,
    /// Opponent defensive rank against this stat (1 = best defense)
    #[serde(default)]
    pub opponent_def_rank: Option<u16>,
    /// Team point spread (negative = favored)
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub game_total: Option<f64>,
    #[serde(default)]
    pub weather: Option<WeatherConditions>,
}

impl EnrichedGameLog {
    pub fn month(&self) -> u32 {
        self.game.date.month()
    }

    /// 0 = Monday .. 6 = Sunday
    pub fn day_of_week(&self) -> u32 {
        self.game.date.weekday().num_days_from_monday()
    }
}

/// Game-level context for a prop being evaluated today.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupContext {
    pub opponent: String,
    /// Opponent defensive rank against the stat (1 = best defense)
    pub opponent_def_rank: Option<u16>,
    pub rest_days: Option<u8>,
    pub is_home: bool,
    pub is_back_to_back: bool,
    pub weather: Option<WeatherConditions>,
}

// ============================================================================
// Prop Direction
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetDirection {
    #[default]
    Over,
    Under,
}

impl BetDirection {
    /// A value resolves as a hit for this side. Equality is never a hit.
    pub fn is_hit(&self, value: f64, line: f64) -> bool {
        match self {
            BetDirection::Over => value > line,
            BetDirection::Under => value < line,
        }
    }

    /// How far the result landed on the losing side of the line
    /// (negative when the bet won).
    pub fn miss_margin(&self, value: f64, line: f64) -> f64 {
        match self {
            BetDirection::Over => line - value,
            BetDirection::Under => value - line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_parse_is_case_insensitive() {
        assert_eq!(Sport::parse("nba"), Some(Sport::NBA));
        assert_eq!(Sport::parse(" MLB "), Some(Sport::MLB));
        assert_eq!(Sport::parse("hockey"), None);
    }

    #[test]
    fn test_direction_ties_are_never_hits() {
        assert!(!BetDirection::Over.is_hit(20.0, 20.0));
        assert!(!BetDirection::Under.is_hit(20.0, 20.0));
        assert!(BetDirection::Under.is_hit(19.5, 20.0));
        assert_eq!(BetDirection::Over.miss_margin(18.0, 20.5), 2.5);
    }

    #[test]
    fn test_game_log_json_shape() {
        let json = r#"{
            "date": "2024-01-15",
            "opponent": "BOS",
            "stats": {"pts": 31.0},
            "isHome": true,
            "isBackToBack": false
        }"#;
        let game: GameLogEntry = serde_json::from_str(json).unwrap();
        assert!(game.is_home);
        assert_eq!(game.stat("pts"), Some(31.0));
        assert_eq!(game.stat("reb"), None);
        assert_eq!(game.stat_or_zero("reb"), 0.0);
    }
}
