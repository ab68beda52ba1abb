//! Community strategy models.

use super::{FilterCondition, Sport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cached backtest figures stored alongside a published strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSnapshot {
    pub games: u32,
    pub hits: u32,
    pub hit_rate: f64,
    pub roi: f64,
}

/// Results of games tracked since the strategy was published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePerformance {
    pub games: u32,
    pub hits: u32,
    pub roi: f64,
    pub units: f64,
}

impl LivePerformance {
    pub fn is_profitable(&self) -> bool {
        self.units > 0.0 || (self.units == 0.0 && self.roi > 0.0)
    }
}

/// A filter published to the community library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStrategy {
    pub id: Uuid,
    pub author_id: String,
    pub name: String,
    pub description: String,
    pub sport: Sport,
    #[serde(default)]
    pub tags: Vec<String>,
    pub conditions: Vec<FilterCondition>,
    pub backtest: BacktestSnapshot,
    #[serde(default)]
    pub live_performance: LivePerformance,
    #[serde(default)]
    pub follower_count: u32,
    #[serde(default)]
    pub fork_count: u32,
    #[serde(default)]
    pub vote_score: i32,
    #[serde(default)]
    pub comment_count: u32,
    pub published_at: DateTime<Utc>,
}

/// What an author submits before publishing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sport: Option<Sport>,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub backtest: Option<BacktestSnapshot>,
}
