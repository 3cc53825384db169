use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

/// A food item from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Food {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub kcal: i32,
}

/// A food category (e.g., "Korean/Stew")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A single recorded consumption: one user ate one food at one point in time.
///
/// Events are immutable once recorded; the recommendation core only ever
/// reads a bounded trailing window of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConsumptionEvent {
    pub user_id: i64,
    pub food_id: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Half-open time range `[start, end)` used to bound history queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the trailing `days` days up to now
    pub fn trailing_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// The closed set of recommendation strategies
///
/// All strategies share one output contract: an ordered list of food ids,
/// at most `limit` long, with no duplicates. Strategy-specific inputs
/// (preferred category, peer users) are resolved internally via the
/// provider traits, never passed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Uniform sample of the catalog, without replacement
    Random,
    /// Most-consumed foods over the last day, across all users
    Popular,
    /// Most-consumed foods in the user's preferred category (30 days)
    Category,
    /// Most-consumed foods among users sharing the preferred category
    Peers,
    /// Memory-based collaborative filtering over item-item similarity
    Personalized,
}

impl Strategy {
    /// Whether this strategy needs a target user to resolve its inputs
    pub fn requires_user(&self) -> bool {
        matches!(
            self,
            Strategy::Category | Strategy::Peers | Strategy::Personalized
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Popular => "popular",
            Strategy::Category => "category",
            Strategy::Peers => "peers",
            Strategy::Personalized => "personalized",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Strategy::Random),
            "popular" => Ok(Strategy::Popular),
            "category" => Ok(Strategy::Category),
            "peers" => Ok(Strategy::Peers),
            "personalized" => Ok(Strategy::Personalized),
            other => Err(AppError::UnsupportedStrategy(other.to_string())),
        }
    }
}
