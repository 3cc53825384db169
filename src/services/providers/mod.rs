/// Data provider abstraction
///
/// The recommendation core reads consumption history and the food catalog
/// through these traits rather than touching storage directly. This keeps
/// every strategy testable against in-memory fixtures and leaves the
/// storage engine swappable.
use crate::{
    error::AppResult,
    models::{ConsumptionEvent, Food, TimeWindow},
};

pub mod postgres;

pub use postgres::PostgresProvider;

/// Source of consumption events
///
/// All reads are bounded by a [`TimeWindow`] except peer pooling, which
/// deliberately spans each peer's full history.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryProvider: Send + Sync {
    /// All events inside the window, across every user
    async fn fetch_history(&self, window: TimeWindow) -> AppResult<Vec<ConsumptionEvent>>;

    /// One user's events inside the window
    async fn fetch_user_history(
        &self,
        user_id: i64,
        window: TimeWindow,
    ) -> AppResult<Vec<ConsumptionEvent>>;

    /// The pooled, unwindowed history of a set of users
    async fn fetch_users_history(&self, user_ids: Vec<i64>) -> AppResult<Vec<ConsumptionEvent>>;
}

/// Source of food/catalog metadata and per-user category preferences
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// The full food catalog
    async fn fetch_catalog(&self) -> AppResult<Vec<Food>>;

    /// The category a user marked as their main interest, if any
    async fn fetch_preferred_category(&self, user_id: i64) -> AppResult<Option<i64>>;

    /// Ids of every user whose preferred category is `category_id`
    ///
    /// The requesting user is included when they share the category.
    async fn fetch_peer_users(&self, category_id: i64) -> AppResult<Vec<i64>>;
}
