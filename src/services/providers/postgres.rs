use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{ConsumptionEvent, Food, TimeWindow},
};

use super::{CatalogProvider, HistoryProvider};

/// PostgreSQL-backed implementation of both provider traits
///
/// Queries run against the `histories`, `foods` and `profiles` tables and
/// stay read-only; no strategy ever writes back through this provider.
#[derive(Clone)]
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryProvider for PostgresProvider {
    async fn fetch_history(&self, window: TimeWindow) -> AppResult<Vec<ConsumptionEvent>> {
        let events = sqlx::query_as::<_, ConsumptionEvent>(
            r#"
            SELECT user_id, food_id, created_at AS occurred_at
            FROM histories
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn fetch_user_history(
        &self,
        user_id: i64,
        window: TimeWindow,
    ) -> AppResult<Vec<ConsumptionEvent>> {
        let events = sqlx::query_as::<_, ConsumptionEvent>(
            r#"
            SELECT user_id, food_id, created_at AS occurred_at
            FROM histories
            WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn fetch_users_history(&self, user_ids: Vec<i64>) -> AppResult<Vec<ConsumptionEvent>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let events = sqlx::query_as::<_, ConsumptionEvent>(
            r#"
            SELECT user_id, food_id, created_at AS occurred_at
            FROM histories
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for PostgresProvider {
    async fn fetch_catalog(&self) -> AppResult<Vec<Food>> {
        let foods = sqlx::query_as::<_, Food>(
            r#"
            SELECT id, category_id, name, kcal
            FROM foods
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(foods)
    }

    async fn fetch_preferred_category(&self, user_id: i64) -> AppResult<Option<i64>> {
        let category: Option<Option<i64>> = sqlx::query_scalar(
            r#"
            SELECT preferred_category_id
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category.flatten())
    }

    async fn fetch_peer_users(&self, category_id: i64) -> AppResult<Vec<i64>> {
        let users: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM profiles
            WHERE preferred_category_id = $1
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
