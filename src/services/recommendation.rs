use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use crate::db::{Cache, CacheKey};
use crate::error::{AppError, AppResult};
use crate::models::{Food, Strategy, TimeWindow};

use super::model::ModelHandle;
use super::providers::{CatalogProvider, HistoryProvider};
use super::{scoring, strategies, RecommendError};

/// History window for the yesterday-popular strategy
const POPULAR_WINDOW_DAYS: i64 = 1;
/// History window for the category-popular strategy
const CATEGORY_WINDOW_DAYS: i64 = 30;
/// TTL for cached popularity rankings
const RANKING_CACHE_TTL: u64 = 600;

/// Tunable policy knobs for the recommender
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Trailing window in which already-eaten foods stay excluded from
    /// personalized results. Deliberately separate from the CF training
    /// window: older consumption may resurface as a recommendation.
    pub exclusion_window_days: i64,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            exclusion_window_days: 30,
        }
    }
}

/// The uniform entry point for every recommendation strategy
///
/// Holds the provider handles, the published CF model and the ranking
/// cache. Requests are read-only against shared data, so any number of
/// them may run concurrently.
pub struct Recommender {
    history: Arc<dyn HistoryProvider>,
    catalog: Arc<dyn CatalogProvider>,
    cache: Cache,
    models: ModelHandle,
    options: RecommendOptions,
}

impl Recommender {
    pub fn new(
        history: Arc<dyn HistoryProvider>,
        catalog: Arc<dyn CatalogProvider>,
        cache: Cache,
        models: ModelHandle,
        options: RecommendOptions,
    ) -> Self {
        Self {
            history,
            catalog,
            cache,
            models,
            options,
        }
    }

    /// Runs one strategy and returns at most `limit` foods, no duplicates
    ///
    /// Strategy-specific inputs (preferred category, peers) are resolved
    /// internally. Strategies that personalize reject a missing user id;
    /// the personalized strategy additionally falls back to popular, then
    /// random, when the CF model cannot serve the user.
    pub async fn recommend(
        &self,
        strategy: Strategy,
        user_id: Option<i64>,
        limit: usize,
    ) -> AppResult<Vec<Food>> {
        match (strategy, user_id) {
            (Strategy::Random, _) => strategies::random(self.catalog.as_ref(), limit).await,
            (Strategy::Popular, _) => self.popular(limit).await,
            (Strategy::Category, Some(user_id)) => self.category_popular(user_id, limit).await,
            (Strategy::Peers, Some(user_id)) => self.peer_group(user_id, limit).await,
            (Strategy::Personalized, Some(user_id)) => self.personalized(user_id, limit).await,
            (strategy, None) => Err(AppError::InvalidInput(format!(
                "strategy '{strategy}' requires a user_id"
            ))),
        }
    }

    /// Foods other users ate most over the last day
    async fn popular(&self, limit: usize) -> AppResult<Vec<Food>> {
        let key = CacheKey::Popular(today_bucket());

        let ranking = match self.cache.get_cached::<Vec<i64>>(&key).await {
            Some(ranking) => ranking,
            None => {
                let ranking = strategies::popular_ranking(
                    self.history.as_ref(),
                    TimeWindow::trailing_days(POPULAR_WINDOW_DAYS),
                )
                .await?;
                self.cache.set_in_background(&key, &ranking, RANKING_CACHE_TTL);
                ranking
            }
        };

        let foods_by_id = self.catalog_by_id().await?;
        Ok(strategies::resolve_ranked(&ranking, &foods_by_id, limit))
    }

    /// Most popular foods within the user's preferred category (30 days)
    async fn category_popular(&self, user_id: i64, limit: usize) -> AppResult<Vec<Food>> {
        let Some(category_id) = self.catalog.fetch_preferred_category(user_id).await? else {
            tracing::info!(user_id, "User has no preferred category, returning empty result");
            return Ok(Vec::new());
        };

        let foods_by_id = self.catalog_by_id().await?;
        let key = CacheKey::CategoryPopular(category_id, today_bucket());

        let ranking = match self.cache.get_cached::<Vec<i64>>(&key).await {
            Some(ranking) => ranking,
            None => {
                let category_foods: HashSet<i64> = foods_by_id
                    .values()
                    .filter(|food| food.category_id == category_id)
                    .map(|food| food.id)
                    .collect();

                let ranking = strategies::category_ranking(
                    self.history.as_ref(),
                    &category_foods,
                    TimeWindow::trailing_days(CATEGORY_WINDOW_DAYS),
                )
                .await?;
                self.cache.set_in_background(&key, &ranking, RANKING_CACHE_TTL);
                ranking
            }
        };

        Ok(strategies::resolve_ranked(&ranking, &foods_by_id, limit))
    }

    /// Most popular foods among users sharing the preferred category
    async fn peer_group(&self, user_id: i64, limit: usize) -> AppResult<Vec<Food>> {
        let Some(category_id) = self.catalog.fetch_preferred_category(user_id).await? else {
            tracing::info!(user_id, "User has no preferred category, returning empty result");
            return Ok(Vec::new());
        };

        let peers = self.catalog.fetch_peer_users(category_id).await?;
        if peers.is_empty() {
            tracing::info!(user_id, category_id, "No peers share the category");
            return Ok(Vec::new());
        }

        let ranking = strategies::peer_ranking(self.history.as_ref(), peers).await?;
        let foods_by_id = self.catalog_by_id().await?;
        Ok(strategies::resolve_ranked(&ranking, &foods_by_id, limit))
    }

    /// Memory-based CF: score, exclude already-eaten, rank
    ///
    /// A cold model or an unknown user degrades to the fallback chain
    /// instead of surfacing an error; provider failures still propagate.
    async fn personalized(&self, user_id: i64, limit: usize) -> AppResult<Vec<Food>> {
        match self.try_personalized(user_id, limit).await {
            Ok(foods) => Ok(foods),
            Err(RecommendError::Provider(e)) => Err(e),
            Err(reason) => {
                tracing::warn!(
                    user_id,
                    reason = %reason,
                    "CF unavailable, falling back to non-personalized strategy"
                );
                self.fallback(limit).await
            }
        }
    }

    async fn try_personalized(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Food>, RecommendError> {
        let model = self
            .models
            .current()
            .await
            .ok_or(RecommendError::InsufficientData)?;
        let row = model
            .user_row(user_id)
            .ok_or(RecommendError::UnknownUser(user_id))?;

        let mut scores = scoring::score_items(row, model.similarity());

        let exclusion_window = TimeWindow::trailing_days(self.options.exclusion_window_days);
        let consumed = self
            .history
            .fetch_user_history(user_id, exclusion_window)
            .await?;
        let excluded: Vec<usize> = consumed
            .iter()
            .filter_map(|event| model.item_position(event.food_id))
            .collect();
        scoring::apply_exclusions(&mut scores, &excluded);

        let ranked = scoring::rank(&scores, model.item_ids(), limit);

        tracing::debug!(
            user_id,
            candidates = model.item_ids().len(),
            excluded = excluded.len(),
            returned = ranked.len(),
            "Scored personalized recommendations"
        );

        let foods_by_id = self.catalog_by_id().await?;
        let ranking: Vec<i64> = ranked.into_iter().map(|item| item.food_id).collect();
        Ok(strategies::resolve_ranked(&ranking, &foods_by_id, limit))
    }

    /// Fallback chain for a cold CF model: popular first, then random
    async fn fallback(&self, limit: usize) -> AppResult<Vec<Food>> {
        let foods = self.popular(limit).await?;
        if !foods.is_empty() {
            return Ok(foods);
        }
        strategies::random(self.catalog.as_ref(), limit).await
    }

    async fn catalog_by_id(&self) -> AppResult<HashMap<i64, Food>> {
        let foods = self.catalog.fetch_catalog().await?;
        Ok(foods.into_iter().map(|food| (food.id, food)).collect())
    }
}

/// UTC date bucket for popularity cache keys
fn today_bucket() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
