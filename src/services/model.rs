use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::TimeWindow;

use super::matrix::InteractionMatrix;
use super::providers::{CatalogProvider, HistoryProvider};
use super::similarity::ItemSimilarity;
use super::RecommendError;

/// One immutable snapshot of the collaborative-filtering model
///
/// Bundles the interaction matrix and the item-item similarity derived
/// from it, so every reader scores against a single consistent pair.
#[derive(Debug)]
pub struct CfModel {
    interactions: InteractionMatrix,
    similarity: ItemSimilarity,
    window: TimeWindow,
    built_at: DateTime<Utc>,
}

impl CfModel {
    /// Builds a model from windowed consumption events and the catalog
    pub fn build(
        events: &[crate::models::ConsumptionEvent],
        catalog_ids: &HashSet<i64>,
        window: TimeWindow,
    ) -> Result<Self, RecommendError> {
        let interactions = InteractionMatrix::from_events(events, catalog_ids, window)?;
        let similarity = ItemSimilarity::from_interactions(&interactions);

        Ok(Self {
            interactions,
            similarity,
            window,
            built_at: Utc::now(),
        })
    }

    /// Interaction row for the user, if they appear in the training window
    pub fn user_row(&self, user_id: i64) -> Option<&[f64]> {
        self.interactions.row_for_user(user_id)
    }

    /// Food ids in column order
    pub fn item_ids(&self) -> &[i64] {
        self.interactions.item_ids()
    }

    pub fn item_position(&self, food_id: i64) -> Option<usize> {
        self.interactions.item_position(food_id)
    }

    pub fn similarity(&self) -> &ItemSimilarity {
        &self.similarity
    }

    pub fn interactions(&self) -> &InteractionMatrix {
        &self.interactions
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Shared handle to the currently published model
///
/// Models are built off the request path and swapped in whole; a reader
/// clones the inner `Arc` and keeps scoring against that snapshot even if
/// a rebuild publishes a newer one mid-request.
#[derive(Clone, Default)]
pub struct ModelHandle {
    inner: Arc<RwLock<Option<Arc<CfModel>>>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest published model, if any build has succeeded yet
    pub async fn current(&self) -> Option<Arc<CfModel>> {
        self.inner.read().await.clone()
    }

    /// Atomically replaces the published model
    pub async fn publish(&self, model: CfModel) {
        let mut guard = self.inner.write().await;
        *guard = Some(Arc::new(model));
    }
}

/// Builds a fresh model from the providers' current data
pub async fn rebuild(
    history: &dyn HistoryProvider,
    catalog: &dyn CatalogProvider,
    window_days: i64,
) -> Result<CfModel, RecommendError> {
    let foods = catalog.fetch_catalog().await?;
    let catalog_ids: HashSet<i64> = foods.into_iter().map(|food| food.id).collect();

    let window = TimeWindow::trailing_days(window_days);
    let events = history.fetch_history(window).await?;

    CfModel::build(&events, &catalog_ids, window)
}

/// Periodic model rebuild task
///
/// Ticks immediately on startup, then every `interval_secs`. A failed
/// rebuild leaves the previously published model in place, so readers keep
/// a stale-but-valid model instead of losing personalization.
pub async fn run_rebuild_loop(
    history: Arc<dyn HistoryProvider>,
    catalog: Arc<dyn CatalogProvider>,
    handle: ModelHandle,
    window_days: i64,
    interval_secs: u64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;

        match rebuild(history.as_ref(), catalog.as_ref(), window_days).await {
            Ok(model) => {
                tracing::info!(
                    users = model.interactions().user_count(),
                    items = model.interactions().item_count(),
                    window_days,
                    "Publishing rebuilt CF model"
                );
                handle.publish(model).await;
            }
            Err(RecommendError::InsufficientData) => {
                tracing::warn!(
                    window_days,
                    "No qualifying interactions, keeping previous CF model"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "CF model rebuild failed, keeping previous model");
            }
        }
    }
}
