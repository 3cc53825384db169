use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Food, Strategy},
    routes::AppState,
};

/// Hard ceiling on the requested result size
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    /// Strategy name: random, popular, category, peers or personalized
    pub strategy: String,
    /// Target user; required by the personalizing strategies
    pub user_id: Option<i64>,
    /// Requested result size; capped at [`MAX_LIMIT`]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub strategy: Strategy,
    pub count: usize,
    pub items: Vec<Food>,
}

/// Handler for the recommendations endpoint
///
/// All strategies are served through this one route; an unknown strategy
/// name is a 400, never a crash.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<RecommendationResponse>> {
    let strategy: Strategy = params.strategy.parse()?;
    let limit = params.limit.unwrap_or(state.default_limit).min(MAX_LIMIT);

    tracing::info!(
        request_id = %request_id,
        strategy = %strategy,
        user_id = ?params.user_id,
        limit,
        "Processing recommendation request"
    );

    let items = state
        .recommender
        .recommend(strategy, params.user_id, limit)
        .await?;

    tracing::info!(
        request_id = %request_id,
        strategy = %strategy,
        count = items.len(),
        "Recommendation completed"
    );

    Ok(Json(RecommendationResponse {
        strategy,
        count: items.len(),
        items,
    }))
}
