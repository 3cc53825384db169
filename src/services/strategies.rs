use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;

use crate::error::AppResult;
use crate::models::{ConsumptionEvent, Food, TimeWindow};

use super::providers::{CatalogProvider, HistoryProvider};

/// Uniform random sample of the catalog, without replacement
///
/// When the catalog holds fewer foods than `limit`, the whole catalog is
/// returned (each food exactly once).
pub async fn random(catalog: &dyn CatalogProvider, limit: usize) -> AppResult<Vec<Food>> {
    let foods = catalog.fetch_catalog().await?;
    let sample_size = limit.min(foods.len());

    let mut rng = rand::thread_rng();
    let sample: Vec<Food> = foods
        .choose_multiple(&mut rng, sample_size)
        .cloned()
        .collect();

    tracing::debug!(catalog_size = foods.len(), sampled = sample.len(), "Random sample drawn");

    Ok(sample)
}

/// Foods ranked by consumption count inside the window, across all users
pub async fn popular_ranking(
    history: &dyn HistoryProvider,
    window: TimeWindow,
) -> AppResult<Vec<i64>> {
    let events = history.fetch_history(window).await?;
    Ok(count_by_food(&events))
}

/// Foods of one category ranked by consumption count inside the window
///
/// `category_foods` is the id set of the catalog foods belonging to the
/// user's preferred category; events for other foods are ignored.
pub async fn category_ranking(
    history: &dyn HistoryProvider,
    category_foods: &HashSet<i64>,
    window: TimeWindow,
) -> AppResult<Vec<i64>> {
    let events = history.fetch_history(window).await?;
    let filtered: Vec<ConsumptionEvent> = events
        .into_iter()
        .filter(|event| category_foods.contains(&event.food_id))
        .collect();

    Ok(count_by_food(&filtered))
}

/// Foods ranked by consumption count over the pooled history of peers
///
/// An empty peer set yields an empty ranking, not an error.
pub async fn peer_ranking(history: &dyn HistoryProvider, peers: Vec<i64>) -> AppResult<Vec<i64>> {
    if peers.is_empty() {
        return Ok(Vec::new());
    }

    let events = history.fetch_users_history(peers).await?;
    Ok(count_by_food(&events))
}

/// Consumption counts per food, most consumed first, ties by id ascending
///
/// Foods with zero qualifying events never appear: only foods actually
/// present in the event set are counted.
pub fn count_by_food(events: &[ConsumptionEvent]) -> Vec<i64> {
    let mut counts: HashMap<i64, u64> = HashMap::new();
    for event in events {
        *counts.entry(event.food_id).or_default() += 1;
    }

    let mut ranked: Vec<(i64, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked.into_iter().map(|(food_id, _)| food_id).collect()
}

/// Walks a ranking and resolves ids against the catalog, up to `limit`
///
/// Ids that no longer resolve (deleted foods still present in aggregated
/// history) are skipped rather than aborting the result.
pub fn resolve_ranked(
    ranking: &[i64],
    foods_by_id: &HashMap<i64, Food>,
    limit: usize,
) -> Vec<Food> {
    let mut foods = Vec::with_capacity(limit.min(ranking.len()));

    for food_id in ranking {
        if foods.len() >= limit {
            break;
        }
        match foods_by_id.get(food_id) {
            Some(food) => foods.push(food.clone()),
            None => tracing::debug!(food_id, "Skipping ranked food missing from catalog"),
        }
    }

    foods
}
