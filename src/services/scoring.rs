use super::similarity::ItemSimilarity;

/// Sentinel score for items that must never be recommended
///
/// Exclusion and ranking share one rule: anything at or below this value
/// stays out of the result.
pub const EXCLUDED_SCORE: f64 = 0.0;

/// One ranked candidate: a food id with its normalized score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub food_id: i64,
    pub score: f64,
}

/// Projects a user's interaction row through the similarity matrix
///
/// `scores[j] = Σ_i row[i] * S[i][j]`: items similar to what the user
/// already consumed score high, weighted by how much they consumed it.
/// The output is indexed by the same item positions as the matrix columns.
pub fn score_items(row: &[f64], similarity: &ItemSimilarity) -> Vec<f64> {
    let items = similarity.item_count();
    debug_assert_eq!(row.len(), items);

    let mut scores = vec![0.0; items];
    for (i, &weight) in row.iter().enumerate() {
        if weight == 0.0 {
            continue;
        }
        for (j, score) in scores.iter_mut().enumerate() {
            *score += weight * similarity.get(i, j);
        }
    }
    scores
}

/// Forces the score of every excluded item position to the sentinel
///
/// Used to keep already-eaten foods out of the result. Exclusion is scoped
/// to a trailing window, so foods eaten long ago may legitimately score
/// again.
pub fn apply_exclusions(scores: &mut [f64], excluded: &[usize]) {
    for &position in excluded {
        if position < scores.len() {
            scores[position] = EXCLUDED_SCORE;
        }
    }
}

/// Orders item positions by score and returns the top `limit` as ids
///
/// Scores are min-max normalized for scale consistency, sorted descending,
/// with ties broken by food id ascending. Items at or below the sentinel
/// are never returned, even if that leaves fewer than `limit` results; a
/// short result is valid.
pub fn rank(scores: &[f64], item_ids: &[i64], limit: usize) -> Vec<RankedItem> {
    debug_assert_eq!(scores.len(), item_ids.len());

    let normalized = normalize_min_max(scores);

    let mut candidates: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i] > EXCLUDED_SCORE)
        .collect();

    candidates.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(item_ids[a].cmp(&item_ids[b]))
    });
    candidates.truncate(limit);

    candidates
        .into_iter()
        .map(|i| RankedItem {
            food_id: item_ids[i],
            score: normalized[i],
        })
        .collect()
}

/// Min-max normalization across the score vector
///
/// A flat vector (max == min) maps to all ones rather than dividing by
/// zero; ordering is unchanged either way.
fn normalize_min_max(scores: &[f64]) -> Vec<f64> {
    let Some(&first) = scores.first() else {
        return Vec::new();
    };

    let (min, max) = scores.iter().fold((first, first), |(min, max), &s| {
        (min.min(s), max.max(s))
    });

    if max == min {
        return vec![1.0; scores.len()];
    }

    scores.iter().map(|&s| (s - min) / (max - min)).collect()
}
