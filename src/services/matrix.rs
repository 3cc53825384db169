use std::collections::{HashMap, HashSet};

use crate::models::{ConsumptionEvent, TimeWindow};

use super::RecommendError;

/// User × item interaction matrix
///
/// The value at `(user, item)` is the count of that user's consumptions of
/// that item inside the training window; repeated consumption strengthens
/// the signal. Rows and columns map bijectively to user and food ids
/// through lookup tables built together with the matrix, and indices are
/// contiguous from 0. Users and foods with no qualifying events are not
/// present at all, so the matrix never carries empty rows or columns.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    /// Row-major counts, `users × items`
    counts: Vec<f64>,
    /// Row index → user id
    user_ids: Vec<i64>,
    /// Column index → food id
    item_ids: Vec<i64>,
    user_index: HashMap<i64, usize>,
    item_index: HashMap<i64, usize>,
}

impl InteractionMatrix {
    /// Builds the matrix from consumption events
    ///
    /// An event qualifies when it falls inside `window` and references a
    /// food present in `catalog_ids`; everything else is skipped. Index
    /// order follows ascending user/food id, so identical input always
    /// produces an identical matrix.
    pub fn from_events(
        events: &[ConsumptionEvent],
        catalog_ids: &HashSet<i64>,
        window: TimeWindow,
    ) -> Result<Self, RecommendError> {
        let qualifying: Vec<&ConsumptionEvent> = events
            .iter()
            .filter(|event| window.contains(event.occurred_at))
            .filter(|event| catalog_ids.contains(&event.food_id))
            .collect();

        if qualifying.is_empty() {
            return Err(RecommendError::InsufficientData);
        }

        let mut user_ids: Vec<i64> = qualifying.iter().map(|event| event.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let mut item_ids: Vec<i64> = qualifying.iter().map(|event| event.food_id).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let user_index: HashMap<i64, usize> = user_ids
            .iter()
            .enumerate()
            .map(|(row, &id)| (id, row))
            .collect();
        let item_index: HashMap<i64, usize> = item_ids
            .iter()
            .enumerate()
            .map(|(col, &id)| (id, col))
            .collect();

        let mut counts = vec![0.0; user_ids.len() * item_ids.len()];
        for event in qualifying {
            let row = user_index[&event.user_id];
            let col = item_index[&event.food_id];
            counts[row * item_ids.len() + col] += 1.0;
        }

        Ok(Self {
            counts,
            user_ids,
            item_ids,
            user_index,
            item_index,
        })
    }

    pub fn user_count(&self) -> usize {
        self.user_ids.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    /// Food ids in column order
    pub fn item_ids(&self) -> &[i64] {
        &self.item_ids
    }

    /// User ids in row order
    pub fn user_ids(&self) -> &[i64] {
        &self.user_ids
    }

    pub fn user_position(&self, user_id: i64) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    pub fn item_position(&self, food_id: i64) -> Option<usize> {
        self.item_index.get(&food_id).copied()
    }

    /// Interaction row for one user, one entry per item column
    pub fn row(&self, row: usize) -> &[f64] {
        let items = self.item_ids.len();
        &self.counts[row * items..(row + 1) * items]
    }

    /// Interaction row looked up by user id
    pub fn row_for_user(&self, user_id: i64) -> Option<&[f64]> {
        self.user_position(user_id).map(|row| self.row(row))
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.counts[row * self.item_ids.len() + col]
    }

    /// Test-only constructor from dense rows, bypassing event aggregation
    #[cfg(test)]
    pub(crate) fn from_dense(rows: Vec<Vec<f64>>, user_ids: Vec<i64>, item_ids: Vec<i64>) -> Self {
        assert_eq!(rows.len(), user_ids.len());
        assert!(rows.iter().all(|row| row.len() == item_ids.len()));

        let user_index = user_ids
            .iter()
            .enumerate()
            .map(|(row, &id)| (id, row))
            .collect();
        let item_index = item_ids
            .iter()
            .enumerate()
            .map(|(col, &id)| (id, col))
            .collect();

        Self {
            counts: rows.into_iter().flatten().collect(),
            user_ids,
            item_ids,
            user_index,
            item_index,
        }
    }
}
