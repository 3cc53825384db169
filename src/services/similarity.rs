use super::matrix::InteractionMatrix;

/// Item × item cosine similarity matrix
///
/// Each interaction-matrix column is treated as a vector over users;
/// `S[i][j]` is the cosine of the angle between columns `i` and `j`.
/// Column indices are the same item indices as the source matrix, so the
/// two structures share one id↔index mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSimilarity {
    /// Row-major `items × items` values in [-1, 1]
    values: Vec<f64>,
    items: usize,
}

impl ItemSimilarity {
    /// Computes cosine similarity between every pair of item columns
    ///
    /// A pair involving a zero-norm column gets similarity 0 rather than a
    /// NaN from dividing by zero. Each entry is computed once and mirrored,
    /// so `S[i][j] == S[j][i]` holds exactly and the result depends only on
    /// the input matrix.
    pub fn from_interactions(matrix: &InteractionMatrix) -> Self {
        let items = matrix.item_count();
        let users = matrix.user_count();

        let norms: Vec<f64> = (0..items)
            .map(|col| {
                (0..users)
                    .map(|row| matrix.value(row, col).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        let mut values = vec![0.0; items * items];
        for i in 0..items {
            for j in i..items {
                let sim = if norms[i] == 0.0 || norms[j] == 0.0 {
                    0.0
                } else {
                    let dot: f64 = (0..users)
                        .map(|row| matrix.value(row, i) * matrix.value(row, j))
                        .sum();
                    dot / (norms[i] * norms[j])
                };

                values[i * items + j] = sim;
                values[j * items + i] = sim;
            }
        }

        Self { values, items }
    }

    pub fn item_count(&self) -> usize {
        self.items
    }

    /// Similarity between item columns `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.items + j]
    }
}
