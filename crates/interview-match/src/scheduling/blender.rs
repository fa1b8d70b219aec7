//! Linear blending of the three affinity signals.
//!
//! Training rows are restricted to pairs present in all three signal maps. The target
//! is the fixed-weight blend, so a well-conditioned fit recovers those weights; the
//! fitted model is what prediction callers consume.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::PairKey;

const PIVOT_EPSILON: f64 = 1e-12;

/// Fixed weights of the default combiner and of the training label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub cosine: f64,
    pub jaccard: f64,
    pub matching: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            cosine: 0.4,
            jaccard: 0.3,
            matching: 0.3,
        }
    }
}

impl BlendWeights {
    pub fn blend(&self, cosine: f64, jaccard: f64, matching: f64) -> f64 {
        self.cosine * cosine + self.jaccard * jaccard + self.matching * matching
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlendError {
    #[error("cannot train blend model: {0} scores are empty")]
    EmptyInput(&'static str),
    #[error("cannot train blend model: signal maps share no pairs")]
    NoSharedPairs,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreBlender {
    weights: BlendWeights,
}

impl ScoreBlender {
    pub fn new(weights: BlendWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    pub fn fit(
        &self,
        cosine: &BTreeMap<PairKey, f64>,
        jaccard: &BTreeMap<PairKey, f64>,
        matching: &BTreeMap<PairKey, f64>,
    ) -> Result<BlendModel, BlendError> {
        if cosine.is_empty() {
            return Err(BlendError::EmptyInput("cosine"));
        }
        if jaccard.is_empty() {
            return Err(BlendError::EmptyInput("jaccard"));
        }
        if matching.is_empty() {
            return Err(BlendError::EmptyInput("matching"));
        }

        let rows: Vec<([f64; 3], f64)> = cosine
            .iter()
            .filter_map(|(pair, &c)| {
                let j = *jaccard.get(pair)?;
                let m = *matching.get(pair)?;
                Some(([c, j, m], self.weights.blend(c, j, m)))
            })
            .collect();

        if rows.is_empty() {
            return Err(BlendError::NoSharedPairs);
        }

        Ok(BlendModel::least_squares(&rows))
    }
}

/// Ordinary least squares fit over `[cosine, jaccard, matching]` with an intercept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendModel {
    pub intercept: f64,
    pub coefficients: [f64; 3],
    pub feature_means: [f64; 3],
    pub samples: usize,
}

impl BlendModel {
    fn least_squares(rows: &[([f64; 3], f64)]) -> Self {
        let n = rows.len() as f64;
        let mut means = [0.0; 3];
        let mut target_mean = 0.0;
        for (features, target) in rows {
            for (mean, value) in means.iter_mut().zip(features) {
                *mean += value / n;
            }
            target_mean += target / n;
        }

        let mut gram = [[0.0; 3]; 3];
        let mut moment = [0.0; 3];
        for (features, target) in rows {
            let centered: Vec<f64> = features.iter().zip(&means).map(|(x, m)| x - m).collect();
            let y = target - target_mean;
            for i in 0..3 {
                moment[i] += centered[i] * y;
                for j in 0..3 {
                    gram[i][j] += centered[i] * centered[j];
                }
            }
        }

        let coefficients = solve_normal_equations(gram, moment);
        let intercept = target_mean
            - coefficients
                .iter()
                .zip(&means)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        Self {
            intercept,
            coefficients,
            feature_means: means,
            samples: rows.len(),
        }
    }

    /// Predicts from cosine and matching scores; Jaccard is held at its training mean.
    pub fn predict(&self, cosine: f64, matching: f64) -> f64 {
        self.predict_full(cosine, self.feature_means[1], matching)
    }

    pub fn predict_full(&self, cosine: f64, jaccard: f64, matching: f64) -> f64 {
        self.intercept
            + self.coefficients[0] * cosine
            + self.coefficients[1] * jaccard
            + self.coefficients[2] * matching
    }
}

// Gauss-Jordan with partial pivoting. Columns without a usable pivot are collinear
// with earlier ones (or constant) and get a zero coefficient.
fn solve_normal_equations(gram: [[f64; 3]; 3], moment: [f64; 3]) -> [f64; 3] {
    let mut augmented = [[0.0; 4]; 3];
    for i in 0..3 {
        augmented[i][..3].copy_from_slice(&gram[i]);
        augmented[i][3] = moment[i];
    }

    let scale = 1.0 + (0..3).map(|i| gram[i][i].abs()).fold(0.0, f64::max);
    let mut pivots = Vec::with_capacity(3);
    let mut row = 0;
    for col in 0..3 {
        let Some(best) = (row..3).max_by(|&a, &b| {
            augmented[a][col]
                .abs()
                .total_cmp(&augmented[b][col].abs())
        }) else {
            break;
        };
        if augmented[best][col].abs() <= PIVOT_EPSILON * scale {
            continue;
        }

        augmented.swap(row, best);
        let pivot = augmented[row][col];
        for value in augmented[row].iter_mut() {
            *value /= pivot;
        }
        for other in 0..3 {
            if other == row {
                continue;
            }
            let factor = augmented[other][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..4 {
                augmented[other][k] -= factor * augmented[row][k];
            }
        }
        pivots.push((row, col));
        row += 1;
    }

    let mut solution = [0.0; 3];
    for (row, col) in pivots {
        solution[col] = augmented[row][3];
    }
    solution
}
