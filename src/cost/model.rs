//! Ridge-regularized linear cost model.

use super::features::FEATURE_DIM;
use super::CostError;
use tokio::time::Instant;

/// Linear model `cost = w · x` fitted by ridge regression.
#[derive(Debug, Clone)]
pub struct CostModel {
    pub weights: [f64; FEATURE_DIM],
    /// Mean absolute error on the training samples
    pub mae: f64,
    pub trained_on: usize,
    pub trained_at: Instant,
}

impl CostModel {
    /// Fit `(XᵀX + λI) w = Xᵀy`. The bias term is not regularized.
    pub fn fit(samples: &[([f64; FEATURE_DIM], f64)], lambda: f64) -> Result<Self, CostError> {
        if samples.is_empty() {
            return Err(CostError::InsufficientSamples { have: 0, need: 1 });
        }

        let mut xtx = [[0.0; FEATURE_DIM]; FEATURE_DIM];
        let mut xty = [0.0; FEATURE_DIM];
        for (x, y) in samples {
            for i in 0..FEATURE_DIM {
                xty[i] += x[i] * y;
                for j in 0..FEATURE_DIM {
                    xtx[i][j] += x[i] * x[j];
                }
            }
        }
        for (i, row) in xtx.iter_mut().enumerate().skip(1) {
            row[i] += lambda;
        }

        let weights = solve(xtx, xty).ok_or(CostError::SingularSystem)?;

        let mae = samples
            .iter()
            .map(|(x, y)| (dot(&weights, x) - y).abs())
            .sum::<f64>()
            / samples.len() as f64;

        Ok(Self {
            weights,
            mae,
            trained_on: samples.len(),
            trained_at: Instant::now(),
        })
    }

    pub fn predict(&self, x: &[f64; FEATURE_DIM]) -> Result<f64, CostError> {
        let prediction = dot(&self.weights, x);
        if prediction.is_finite() && prediction >= 0.0 {
            Ok(prediction)
        } else {
            Err(CostError::InvalidPrediction(prediction))
        }
    }

    /// `1 − MAE/|prediction|`, clamped to [0, 1].
    pub fn confidence(&self, prediction: f64) -> f64 {
        if prediction.abs() < f64::EPSILON {
            return 0.0;
        }
        (1.0 - self.mae / prediction.abs()).clamp(0.0, 1.0)
    }
}

fn dot(a: &[f64; FEATURE_DIM], b: &[f64; FEATURE_DIM]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gaussian elimination with partial pivoting. `None` if singular.
fn solve(
    mut a: [[f64; FEATURE_DIM]; FEATURE_DIM],
    mut b: [f64; FEATURE_DIM],
) -> Option<[f64; FEATURE_DIM]> {
    const EPS: f64 = 1e-12;

    for col in 0..FEATURE_DIM {
        let pivot = (col..FEATURE_DIM)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < EPS {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..FEATURE_DIM {
            let factor = a[row][col] / a[col][col];
            for k in col..FEATURE_DIM {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; FEATURE_DIM];
    for row in (0..FEATURE_DIM).rev() {
        let tail: f64 = (row + 1..FEATURE_DIM).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|w| w.is_finite()).then_some(x)
}
