//! Weighted linear regression behind a narrow solver interface
//!
//! The rating model only hands over a design matrix, a target vector and
//! per-row weights and gets an intercept plus a coefficient per column back.
//! Any solver that implements [`RegressionSolver`] can be swapped in.

use crate::error::RegressionError;
use std::fmt::Debug;

/// Dense row-major design matrix
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }
}

/// Result of a fit: `target ≈ intercept + design · coefficients`
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

pub trait RegressionSolver: Send + Sync + Debug {
    fn solve(
        &self,
        design: &DesignMatrix,
        target: &[f64],
        weights: &[f64],
    ) -> Result<RegressionFit, RegressionError>;
}

/// Weighted least squares via damped normal equations
///
/// Columns and target are centred on their weighted means, then
/// `(XᵀWX + λI) β = XᵀWy` is solved with Gaussian elimination and partial
/// pivoting. `λ` is `ridge` times the mean diagonal of `XᵀWX`, so collinear
/// columns settle on the minimum-norm solution rather than blowing up. The
/// intercept is recovered from the means and is never damped.
#[derive(Debug, Clone)]
pub struct WeightedLeastSquares {
    ridge: f64,
    fit_intercept: bool,
}

impl WeightedLeastSquares {
    /// Fewer observations than this cannot be fitted
    pub const MIN_OBSERVATIONS: usize = 2;

    pub fn new(ridge: f64) -> Self {
        Self {
            ridge: ridge.max(0.0),
            fit_intercept: true,
        }
    }

    /// Fit with the intercept pinned to zero
    pub fn through_origin(mut self) -> Self {
        self.fit_intercept = false;
        self
    }
}

impl Default for WeightedLeastSquares {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl RegressionSolver for WeightedLeastSquares {
    fn solve(
        &self,
        design: &DesignMatrix,
        target: &[f64],
        weights: &[f64],
    ) -> Result<RegressionFit, RegressionError> {
        let (n, p) = (design.rows(), design.cols());
        if target.len() != n || weights.len() != n {
            return Err(RegressionError::ShapeMismatch {
                reason: format!(
                    "{} rows, {} targets, {} weights",
                    n,
                    target.len(),
                    weights.len()
                ),
            });
        }
        if n < Self::MIN_OBSERVATIONS {
            return Err(RegressionError::NotEnoughObservations {
                observations: n,
                required: Self::MIN_OBSERVATIONS,
            });
        }

        let total_weight: f64 = weights.iter().sum();
        if !(total_weight > 0.0) || !total_weight.is_finite() {
            return Err(RegressionError::ZeroWeight);
        }

        let (column_means, target_mean) = if self.fit_intercept {
            let mut means = vec![0.0; p];
            let mut target_mean = 0.0;
            for row in 0..n {
                let w = weights[row] / total_weight;
                for (mean, x) in means.iter_mut().zip(design.row(row)) {
                    *mean += w * x;
                }
                target_mean += w * target[row];
            }
            (means, target_mean)
        } else {
            (vec![0.0; p], 0.0)
        };

        if p == 0 {
            return Ok(RegressionFit {
                intercept: target_mean,
                coefficients: Vec::new(),
            });
        }

        // Normal equations, augmented with the right-hand side in column p
        let width = p + 1;
        let mut system = vec![0.0; p * width];
        let mut x = vec![0.0; p];
        for row in 0..n {
            let w = weights[row];
            if w == 0.0 {
                continue;
            }
            for (i, value) in design.row(row).iter().enumerate() {
                x[i] = value - column_means[i];
            }
            let y = target[row] - target_mean;
            for i in 0..p {
                if x[i] == 0.0 {
                    continue;
                }
                let wx = w * x[i];
                for j in 0..p {
                    system[i * width + j] += wx * x[j];
                }
                system[i * width + p] += wx * y;
            }
        }

        let trace: f64 = (0..p).map(|i| system[i * width + i]).sum();
        if !(trace > 0.0) {
            return Err(RegressionError::Singular { column: 0 });
        }
        let damping = self.ridge * trace / p as f64;
        for i in 0..p {
            system[i * width + i] += damping;
        }

        let coefficients = gaussian_elimination(&mut system, p)?;
        let intercept = target_mean
            - column_means
                .iter()
                .zip(&coefficients)
                .map(|(mean, c)| mean * c)
                .sum::<f64>();
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(RegressionError::NonFinite);
        }
        Ok(RegressionFit {
            intercept,
            coefficients,
        })
    }
}

/// Solve an augmented `p × (p + 1)` system in place
fn gaussian_elimination(system: &mut [f64], p: usize) -> Result<Vec<f64>, RegressionError> {
    let width = p + 1;
    let scale = (0..p)
        .map(|i| system[i * width + i].abs())
        .fold(0.0, f64::max);
    let tolerance = scale * 1e-12;

    for col in 0..p {
        let pivot = (col..p)
            .max_by(|&a, &b| {
                system[a * width + col]
                    .abs()
                    .total_cmp(&system[b * width + col].abs())
            })
            .unwrap_or(col);

        if system[pivot * width + col].abs() <= tolerance {
            return Err(RegressionError::Singular { column: col });
        }
        if pivot != col {
            for k in 0..width {
                system.swap(col * width + k, pivot * width + k);
            }
        }

        let lead = system[col * width + col];
        for row in col + 1..p {
            let factor = system[row * width + col] / lead;
            if factor == 0.0 {
                continue;
            }
            for k in col..width {
                system[row * width + k] -= factor * system[col * width + k];
            }
        }
    }

    let mut solution = vec![0.0; p];
    for row in (0..p).rev() {
        let mut value = system[row * width + p];
        for k in row + 1..p {
            value -= system[row * width + k] * solution[k];
        }
        solution[row] = value / system[row * width + row];
    }
    Ok(solution)
}
