//! Ridge regression over the five price features.
//!
//! The fit minimises `‖Xβ − y‖² / n + α‖β‖²` over every coefficient,
//! including the bias, which reduces to the normal equations
//! `(XᵀX + α·n·I) β = Xᵀy`. With `α > 0` the system is symmetric positive
//! definite and is solved by Cholesky decomposition.

use crate::config::PredictionConfig;
use crate::error::{AppError, Result};
use crate::models::{AccuracyWarning, Diagnostics, FeatureVector, TrainedModel, FEATURE_COUNT};
use crate::services::features::Dataset;

type Matrix = [[f64; FEATURE_COUNT]; FEATURE_COUNT];
type Vector = [f64; FEATURE_COUNT];

/// Result of one fit-and-predict call.
#[derive(Debug, Clone)]
pub struct RegressionOutcome {
    pub prediction: f64,
    pub model: TrainedModel,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct RegressionEngine {
    train_fraction: f64,
    ridge_alpha: f64,
    min_sample_size: usize,
    max_nrmse: f64,
}

impl RegressionEngine {
    pub fn new(
        train_fraction: f64,
        ridge_alpha: f64,
        min_sample_size: usize,
        max_nrmse: f64,
    ) -> Self {
        RegressionEngine {
            train_fraction,
            ridge_alpha,
            min_sample_size,
            max_nrmse,
        }
    }

    pub fn from_config(config: &PredictionConfig) -> Self {
        Self::new(
            config.train_fraction,
            config.ridge_alpha,
            config.min_sample_size,
            config.max_nrmse,
        )
    }

    /// Split, fit, validate on the held-out rows, and predict at `query`.
    ///
    /// Rows are split positionally, so `dataset` must already be shuffled.
    pub fn fit_and_predict(
        &self,
        dataset: &Dataset,
        query: &FeatureVector,
    ) -> Result<RegressionOutcome> {
        if dataset.features.len() != dataset.prices.len() {
            return Err(AppError::Model(format!(
                "{} feature rows but {} prices",
                dataset.features.len(),
                dataset.prices.len()
            )));
        }
        let n = dataset.len();
        if n == 0 {
            return Err(AppError::InsufficientData(
                "No comparable transactions to fit a model on".to_string(),
            ));
        }

        let (train_size, test_size) = split_sizes(n, self.train_fraction);
        let (train_x, test_x) = dataset.features.split_at(train_size);
        let (train_y, test_y) = dataset.prices.split_at(train_size);

        let coefficients = fit_ridge(train_x, train_y, self.ridge_alpha)?;
        let (rmse, nrmse) = validate(&coefficients, test_x, test_y);
        let model = TrainedModel {
            coefficients,
            rmse,
            nrmse,
        };

        let warnings = self.quality_warnings(n, nrmse);
        for warning in &warnings {
            tracing::warn!("Model might be inaccurate: {}", warning);
        }

        let prediction = model.predict(query);
        tracing::debug!(
            "Fitted on {} rows, tested on {}: coefficients {:?}, rmse {:?}, nrmse {:?}",
            train_size,
            test_size,
            model.coefficients,
            rmse,
            nrmse
        );

        Ok(RegressionOutcome {
            prediction,
            diagnostics: Diagnostics {
                sample_count: n,
                train_size,
                test_size,
                rmse,
                nrmse,
                warnings,
            },
            model,
        })
    }

    /// Advisory warnings. An unavailable nrmse never counts as high.
    pub fn quality_warnings(
        &self,
        sample_count: usize,
        nrmse: Option<f64>,
    ) -> Vec<AccuracyWarning> {
        let mut warnings = Vec::new();
        if sample_count < self.min_sample_size {
            warnings.push(AccuracyWarning::LowSampleCount {
                count: sample_count,
                minimum: self.min_sample_size,
            });
        }
        if let Some(nrmse) = nrmse {
            if nrmse > self.max_nrmse {
                warnings.push(AccuracyWarning::HighNormalizedError {
                    nrmse,
                    maximum: self.max_nrmse,
                });
            }
        }
        warnings
    }
}

/// `(train, test)` row counts: `ceil(fraction · n)` rows train, the rest test.
pub fn split_sizes(n: usize, train_fraction: f64) -> (usize, usize) {
    let train = ((n as f64) * train_fraction).ceil() as usize;
    let train = train.min(n);
    (train, n - train)
}

pub fn fit_ridge(features: &[FeatureVector], prices: &[f64], alpha: f64) -> Result<Vector> {
    let n = features.len();
    if n == 0 {
        return Err(AppError::InsufficientData("Training set is empty".to_string()));
    }

    let mut gram: Matrix = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];
    let mut rhs: Vector = [0.0; FEATURE_COUNT];

    for (row, &y) in features.iter().zip(prices) {
        let x = row.as_array();
        for i in 0..FEATURE_COUNT {
            rhs[i] += x[i] * y;
            for j in 0..=i {
                gram[i][j] += x[i] * x[j];
            }
        }
    }

    let penalty = alpha * n as f64;
    for i in 0..FEATURE_COUNT {
        gram[i][i] += penalty;
        for j in 0..i {
            gram[j][i] = gram[i][j];
        }
    }

    cholesky_solve(&gram, &rhs)
}

/// Held-out RMSE and range-normalised RMSE. Both are `None` without a test
/// set; `nrmse` is also `None` when the test prices have zero range.
pub fn validate(
    coefficients: &Vector,
    features: &[FeatureVector],
    prices: &[f64],
) -> (Option<f64>, Option<f64>) {
    if features.is_empty() {
        return (None, None);
    }

    let model = TrainedModel {
        coefficients: *coefficients,
        rmse: None,
        nrmse: None,
    };
    let sse: f64 = features
        .iter()
        .zip(prices)
        .map(|(x, y)| (model.predict(x) - y).powi(2))
        .sum();
    let rmse = (sse / features.len() as f64).sqrt();

    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let nrmse = Some(rmse / (max - min)).filter(|v| v.is_finite());

    (Some(rmse), nrmse)
}

fn cholesky_solve(a: &Matrix, b: &Vector) -> Result<Vector> {
    let mut l: Matrix = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];

    for i in 0..FEATURE_COUNT {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = a[i][i] - dot;
                if !(d > 0.0 && d.is_finite()) {
                    return Err(AppError::Model(
                        "Normal equations are not positive definite".to_string(),
                    ));
                }
                l[i][i] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - dot) / l[j][j];
            }
        }
    }

    // L z = b
    let mut z: Vector = [0.0; FEATURE_COUNT];
    for i in 0..FEATURE_COUNT {
        let dot: f64 = (0..i).map(|k| l[i][k] * z[k]).sum();
        z[i] = (b[i] - dot) / l[i][i];
    }

    // Lᵀ x = z
    let mut x: Vector = [0.0; FEATURE_COUNT];
    for i in (0..FEATURE_COUNT).rev() {
        let dot: f64 = (i + 1..FEATURE_COUNT).map(|k| l[k][i] * x[k]).sum();
        x[i] = (z[i] - dot) / l[i][i];
    }

    Ok(x)
}
