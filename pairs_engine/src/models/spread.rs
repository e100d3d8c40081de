/// models/spread.rs — OLS Hedge Ratio, Spread and Z-Score
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// Static hedge regression of asset 2 on asset 1 (intercept included):
///
///   P2_t = α + β·P1_t + s_t
///
///   β̂ = Σ(x_i − x̄)(y_i − ȳ) / Σ(x_i − x̄)²
///   α̂ = ȳ − β̂·x̄
///   R² = 1 − Σ s_t² / Σ(y_i − ȳ)²
///
/// Spread (residual) and its standardised score:
///
///   s_t = P2_t − (α̂ + β̂·P1_t)
///   Z_t = (s_t − mean(s)) / std(s)
///
///   std is the SAMPLE standard deviation (ddof = 1), so the Z series has
///   sample mean 0 and sample std 1.
///
/// Rolling correlation over the trailing w bars ending at t:
///
///   ρ_t = Pearson(P1[t−w+1..=t], P2[t−w+1..=t]),  undefined for t < w − 1
///
/// The fit is done once over the full window supplied; no walk-forward refit.
/// ─────────────────────────────────────────────────────────────────────────
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::AlignedSeries;
use crate::error::{PairsError, Result};
use crate::models::ols::{DEGENERATE_REL_EPS, ols};

/// Immutable result of one spread fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadModel {
    /// Regression intercept α̂
    pub alpha: f64,
    /// Hedge ratio β̂
    pub beta: f64,
    pub r_squared: f64,
    /// Residual spread, one value per aligned bar
    pub spread: Vec<f64>,
    /// Mean of `spread` over the full window
    pub mean: f64,
    /// Sample std of `spread` over the full window
    pub std: f64,
    pub zscore: Vec<f64>,
    /// Pearson correlation of the trailing `corr_window` bars; `None` while
    /// the window is not yet full or has zero variance.
    pub rolling_corr: Vec<Option<f64>>,
    pub corr_window: usize,
}

impl SpreadModel {
    /// Fit the hedge regression and derive spread, z-score and rolling
    /// correlation.  Pure: identical inputs give bit-identical outputs.
    pub fn fit(aligned: &AlignedSeries, corr_window: usize) -> Result<Self> {
        let n = aligned.len();
        if n < 2 {
            return Err(PairsError::degenerate(
                "regression",
                format!("at least 2 aligned bars required, got {n}"),
            ));
        }
        if corr_window < 2 {
            return Err(PairsError::invalid_config(
                "corr_window",
                format!("must be >= 2, got {corr_window}"),
            ));
        }

        let p1 = aligned.price1();
        let p2 = aligned.price2();
        let Some(fit) = ols(&Array1::from(p1.clone()), &Array1::from(p2.clone())) else {
            return Err(PairsError::degenerate(
                "regression",
                format!("{} has zero variance; hedge ratio undefined", aligned.name1),
            ));
        };
        let (alpha, beta) = (fit.alpha, fit.beta);
        let r_squared = fit.r_squared();
        let spread_arr = fit.residuals;

        let mean = spread_arr.mean().unwrap_or(0.0);
        let std = spread_arr.std(1.0);

        let y_scale = p2.iter().sum::<f64>().abs() / n as f64;
        if !(std > DEGENERATE_REL_EPS * y_scale.max(1.0)) {
            return Err(PairsError::degenerate(
                "spread",
                format!(
                    "spread of {} on {} is constant (std = {std:e}); z-score undefined",
                    aligned.name2, aligned.name1
                ),
            ));
        }

        let zscore = spread_arr.mapv(|s| (s - mean) / std).to_vec();
        let rolling_corr = rolling_corr(&p1, &p2, corr_window);

        tracing::debug!(alpha, beta, r_squared, mean, std, "spread model fitted on {n} bars");

        Ok(Self {
            alpha,
            beta,
            r_squared,
            spread: spread_arr.to_vec(),
            mean,
            std,
            zscore,
            rolling_corr,
            corr_window,
        })
    }

    pub fn len(&self) -> usize {
        self.spread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spread.is_empty()
    }

    /// Fitted value α̂ + β̂·price1.
    pub fn fitted(&self, price1: f64) -> f64 {
        self.alpha + self.beta * price1
    }

    pub fn current_zscore(&self) -> Option<f64> {
        self.zscore.last().copied()
    }

    /// Latest defined rolling correlation.
    pub fn current_rolling_corr(&self) -> Option<f64> {
        self.rolling_corr.last().copied().flatten()
    }
}

/// Pearson correlation; `None` for mismatched / short input or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Trailing-window Pearson correlation, aligned to the input index.
pub fn rolling_corr(x: &[f64], y: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = x.len().min(y.len());
    (0..n)
        .map(|t| {
            if window < 2 || t + 1 < window {
                None
            } else {
                let start = t + 1 - window;
                pearson(&x[start..=t], &y[start..=t])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AlignedBar;
    use crate::error::ErrorKind;
    use chrono::{Duration, TimeZone, Utc};

    fn aligned(p1: &[f64], p2: &[f64]) -> AlignedSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = p1
            .iter()
            .zip(p2)
            .enumerate()
            .map(|(i, (&price1, &price2))| AlignedBar {
                timestamp: t0 + Duration::days(i as i64),
                price1,
                price2,
            })
            .collect();
        AlignedSeries::new("A", "B", bars).unwrap()
    }

    #[test]
    fn recovers_linear_relation_with_noise() {
        let p1: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let noise = [0.3, -0.2, 0.1, -0.4, 0.2];
        let p2: Vec<f64> = p1.iter().enumerate().map(|(i, x)| 5.0 + 2.0 * x + noise[i % 5]).collect();
        let m = SpreadModel::fit(&aligned(&p1, &p2), 10).unwrap();
        assert!((m.beta - 2.0).abs() < 0.01, "beta = {}", m.beta);
        assert!((m.alpha - 5.0).abs() < 1.0, "alpha = {}", m.alpha);
        assert!(m.r_squared > 0.999);
        assert_eq!(m.spread.len(), 50);
        assert_eq!(m.zscore.len(), 50);
    }

    #[test]
    fn zscore_is_standardised() {
        let p1: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1).collect();
        let p2: Vec<f64> = p1.iter().enumerate().map(|(i, x)| 1.5 * x + (i as f64 * 1.3).cos()).collect();
        let m = SpreadModel::fit(&aligned(&p1, &p2), 5).unwrap();
        let n = m.zscore.len() as f64;
        let mean = m.zscore.iter().sum::<f64>() / n;
        let var = m.zscore.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(mean.abs() < 1e-9);
        assert!((var.sqrt() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identical_series_are_degenerate() {
        let p: Vec<f64> = (0..30).map(|i| 10.0 + (i as f64).sqrt()).collect();
        let err = SpreadModel::fit(&aligned(&p, &p), 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateInput);
        match err {
            PairsError::DegenerateInput { stage, .. } => assert_eq!(stage, "spread"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn constant_regressor_is_degenerate() {
        let p1 = vec![10.0; 10];
        let p2: Vec<f64> = (0..10).map(|i| i as f64).collect();
        match SpreadModel::fit(&aligned(&p1, &p2), 3).unwrap_err() {
            PairsError::DegenerateInput { stage, .. } => assert_eq!(stage, "regression"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn single_bar_is_degenerate() {
        let err = SpreadModel::fit(&aligned(&[1.0], &[2.0]), 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    }

    #[test]
    fn rolling_corr_is_undefined_before_window_fills() {
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let rc = rolling_corr(&x, &y, 3);
        assert_eq!(rc.len(), 6);
        assert!(rc[0].is_none() && rc[1].is_none());
        for v in &rc[2..] {
            assert!((v.unwrap() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn pearson_anti_correlated() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&x, &y).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), None);
    }
}
