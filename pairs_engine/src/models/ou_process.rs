/// models/ou_process.rs — Ornstein-Uhlenbeck fit of the spread
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// The OU SDE (continuous time):
///
///   dX_t = θ(μ − X_t)dt + σ_OU · dW_t
///
/// AR(1) DISCRETISATION (Δt = 1 bar):
///
///   X_t = a + b·X_{t-1} + ε_t,    ε_t ~ N(0, σ²_ε)
///
/// Parameter mapping from OLS regression:
///
///   b̂  = OLS slope      →  θ̂ = −ln(b̂)
///   â  = OLS intercept  →  μ̂ = â / (1 − b̂)
///   σ̂_OU = std(residuals) / √(1 − b̂²)
///
/// HALF-LIFE of mean reversion (bars):
///
///   t½ = ln(2) / θ = −ln(2) / ln(b̂)
///
/// Applied to the residual spread, t½ tells how many bars a dislocation
/// takes to decay halfway back to equilibrium.
/// ─────────────────────────────────────────────────────────────────────────
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::ols::ols;

const MIN_POINTS: usize = 10;

/// Fitted OU parameters of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuParams {
    /// Equilibrium level
    pub mu: f64,
    pub sigma_ou: f64,
    /// Reversion speed per bar
    pub theta: f64,
    /// AR(1) slope, e^{−θ}
    pub b: f64,
    /// Bars for a dislocation to decay halfway
    pub half_life: f64,
}

impl OuParams {
    /// AR(1) regression of each value on the one before it.
    ///
    /// `None` below 10 points, or when the slope is outside (0, 1), i.e. the
    /// series trends or oscillates instead of reverting.
    pub fn estimate(series: &[f64]) -> Option<Self> {
        if series.len() < MIN_POINTS {
            return None;
        }
        let lagged = Array1::from(series[..series.len() - 1].to_vec());
        let current = Array1::from(series[1..].to_vec());
        let fit = ols(&lagged, &current)?;

        let b = fit.beta;
        if !(b > 0.0 && b < 1.0) {
            return None;
        }
        let stationary_scale = (1.0 - b * b).sqrt();
        if stationary_scale < 1e-10 {
            return None;
        }

        let theta = -b.ln();
        Some(OuParams {
            mu: fit.alpha / (1.0 - b),
            sigma_ou: fit.residuals.iter().std_dev() / stationary_scale,
            theta,
            b,
            half_life: std::f64::consts::LN_2 / theta,
        })
    }
}
