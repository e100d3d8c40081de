/// models/pair_stats.rs — Descriptive statistics of a fitted pair
///
/// Summary numbers shown next to the spread chart: how tightly the two
/// assets co-move, in price and in returns, and how quickly the spread
/// mean-reverts.
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data::AlignedSeries;
use crate::models::ou_process::OuParams;
use crate::models::spread::{pearson, SpreadModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStatistics {
    /// Full-window Pearson correlation of prices
    pub pearson_corr: Option<f64>,
    /// Pearson correlation of simple bar returns
    pub returns_corr: Option<f64>,
    /// std(returns2) / std(returns1)
    pub volatility_ratio: Option<f64>,
    /// √mean(s_t²) of the regression residuals
    pub regression_std_error: f64,
    pub current_rolling_corr: Option<f64>,
    /// Mean over the defined rolling-correlation values
    pub mean_rolling_corr: Option<f64>,
    /// OU fit of the spread; `None` when it does not mean-revert
    pub ou: Option<OuParams>,
}

impl PairStatistics {
    pub fn compute(aligned: &AlignedSeries, model: &SpreadModel) -> Self {
        let p1 = aligned.price1();
        let p2 = aligned.price2();

        let (r1, r2) = paired_returns(&p1, &p2);
        let volatility_ratio = if r1.len() >= 2 {
            let s1 = r1.iter().std_dev();
            let s2 = r2.iter().std_dev();
            (s1 > 0.0 && s2.is_finite()).then(|| s2 / s1)
        } else {
            None
        };

        let regression_std_error = if model.spread.is_empty() {
            0.0
        } else {
            (model.spread.iter().map(|s| s * s).sum::<f64>() / model.spread.len() as f64).sqrt()
        };

        let defined: Vec<f64> = model.rolling_corr.iter().flatten().copied().collect();
        let mean_rolling_corr = (!defined.is_empty()).then(|| defined.iter().mean());

        Self {
            pearson_corr: pearson(&p1, &p2),
            returns_corr: pearson(&r1, &r2),
            volatility_ratio,
            regression_std_error,
            current_rolling_corr: model.current_rolling_corr(),
            mean_rolling_corr,
            ou: OuParams::estimate(&model.spread),
        }
    }

    pub fn half_life(&self) -> Option<f64> {
        self.ou.as_ref().map(|p| p.half_life)
    }
}

/// Simple returns of both legs, keeping only bars where both are defined.
fn paired_returns(p1: &[f64], p2: &[f64]) -> (Vec<f64>, Vec<f64>) {
    p1.windows(2)
        .zip(p2.windows(2))
        .filter_map(|(a, b)| {
            let ra = a[1] / a[0] - 1.0;
            let rb = b[1] / b[0] - 1.0;
            (ra.is_finite() && rb.is_finite()).then_some((ra, rb))
        })
        .unzip()
}
