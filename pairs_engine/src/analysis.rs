/// analysis.rs — End-to-end pair pipeline
///
///   PriceSeries ×2 ─align─▶ AlignedSeries ─fit─▶ SpreadModel ─┬─▶ SignalSeries
///                                                             ├─▶ PairStatistics
///                                                             └─▶ run_backtest ─▶ PerfReport
///
/// Every entry point validates the `StrategyConfig` before touching data.
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::{run_backtest, BacktestResult};
use crate::config::StrategyConfig;
use crate::data::{align, AlignedSeries, PriceSeries};
use crate::error::Result;
use crate::metrics::{compute_metrics, PerfReport};
use crate::models::{PairStatistics, SpreadModel};
use crate::signals::{classify_with, SignalSeries, SignalState};

/// Spread model, signals and descriptive statistics of one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAnalysis {
    pub name1: String,
    pub name2: String,
    pub model: SpreadModel,
    pub signals: SignalSeries,
    pub current_state: SignalState,
    /// `current_state` with the legs spelled out
    pub current_label: String,
    pub stats: PairStatistics,
}

/// Analysis plus the backtest run on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsRun {
    pub analysis: PairAnalysis,
    pub backtest: BacktestResult,
    pub metrics: PerfReport,
}

pub fn analyze(aligned: &AlignedSeries, cfg: &StrategyConfig) -> Result<PairAnalysis> {
    cfg.validate()?;
    let thresholds = cfg.thresholds()?;

    let model = SpreadModel::fit(aligned, cfg.corr_window)?;
    let signals = classify_with(&model.zscore, &thresholds);
    let current_state = signals.current().unwrap_or(SignalState::NoSignal);
    let stats = PairStatistics::compute(aligned, &model);

    info!(
        "{} / {}: β={:.4} α={:.4} R²={:.3} Z={:+.2} → {}",
        aligned.name1,
        aligned.name2,
        model.beta,
        model.alpha,
        model.r_squared,
        model.current_zscore().unwrap_or(0.0),
        current_state
    );

    Ok(PairAnalysis {
        name1: aligned.name1.clone(),
        name2: aligned.name2.clone(),
        current_label: current_state.label(&aligned.name1, &aligned.name2),
        model,
        signals,
        current_state,
        stats,
    })
}

pub fn run(aligned: &AlignedSeries, cfg: &StrategyConfig, periods_per_year: f64) -> Result<PairsRun> {
    let analysis = analyze(aligned, cfg)?;
    let backtest = run_backtest(aligned, &analysis.model, cfg)?;
    let metrics = compute_metrics(&backtest, aligned, periods_per_year);
    Ok(PairsRun { analysis, backtest, metrics })
}

/// Align two raw series and run the full pipeline on the overlap.
pub fn run_series(
    series1: &PriceSeries,
    series2: &PriceSeries,
    cfg: &StrategyConfig,
    periods_per_year: f64,
) -> Result<PairsRun> {
    cfg.validate()?;
    let aligned = align(series1, series2)?;
    run(&aligned, cfg, periods_per_year)
}
