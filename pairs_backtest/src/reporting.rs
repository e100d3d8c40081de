/// reporting.rs — Pairs backtest reporting and export
///
/// Builds a serialisable report from one pipeline run and writes it out.
///
/// Features:
/// - Text summary (model, current signal, pair statistics, performance)
/// - JSON report (metadata, model, statistics, metrics, trade ledger)
/// - CSV trade ledger and per-bar analysis table via polars
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use pairs_engine::{AlignedSeries, PairStatistics, PairsRun, PerfReport, Position, StrategyConfig, Trade};

/// Serialisable summary of one pairs run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub metadata: ReportMetadata,
    pub model: ModelSummary,
    pub statistics: PairStatistics,
    pub performance: PerfReport,
    pub trades: Vec<Trade>,
    pub open_position: Option<Position>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub asset1: String,
    pub asset2: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub bars: usize,
    pub config: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub alpha: f64,
    pub beta: f64,
    pub r_squared: f64,
    pub spread_mean: f64,
    pub spread_std: f64,
    pub current_zscore: Option<f64>,
    pub current_signal: String,
}

impl BacktestReport {
    pub fn build(run: &PairsRun, aligned: &AlignedSeries, config: &StrategyConfig) -> Self {
        let a = &run.analysis;
        Self {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                asset1: a.name1.clone(),
                asset2: a.name2.clone(),
                start_time: aligned.first().map(|b| b.timestamp),
                end_time: aligned.last().map(|b| b.timestamp),
                bars: aligned.len(),
                config: config.clone(),
            },
            model: ModelSummary {
                alpha: a.model.alpha,
                beta: a.model.beta,
                r_squared: a.model.r_squared,
                spread_mean: a.model.mean,
                spread_std: a.model.std,
                current_zscore: a.model.current_zscore(),
                current_signal: a.current_label.clone(),
            },
            statistics: a.stats.clone(),
            performance: run.metrics.clone(),
            trades: run.backtest.trades.clone(),
            open_position: run.backtest.open_position.clone(),
        }
    }
}

impl std::fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.metadata;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "PAIR: {} / {}", m.asset1, m.asset2)?;
        if let (Some(s), Some(e)) = (m.start_time, m.end_time) {
            writeln!(f, "Period: {} to {} ({} bars)", s.format("%Y-%m-%d"), e.format("%Y-%m-%d"), m.bars)?;
        }
        writeln!(f, "{}", "=".repeat(60))?;

        writeln!(f, "\nSPREAD MODEL:")?;
        writeln!(f, "  {} = {:.4} + {:.4} × {} + spread", m.asset2, self.model.alpha, self.model.beta, m.asset1)?;
        writeln!(f, "  R²: {:.4}", self.model.r_squared)?;
        writeln!(f, "  Spread mean / std: {:.4} / {:.4}", self.model.spread_mean, self.model.spread_std)?;
        match self.model.current_zscore {
            Some(z) => writeln!(f, "  Current Z-score: {z:+.3}")?,
            None => writeln!(f, "  Current Z-score: N/A")?,
        }
        writeln!(f, "  Signal: {}", self.model.current_signal)?;

        let s = &self.statistics;
        writeln!(f, "\nPAIR STATISTICS:")?;
        writeln!(f, "  Price correlation:    {}", opt(s.pearson_corr, 3))?;
        writeln!(f, "  Returns correlation:  {}", opt(s.returns_corr, 3))?;
        writeln!(f, "  Rolling corr (last):  {}", opt(s.current_rolling_corr, 3))?;
        writeln!(f, "  Rolling corr (mean):  {}", opt(s.mean_rolling_corr, 3))?;
        writeln!(f, "  Volatility ratio:     {}", opt(s.volatility_ratio, 3))?;
        writeln!(f, "  Regression std error: {:.4}", s.regression_std_error)?;
        writeln!(f, "  Half-life (bars):     {}", opt(s.half_life(), 1))?;

        writeln!(f)?;
        write!(f, "{}", self.performance)?;

        if !self.trades.is_empty() {
            writeln!(f, "\nTRADES:")?;
            for t in &self.trades {
                writeln!(
                    f,
                    "  {} → {}  {:<12} Z {:+.2} → {:+.2}  PnL {:>+10.2} ({:+.2}%)  {}",
                    t.entry_date.format("%Y-%m-%d"),
                    t.exit_date.format("%Y-%m-%d"),
                    t.direction.to_string(),
                    t.entry_zscore,
                    t.exit_zscore,
                    t.pnl,
                    t.pnl_pct,
                    t.exit_reason
                )?;
            }
        }
        if let Some(p) = &self.open_position {
            writeln!(
                f,
                "\nOPEN: {} since {} (Z {:+.2}, notional {:.2})",
                p.direction,
                p.entry_date.format("%Y-%m-%d"),
                p.entry_zscore,
                p.notional_value
            )?;
        }
        Ok(())
    }
}

fn opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "N/A".to_string(),
    }
}

/// Report writer configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Write `<base>.json`
    pub export_json: bool,
    /// Write `<base>_trades.csv` and `<base>_bars.csv`
    pub export_csv: bool,
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { export_json: true, export_csv: true, output_dir: PathBuf::from("./reports") }
    }
}

pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Write every enabled export; returns the paths written.
    pub fn export(&self, report: &BacktestReport, run: &PairsRun, aligned: &AlignedSeries) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.config.output_dir)?;
        let base = format!("{}_{}", report.metadata.asset1, report.metadata.asset2);
        let mut written = Vec::new();

        if self.config.export_json {
            let path = self.config.output_dir.join(format!("{base}.json"));
            fs::write(&path, serde_json::to_string_pretty(report)?)?;
            info!("JSON report exported to: {}", path.display());
            written.push(path);
        }

        if self.config.export_csv {
            let path = self.config.output_dir.join(format!("{base}_trades.csv"));
            write_csv(&path, &mut trades_frame(&run.backtest.trades)?)?;
            info!("CSV trade ledger exported to: {}", path.display());
            written.push(path);

            let path = self.config.output_dir.join(format!("{base}_bars.csv"));
            write_csv(&path, &mut bars_frame(run, aligned)?)?;
            info!("CSV bar table exported to: {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

pub fn trades_frame(trades: &[Trade]) -> PolarsResult<DataFrame> {
    df!(
        "entry_date" => trades.iter().map(|t| t.entry_date.to_rfc3339()).collect::<Vec<_>>(),
        "exit_date" => trades.iter().map(|t| t.exit_date.to_rfc3339()).collect::<Vec<_>>(),
        "direction" => trades.iter().map(|t| t.direction.to_string()).collect::<Vec<_>>(),
        "entry_price1" => trades.iter().map(|t| t.entry_price1).collect::<Vec<_>>(),
        "entry_price2" => trades.iter().map(|t| t.entry_price2).collect::<Vec<_>>(),
        "exit_price1" => trades.iter().map(|t| t.exit_price1).collect::<Vec<_>>(),
        "exit_price2" => trades.iter().map(|t| t.exit_price2).collect::<Vec<_>>(),
        "shares1" => trades.iter().map(|t| t.shares1).collect::<Vec<_>>(),
        "shares2" => trades.iter().map(|t| t.shares2).collect::<Vec<_>>(),
        "entry_zscore" => trades.iter().map(|t| t.entry_zscore).collect::<Vec<_>>(),
        "exit_zscore" => trades.iter().map(|t| t.exit_zscore).collect::<Vec<_>>(),
        "notional" => trades.iter().map(|t| t.notional_value).collect::<Vec<_>>(),
        "costs" => trades.iter().map(|t| t.entry_cost + t.exit_cost).collect::<Vec<_>>(),
        "pnl" => trades.iter().map(|t| t.pnl).collect::<Vec<_>>(),
        "pnl_pct" => trades.iter().map(|t| t.pnl_pct).collect::<Vec<_>>(),
        "exit_reason" => trades.iter().map(|t| t.exit_reason.as_str()).collect::<Vec<_>>(),
        "holding_days" => trades.iter().map(|t| t.holding_days).collect::<Vec<_>>(),
    )
}

/// One row per aligned bar: prices, spread, z-score, rolling correlation,
/// signal state and the simulated portfolio.
pub fn bars_frame(run: &PairsRun, aligned: &AlignedSeries) -> PolarsResult<DataFrame> {
    let model = &run.analysis.model;
    let path = &run.backtest.portfolio;
    df!(
        "timestamp" => aligned.bars().iter().map(|b| b.timestamp.to_rfc3339()).collect::<Vec<_>>(),
        "price1" => aligned.price1(),
        "price2" => aligned.price2(),
        "spread" => model.spread.clone(),
        "zscore" => model.zscore.clone(),
        "rolling_corr" => model.rolling_corr.clone(),
        "signal" => run.analysis.signals.states.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        "cash" => path.iter().map(|p| p.cash).collect::<Vec<_>>(),
        "position_value" => path.iter().map(|p| p.position_value).collect::<Vec<_>>(),
        "portfolio_value" => path.iter().map(|p| p.portfolio_value).collect::<Vec<_>>(),
        "position" => path.iter().map(|p| p.direction.as_i8() as i32).collect::<Vec<_>>(),
    )
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
