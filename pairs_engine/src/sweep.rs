/// sweep.rs — Parallel parameter sweep
///
/// Each configuration is an independent backtest: it fits its own model and
/// owns its own position and ledger, so runs share nothing mutable and fan
/// out over the rayon pool.  A failing row is reported in place; it does not
/// abort the sweep.
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::analysis;
use crate::config::StrategyConfig;
use crate::data::AlignedSeries;
use crate::error::Result;
use crate::metrics::PerfReport;

/// Cartesian product of threshold / risk values over a base config.
///
/// Axes left unset keep the base value.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    base: StrategyConfig,
    entry_thresholds: Vec<f64>,
    exit_thresholds: Vec<f64>,
    stop_losses: Vec<f64>,
    take_profits: Vec<f64>,
}

impl ParameterGrid {
    pub fn new(base: StrategyConfig) -> Self {
        Self {
            entry_thresholds: vec![base.entry_threshold],
            exit_thresholds: vec![base.exit_threshold],
            stop_losses: vec![base.stop_loss_pct],
            take_profits: vec![base.take_profit_pct],
            base,
        }
    }

    pub fn entry_thresholds(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.entry_thresholds = non_empty(values.into(), self.base.entry_threshold);
        self
    }

    pub fn exit_thresholds(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.exit_thresholds = non_empty(values.into(), self.base.exit_threshold);
        self
    }

    pub fn stop_losses(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.stop_losses = non_empty(values.into(), self.base.stop_loss_pct);
        self
    }

    pub fn take_profits(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.take_profits = non_empty(values.into(), self.base.take_profit_pct);
        self
    }

    pub fn len(&self) -> usize {
        self.entry_thresholds.len() * self.exit_thresholds.len() * self.stop_losses.len() * self.take_profits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All combinations, entry threshold varying slowest.
    pub fn configs(&self) -> Vec<StrategyConfig> {
        let mut out = Vec::with_capacity(self.len());
        for &entry in &self.entry_thresholds {
            for &exit in &self.exit_thresholds {
                for &sl in &self.stop_losses {
                    for &tp in &self.take_profits {
                        out.push(StrategyConfig {
                            entry_threshold: entry,
                            exit_threshold: exit,
                            stop_loss_pct: sl,
                            take_profit_pct: tp,
                            ..self.base.clone()
                        });
                    }
                }
            }
        }
        out
    }
}

fn non_empty(values: Vec<f64>, fallback: f64) -> Vec<f64> {
    if values.is_empty() { vec![fallback] } else { values }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub config: StrategyConfig,
    #[serde(serialize_with = "serialize_outcome")]
    pub result: Result<PerfReport>,
}

impl SweepOutcome {
    pub fn metrics(&self) -> Option<&PerfReport> {
        self.result.as_ref().ok()
    }
}

fn serialize_outcome<S: serde::Serializer>(result: &Result<PerfReport>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match result {
        Ok(report) => report.serialize(s),
        Err(e) => s.serialize_str(&e.to_string()),
    }
}

/// Run every config against the same aligned series in parallel.
/// Output order matches `configs`.
pub fn run_sweep(aligned: &AlignedSeries, configs: &[StrategyConfig], periods_per_year: f64) -> Vec<SweepOutcome> {
    info!("sweep: {} configurations on {} bars", configs.len(), aligned.len());
    let outcomes: Vec<SweepOutcome> = configs
        .par_iter()
        .map(|cfg| SweepOutcome {
            config: cfg.clone(),
            result: analysis::run(aligned, cfg, periods_per_year).map(|r| r.metrics),
        })
        .collect();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!("sweep done: {} ok, {} rejected", outcomes.len() - failed, failed);
    outcomes
}

/// Highest-Sharpe successful row.
pub fn best_by_sharpe(outcomes: &[SweepOutcome]) -> Option<&SweepOutcome> {
    outcomes
        .iter()
        .filter(|o| o.metrics().is_some_and(|m| m.sharpe.is_finite()))
        .max_by(|a, b| {
            let sa = a.metrics().map_or(f64::NEG_INFINITY, |m| m.sharpe);
            let sb = b.metrics().map_or(f64::NEG_INFINITY, |m| m.sharpe);
            sa.total_cmp(&sb)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AlignedBar;
    use crate::error::ErrorKind;
    use chrono::{Duration, TimeZone, Utc};

    fn aligned() -> AlignedSeries {
        let t0 = Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap();
        let bars = (0..150)
            .map(|i| {
                let x = 40.0 + 3.0 * (i as f64 * 0.11).sin();
                AlignedBar {
                    timestamp: t0 + Duration::days(i),
                    price1: x,
                    price2: 5.0 + 2.0 * x + 1.5 * (i as f64 * 0.6).sin(),
                }
            })
            .collect();
        AlignedSeries::new("P", "Q", bars).unwrap()
    }

    #[test]
    fn grid_is_cartesian() {
        let grid = ParameterGrid::new(StrategyConfig::default())
            .entry_thresholds([1.5, 2.0, 2.5])
            .exit_thresholds([0.0, 0.5])
            .stop_losses(Vec::<f64>::new());
        assert_eq!(grid.len(), 6);
        let cfgs = grid.configs();
        assert_eq!(cfgs.len(), 6);
        assert_eq!(cfgs[0].entry_threshold, 1.5);
        assert_eq!(cfgs[1].exit_threshold, 0.5);
        assert!(cfgs.iter().all(|c| c.stop_loss_pct == 5.0));
    }

    #[test]
    fn invalid_rows_do_not_abort_sweep() {
        let cfgs = ParameterGrid::new(StrategyConfig::default())
            .entry_thresholds([1.0, 2.0])
            .exit_thresholds([0.5, 1.5])
            .configs();
        let out = run_sweep(&aligned(), &cfgs, 252.0);
        assert_eq!(out.len(), 4);
        // (1.0, 1.5) has exit ≥ entry
        assert_eq!(out[1].result.as_ref().unwrap_err().kind(), ErrorKind::InvalidConfig);
        assert!(out[0].result.is_ok() && out[2].result.is_ok() && out[3].result.is_ok());
        assert!(best_by_sharpe(&out).is_some());
    }

    #[test]
    fn sweep_matches_sequential_runs() {
        let cfgs = ParameterGrid::new(StrategyConfig::default()).entry_thresholds([1.2, 1.8]).configs();
        let a = aligned();
        let out = run_sweep(&a, &cfgs, 252.0);
        for (o, cfg) in out.iter().zip(&cfgs) {
            let seq = analysis::run(&a, cfg, 252.0).unwrap().metrics;
            assert_eq!(o.metrics(), Some(&seq));
        }
    }
}
