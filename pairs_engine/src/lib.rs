//! Statistical-arbitrage pairs engine.
//!
//! Aligns two price series, fits an OLS hedge ratio, turns the residual
//! spread into a z-score, classifies entry/exit bands and backtests a single
//! dollar-neutral spread position with cost, stop-loss and take-profit
//! handling.  Everything here is pure and synchronous; callers own I/O.
pub mod analysis;
pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod risk;
pub mod signals;
pub mod sweep;

pub use analysis::{analyze, run, run_series, PairAnalysis, PairsRun};
pub use backtest::{run_backtest, BacktestResult, PortfolioPoint, Position, Trade};
pub use config::{SignalThresholds, StrategyConfig};
pub use data::{align, AlignedBar, AlignedSeries, PricePoint, PriceSeries};
pub use error::{ErrorKind, PairsError, Result};
pub use metrics::{compute_metrics, PerfReport};
pub use models::*;
pub use risk::ExitReason;
pub use signals::{classify, SignalSeries, SignalState};
