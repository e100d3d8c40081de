/// lib.rs — Pairs backtest runner library
///
/// File-facing half of the pairs workspace: loads the two price series from
/// CSV and renders / exports the engine's outputs.

pub mod data_adapter;
pub mod reporting;

pub use data_adapter::{CsvSource, parse_timestamp};
pub use reporting::{BacktestReport, ReportConfig, ReportGenerator};
