/// risk.rs — Position sizing and exit rules for the spread position
///
/// SIZING
///   notional = min(max_position_pct/100 · initial_capital,
///                  0.95 · current_portfolio_value)
///   split evenly between the two legs (dollar-neutral).
///
/// EXIT PRIORITY (first triggered wins)
///   1. z-score reversion : |Z| < exit_threshold
///   2. stop loss         : PnL% < −stop_loss_pct
///   3. take profit       : PnL% > +take_profit_pct
///   PnL% = unrealised dollar PnL / entry notional × 100
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;

/// Share of current portfolio value that may be committed to one position.
pub const MAX_PORTFOLIO_FRACTION: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "z-score exit")]
    ZScoreExit,
    #[serde(rename = "stop loss")]
    StopLoss,
    #[serde(rename = "take profit")]
    TakeProfit,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::ZScoreExit => "z-score exit",
            ExitReason::StopLoss => "stop loss",
            ExitReason::TakeProfit => "take profit",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskManager {
    /// Cap on entry notional in currency
    pub max_position_value: f64,
    pub exit_threshold: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl RiskManager {
    pub fn new(cfg: &StrategyConfig) -> Self {
        Self {
            max_position_value: cfg.max_position_value(),
            exit_threshold: cfg.exit_threshold,
            stop_loss_pct: cfg.stop_loss_pct,
            take_profit_pct: cfg.take_profit_pct,
        }
    }

    /// Entry notional for the whole pair (both legs together).
    pub fn position_notional(&self, portfolio_value: f64) -> f64 {
        self.max_position_value
            .min(MAX_PORTFOLIO_FRACTION * portfolio_value)
            .max(0.0)
    }

    /// Exit decision for an open position, in priority order.
    pub fn check_exit(&self, zscore: f64, pnl_pct: f64) -> Option<ExitReason> {
        if zscore.abs() < self.exit_threshold {
            Some(ExitReason::ZScoreExit)
        } else if pnl_pct < -self.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else if pnl_pct > self.take_profit_pct {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }
}
