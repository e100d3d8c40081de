/// backtest.rs — Event-Driven Spread Backtest
///
/// Walks the aligned price / z-score series once, in timestamp order, with a
/// single position slot.  Records the trade ledger and a per-bar portfolio
/// path for metrics computation.
///
/// ARCHITECTURE
/// ┌─────────────────────────────────────────────────────┐
/// │  AlignedSeries + SpreadModel.zscore                 │
/// │        │                                            │
/// │        ▼                                            │
/// │  [step(i, bar, z)]                                  │
/// │        │                                            │
/// │   ┌────┴──────────────────────────────────┐        │
/// │   │  Backtester                           │        │
/// │   │  ├─ mark-to-market portfolio value    │        │
/// │   │  ├─ FLAT & i > 0 → evaluate entry     │        │
/// │   │  └─ OPEN → RiskManager.check_exit      │        │
/// │   └────────────────────────────────────────┘        │
/// │        │                                            │
/// │   open_position() / close_position()               │
/// │        │                                            │
/// │   path[i] = {cash, position value, total}          │
/// └─────────────────────────────────────────────────────┘
///
/// ACCOUNTING
///   market value  MV = s1·P1 + s2·P2        (≈ unrealised PnL: the book is
///                                             dollar-neutral at entry)
///   entry : cash −= MV_entry + notional·c
///   exit  : cash += MV_exit − gross_exit·c,   gross = |s1·P1| + |s2·P2|
///   every bar: portfolio_value = cash + MV   (snapshot after transitions)
///
/// A position still open after the last bar is NOT force-closed; it is
/// returned in `open_position` and appears only in the final mark-to-market.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StrategyConfig;
use crate::data::{AlignedBar, AlignedSeries};
use crate::error::{PairsError, Result};
use crate::models::{Direction, SpreadModel};
use crate::risk::{ExitReason, RiskManager};

/// The open spread position.  Fields are fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    /// Signed units of asset 1 (negative = short)
    pub shares1: f64,
    /// Signed units of asset 2 (negative = short)
    pub shares2: f64,
    pub entry_price1: f64,
    pub entry_price2: f64,
    pub entry_date: DateTime<Utc>,
    pub entry_index: usize,
    pub entry_zscore: f64,
    /// Total notional of both legs at entry
    pub notional_value: f64,
    pub entry_cost: f64,
}

impl Position {
    pub fn market_value(&self, price1: f64, price2: f64) -> f64 {
        self.shares1 * price1 + self.shares2 * price2
    }

    /// Gross exposure |s1·P1| + |s2·P2|, the base for exit costs.
    pub fn gross_value(&self, price1: f64, price2: f64) -> f64 {
        (self.shares1 * price1).abs() + (self.shares2 * price2).abs()
    }

    pub fn unrealized_pnl(&self, price1: f64, price2: f64) -> f64 {
        self.shares1 * (price1 - self.entry_price1) + self.shares2 * (price2 - self.entry_price2)
    }

    /// Unrealised PnL as percent of entry notional.
    pub fn pnl_pct(&self, price1: f64, price2: f64) -> f64 {
        if self.notional_value > 0.0 {
            self.unrealized_pnl(price1, price2) / self.notional_value * 100.0
        } else {
            0.0
        }
    }
}

/// Immutable ledger entry for a closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub direction: Direction,
    pub entry_price1: f64,
    pub entry_price2: f64,
    pub exit_price1: f64,
    pub exit_price2: f64,
    pub shares1: f64,
    pub shares2: f64,
    pub notional_value: f64,
    pub entry_zscore: f64,
    pub exit_zscore: f64,
    pub entry_cost: f64,
    pub exit_cost: f64,
    /// Realised PnL net of the exit cost
    pub pnl: f64,
    /// `pnl` as percent of entry notional
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
    pub holding_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    /// Mark-to-market value of the open position (0 when flat)
    pub position_value: f64,
    pub portfolio_value: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub portfolio: Vec<PortfolioPoint>,
    /// Position still open after the last bar (not force-closed)
    pub open_position: Option<Position>,
    pub initial_capital: f64,
    pub final_value: f64,
}

impl BacktestResult {
    pub fn portfolio_values(&self) -> Vec<f64> {
        self.portfolio.iter().map(|p| p.portfolio_value).collect()
    }

    /// Position code per bar: +1 long spread, −1 short spread, 0 flat.
    pub fn positions(&self) -> Vec<i8> {
        self.portfolio.iter().map(|p| p.direction.as_i8()).collect()
    }

    pub fn total_costs(&self) -> f64 {
        let closed: f64 = self.trades.iter().map(|t| t.entry_cost + t.exit_cost).sum();
        closed + self.open_position.as_ref().map_or(0.0, |p| p.entry_cost)
    }
}

/// Single-run simulator state.  One instance per backtest; nothing is
/// shared between runs.
#[derive(Debug)]
pub struct Backtester {
    risk: RiskManager,
    entry_threshold: f64,
    cost_rate: f64,
    initial_capital: f64,
    cash: f64,
    position: Option<Position>,
    trades: Vec<Trade>,
    path: Vec<PortfolioPoint>,
}

impl Backtester {
    pub fn new(cfg: &StrategyConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            risk: RiskManager::new(cfg),
            entry_threshold: cfg.entry_threshold,
            cost_rate: cfg.cost_rate(),
            initial_capital: cfg.initial_capital,
            cash: cfg.initial_capital,
            position: None,
            trades: Vec::new(),
            path: Vec::new(),
        })
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Process one bar.  Bars must be fed in index order.
    pub fn step(&mut self, index: usize, bar: &AlignedBar, zscore: f64) -> Result<()> {
        check_bar(index, bar, zscore)?;
        let (p1, p2) = (bar.price1, bar.price2);

        match self.position.as_ref() {
            None => {
                if index > 0 {
                    let portfolio_value = self.cash;
                    if zscore < -self.entry_threshold {
                        self.open_position(Direction::LongSpread, index, bar, zscore, portfolio_value);
                    } else if zscore > self.entry_threshold {
                        self.open_position(Direction::ShortSpread, index, bar, zscore, portfolio_value);
                    }
                }
            }
            Some(pos) => {
                let pnl_pct = pos.pnl_pct(p1, p2);
                if let Some(reason) = self.risk.check_exit(zscore, pnl_pct) {
                    self.close_position(bar, zscore, reason);
                }
            }
        }

        let position_value = self.position.as_ref().map_or(0.0, |p| p.market_value(p1, p2));
        self.path.push(PortfolioPoint {
            timestamp: bar.timestamp,
            cash: self.cash,
            position_value,
            portfolio_value: self.cash + position_value,
            direction: self.position.as_ref().map_or(Direction::Flat, |p| p.direction),
        });
        Ok(())
    }

    fn open_position(
        &mut self,
        direction: Direction,
        index: usize,
        bar: &AlignedBar,
        zscore: f64,
        portfolio_value: f64,
    ) {
        let notional = self.risk.position_notional(portfolio_value);
        if notional <= 0.0 {
            return;
        }
        let half = notional / 2.0;
        let (shares1, shares2) = match direction {
            // long asset 2, short asset 1
            Direction::LongSpread => (-half / bar.price1, half / bar.price2),
            // long asset 1, short asset 2
            Direction::ShortSpread => (half / bar.price1, -half / bar.price2),
            Direction::Flat => return,
        };

        let entry_cost = notional * self.cost_rate;
        let position = Position {
            direction,
            shares1,
            shares2,
            entry_price1: bar.price1,
            entry_price2: bar.price2,
            entry_date: bar.timestamp,
            entry_index: index,
            entry_zscore: zscore,
            notional_value: notional,
            entry_cost,
        };
        self.cash -= position.market_value(bar.price1, bar.price2) + entry_cost;

        debug!(
            "[bar {:>5}] OPEN  {:<12} notional={:.2} Z={:+.3} cost={:.2}",
            index, direction, notional, zscore, entry_cost
        );
        self.position = Some(position);
    }

    fn close_position(&mut self, bar: &AlignedBar, zscore: f64, reason: ExitReason) {
        let Some(pos) = self.position.take() else {
            return;
        };
        let (p1, p2) = (bar.price1, bar.price2);

        let gross_pnl = pos.unrealized_pnl(p1, p2);
        let exit_cost = pos.gross_value(p1, p2) * self.cost_rate;
        let pnl = gross_pnl - exit_cost;
        self.cash += pos.market_value(p1, p2) - exit_cost;

        let trade = Trade {
            entry_date: pos.entry_date,
            exit_date: bar.timestamp,
            direction: pos.direction,
            entry_price1: pos.entry_price1,
            entry_price2: pos.entry_price2,
            exit_price1: p1,
            exit_price2: p2,
            shares1: pos.shares1,
            shares2: pos.shares2,
            notional_value: pos.notional_value,
            entry_zscore: pos.entry_zscore,
            exit_zscore: zscore,
            entry_cost: pos.entry_cost,
            exit_cost,
            pnl,
            pnl_pct: pnl / pos.notional_value * 100.0,
            exit_reason: reason,
            holding_days: (bar.timestamp - pos.entry_date).num_days(),
        };
        debug!(
            "CLOSE {:<12} pnl={:+.2} ({:+.2}%) reason={} held={}d",
            trade.direction, trade.pnl, trade.pnl_pct, trade.exit_reason, trade.holding_days
        );
        self.trades.push(trade);
    }

    pub fn finish(self) -> BacktestResult {
        if let Some(pos) = &self.position {
            warn!(
                "position {} opened {} still open at final bar; not force-closed",
                pos.direction, pos.entry_date
            );
        }
        let final_value = self
            .path
            .last()
            .map_or(self.initial_capital, |p| p.portfolio_value);
        BacktestResult {
            trades: self.trades,
            portfolio: self.path,
            open_position: self.position,
            initial_capital: self.initial_capital,
            final_value,
        }
    }
}

/// Run a complete backtest over an aligned series and its fitted spread.
pub fn run_backtest(
    aligned: &AlignedSeries,
    model: &SpreadModel,
    cfg: &StrategyConfig,
) -> Result<BacktestResult> {
    let mut bt = Backtester::new(cfg)?;
    let bars = aligned.bars();

    if model.zscore.len() != bars.len() {
        let index = model.zscore.len().min(bars.len());
        let timestamp = bars
            .get(index)
            .or_else(|| bars.last())
            .map_or(DateTime::<Utc>::MIN_UTC, |b| b.timestamp);
        return Err(PairsError::DataIntegrity {
            index,
            timestamp,
            column: "zscore",
            reason: format!(
                "z-score series has {} values but {} bars were supplied",
                model.zscore.len(),
                bars.len()
            ),
        });
    }

    info!(
        "backtest {} / {}: {} bars, entry={:.2} exit={:.2} capital={:.2}",
        aligned.name1,
        aligned.name2,
        bars.len(),
        cfg.entry_threshold,
        cfg.exit_threshold,
        cfg.initial_capital
    );

    for (i, (bar, &z)) in bars.iter().zip(&model.zscore).enumerate() {
        bt.step(i, bar, z)?;
    }

    let result = bt.finish();
    info!(
        "backtest done: {} trades, final value {:.2}",
        result.trades.len(),
        result.final_value
    );
    Ok(result)
}

fn check_bar(index: usize, bar: &AlignedBar, zscore: f64) -> Result<()> {
    let fail = |column: &'static str, reason: String| PairsError::DataIntegrity {
        index,
        timestamp: bar.timestamp,
        column,
        reason,
    };
    if !(bar.price1.is_finite() && bar.price1 > 0.0) {
        return Err(fail("price1", format!("price must be positive and finite, got {}", bar.price1)));
    }
    if !(bar.price2.is_finite() && bar.price2 > 0.0) {
        return Err(fail("price2", format!("price must be positive and finite, got {}", bar.price2)));
    }
    if !zscore.is_finite() {
        return Err(fail("zscore", format!("z-score must be finite, got {zscore}")));
    }
    Ok(())
}
