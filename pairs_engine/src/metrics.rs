/// metrics.rs — Performance Metrics
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// TOTAL RETURN
///   R% = (V_final − V_0) / V_0 × 100
///
/// WIN RATE & PROFIT FACTOR (per closed trade, net PnL)
///   winners = {pnl > 0},  losers = {pnl < 0}
///   P_win%  = |winners| / N_trades × 100          (0 with no trades)
///   PF      = Σ pnl(winners) / |Σ pnl(losers)|    (+∞ with no losers,
///                                                  0 with no trades)
///
/// ANNUALISED VOLATILITY
///   r_t = V_t / V_{t−1} − 1
///   σ_a = std(r_t) × √N_annual        (sample std, N_annual = 252 daily)
///
/// SHARPE RATIO
///   SR = (R% / 100) / σ_a              (0 when σ_a = 0)
///   Total-period return over annualised vol; no risk-free rate.
///
/// MAXIMUM DRAWDOWN (positive percent)
///   peak_t = max_{s ≤ t}(V_s)
///   MaxDD% = max_t (peak_t − V_t) / peak_t × 100
///
/// BUY & HOLD BENCHMARK (asset 1)
///   V_bh = V_0 × P1_last / P1_first
/// ─────────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::backtest::{BacktestResult, Trade};
use crate::data::AlignedSeries;

/// Daily bars.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Complete backtest performance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfReport {
    pub n_trades:             usize,
    pub n_winners:            usize,
    pub n_losers:             usize,
    pub win_rate_pct:         f64,
    pub avg_win:              f64,  // currency
    pub avg_loss:             f64,  // currency, ≤ 0
    /// +∞ with no losers; written as `"inf"` in JSON
    #[serde(with = "infinite_as_text")]
    pub profit_factor:        f64,
    pub avg_holding_days:     f64,
    pub total_return_pct:     f64,
    pub volatility:           f64,  // annualised, fraction
    pub sharpe:               f64,
    pub max_drawdown_pct:     f64,  // positive
    pub initial_capital:      f64,
    pub final_value:          f64,
    pub buy_hold_value:       f64,
    pub buy_hold_return_pct:  f64,
    pub excess_return_pct:    f64,
    pub total_costs:          f64,
    pub position_open_at_end: bool,
}

impl std::fmt::Display for PerfReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "════════════════════════════════════════════")?;
        writeln!(f, "  PAIRS BACKTEST PERFORMANCE REPORT")?;
        writeln!(f, "════════════════════════════════════════════")?;
        writeln!(f, "  Trades         : {} ({} won / {} lost)", self.n_trades, self.n_winners, self.n_losers)?;
        writeln!(f, "  Win Rate       : {:.1}%", self.win_rate_pct)?;
        writeln!(f, "  Avg Win        : ${:.2}", self.avg_win)?;
        writeln!(f, "  Avg Loss       : ${:.2}", self.avg_loss)?;
        writeln!(f, "  Profit Factor  : {}", fmt_ratio(self.profit_factor))?;
        writeln!(f, "  Avg Holding    : {:.1} days", self.avg_holding_days)?;
        writeln!(f, "  Total Return   : {:.2}%", self.total_return_pct)?;
        writeln!(f, "  Volatility     : {:.2}%", self.volatility * 100.0)?;
        writeln!(f, "  Sharpe Ratio   : {:.3}", self.sharpe)?;
        writeln!(f, "  Max Drawdown   : {:.2}%", self.max_drawdown_pct)?;
        writeln!(f, "  Costs Paid     : ${:.2}", self.total_costs)?;
        writeln!(f, "  Initial Capital: ${:.2}", self.initial_capital)?;
        writeln!(f, "  Final Value    : ${:.2}", self.final_value)?;
        writeln!(f, "  Buy & Hold     : ${:.2} ({:+.2}%)", self.buy_hold_value, self.buy_hold_return_pct)?;
        writeln!(f, "  Excess Return  : {:+.2}%", self.excess_return_pct)?;
        if self.position_open_at_end {
            writeln!(f, "  (position still open at final bar, marked to market)")?;
        }
        writeln!(f, "════════════════════════════════════════════")
    }
}

/// JSON has no infinity; `serde_json` would write it as `null` and refuse
/// to read that back into an `f64`.
mod infinite_as_text {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
        if *x == f64::INFINITY {
            s.serialize_str("inf")
        } else if *x == f64::NEG_INFINITY {
            s.serialize_str("-inf")
        } else {
            s.serialize_f64(*x)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(x) => Ok(x),
            Repr::Text(t) => match t.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("expected a number or \"inf\", got {other:?}"))),
            },
        }
    }
}

fn fmt_ratio(x: f64) -> String {
    if x.is_infinite() {
        "∞".to_string()
    } else {
        format!("{x:.2}")
    }
}

/// Compute all performance metrics for one backtest run.
///
/// # Arguments
/// * `result`           — trade ledger and per-bar portfolio path
/// * `aligned`          — the bars the run was made on (buy-and-hold leg)
/// * `periods_per_year` — annualisation factor for volatility
pub fn compute_metrics(
    result:           &BacktestResult,
    aligned:          &AlignedSeries,
    periods_per_year: f64,
) -> PerfReport {
    let initial = result.initial_capital;
    let final_value = result.final_value;
    let trades = &result.trades;
    let n = trades.len();

    // ── Per-trade statistics ──────────────────────────────────────────────
    let (n_winners, gross_win, n_losers, gross_loss) = trade_split(trades);
    let win_rate_pct = if n == 0 { 0.0 } else { n_winners as f64 / n as f64 * 100.0 };
    let avg_win = if n_winners == 0 { 0.0 } else { gross_win / n_winners as f64 };
    let avg_loss = if n_losers == 0 { 0.0 } else { gross_loss / n_losers as f64 };
    let profit_factor = if n == 0 {
        0.0
    } else if n_losers == 0 {
        f64::INFINITY
    } else {
        gross_win / gross_loss.abs()
    };
    let avg_holding_days = if n == 0 {
        0.0
    } else {
        trades.iter().map(|t| t.holding_days as f64).sum::<f64>() / n as f64
    };

    // ── Path statistics ───────────────────────────────────────────────────
    let total_return_pct = (final_value - initial) / initial * 100.0;
    let values = result.portfolio_values();
    let volatility = annualized_volatility(&bar_returns(&values), periods_per_year);
    let sharpe = if volatility > 0.0 { (total_return_pct / 100.0) / volatility } else { 0.0 };

    // ── Buy & hold ────────────────────────────────────────────────────────
    let buy_hold_value = match (aligned.first(), aligned.last()) {
        (Some(first), Some(last)) => initial * (last.price1 / first.price1),
        _ => initial,
    };
    let buy_hold_return_pct = (buy_hold_value - initial) / initial * 100.0;

    PerfReport {
        n_trades: n,
        n_winners,
        n_losers,
        win_rate_pct,
        avg_win,
        avg_loss,
        profit_factor,
        avg_holding_days,
        total_return_pct,
        volatility,
        sharpe,
        max_drawdown_pct: max_drawdown(&values) * 100.0,
        initial_capital: initial,
        final_value,
        buy_hold_value,
        buy_hold_return_pct,
        excess_return_pct: total_return_pct - buy_hold_return_pct,
        total_costs: result.total_costs(),
        position_open_at_end: result.open_position.is_some(),
    }
}

/// (winners, Σ winning pnl, losers, Σ losing pnl).  Break-even trades count
/// as neither.
fn trade_split(trades: &[Trade]) -> (usize, f64, usize, f64) {
    trades.iter().fold((0, 0.0, 0, 0.0), |(nw, w, nl, l), t| {
        if t.pnl > 0.0 {
            (nw + 1, w + t.pnl, nl, l)
        } else if t.pnl < 0.0 {
            (nw, w, nl + 1, l + t.pnl)
        } else {
            (nw, w, nl, l)
        }
    })
}

/// Simple bar-over-bar returns of a value path.
pub fn bar_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Sample std of returns × √periods_per_year; 0 with fewer than 2 returns.
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = returns.iter().std_dev();
    if sd.is_finite() { sd * periods_per_year.sqrt() } else { 0.0 }
}

/// Maximum drawdown from a value path.
/// Returns a positive fraction (e.g. 0.15 = 15% below the running peak).
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0f64;

    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd
}
