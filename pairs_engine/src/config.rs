/// config.rs — Strategy configuration, validated at the boundary
///
/// Every parameter consumed by the pairs engine is defined here.  The engine
/// never reads ambient state: callers build a `StrategyConfig` (defaults,
/// JSON, or `.env`), call `validate()`, and pass it by reference.
///
/// Percent-valued fields are expressed in percent (0.1 = 0.1 %), matching
/// how the thresholds are quoted on a trading desk.
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{PairsError, Result};

pub const DEFAULT_CORR_WINDOW: usize = 20;
pub const DEFAULT_ENTRY_Z: f64 = 2.0;
pub const DEFAULT_EXIT_Z: f64 = 0.5;
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_COST_PCT: f64 = 0.1;
pub const DEFAULT_MAX_POSITION_PCT: f64 = 50.0;
pub const DEFAULT_STOP_LOSS_PCT: f64 = 5.0;
pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    // ── Spread model ─────────────────────────────────────────────────
    /// Rolling correlation window (bars), ≥ 2
    pub corr_window: usize,

    // ── Z-score thresholds ───────────────────────────────────────────
    /// Open when |Z| > entry_threshold
    pub entry_threshold: f64,
    /// Close when |Z| < exit_threshold (must be < entry_threshold)
    pub exit_threshold: f64,

    // ── Capital & costs ──────────────────────────────────────────────
    pub initial_capital: f64,
    /// Flat cost per side as percent of traded notional
    pub transaction_cost_pct: f64,
    /// Cap on position notional as percent of initial capital, in (0, 100]
    pub max_position_pct: f64,

    // ── Risk exits (percent of entry notional) ───────────────────────
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            corr_window: DEFAULT_CORR_WINDOW,
            entry_threshold: DEFAULT_ENTRY_Z,
            exit_threshold: DEFAULT_EXIT_Z,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            transaction_cost_pct: DEFAULT_COST_PCT,
            max_position_pct: DEFAULT_MAX_POSITION_PCT,
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            take_profit_pct: DEFAULT_TAKE_PROFIT_PCT,
        }
    }
}

impl StrategyConfig {
    /// Load configuration from `PAIRS_*` environment variables (after dotenv).
    /// Unset variables keep their default.  Not validated: apply any
    /// overrides, then call `validate()`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // ignore missing .env

        let cfg = Self {
            corr_window:          parse_env("PAIRS_CORR_WINDOW",      DEFAULT_CORR_WINDOW)?,
            entry_threshold:      parse_env("PAIRS_ENTRY_Z",          DEFAULT_ENTRY_Z)?,
            exit_threshold:       parse_env("PAIRS_EXIT_Z",           DEFAULT_EXIT_Z)?,
            initial_capital:      parse_env("PAIRS_INITIAL_CAPITAL",  DEFAULT_INITIAL_CAPITAL)?,
            transaction_cost_pct: parse_env("PAIRS_COST_PCT",         DEFAULT_COST_PCT)?,
            max_position_pct:     parse_env("PAIRS_MAX_POSITION_PCT", DEFAULT_MAX_POSITION_PCT)?,
            stop_loss_pct:        parse_env("PAIRS_STOP_LOSS_PCT",    DEFAULT_STOP_LOSS_PCT)?,
            take_profit_pct:      parse_env("PAIRS_TAKE_PROFIT_PCT",  DEFAULT_TAKE_PROFIT_PCT)?,
        };
        Ok(cfg)
    }

    /// Parse a JSON config; missing keys keep their default.  Only the
    /// syntax is checked here; ranges are checked by `validate()`.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PairsError::invalid_config("json", e.to_string()))
    }

    /// Check every range constraint.  Runs before any computation starts.
    pub fn validate(&self) -> Result<()> {
        if self.corr_window < 2 {
            return Err(PairsError::invalid_config(
                "corr_window",
                format!("must be >= 2, got {}", self.corr_window),
            ));
        }
        SignalThresholds::new(self.entry_threshold, self.exit_threshold)?;

        require_finite("initial_capital", self.initial_capital)?;
        if self.initial_capital <= 0.0 {
            return Err(PairsError::invalid_config(
                "initial_capital",
                format!("must be > 0, got {}", self.initial_capital),
            ));
        }
        non_negative("transaction_cost_pct", self.transaction_cost_pct)?;

        require_finite("max_position_pct", self.max_position_pct)?;
        if self.max_position_pct <= 0.0 || self.max_position_pct > 100.0 {
            return Err(PairsError::invalid_config(
                "max_position_pct",
                format!("must be in (0, 100], got {}", self.max_position_pct),
            ));
        }
        non_negative("stop_loss_pct", self.stop_loss_pct)?;
        non_negative("take_profit_pct", self.take_profit_pct)?;
        Ok(())
    }

    pub fn thresholds(&self) -> Result<SignalThresholds> {
        SignalThresholds::new(self.entry_threshold, self.exit_threshold)
    }

    /// Transaction cost as a fraction of notional (0.1 % → 0.001).
    pub fn cost_rate(&self) -> f64 {
        self.transaction_cost_pct / 100.0
    }

    /// Hard cap on entry notional in currency.
    pub fn max_position_value(&self) -> f64 {
        self.max_position_pct / 100.0 * self.initial_capital
    }
}

/// Validated entry/exit z-score pair: `entry > exit >= 0`.
///
/// Holding one of these guarantees the three signal bands cannot overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    entry: f64,
    exit: f64,
}

impl SignalThresholds {
    pub fn new(entry: f64, exit: f64) -> Result<Self> {
        require_finite("entry_threshold", entry)?;
        require_finite("exit_threshold", exit)?;
        if entry <= 0.0 {
            return Err(PairsError::invalid_config(
                "entry_threshold",
                format!("must be > 0, got {entry}"),
            ));
        }
        if exit < 0.0 {
            return Err(PairsError::invalid_config(
                "exit_threshold",
                format!("must be >= 0, got {exit}"),
            ));
        }
        if exit >= entry {
            return Err(PairsError::invalid_config(
                "exit_threshold",
                format!("must be < entry_threshold ({entry}), got {exit}"),
            ));
        }
        Ok(Self { entry, exit })
    }

    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn exit(&self) -> f64 {
        self.exit
    }
}

fn require_finite(field: &'static str, v: f64) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(PairsError::invalid_config(field, format!("must be finite, got {v}")))
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<()> {
    require_finite(field, v)?;
    if v < 0.0 {
        return Err(PairsError::invalid_config(field, format!("must be >= 0, got {v}")));
    }
    Ok(())
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T>
where
    T: std::str::FromStr + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| PairsError::invalid_config(key, format!("cannot parse {v:?}: {e}"))),
        Err(_) => Ok(default),
    }
}
