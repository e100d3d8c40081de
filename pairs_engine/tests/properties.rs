//! Property-based tests for the pairs engine invariants.
//!
//! Random but well-formed price paths are pushed through the full pipeline
//! and the structural guarantees are checked on every generated case.

use chrono::{Duration, TimeZone, Utc};
use pairs_engine::signals::classify;
use pairs_engine::{run, AlignedBar, AlignedSeries, SpreadModel, StrategyConfig};
use proptest::prelude::*;

fn aligned_from(p1: &[f64], p2: &[f64]) -> AlignedSeries {
    let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let bars = p1
        .iter()
        .zip(p2)
        .enumerate()
        .map(|(i, (&price1, &price2))| AlignedBar { timestamp: t0 + Duration::days(i as i64), price1, price2 })
        .collect();
    AlignedSeries::new("X", "Y", bars).unwrap()
}

/// Geometric random walk for asset 1 and a noisy linear function of it for
/// asset 2.  Prices stay strictly positive.
fn pair_paths() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (10usize..160).prop_flat_map(|n| {
        (
            prop::collection::vec(-0.03f64..0.03, n),
            prop::collection::vec(-2.0f64..2.0, n),
            0.5f64..3.0,
        )
            .prop_map(|(rets, noise, beta)| {
                let mut p1 = Vec::with_capacity(rets.len());
                let mut px = 100.0;
                for r in rets {
                    px *= 1.0 + r;
                    p1.push(px);
                }
                let p2: Vec<f64> = p1.iter().zip(&noise).map(|(p, e)| 20.0 + beta * p + e).collect();
                (p1, p2)
            })
    })
}

fn sweepable_config() -> impl Strategy<Value = StrategyConfig> {
    (0.5f64..3.0, 0.0f64..1.0, 0.0f64..0.5, 1.0f64..20.0, 1.0f64..30.0).prop_map(|(entry, exit_frac, cost, sl, tp)| {
        StrategyConfig {
            corr_window: 5,
            entry_threshold: entry,
            exit_threshold: entry * exit_frac * 0.99,
            transaction_cost_pct: cost,
            stop_loss_pct: sl,
            take_profit_pct: tp,
            ..Default::default()
        }
    })
}

proptest! {
    /// Spread and z-score are bar-aligned and the z-score is standardised.
    #[test]
    fn zscore_is_standardised((p1, p2) in pair_paths()) {
        let model = SpreadModel::fit(&aligned_from(&p1, &p2), 5);
        prop_assume!(model.is_ok());
        let model = model.unwrap();

        let n = p1.len();
        prop_assert_eq!(model.spread.len(), n);
        prop_assert_eq!(model.zscore.len(), n);
        prop_assert_eq!(model.rolling_corr.len(), n);

        let mean = model.zscore.iter().sum::<f64>() / n as f64;
        let var = model.zscore.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        prop_assert!(mean.abs() < 1e-9, "mean z = {}", mean);
        prop_assert!((var.sqrt() - 1.0).abs() < 1e-9, "std z = {}", var.sqrt());
    }

    /// α + β·P1 + spread reproduces P2.
    #[test]
    fn regression_round_trip((p1, p2) in pair_paths()) {
        let model = SpreadModel::fit(&aligned_from(&p1, &p2), 5);
        prop_assume!(model.is_ok());
        let model = model.unwrap();
        for ((x, y), s) in p1.iter().zip(&p2).zip(&model.spread) {
            let rebuilt = model.alpha + model.beta * x + s;
            prop_assert!((rebuilt - y).abs() < 1e-9 * y.abs().max(1.0), "{} vs {}", rebuilt, y);
        }
    }

    /// At most one of long / short / exit holds on any bar.
    #[test]
    fn signal_bands_are_exclusive(
        zs in prop::collection::vec(-5.0f64..5.0, 1..200),
        entry in 0.1f64..4.0,
        exit_frac in 0.0f64..1.0,
    ) {
        let sig = classify(&zs, entry, entry * exit_frac * 0.99).unwrap();
        for i in 0..zs.len() {
            let active = [sig.long_entry[i], sig.short_entry[i], sig.exit[i]].iter().filter(|b| **b).count();
            prop_assert!(active <= 1, "bar {} z={} has {} active flags", i, zs[i], active);
        }
    }

    /// cash + position value == portfolio value on every bar, the ledger is
    /// ordered and non-overlapping, and a rerun is bit-identical.
    #[test]
    fn backtest_conserves_value_and_is_deterministic(
        (p1, p2) in pair_paths(),
        cfg in sweepable_config(),
    ) {
        let aligned = aligned_from(&p1, &p2);
        let first = run(&aligned, &cfg, 252.0);
        prop_assume!(first.is_ok());
        let first = first.unwrap();

        prop_assert_eq!(first.backtest.portfolio.len(), p1.len());
        for p in &first.backtest.portfolio {
            let tol = 1e-9 * p.portfolio_value.abs().max(1.0);
            prop_assert!((p.cash + p.position_value - p.portfolio_value).abs() < tol);
        }

        for t in &first.backtest.trades {
            prop_assert!(t.entry_date < t.exit_date);
            prop_assert!(t.holding_days >= 0);
        }
        for w in first.backtest.trades.windows(2) {
            prop_assert!(w[0].exit_date <= w[1].entry_date);
        }
        if let (Some(open), Some(last)) = (&first.backtest.open_position, first.backtest.trades.last()) {
            prop_assert!(last.exit_date <= open.entry_date);
        }

        let second = run(&aligned, &cfg, 252.0).unwrap();
        prop_assert_eq!(&first.backtest.trades, &second.backtest.trades);
        prop_assert_eq!(&first.backtest.portfolio, &second.backtest.portfolio);
    }

    /// The final value is fully explained by the ledger: starting capital,
    /// each closed trade's net PnL less its entry cost, and the open
    /// position marked at the last bar less its entry cost.
    #[test]
    fn final_value_is_explained_by_ledger(
        (p1, p2) in pair_paths(),
        cfg in sweepable_config(),
    ) {
        let aligned = aligned_from(&p1, &p2);
        let out = run(&aligned, &cfg, 252.0);
        prop_assume!(out.is_ok());
        let bt = out.unwrap().backtest;

        let realised: f64 = bt.trades.iter().map(|t| t.pnl - t.entry_cost).sum();
        let (last1, last2) = (p1[p1.len() - 1], p2[p2.len() - 1]);
        let open = bt.open_position.as_ref().map_or(0.0, |pos| pos.unrealized_pnl(last1, last2) - pos.entry_cost);
        let expected = cfg.initial_capital + realised + open;

        let tol = 1e-9 * cfg.initial_capital.max(bt.final_value.abs());
        prop_assert!(
            (bt.final_value - expected).abs() < tol,
            "final {} vs ledger {} ({} trades)", bt.final_value, expected, bt.trades.len()
        );

        let spent: f64 = bt.trades.iter().map(|t| t.entry_cost + t.exit_cost).sum::<f64>()
            + bt.open_position.as_ref().map_or(0.0, |pos| pos.entry_cost);
        prop_assert!((bt.total_costs() - spent).abs() < tol);
    }
}
