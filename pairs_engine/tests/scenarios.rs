//! End-to-end scenarios for the pairs engine: degenerate pairs, a single
//! mean-reversion round trip, stop-loss precedence and zero-trade runs.

use chrono::{Duration, TimeZone, Utc};
use pairs_engine::metrics::DEFAULT_PERIODS_PER_YEAR;
use pairs_engine::{
    align, compute_metrics, run_backtest, AlignedBar, AlignedSeries, Direction, ErrorKind, ExitReason, PairsError,
    PriceSeries, SpreadModel, StrategyConfig,
};

fn aligned_from(p1: &[f64], p2: &[f64]) -> AlignedSeries {
    let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let bars = p1
        .iter()
        .zip(p2)
        .enumerate()
        .map(|(i, (&price1, &price2))| AlignedBar { timestamp: t0 + Duration::days(i as i64), price1, price2 })
        .collect();
    AlignedSeries::new("AAA", "BBB", bars).unwrap()
}

/// A model whose z-score path is scripted, for driving the simulator directly.
fn scripted_model(zscore: &[f64]) -> SpreadModel {
    SpreadModel {
        alpha: 0.0,
        beta: 1.0,
        r_squared: 1.0,
        spread: zscore.to_vec(),
        mean: 0.0,
        std: 1.0,
        zscore: zscore.to_vec(),
        rolling_corr: vec![None; zscore.len()],
        corr_window: 20,
    }
}

fn cfg() -> StrategyConfig {
    StrategyConfig { entry_threshold: 2.0, exit_threshold: 0.5, stop_loss_pct: 5.0, ..Default::default() }
}

#[test]
fn identical_series_are_degenerate() {
    let p: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
    let err = SpreadModel::fit(&aligned_from(&p, &p), 20).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    assert!(matches!(err, PairsError::DegenerateInput { stage: "spread", .. }), "{err}");
}

#[test]
fn single_swing_gives_one_short_and_one_zscore_exit() {
    let z = [0.0, 0.8, 1.6, 2.5, 1.9, 1.2, 0.6, 0.0, 0.3, 0.1];
    let flat = [100.0; 10];
    let aligned = aligned_from(&flat, &flat);

    let res = run_backtest(&aligned, &scripted_model(&z), &cfg()).unwrap();
    assert_eq!(res.trades.len(), 1);
    let t = &res.trades[0];
    assert_eq!(t.direction, Direction::ShortSpread);
    assert_eq!(t.exit_reason, ExitReason::ZScoreExit);
    assert_eq!(t.entry_date, aligned.bars()[3].timestamp);
    assert_eq!(t.exit_date, aligned.bars()[7].timestamp);
    assert_eq!(t.holding_days, 4);
    assert!(res.open_position.is_none());
    // unchanged prices: only the two cost legs are lost
    let costs = t.entry_cost + t.exit_cost;
    assert!((res.final_value - (10_000.0 - costs)).abs() < 1e-9);
}

#[test]
fn stop_loss_fires_before_reversion() {
    let z = [0.0, 2.5, 2.6, 1.5, 0.0];
    let p1 = [100.0; 5];
    // short spread is short asset 2; a 12 % rally costs 6 % of notional
    let p2 = [100.0, 100.0, 112.0, 112.0, 112.0];
    let res = run_backtest(&aligned_from(&p1, &p2), &scripted_model(&z), &cfg()).unwrap();

    assert_eq!(res.trades.len(), 1);
    assert_eq!(res.trades[0].exit_reason, ExitReason::StopLoss);
    assert!(res.trades[0].pnl < -250.0);
}

#[test]
fn zero_trades_report_sentinels() {
    let z: Vec<f64> = (0..30).map(|i| (i as f64 * 0.4).sin()).collect();
    let p1: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
    let p2 = vec![80.0; 30];
    let aligned = aligned_from(&p1, &p2);

    let res = run_backtest(&aligned, &scripted_model(&z), &cfg()).unwrap();
    let m = compute_metrics(&res, &aligned, DEFAULT_PERIODS_PER_YEAR);
    assert_eq!(m.n_trades, 0);
    assert_eq!(m.win_rate_pct, 0.0);
    assert_eq!(m.profit_factor, 0.0);
    assert!(m.total_return_pct.abs() < 1e-12);
    assert!(m.to_string().contains("Trades         : 0"));
}

#[test]
fn zscore_length_mismatch_is_data_integrity() {
    let flat = [100.0; 6];
    let err = run_backtest(&aligned_from(&flat, &flat), &scripted_model(&[0.0; 4]), &cfg()).unwrap_err();
    match err {
        PairsError::DataIntegrity { index, column, .. } => {
            assert_eq!(index, 4);
            assert_eq!(column, "zscore");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn gaps_in_either_leg_drop_the_bar() {
    let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let d = |n| t0 + Duration::days(n);
    let a = PriceSeries::from_pairs("AAA", vec![(d(0), 1.0), (d(1), f64::NAN), (d(2), 3.0), (d(3), 4.0)]);
    let b = PriceSeries::from_pairs("BBB", vec![(d(0), 2.0), (d(1), 2.5), (d(2), 6.0), (d(4), 9.0)]);
    let aligned = align(&a, &b).unwrap();
    assert_eq!(aligned.timestamps(), vec![d(0), d(2)]);
}
