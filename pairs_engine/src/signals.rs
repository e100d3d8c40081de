/// signals.rs — Stateless z-score band classification
///
///   LONG_SPREAD  : Z < −entry   (spread far below mean, expect reversion UP)
///   SHORT_SPREAD : Z > +entry   (spread far above mean, expect reversion DOWN)
///   FLAT_EXIT    : |Z| < exit   (spread back near equilibrium)
///   NO_SIGNAL    : otherwise
///
/// With entry > exit ≥ 0 the bands are disjoint.  Each bar is classified on
/// its own; position memory lives only in the backtest simulator.
use serde::{Deserialize, Serialize};

use crate::config::SignalThresholds;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    LongSpread,
    ShortSpread,
    FlatExit,
    NoSignal,
}

impl SignalState {
    /// Human-readable state with the traded legs named.
    pub fn label(self, name1: &str, name2: &str) -> String {
        match self {
            SignalState::LongSpread => format!("Long Spread (buy {name2}, sell {name1})"),
            SignalState::ShortSpread => format!("Short Spread (sell {name2}, buy {name1})"),
            SignalState::FlatExit => "Exit position (no trade)".to_string(),
            SignalState::NoSignal => "No clear signal".to_string(),
        }
    }
}

impl std::fmt::Display for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalState::LongSpread => "LONG_SPREAD",
            SignalState::ShortSpread => "SHORT_SPREAD",
            SignalState::FlatExit => "FLAT_EXIT",
            SignalState::NoSignal => "NO_SIGNAL",
        };
        f.write_str(s)
    }
}

/// Classify one z-score.  A non-finite score is `NoSignal`.
pub fn classify_bar(z: f64, thresholds: &SignalThresholds) -> SignalState {
    if !z.is_finite() {
        SignalState::NoSignal
    } else if z < -thresholds.entry() {
        SignalState::LongSpread
    } else if z > thresholds.entry() {
        SignalState::ShortSpread
    } else if z.abs() < thresholds.exit() {
        SignalState::FlatExit
    } else {
        SignalState::NoSignal
    }
}

/// Per-bar signal flags, aligned to the z-score input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub states: Vec<SignalState>,
    pub long_entry: Vec<bool>,
    pub short_entry: Vec<bool>,
    pub exit: Vec<bool>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State of the most recent bar.
    pub fn current(&self) -> Option<SignalState> {
        self.states.last().copied()
    }

    pub fn current_label(&self, name1: &str, name2: &str) -> String {
        self.current().unwrap_or(SignalState::NoSignal).label(name1, name2)
    }
}

/// Classify a whole z-score series.  Threshold ordering is validated up
/// front and reported as `InvalidConfig`.
pub fn classify(zscore: &[f64], entry_threshold: f64, exit_threshold: f64) -> Result<SignalSeries> {
    let thresholds = SignalThresholds::new(entry_threshold, exit_threshold)?;
    Ok(classify_with(zscore, &thresholds))
}

pub fn classify_with(zscore: &[f64], thresholds: &SignalThresholds) -> SignalSeries {
    let states: Vec<SignalState> = zscore.iter().map(|&z| classify_bar(z, thresholds)).collect();
    SignalSeries {
        long_entry: states.iter().map(|s| *s == SignalState::LongSpread).collect(),
        short_entry: states.iter().map(|s| *s == SignalState::ShortSpread).collect(),
        exit: states.iter().map(|s| *s == SignalState::FlatExit).collect(),
        states,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn bands() {
        let t = SignalThresholds::new(2.0, 0.5).unwrap();
        assert_eq!(classify_bar(-2.1, &t), SignalState::LongSpread);
        assert_eq!(classify_bar(2.1, &t), SignalState::ShortSpread);
        assert_eq!(classify_bar(0.4, &t), SignalState::FlatExit);
        assert_eq!(classify_bar(-0.4, &t), SignalState::FlatExit);
        assert_eq!(classify_bar(1.0, &t), SignalState::NoSignal);
        // boundaries are exclusive
        assert_eq!(classify_bar(2.0, &t), SignalState::NoSignal);
        assert_eq!(classify_bar(0.5, &t), SignalState::NoSignal);
        assert_eq!(classify_bar(f64::NAN, &t), SignalState::NoSignal);
    }

    #[test]
    fn infinite_score_is_no_signal() {
        let t = SignalThresholds::new(2.0, 0.5).unwrap();
        assert_eq!(classify_bar(f64::INFINITY, &t), SignalState::NoSignal);
        assert_eq!(classify_bar(f64::NEG_INFINITY, &t), SignalState::NoSignal);
        let s = classify(&[f64::NEG_INFINITY, -3.0], 2.0, 0.5).unwrap();
        assert_eq!(s.long_entry, vec![false, true]);
    }

    #[test]
    fn series_flags_follow_states() {
        let s = classify(&[-3.0, 0.0, 3.0, 1.0], 2.0, 0.5).unwrap();
        assert_eq!(s.long_entry, vec![true, false, false, false]);
        assert_eq!(s.short_entry, vec![false, false, true, false]);
        assert_eq!(s.exit, vec![false, true, false, false]);
        assert_eq!(s.current(), Some(SignalState::NoSignal));
    }

    #[test]
    fn zero_exit_threshold_never_exits() {
        let s = classify(&[0.0, -0.0], 1.0, 0.0).unwrap();
        assert!(s.exit.iter().all(|e| !e));
    }

    #[test]
    fn overlapping_bands_rejected() {
        let err = classify(&[0.0], 0.5, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn label_names_legs() {
        let s = classify(&[-2.5], 2.0, 0.5).unwrap();
        assert_eq!(s.current_label("BTC", "ETH"), "Long Spread (buy ETH, sell BTC)");
        assert_eq!(SignalState::ShortSpread.label("BTC", "ETH"), "Short Spread (sell ETH, buy BTC)");
    }
}
