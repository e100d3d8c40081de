/// data.rs — Price series and two-asset alignment
///
/// The engine consumes one `AlignedSeries`: bars present in BOTH inputs,
/// strictly increasing timestamps, finite prices.  Missing observations
/// (NaN / non-finite) are dropped per asset before the inner join, so a
/// gap in either asset removes that timestamp entirely.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PairsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    /// NaN marks a missing observation.
    pub price: f64,
}

/// Single-asset close series as delivered by the data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub label: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(label: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self { label: label.into(), points }
    }

    pub fn from_pairs(
        label: impl Into<String>,
        pairs: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Self {
        let points = pairs
            .into_iter()
            .map(|(timestamp, price)| PricePoint { timestamp, price })
            .collect();
        Self::new(label, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedBar {
    pub timestamp: DateTime<Utc>,
    pub price1: f64,
    pub price2: f64,
}

/// Inner-joined two-asset table.  Construction enforces the invariants,
/// so downstream components may index without re-checking ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub name1: String,
    pub name2: String,
    bars: Vec<AlignedBar>,
}

impl AlignedSeries {
    /// Build from already-aligned bars, checking order and finiteness.
    pub fn new(
        name1: impl Into<String>,
        name2: impl Into<String>,
        bars: Vec<AlignedBar>,
    ) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            check_price(i, bar.timestamp, "price1", bar.price1)?;
            check_price(i, bar.timestamp, "price2", bar.price2)?;
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(PairsError::DataIntegrity {
                    index: i,
                    timestamp: bar.timestamp,
                    column: "timestamp",
                    reason: format!(
                        "timestamps must be strictly increasing (previous {})",
                        bars[i - 1].timestamp
                    ),
                });
            }
        }
        Ok(Self { name1: name1.into(), name2: name2.into(), bars })
    }

    pub fn bars(&self) -> &[AlignedBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn price1(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.price1).collect()
    }

    pub fn price2(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.price2).collect()
    }

    pub fn first(&self) -> Option<&AlignedBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&AlignedBar> {
        self.bars.last()
    }
}

/// Merge two price series on common timestamps.
///
/// Duplicate timestamps within one series keep the last observation.
/// Fails with `EmptyIntersection` when no timestamp survives the join.
pub fn align(series1: &PriceSeries, series2: &PriceSeries) -> Result<AlignedSeries> {
    let left = clean_index(series1);
    let right = clean_index(series2);

    let bars: Vec<AlignedBar> = left
        .iter()
        .filter_map(|(ts, &price1)| {
            right.get(ts).map(|&price2| AlignedBar { timestamp: *ts, price1, price2 })
        })
        .collect();

    if bars.is_empty() {
        return Err(PairsError::EmptyIntersection {
            left: series1.label.clone(),
            right: series2.label.clone(),
            left_len: series1.len(),
            right_len: series2.len(),
        });
    }

    tracing::debug!(
        left = series1.len(),
        right = series2.len(),
        aligned = bars.len(),
        "aligned {} / {}",
        series1.label,
        series2.label
    );

    AlignedSeries::new(series1.label.clone(), series2.label.clone(), bars)
}

fn clean_index(series: &PriceSeries) -> BTreeMap<DateTime<Utc>, f64> {
    series
        .points
        .iter()
        .filter(|p| p.price.is_finite())
        .map(|p| (p.timestamp, p.price))
        .collect()
}

fn check_price(index: usize, timestamp: DateTime<Utc>, column: &'static str, v: f64) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(PairsError::DataIntegrity {
            index,
            timestamp,
            column,
            reason: format!("price must be a finite number, got {v}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    #[test]
    fn align_keeps_only_common_timestamps() {
        let a = PriceSeries::from_pairs("A", vec![(day(0), 1.0), (day(1), 2.0), (day(3), 4.0)]);
        let b = PriceSeries::from_pairs("B", vec![(day(1), 20.0), (day(2), 30.0), (day(3), 40.0)]);
        let aligned = align(&a, &b).unwrap();
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.timestamps(), vec![day(1), day(3)]);
        assert_eq!(aligned.price1(), vec![2.0, 4.0]);
        assert_eq!(aligned.price2(), vec![20.0, 40.0]);
        assert_eq!(aligned.name1, "A");
    }

    #[test]
    fn align_sorts_unordered_input_and_drops_missing() {
        let a = PriceSeries::from_pairs(
            "A",
            vec![(day(2), 3.0), (day(0), 1.0), (day(1), f64::NAN)],
        );
        let b = PriceSeries::from_pairs("B", vec![(day(0), 10.0), (day(1), 11.0), (day(2), 12.0)]);
        let aligned = align(&a, &b).unwrap();
        assert_eq!(aligned.timestamps(), vec![day(0), day(2)]);
    }

    #[test]
    fn disjoint_calendars_are_an_empty_intersection() {
        let a = PriceSeries::from_pairs("A", vec![(day(0), 1.0), (day(2), 1.0)]);
        let b = PriceSeries::from_pairs("B", vec![(day(1), 1.0), (day(3), 1.0)]);
        let err = align(&a, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyIntersection);
        match err {
            PairsError::EmptyIntersection { left, right, left_len, right_len } => {
                assert_eq!((left.as_str(), right.as_str()), ("A", "B"));
                assert_eq!((left_len, right_len), (2, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn new_rejects_unordered_or_missing_bars() {
        let bars = vec![
            AlignedBar { timestamp: day(1), price1: 1.0, price2: 1.0 },
            AlignedBar { timestamp: day(0), price1: 1.0, price2: 1.0 },
        ];
        assert_eq!(
            AlignedSeries::new("A", "B", bars).unwrap_err().kind(),
            ErrorKind::DataIntegrity
        );

        let bars = vec![AlignedBar { timestamp: day(0), price1: 1.0, price2: f64::INFINITY }];
        match AlignedSeries::new("A", "B", bars).unwrap_err() {
            PairsError::DataIntegrity { column, index, .. } => {
                assert_eq!(column, "price2");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
