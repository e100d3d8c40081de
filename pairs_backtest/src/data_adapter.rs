/// data_adapter.rs — CSV price loading for the pairs engine
///
/// Reads one close-price series per file with polars and converts it into
/// a `pairs_engine::PriceSeries`.
///
/// Architecture:
/// ┌─────────────────────────────────────────────────────┐
/// │  CSV file (one asset)                               │
/// │        │                                            │
/// │        ▼                                            │
/// │  polars CsvReader → DataFrame                       │
/// │        │                                            │
/// │   ┌────┴──────────────────────────────────┐        │
/// │   │  Column resolution (case-insensitive) │        │
/// │   │  ├─ time : timestamp/date/datetime…   │        │
/// │   │  └─ price: close/adj close/price…     │        │
/// │   └────────────────────────────────────────┘        │
/// │        │                                            │
/// │        ▼                                            │
/// │  PriceSeries { label, points }  (null → NaN)        │
/// └─────────────────────────────────────────────────────┘
///
/// Accepted time formats: RFC 3339, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%d`,
/// integer epoch milliseconds, and polars Date / Datetime columns.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use polars::prelude::*;
use tracing::{debug, info, warn};

use pairs_engine::{PricePoint, PriceSeries};

const TIME_COLUMNS: [&str; 6] = ["timestamp", "date", "datetime", "time", "open_time", "index"];
const PRICE_COLUMNS: [&str; 4] = ["close", "adj close", "adj_close", "price"];

/// One asset's CSV file and how to read it.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    /// Series label; defaults to the file stem
    pub label: Option<String>,
    /// Price column override; defaults to the first of `PRICE_COLUMNS`
    pub price_column: Option<String>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), label: None, price_column: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_price_column(mut self, column: impl Into<String>) -> Self {
        self.price_column = Some(column.into());
        self
    }

    fn resolved_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "asset".to_string())
        })
    }

    pub fn load(&self) -> Result<PriceSeries> {
        let df = read_csv(&self.path)?;
        let label = self.resolved_label();
        let series = frame_to_series(&df, &label, self.price_column.as_deref())
            .with_context(|| format!("reading prices from {}", self.path.display()))?;
        info!("Loaded {} rows for {} from {}", series.len(), label, self.path.display());
        Ok(series)
    }
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        bail!("price file not found: {}", path.display());
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("parsing CSV {}", path.display()))?;
    debug!("{}: {} rows, columns {:?}", path.display(), df.height(), df.get_column_names());
    Ok(df)
}

/// Convert a loaded frame into a price series.
pub fn frame_to_series(df: &DataFrame, label: &str, price_column: Option<&str>) -> Result<PriceSeries> {
    let time_name = match find_column(df, &TIME_COLUMNS) {
        Some(name) => name,
        None => bail!("no time column (expected one of {:?})", TIME_COLUMNS),
    };
    let price_name = match price_column {
        Some(wanted) => find_column(df, &[wanted]).ok_or_else(|| anyhow!("price column {wanted:?} not found"))?,
        None => find_column(df, &PRICE_COLUMNS)
            .ok_or_else(|| anyhow!("no price column (expected one of {:?})", PRICE_COLUMNS))?,
    };

    let timestamps = parse_time_column(df.column(&time_name)?)?;
    let prices = df.column(&price_name)?.cast(&DataType::Float64)?;
    let prices = prices.f64()?;

    let mut missing = 0usize;
    let points: Vec<PricePoint> = timestamps
        .into_iter()
        .zip(prices.into_iter())
        .map(|(timestamp, price)| {
            let price = price.unwrap_or_else(|| {
                missing += 1;
                f64::NAN
            });
            PricePoint { timestamp, price }
        })
        .collect();
    if missing > 0 {
        warn!("{}: {} rows with missing {} treated as gaps", label, missing, price_name);
    }

    Ok(PriceSeries::new(label, points))
}

/// Case-insensitive lookup; returns the column's actual name.
fn find_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
    let names = df.get_column_names();
    candidates.iter().find_map(|want| {
        names
            .iter()
            .find(|n| n.as_str().trim().eq_ignore_ascii_case(want))
            .map(|n| n.as_str().to_string())
    })
}

fn parse_time_column(col: &Column) -> Result<Vec<DateTime<Utc>>> {
    match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                let raw = v.ok_or_else(|| anyhow!("row {row}: missing timestamp"))?;
                parse_timestamp(raw).ok_or_else(|| anyhow!("row {row}: unrecognised timestamp {raw:?}"))
            })
            .collect(),
        DataType::Date => {
            let days = col.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .enumerate()
                .map(|(row, d)| {
                    let d = d.ok_or_else(|| anyhow!("row {row}: missing date"))?;
                    Utc.timestamp_opt(i64::from(d) * 86_400, 0)
                        .single()
                        .ok_or_else(|| anyhow!("row {row}: date out of range"))
                })
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = col.cast(&DataType::Int64)?;
            raw.i64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    let v = v.ok_or_else(|| anyhow!("row {row}: missing timestamp"))?;
                    let ts = match unit {
                        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
                        TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
                        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(v)),
                    };
                    ts.ok_or_else(|| anyhow!("row {row}: timestamp out of range"))
                })
                .collect()
        }
        dt if dt.is_integer() => {
            let raw = col.cast(&DataType::Int64)?;
            raw.i64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    let ms = v.ok_or_else(|| anyhow!("row {row}: missing timestamp"))?;
                    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("row {row}: epoch ms {ms} out of range"))
                })
                .collect()
        }
        other => bail!("unsupported time column type {other}"),
    }
}

/// Parse one textual timestamp.  Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}
