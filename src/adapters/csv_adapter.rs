//! CSV adapter for price/signal inputs and the trajectory report.
//!
//! Columns are located by header name, so column order does not matter and extra
//! columns are ignored. `open`, `high`, `low` default to `close` and `volume` to 0.

use std::fs;
use std::path::PathBuf;

use crate::domain::backtest::Trajectory;
use crate::domain::error::TradedeskError;
use crate::domain::ohlcv::{PricePoint, parse_timestamp};
use crate::domain::signal::{Exposure, Signal};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    /// Relative sources resolve against `base_path`; absolute ones are used as is.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn resolve(&self, source: &str) -> PathBuf {
        self.base_path.join(source)
    }

    fn read_table(&self, source: &str) -> Result<(csv::StringRecord, Vec<csv::StringRecord>), TradedeskError> {
        let path = self.resolve(source);
        let content = fs::read_to_string(&path).map_err(|e| TradedeskError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| TradedeskError::Data {
                reason: format!("CSV header error in {source}: {e}"),
            })?
            .clone();

        let mut records = Vec::new();
        for result in rdr.records() {
            records.push(result.map_err(|e| TradedeskError::Data {
                reason: format!("CSV parse error in {source}: {e}"),
            })?);
        }
        Ok((headers, records))
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn require_column(headers: &csv::StringRecord, name: &str, source: &str) -> Result<usize, TradedeskError> {
    column(headers, name).ok_or_else(|| TradedeskError::Data {
        reason: format!("missing {name} column in {source}"),
    })
}

fn field_timestamp(record: &csv::StringRecord, idx: usize) -> Result<chrono::NaiveDateTime, TradedeskError> {
    let raw = record.get(idx).unwrap_or_default();
    parse_timestamp(raw).ok_or_else(|| TradedeskError::Data {
        reason: format!("invalid date '{raw}'"),
    })
}

fn field_f64(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, TradedeskError> {
    let raw = record.get(idx).unwrap_or_default();
    raw.parse().map_err(|e| TradedeskError::Data {
        reason: format!("invalid {name} value '{raw}': {e}"),
    })
}

fn optional_f64(
    record: &csv::StringRecord,
    idx: Option<usize>,
    name: &str,
) -> Result<Option<f64>, TradedeskError> {
    match idx {
        Some(i) if !record.get(i).unwrap_or_default().is_empty() => field_f64(record, i, name).map(Some),
        _ => Ok(None),
    }
}

impl DataPort for CsvAdapter {
    fn load_prices(&self, source: &str) -> Result<Vec<PricePoint>, TradedeskError> {
        let (headers, records) = self.read_table(source)?;
        let date_col = require_column(&headers, "date", source)?;
        let close_col = require_column(&headers, "close", source)?;
        let open_col = column(&headers, "open");
        let high_col = column(&headers, "high");
        let low_col = column(&headers, "low");
        let volume_col = column(&headers, "volume");

        let mut prices = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            let timestamp = field_timestamp(record, date_col)?;
            let close = field_f64(record, close_col, "close")?;
            if !close.is_finite() || close <= 0.0 {
                return Err(TradedeskError::Data {
                    reason: format!(
                        "row {} of {source}: close must be a positive number, got {close}",
                        row + 1
                    ),
                });
            }
            prices.push(PricePoint {
                timestamp,
                open: optional_f64(record, open_col, "open")?.unwrap_or(close),
                high: optional_f64(record, high_col, "high")?.unwrap_or(close),
                low: optional_f64(record, low_col, "low")?.unwrap_or(close),
                close,
                volume: optional_f64(record, volume_col, "volume")?.unwrap_or(0.0),
            });
        }

        prices.sort_by_key(|p| p.timestamp);
        tracing::debug!(source, rows = prices.len(), "loaded prices");
        Ok(prices)
    }

    fn load_signals(&self, source: &str) -> Result<Vec<Signal>, TradedeskError> {
        let (headers, records) = self.read_table(source)?;
        let date_col = require_column(&headers, "date", source)?;
        let signal_col = require_column(&headers, "signal", source)?;

        let mut signals = Vec::with_capacity(records.len());
        for record in &records {
            let timestamp = field_timestamp(record, date_col)?;
            let value = field_f64(record, signal_col, "signal")?;
            signals.push(Signal::new(timestamp, Exposure::from_value(value, timestamp)?));
        }

        tracing::debug!(source, rows = signals.len(), "loaded signals");
        Ok(signals)
    }
}

impl ReportPort for CsvAdapter {
    fn write_trajectory(&self, trajectory: &Trajectory, output_path: &str) -> Result<(), TradedeskError> {
        let path = self.resolve(output_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data_err = |e: csv::Error| TradedeskError::Data {
            reason: format!("failed to write {}: {}", path.display(), e),
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(data_err)?;
        wtr.write_record(["date", "PortfolioValue", "Position", "Cash"])
            .map_err(data_err)?;
        for state in &trajectory.states {
            wtr.write_record([
                state.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                state.value().to_string(),
                state.position.to_string(),
                state.cash.to_string(),
            ])
            .map_err(data_err)?;
        }
        wtr.flush()?;
        tracing::info!(path = %path.display(), rows = trajectory.len(), "wrote trajectory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::PortfolioState;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, CsvAdapter) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("btc.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n",
        )
        .unwrap();
        fs::write(path.join("close_only.csv"), "close,date\n7.5,2024-02-01 12:00:00\n").unwrap();
        fs::write(path.join("signals.csv"), "date,signal\n2024-01-15,1\n2024-01-16,0\n").unwrap();
        fs::write(path.join("short.csv"), "date,signal\n2024-01-15,-1\n").unwrap();

        (dir, CsvAdapter::new(path))
    }

    fn day(d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn load_prices_sorts_by_date() {
        let (_dir, adapter) = setup_test_data();
        let prices = adapter.load_prices("btc.csv").unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].timestamp, day(15));
        assert_eq!(prices[0].open, 100.0);
        assert_eq!(prices[0].high, 110.0);
        assert_eq!(prices[0].low, 90.0);
        assert_eq!(prices[0].close, 105.0);
        assert_eq!(prices[0].volume, 50_000.0);
        assert_eq!(prices[1].close, 110.0);
    }

    #[test]
    fn close_only_file_fills_missing_columns() {
        let (_dir, adapter) = setup_test_data();
        let prices = adapter.load_prices("close_only.csv").unwrap();
        assert_eq!(prices[0].open, 7.5);
        assert_eq!(prices[0].low, 7.5);
        assert_eq!(prices[0].volume, 0.0);
        assert_eq!(prices[0].timestamp.format("%H:%M").to_string(), "12:00");
    }

    #[test]
    fn missing_file_is_data_error() {
        let (_dir, adapter) = setup_test_data();
        assert!(matches!(
            adapter.load_prices("nope.csv"),
            Err(TradedeskError::Data { .. })
        ));
    }

    #[test]
    fn missing_close_column_is_data_error() {
        let (_dir, adapter) = setup_test_data();
        let err = adapter.load_prices("signals.csv").unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn non_positive_or_non_finite_close_is_rejected() {
        let (dir, adapter) = setup_test_data();
        for bad in ["0", "-5", "NaN", "inf"] {
            fs::write(
                dir.path().join("bad.csv"),
                format!("date,close\n2024-01-01,100\n2024-01-02,{bad}\n"),
            )
            .unwrap();
            let err = adapter.load_prices("bad.csv").unwrap_err();
            assert!(
                matches!(&err, TradedeskError::Data { reason } if reason.contains("row 2")),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn load_signals_maps_exposure() {
        let (_dir, adapter) = setup_test_data();
        let signals = adapter.load_signals("signals.csv").unwrap();
        assert_eq!(signals[0].exposure, Exposure::Long);
        assert_eq!(signals[1].exposure, Exposure::Flat);
    }

    #[test]
    fn short_signal_is_unsupported() {
        let (_dir, adapter) = setup_test_data();
        assert!(matches!(
            adapter.load_signals("short.csv"),
            Err(TradedeskError::UnsupportedSignal { .. })
        ));
    }

    #[test]
    fn write_trajectory_layout() {
        let (dir, adapter) = setup_test_data();
        let trajectory = Trajectory {
            states: vec![PortfolioState {
                timestamp: day(15),
                cash: 0.0,
                position: 100.0,
                mark_price: 105.0,
            }],
        };
        adapter.write_trajectory(&trajectory, "out/trajectory.csv").unwrap();

        let raw = fs::read_to_string(dir.path().join("out/trajectory.csv")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], "date,PortfolioValue,Position,Cash");
        assert_eq!(lines[1], "2024-01-15 00:00:00,10500,100,0");
    }
}
