//! CSV ingest for record progressions.
//!
//! Turns a small CSV into an `ObservationSeries`:
//!
//! ```text
//! date,value            elapsed,value
//! 2019-03-01,1843.2     0,1843.2
//! 2019-04-17,1822.9     47,1822.9
//! ```
//!
//! Design goals:
//! - **Strict schema** for the time and value columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **No cleaning**: ordering is checked, monotonicity is the producer's job

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use serde::Serialize;

use crate::domain::{Observation, ObservationSeries};
use crate::error::{AppError, SeriesError};

const DATE_COLUMNS: [&str; 1] = ["date"];
const ELAPSED_COLUMNS: [&str; 2] = ["elapsed", "days"];
const VALUE_COLUMNS: [&str; 3] = ["value", "time_seconds", "time"];

/// How the time column was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimeAxis {
    /// Calendar dates; elapsed is days since `first_date`.
    Date { first_date: NaiveDate },
    /// Elapsed values read as-is.
    Elapsed,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the series plus what happened to each row.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: ObservationSeries,
    pub time_axis: TimeAxis,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a record progression from a CSV file.
pub fn load_series(path: &Path) -> Result<IngestedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    parse_series(file)
}

/// Parse a record progression from any CSV source.
pub fn parse_series<R: Read>(source: R) -> Result<IngestedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let value_col = find_column(&header_map, &VALUE_COLUMNS).ok_or_else(|| {
        AppError::new(
            2,
            format!("Missing value column (expected one of: {}).", VALUE_COLUMNS.join(", ")),
        )
    })?;
    let date_col = find_column(&header_map, &DATE_COLUMNS);
    let elapsed_col = find_column(&header_map, &ELAPSED_COLUMNS);
    if date_col.is_none() && elapsed_col.is_none() {
        return Err(AppError::new(
            2,
            "Missing time column (expected 'date' or 'elapsed').",
        ));
    }

    let mut dated: Vec<(NaiveDate, f64)> = Vec::new();
    let mut observations: Vec<Observation> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let value = match parse_f64(&record, value_col) {
            Ok(v) => v,
            Err(message) => {
                row_errors.push(RowError { line, message });
                continue;
            }
        };

        // Dates win when both columns are present.
        if let Some(col) = date_col {
            match parse_date(&record, col) {
                Ok(date) => dated.push((date, value)),
                Err(message) => row_errors.push(RowError { line, message }),
            }
        } else if let Some(col) = elapsed_col {
            match parse_f64(&record, col) {
                Ok(elapsed) => observations.push(Observation { elapsed, value }),
                Err(message) => row_errors.push(RowError { line, message }),
            }
        }
    }

    let (series, time_axis) = match date_col {
        Some(_) => {
            let first_date = dated.first().map(|(d, _)| *d).ok_or(SeriesError::Empty)?;
            (
                ObservationSeries::from_dates(&dated)?,
                TimeAxis::Date { first_date },
            )
        }
        None => {
            check_elapsed_order(&observations)?;
            (ObservationSeries::new(observations), TimeAxis::Elapsed)
        }
    };

    Ok(IngestedSeries {
        rows_used: series.len(),
        series,
        time_axis,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| header_map.get(*n).copied())
}

fn field<'r>(record: &'r StringRecord, col: usize) -> Result<&'r str, String> {
    match record.get(col) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(format!("Missing field in column {}", col + 1)),
    }
}

fn parse_f64(record: &StringRecord, col: usize) -> Result<f64, String> {
    let raw = field(record, col)?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid number '{raw}' in column {}", col + 1))?;
    if !v.is_finite() {
        return Err(format!("Non-finite number '{raw}' in column {}", col + 1));
    }
    Ok(v)
}

fn parse_date(record: &StringRecord, col: usize) -> Result<NaiveDate, String> {
    let raw = field(record, col)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{raw}' (expected YYYY-MM-DD): {e}"))
}

fn check_elapsed_order(observations: &[Observation]) -> Result<(), SeriesError> {
    if observations.is_empty() {
        return Err(SeriesError::Empty);
    }
    if observations[0].elapsed < 0.0 {
        return Err(SeriesError::OutOfOrder {
            index: 0,
            detail: format!("negative elapsed {}", observations[0].elapsed),
        });
    }
    for (index, pair) in observations.windows(2).enumerate() {
        if pair[1].elapsed < pair[0].elapsed {
            return Err(SeriesError::OutOfOrder {
                index: index + 1,
                detail: format!("elapsed {} after {}", pair[1].elapsed, pair[0].elapsed),
            });
        }
    }
    Ok(())
}
