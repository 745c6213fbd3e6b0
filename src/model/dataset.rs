//! Dataset Model
//!
//! This module defines the tabular structures produced by the data loader:
//! one `Reading` per CSV row and the immutable `Dataset` holding them in
//! file order. It also owns the CSV schema: header names are resolved by
//! name, the five relevant columns are kept and everything else is dropped.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::core::constants::{COL_BASAL, COL_BOLUS, COL_DATE, COL_GLYCEMIA, COL_TIME};
use crate::model::loader::LoadError;

/// One row of the CGM export.
///
/// The three numeric columns may carry gaps in the raw source; gaps are
/// represented as `None` until the cleaning step fills them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Calendar date as written in the export.
    pub date: String,
    /// Time of day as written in the export.
    pub time: String,
    /// Blood glucose in g/L.
    pub glycemia: Option<f64>,
    /// Meal-time insulin in units.
    pub bolus: Option<f64>,
    /// Background insulin delivery in U/h.
    pub basal_rate: Option<f64>,
}

/// Ordered sequence of readings in original file order.
///
/// The order is not guaranteed chronological; downstream interpolation
/// assumes the export is already in a stable temporal order. The dataset is
/// immutable after loading; derived data lives in
/// [`GlucoseSessionData`](crate::model::glucose::GlucoseSessionData).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    readings: Vec<Reading>,
}

impl Dataset {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    /// Parses the raw export bytes as comma-separated data with a header
    /// row and selects the five expected columns.
    ///
    /// # Errors
    /// - [`LoadError::Parse`] on malformed CSV (ragged rows, bad encoding,
    ///   non-numeric values in numeric columns).
    /// - [`LoadError::Schema`] when an expected header is absent.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);

        let headers = reader.headers().map_err(LoadError::from)?.clone();
        let col = |name: &str| -> Result<usize, LoadError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LoadError::Schema(name.to_string()))
        };
        let date_idx = col(COL_DATE)?;
        let time_idx = col(COL_TIME)?;
        let glycemia_idx = col(COL_GLYCEMIA)?;
        let bolus_idx = col(COL_BOLUS)?;
        let basal_idx = col(COL_BASAL)?;

        let mut readings = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(LoadError::from)?;
            let field = |idx: usize| record.get(idx).unwrap_or_default();
            readings.push(Reading {
                date: field(date_idx).trim().to_string(),
                time: field(time_idx).trim().to_string(),
                glycemia: parse_numeric(field(glycemia_idx), COL_GLYCEMIA, row)?,
                bolus: parse_numeric(field(bolus_idx), COL_BOLUS, row)?,
                basal_rate: parse_numeric(field(basal_idx), COL_BASAL, row)?,
            });
        }
        Ok(Self { readings })
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Extracts one numeric column with gaps encoded as NaN, ready for
    /// interpolation.
    pub fn column(&self, select: fn(&Reading) -> Option<f64>) -> Vec<f64> {
        self.readings
            .iter()
            .map(|r| select(r).unwrap_or(f64::NAN))
            .collect()
    }

    /// Best-effort timestamps for the trace x-axis.
    ///
    /// Returns `None` as soon as one row fails to parse, so the caller can
    /// fall back to a row-index axis for the whole trace instead of mixing
    /// axes.
    pub fn timestamps(&self) -> Option<Vec<OffsetDateTime>> {
        self.readings
            .iter()
            .map(|r| parse_timestamp(&r.date, &r.time))
            .collect()
    }
}

/// Parses one numeric CSV field. Empty fields are gaps, anything else must
/// be a float.
fn parse_numeric(field: &str, column: &str, row: usize) -> Result<Option<f64>, LoadError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    field.parse::<f64>().map(Some).map_err(|_| {
        LoadError::Parse(format!(
            "row {}: '{}' is not a number in column '{}'",
            row + 2,
            field,
            column
        ))
    })
}

/// Combines the date and time columns into a UTC timestamp.
///
/// Accepts ISO (`2021-08-15`) and European (`15/08/2021`) dates and
/// `HH:MM[:SS]` times.
fn parse_timestamp(date: &str, time: &str) -> Option<OffsetDateTime> {
    let date = Date::parse(date.trim(), format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(date.trim(), format_description!("[day]/[month]/[year]")))
        .ok()?;
    let time = Time::parse(time.trim(), format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(time.trim(), format_description!("[hour]:[minute]")))
        .ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
date,time,glycemia(g/l),bolus,basal rate (U/h),battery,serial
2021-08-15,08:00,1.1,2.5,0.8,95,A1
2021-08-15,08:05,,2.0,,94,A1
2021-08-15,08:10,1.4,,0.9,93,A1
";

    #[test]
    fn parses_and_selects_the_expected_columns() {
        let dataset = Dataset::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 3);
        let first = &dataset.readings()[0];
        assert_eq!(first.date, "2021-08-15");
        assert_eq!(first.time, "08:00");
        assert_eq!(first.glycemia, Some(1.1));
        assert_eq!(first.bolus, Some(2.5));
        assert_eq!(first.basal_rate, Some(0.8));
    }

    #[test]
    fn empty_fields_become_gaps() {
        let dataset = Dataset::from_csv(CSV.as_bytes()).unwrap();
        let second = &dataset.readings()[1];
        assert_eq!(second.glycemia, None);
        assert_eq!(second.basal_rate, None);
        let column = dataset.column(|r| r.glycemia);
        assert!(column[1].is_nan());
        assert_eq!(column[2], 1.4);
    }

    #[test]
    fn missing_header_is_a_schema_error() {
        let csv = "date,time,bolus\n2021-08-15,08:00,2.5\n";
        match Dataset::from_csv(csv.as_bytes()) {
            Err(LoadError::Schema(column)) => assert_eq!(column, "glycemia(g/l)"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let csv = "date,time,glycemia(g/l),bolus,basal rate (U/h)\n2021-08-15,08:00\n";
        assert!(matches!(
            Dataset::from_csv(csv.as_bytes()),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn non_numeric_values_are_a_parse_error() {
        let csv = "date,time,glycemia(g/l),bolus,basal rate (U/h)\n2021-08-15,08:00,high,2.5,0.8\n";
        assert!(matches!(
            Dataset::from_csv(csv.as_bytes()),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn timestamps_accept_iso_and_european_dates() {
        let dataset = Dataset::new(vec![
            Reading {
                date: "2021-08-15".into(),
                time: "08:00".into(),
                glycemia: Some(1.0),
                bolus: None,
                basal_rate: None,
            },
            Reading {
                date: "16/08/2021".into(),
                time: "08:00:30".into(),
                glycemia: Some(1.0),
                bolus: None,
                basal_rate: None,
            },
        ]);
        let ts = dataset.timestamps().unwrap();
        assert_eq!(ts.len(), 2);
        assert!(ts[1] > ts[0]);
    }

    #[test]
    fn one_unparseable_timestamp_disables_the_time_axis() {
        let dataset = Dataset::new(vec![Reading {
            date: "yesterday".into(),
            time: "morning".into(),
            glycemia: Some(1.0),
            bolus: None,
            basal_rate: None,
        }]);
        assert!(dataset.timestamps().is_none());
    }
}
