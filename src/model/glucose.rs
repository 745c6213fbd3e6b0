//! Glucose Model
//!
//! This module derives everything the dashboard shows from a loaded
//! [`Dataset`]: gap-free columns, clinical range classification,
//! time-in-range aggregation, descriptive statistics and the trace points.
//! All of it is a pure function of the dataset and is recomputed as a whole;
//! the raw dataset itself is never mutated.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::core::constants::{
    COL_BASAL, COL_BOLUS, COL_GLYCEMIA, RANGE_EDGES, SEVERITY_HIGH, SEVERITY_LOW,
};
use crate::math::series::{boxplot_summary, describe, interpolate_both, BoxplotSummary, ColumnSummary};
use crate::model::dataset::{Dataset, Reading};

/// Clinical glucose range of one reading.
///
/// The intervals follow the declared bin edges `[0, 0.7, 1.8, 3.5]` g/L,
/// closed on the right. `ALL` fixes the presentation order to the declared
/// edge order; aggregation must never fall back to a map's natural sort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeBucket {
    /// (0, 0.7] g/L.
    Hypoglycemia,
    /// (0.7, 1.8] g/L.
    Target,
    /// (1.8, 3.5] g/L.
    Hyperglycemia,
}

impl RangeBucket {
    /// Buckets in declared bin-edge order.
    pub const ALL: [RangeBucket; 3] = [
        RangeBucket::Hypoglycemia,
        RangeBucket::Target,
        RangeBucket::Hyperglycemia,
    ];

    /// Classifies a glycemia value in g/L.
    ///
    /// Values outside `(0, 3.5]` (including gaps) are unclassified and
    /// silently excluded from aggregation, mirroring the source data's
    /// open-ended bins. This silent drop is a known limitation.
    pub fn classify(glycemia: f64) -> Option<Self> {
        if glycemia > RANGE_EDGES[0] && glycemia <= RANGE_EDGES[1] {
            Some(RangeBucket::Hypoglycemia)
        } else if glycemia > RANGE_EDGES[1] && glycemia <= RANGE_EDGES[2] {
            Some(RangeBucket::Target)
        } else if glycemia > RANGE_EDGES[2] && glycemia <= RANGE_EDGES[3] {
            Some(RangeBucket::Hyperglycemia)
        } else {
            None
        }
    }

    /// Index into bucket-count arrays, in declared order.
    pub fn index(self) -> usize {
        match self {
            RangeBucket::Hypoglycemia => 0,
            RangeBucket::Target => 1,
            RangeBucket::Hyperglycemia => 2,
        }
    }

    /// Interval label used in the range-count table.
    pub fn interval_label(self) -> String {
        let i = self.index();
        format!("({}, {}]", RANGE_EDGES[i], RANGE_EDGES[i + 1])
    }

    /// Row label of the percentage table.
    pub fn percentage_label(self) -> &'static str {
        match self {
            RangeBucket::Hypoglycemia => "Time<70:",
            RangeBucket::Target => "Time in range:",
            RangeBucket::Hyperglycemia => "Time>180:",
        }
    }
}

/// Coarse 3-level severity tag in mg/dL steps.
///
/// Classifies the **bolus** column, not glycemia. That reproduces the
/// source data pipeline verbatim; the field choice looks like a mislabeling
/// there but is preserved here until the data owner confirms intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateSeverity {
    /// Value at or below 70.
    Low,
    /// Between the thresholds.
    Moderate,
    /// Value at or above 180.
    High,
}

impl AggregateSeverity {
    pub fn classify(bolus: f64) -> Self {
        if bolus >= SEVERITY_HIGH {
            AggregateSeverity::High
        } else if bolus <= SEVERITY_LOW {
            AggregateSeverity::Low
        } else {
            // NaN input lands here as well, like the source pipeline.
            AggregateSeverity::Moderate
        }
    }

    /// The numeric tag the source pipeline stores.
    pub fn as_mg_dl(self) -> u16 {
        match self {
            AggregateSeverity::Low => 70,
            AggregateSeverity::Moderate => 110,
            AggregateSeverity::High => 180,
        }
    }
}

/// Counts of classified readings per (time-of-day, range) pair.
///
/// Rows are the distinct time-of-day strings, columns the three range
/// buckets in declared order. Missing combinations count as 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeSummary {
    counts: BTreeMap<String, [u64; 3]>,
}

impl TimeRangeSummary {
    /// Builds the pivot from per-reading classifications. Unclassified
    /// readings are skipped.
    pub fn from_classified<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<RangeBucket>)>,
    {
        let mut counts: BTreeMap<String, [u64; 3]> = BTreeMap::new();
        for (time, bucket) in rows {
            if let Some(bucket) = bucket {
                counts.entry(time.to_string()).or_default()[bucket.index()] += 1;
            }
        }
        Self { counts }
    }

    pub fn count(&self, time: &str, bucket: RangeBucket) -> u64 {
        self.counts
            .get(time)
            .map_or(0, |row| row[bucket.index()])
    }

    /// Totals per bucket summed over all time-of-day rows, in declared
    /// bin-edge order.
    pub fn bucket_totals(&self) -> [u64; 3] {
        let mut totals = [0u64; 3];
        for row in self.counts.values() {
            for (total, count) in totals.iter_mut().zip(row) {
                *total += count;
            }
        }
        totals
    }

    pub fn total_classified(&self) -> u64 {
        self.bucket_totals().iter().sum()
    }
}

/// One row of the time-in-range percentage table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentageRow {
    pub bucket: RangeBucket,
    /// Share of classified readings, in percent.
    pub value: f64,
    /// Display string, e.g. `"25.00%"`.
    pub formatted: String,
}

/// Percentage of classified readings per bucket, in declared bin order.
///
/// Unclassified readings are excluded from the denominator, so the three
/// shares sum to ~100 whenever anything was classified at all.
pub fn percentage_breakdown(totals: &[u64; 3]) -> [PercentageRow; 3] {
    let total: u64 = totals.iter().sum();
    RangeBucket::ALL.map(|bucket| {
        let value = if total == 0 {
            0.0
        } else {
            totals[bucket.index()] as f64 / total as f64 * 100.0
        };
        PercentageRow {
            bucket,
            value,
            formatted: format!("{:.2}%", value),
        }
    })
}

/// Axis of the glucose trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceAxis {
    /// X values are Unix timestamps in seconds; preset window buttons work.
    Timestamp,
    /// Timestamps could not be parsed; x values are row indices.
    #[default]
    RowIndex,
}

/// Glucose time series for the interactive chart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlucoseTrace {
    pub axis: TraceAxis,
    /// `[x, glycemia]` points; rows without a glycemia value are skipped.
    pub points: Vec<[f64; 2]>,
}

/// Everything derived from one dataset, computed in a single pass.
#[derive(Clone, Debug)]
pub struct GlucoseSessionData {
    /// Readings with the numeric gaps filled.
    pub readings: Vec<Reading>,
    /// Range bucket per reading, `None` where unclassifiable.
    pub buckets: Vec<Option<RangeBucket>>,
    /// Severity tag per reading (derived from bolus, see
    /// [`AggregateSeverity`]).
    pub severity: Vec<AggregateSeverity>,
    /// Pivot of classified readings by time of day and range.
    pub summary: TimeRangeSummary,
    /// Time-in-range percentage rows in declared bin order.
    pub percentages: [PercentageRow; 3],
    /// Descriptive statistics per numeric column, preview order.
    pub stats: Vec<(&'static str, ColumnSummary)>,
    /// Boxplot summary of the cleaned bolus column.
    pub bolus_box: Option<BoxplotSummary>,
    /// Glucose time series for the chart.
    pub trace: GlucoseTrace,
}

impl GlucoseSessionData {
    /// Runs the full pipeline: interpolation, classification, aggregation
    /// and descriptive statistics. Deterministic for a given dataset.
    ///
    /// # Errors
    /// Fails when the dataset holds no readings at all.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        if dataset.is_empty() {
            bail!("The export contains no readings.");
        }
        let glycemia = interpolate_both(&dataset.column(|r| r.glycemia));
        let bolus = interpolate_both(&dataset.column(|r| r.bolus));
        let basal = interpolate_both(&dataset.column(|r| r.basal_rate));

        let readings: Vec<Reading> = dataset
            .readings()
            .iter()
            .enumerate()
            .map(|(i, r)| Reading {
                date: r.date.clone(),
                time: r.time.clone(),
                glycemia: finite(glycemia[i]),
                bolus: finite(bolus[i]),
                basal_rate: finite(basal[i]),
            })
            .collect();

        let buckets: Vec<Option<RangeBucket>> =
            glycemia.iter().map(|g| RangeBucket::classify(*g)).collect();
        let severity: Vec<AggregateSeverity> = bolus
            .iter()
            .map(|b| AggregateSeverity::classify(*b))
            .collect();

        let summary = TimeRangeSummary::from_classified(
            readings
                .iter()
                .map(|r| r.time.as_str())
                .zip(buckets.iter().copied()),
        );
        let percentages = percentage_breakdown(&summary.bucket_totals());

        let mut stats = Vec::new();
        for (name, column) in [
            (COL_GLYCEMIA, &glycemia),
            (COL_BOLUS, &bolus),
            (COL_BASAL, &basal),
        ] {
            if let Some(summary) = describe(column) {
                stats.push((name, summary));
            }
        }

        let trace = match dataset.timestamps() {
            Some(timestamps) => GlucoseTrace {
                axis: TraceAxis::Timestamp,
                points: timestamps
                    .iter()
                    .zip(&glycemia)
                    .filter(|(_, g)| g.is_finite())
                    .map(|(ts, g)| [ts.unix_timestamp() as f64, *g])
                    .collect(),
            },
            None => GlucoseTrace {
                axis: TraceAxis::RowIndex,
                points: glycemia
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.is_finite())
                    .map(|(i, g)| [i as f64, *g])
                    .collect(),
            },
        };

        Ok(Self {
            readings,
            buckets,
            severity,
            summary,
            percentages,
            stats,
            bolus_box: boxplot_summary(&bolus),
            trace,
        })
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(time: &str, glycemia: Option<f64>, bolus: Option<f64>) -> Reading {
        Reading {
            date: "2021-08-15".into(),
            time: time.into(),
            glycemia,
            bolus,
            basal_rate: Some(0.8),
        }
    }

    #[test]
    fn classification_is_total_and_exclusive_inside_the_bins() {
        assert_eq!(RangeBucket::classify(0.5), Some(RangeBucket::Hypoglycemia));
        assert_eq!(RangeBucket::classify(0.7), Some(RangeBucket::Hypoglycemia));
        assert_eq!(RangeBucket::classify(0.71), Some(RangeBucket::Target));
        assert_eq!(RangeBucket::classify(1.8), Some(RangeBucket::Target));
        assert_eq!(RangeBucket::classify(2.0), Some(RangeBucket::Hyperglycemia));
        assert_eq!(RangeBucket::classify(3.5), Some(RangeBucket::Hyperglycemia));
    }

    #[test]
    fn values_outside_the_bins_are_unclassified() {
        assert_eq!(RangeBucket::classify(0.0), None);
        assert_eq!(RangeBucket::classify(-0.2), None);
        assert_eq!(RangeBucket::classify(3.6), None);
        assert_eq!(RangeBucket::classify(f64::NAN), None);
    }

    /// Severity intentionally classifies the bolus column, not glycemia;
    /// the dashboard reproduces the source pipeline's mislabeled input
    /// verbatim.
    #[test]
    fn severity_classifies_bolus_not_glycemia() {
        let tags: Vec<u16> = [200.0, 50.0, 100.0]
            .iter()
            .map(|b| AggregateSeverity::classify(*b).as_mg_dl())
            .collect();
        assert_eq!(tags, vec![180, 70, 110]);
        assert_eq!(AggregateSeverity::classify(70.0).as_mg_dl(), 70);
        assert_eq!(AggregateSeverity::classify(180.0).as_mg_dl(), 180);
        assert_eq!(AggregateSeverity::classify(f64::NAN).as_mg_dl(), 110);
    }

    #[test]
    fn pivot_counts_and_percentages_follow_the_declared_bin_order() {
        let dataset = Dataset::new(vec![
            reading("08:00", Some(0.5), Some(2.0)),
            reading("08:00", Some(1.0), Some(2.0)),
            reading("12:00", Some(1.0), Some(2.0)),
            reading("12:00", Some(2.0), Some(2.0)),
        ]);
        let session = GlucoseSessionData::from_dataset(&dataset).unwrap();

        assert_eq!(session.summary.bucket_totals(), [1, 2, 1]);
        assert_eq!(
            session.summary.count("08:00", RangeBucket::Hypoglycemia),
            1
        );
        assert_eq!(session.summary.count("12:00", RangeBucket::Hypoglycemia), 0);

        let formatted: Vec<&str> = session
            .percentages
            .iter()
            .map(|row| row.formatted.as_str())
            .collect();
        assert_eq!(formatted, vec!["25.00%", "50.00%", "25.00%"]);
        let sum: f64 = session.percentages.iter().map(|row| row.value).sum();
        assert!((sum - 100.0).abs() < 0.03);
    }

    #[test]
    fn unclassified_readings_are_dropped_from_the_aggregates() {
        let dataset = Dataset::new(vec![
            reading("08:00", Some(4.2), Some(2.0)),
            reading("08:05", Some(1.0), Some(2.0)),
            reading("08:10", Some(2.0), Some(2.0)),
        ]);
        let session = GlucoseSessionData::from_dataset(&dataset).unwrap();

        assert_eq!(session.buckets[0], None);
        assert_eq!(session.summary.total_classified(), 2);
        let sum: f64 = session.percentages.iter().map(|row| row.value).sum();
        assert!((sum - 100.0).abs() < 0.03);
    }

    #[test]
    fn pipeline_fills_gaps_before_classification() {
        let dataset = Dataset::new(vec![
            reading("08:00", Some(1.0), None),
            reading("08:05", None, None),
            reading("08:10", None, None),
            reading("08:15", Some(4.0), None),
        ]);
        let session = GlucoseSessionData::from_dataset(&dataset).unwrap();

        let cleaned: Vec<f64> = session.readings.iter().map(|r| r.glycemia.unwrap()).collect();
        assert_eq!(cleaned, vec![1.0, 2.0, 3.0, 4.0]);
        // Interpolated values classify too; only the 4.0 falls outside.
        assert_eq!(session.summary.bucket_totals(), [0, 1, 2]);
    }

    #[test]
    fn all_missing_column_stays_missing_and_unclassified() {
        let dataset = Dataset::new(vec![
            reading("08:00", None, Some(2.0)),
            reading("08:05", None, Some(2.0)),
        ]);
        let session = GlucoseSessionData::from_dataset(&dataset).unwrap();

        assert!(session.readings.iter().all(|r| r.glycemia.is_none()));
        assert!(session.buckets.iter().all(Option::is_none));
        assert_eq!(session.summary.total_classified(), 0);
        assert!(session.stats.iter().all(|(name, _)| *name != "glycemia(g/l)"));
        assert!(session.trace.points.is_empty());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert!(GlucoseSessionData::from_dataset(&Dataset::default()).is_err());
    }

    #[test]
    fn rerunning_the_pipeline_is_deterministic() {
        let dataset = Dataset::new(vec![
            reading("08:00", Some(1.0), Some(2.0)),
            reading("08:05", None, Some(75.0)),
            reading("08:10", Some(2.0), Some(200.0)),
        ]);
        let once = GlucoseSessionData::from_dataset(&dataset).unwrap();
        let twice = GlucoseSessionData::from_dataset(&dataset).unwrap();
        assert_eq!(once.readings, twice.readings);
        assert_eq!(once.summary, twice.summary);
        assert_eq!(once.percentages, twice.percentages);
        assert_eq!(
            once.severity,
            vec![
                AggregateSeverity::Low,
                AggregateSeverity::Moderate,
                AggregateSeverity::High
            ]
        );
    }

    #[test]
    fn trace_uses_timestamps_when_every_row_parses() {
        let dataset = Dataset::new(vec![
            reading("08:00", Some(1.0), Some(2.0)),
            reading("08:05", Some(1.2), Some(2.0)),
        ]);
        let session = GlucoseSessionData::from_dataset(&dataset).unwrap();
        assert_eq!(session.trace.axis, TraceAxis::Timestamp);
        assert_eq!(session.trace.points.len(), 2);
        assert!(session.trace.points[1][0] > session.trace.points[0][0]);

        let unparseable = Dataset::new(vec![Reading {
            date: "someday".into(),
            time: "soon".into(),
            glycemia: Some(1.0),
            bolus: None,
            basal_rate: None,
        }]);
        let session = GlucoseSessionData::from_dataset(&unparseable).unwrap();
        assert_eq!(session.trace.axis, TraceAxis::RowIndex);
    }
}
