//! Dashboard View
//!
//! This module renders the analytics page: title and credit block, a
//! five-row preview of the cleaned table, the descriptive-statistics table,
//! the bolus boxplot, the time-in-range tables and the interactive glucose
//! trace. Every number shown here comes precomputed from
//! [`GlucoseSessionData`]; the view never recomputes a statistic.

use std::sync::Arc;

use eframe::egui;
use egui::Color32;
use egui_extras::{Column, TableBuilder};
use egui_plot::{BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotBounds, Points};
use log::error;
use time::{Date, Month, OffsetDateTime};
use tokio::sync::mpsc::Sender;

use crate::core::constants::{COL_BASAL, COL_BOLUS, COL_DATE, COL_GLYCEMIA, COL_TIME};
use crate::core::{events::AppEvent, view_trait::ViewApi};
use crate::model::glucose::{GlucoseSessionData, RangeBucket, TraceAxis};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Preset windows of the glucose trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TraceWindow {
    OneDay,
    OneMonth,
    YearToDate,
    OneYear,
    All,
}

impl TraceWindow {
    const ALL: [(TraceWindow, &'static str); 5] = [
        (TraceWindow::OneDay, "1d"),
        (TraceWindow::OneMonth, "1m"),
        (TraceWindow::YearToDate, "YTD"),
        (TraceWindow::OneYear, "1y"),
        (TraceWindow::All, "All"),
    ];

    /// Window start for a trace ending at `last` (Unix seconds).
    fn start(self, first: f64, last: f64) -> f64 {
        match self {
            TraceWindow::OneDay => last - SECONDS_PER_DAY,
            TraceWindow::OneMonth => last - 30.0 * SECONDS_PER_DAY,
            TraceWindow::YearToDate => OffsetDateTime::from_unix_timestamp(last as i64)
                .ok()
                .and_then(|end| Date::from_calendar_date(end.year(), Month::January, 1).ok())
                .map(|jan| jan.midnight().assume_utc().unix_timestamp() as f64)
                .unwrap_or(first),
            TraceWindow::OneYear => last - 365.0 * SECONDS_PER_DAY,
            TraceWindow::All => first,
        }
    }
}

/// The single-page dashboard.
pub struct DashboardView {
    session: Arc<GlucoseSessionData>,
    event_ch: Sender<AppEvent>,
    /// Window button pressed this frame, applied on the next plot show.
    pending_window: Option<TraceWindow>,
}

impl DashboardView {
    pub fn new(session: Arc<GlucoseSessionData>, event_ch: Sender<AppEvent>) -> Self {
        Self {
            session,
            event_ch,
            pending_window: None,
        }
    }

    fn render_header(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("2nd Patient Data Analytics Dashboard");
            ui.label("Credit: Meryem Kacimi & Ilhem Kacimi");
            if ui.small_button("Reload data").clicked() {
                self.event(AppEvent::ReloadData);
            }
        });
        ui.separator();
    }

    /// Five-row preview of the cleaned table.
    fn render_preview(&self, ui: &mut egui::Ui) {
        ui.heading("Data Pre-Processing");
        ui.label(
            "The export comes from an Omnipod Dash pump. The relevant columns are \
             glycemia(g/l), bolus and basal rate (U/h); gaps in those columns are \
             filled by linear interpolation in both directions.",
        );
        ui.add_space(6.0);

        let fmt = |v: Option<f64>| v.map_or(String::new(), |v| format!("{:.2}", v));
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .columns(Column::auto().at_least(80.0), 5)
            .header(20.0, |mut header| {
                for name in [COL_DATE, COL_TIME, COL_GLYCEMIA, COL_BOLUS, COL_BASAL] {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|mut body| {
                for reading in self.session.readings.iter().take(5) {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&reading.date);
                        });
                        row.col(|ui| {
                            ui.label(&reading.time);
                        });
                        row.col(|ui| {
                            ui.label(fmt(reading.glycemia));
                        });
                        row.col(|ui| {
                            ui.label(fmt(reading.bolus));
                        });
                        row.col(|ui| {
                            ui.label(fmt(reading.basal_rate));
                        });
                    });
                }
            });
        ui.separator();
    }

    fn render_statistics(&self, ui: &mut egui::Ui) {
        ui.heading("Mean Glucose Value");
        ui.label(
            "The mean glucose value over a given period is a straightforward descriptor \
             of overall glycemic control. The target range for diabetics is between 70 \
             and 180 mg/dL.",
        );
        ui.add_space(6.0);

        egui::Grid::new("stats grid").striped(true).show(ui, |ui| {
            for label in ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
                ui.strong(label);
            }
            ui.end_row();
            for (name, summary) in &self.session.stats {
                ui.label(*name);
                ui.label(summary.count.to_string());
                for value in [
                    summary.mean,
                    summary.std,
                    summary.min,
                    summary.q25,
                    summary.median,
                    summary.q75,
                    summary.max,
                ] {
                    ui.label(format!("{:.2}", value));
                }
                ui.end_row();
            }
        });
        ui.separator();
    }

    /// Boxplot of the cleaned bolus column with 1.5 IQR whiskers.
    fn render_boxplot(&self, ui: &mut egui::Ui) {
        ui.heading("Interquartile Range of Blood Glucose Values");
        let Some(summary) = &self.session.bolus_box else {
            ui.label("No bolus values available.");
            ui.separator();
            return;
        };

        let elem = BoxElem::new(
            0.0,
            BoxSpread::new(
                summary.lower_whisker,
                summary.q1,
                summary.median,
                summary.q3,
                summary.upper_whisker,
            ),
        )
        .name(COL_BOLUS)
        .fill(Color32::from_rgb(100, 150, 250).gamma_multiply(0.4))
        .stroke((1.5, Color32::from_rgb(100, 150, 250)));

        Plot::new("bolus boxplot")
            .legend(Legend::default())
            .height(120.0)
            .show_axes([true, false])
            .show(ui, |plot_ui| {
                plot_ui.box_plot(BoxPlot::new(vec![elem]).horizontal());
                if !summary.outliers.is_empty() {
                    let outliers: Vec<[f64; 2]> =
                        summary.outliers.iter().map(|v| [*v, 0.0]).collect();
                    plot_ui.points(
                        Points::new(outliers)
                            .name("outliers")
                            .shape(egui_plot::MarkerShape::Circle)
                            .color(Color32::RED)
                            .radius(2.5),
                    );
                }
            });
        ui.separator();
    }

    /// Range counts and percentage-of-time tables, in declared bin order.
    fn render_time_in_range(&self, ui: &mut egui::Ui) {
        ui.heading("Percentage of Time in Range (TIR)");
        ui.label(
            "The relevant ranges are hypoglycemia (BG < 0.7 g/L), the target range \
             (0.7 g/L < BG < 1.8 g/L) and hyperglycemia (BG > 1.8 g/L).",
        );
        ui.add_space(6.0);

        let totals = self.session.summary.bucket_totals();
        egui::Grid::new("range counts").striped(true).show(ui, |ui| {
            ui.strong("ranges");
            ui.strong("count");
            ui.end_row();
            for bucket in RangeBucket::ALL {
                ui.label(bucket.interval_label());
                ui.label(totals[bucket.index()].to_string());
                ui.end_row();
            }
        });
        ui.add_space(6.0);

        egui::Grid::new("range percentages")
            .striped(true)
            .show(ui, |ui| {
                for row in &self.session.percentages {
                    ui.label(row.bucket.percentage_label());
                    ui.label(&row.formatted);
                    ui.end_row();
                }
            });
        ui.separator();
    }

    /// Interactive glucose trace with preset window buttons.
    fn render_trace(&mut self, ui: &mut egui::Ui) {
        ui.heading("Glucose Trace");
        ui.label(
            "Time series of BG values, useful to visualize fluctuations over time. \
             Use the buttons to change the displayed window, then scrub and zoom freely.",
        );
        ui.add_space(6.0);

        let has_time_axis = self.session.trace.axis == TraceAxis::Timestamp;
        ui.horizontal(|ui| {
            for (window, label) in TraceWindow::ALL {
                let button = ui.add_enabled(
                    has_time_axis || window == TraceWindow::All,
                    egui::Button::new(label),
                );
                if button.clicked() {
                    self.pending_window = Some(window);
                }
            }
        });

        let points = &self.session.trace.points;
        let pending = self.pending_window.take();
        let bounds = pending.and_then(|window| trace_bounds(points, window));

        let mut plot = Plot::new("glucose trace")
            .legend(Legend::default())
            .height(300.0);
        if has_time_axis {
            plot = plot.x_axis_formatter(|mark, _range| format_day(mark.value));
        }
        plot.show(ui, |plot_ui| {
            if let Some((min, max)) = bounds {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
            }
            plot_ui.line(
                Line::new(points.clone())
                    .name(COL_GLYCEMIA)
                    .color(Color32::from_rgb(100, 150, 250)),
            );
        });
    }
}

/// Plot bounds for a preset window, `None` when the trace is empty.
fn trace_bounds(points: &[[f64; 2]], window: TraceWindow) -> Option<([f64; 2], [f64; 2])> {
    let first = points.first()?[0];
    let last = points.last()?[0];
    let start = window.start(first, last).max(first);

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for [_, y] in points {
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }
    let margin = 0.05 * (y_max - y_min).max(0.1);
    Some(([start, y_min - margin], [last, y_max + margin]))
}

/// Axis label for a Unix-seconds grid mark.
fn format_day(value: f64) -> String {
    OffsetDateTime::from_unix_timestamp(value as i64)
        .map(|ts| format!("{:04}-{:02}-{:02}", ts.year(), u8::from(ts.month()), ts.day()))
        .unwrap_or_default()
}

impl ViewApi for DashboardView {
    fn event(&self, event: AppEvent) {
        if let Err(e) = self.event_ch.try_send(event) {
            error!("Failed to send AppEvent: {}", e);
        }
    }

    /// Renders the complete dashboard page.
    fn render(&mut self, ctx: &egui::Context) -> Result<(), String> {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_header(ui);
                self.render_preview(ui);
                self.render_statistics(ui);
                self.render_boxplot(ui);
                self.render_time_in_range(ui);
                self.render_trace(ui);
            });
        });
        Ok(())
    }
}
