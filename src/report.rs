//! Daily availability report rebuilt from the transition log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Serialize, Serializer};
use tracing::info;

use crate::error::{LogError, ReportError};
use crate::event_log::{read_events, Event};

pub const DAY_SECONDS: f64 = 86_400.0;

pub const ORGANIZATION_HEADER: &str = "Organization";
pub const UPTIME_HEADER: &str = "Uptime, %";
pub const DOWNTIME_HEADER: &str = "Total unavailable time for period";

/// The calendar day a report covers, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportWindow {
    pub fn for_day(date: NaiveDate) -> Self {
        ReportWindow {
            start: date.and_time(NaiveTime::MIN),
            end: date.and_hms_opt(23, 59, 59).unwrap_or(date.and_time(NaiveTime::MIN)),
        }
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DowntimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DowntimeInterval {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub endpoint: String,
    pub uptime_percent: f64,
    #[serde(rename = "downtime_seconds", serialize_with = "serialize_seconds")]
    pub total_downtime: TimeDelta,
    pub intervals: Vec<DowntimeInterval>,
}

fn serialize_seconds<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(seconds(*delta))
}

fn seconds(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

/// Folds one endpoint's time-ordered events into downtime intervals.
///
/// A down event opens an interval, a restore closes it. A restore with no
/// open interval is ignored and a second down moves the start forward. An
/// interval still open after the last event is closed at `window_end`.
pub fn replay<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    window_end: NaiveDateTime,
) -> Vec<DowntimeInterval> {
    let (mut intervals, last_down) = events.into_iter().fold(
        (Vec::new(), None::<NaiveDateTime>),
        |(mut intervals, last_down), event| {
            if event.is_restore() {
                if let Some(start) = last_down {
                    intervals.push(DowntimeInterval {
                        start,
                        end: event.timestamp,
                    });
                }
                (intervals, None)
            } else {
                (intervals, Some(event.timestamp))
            }
        },
    );
    if let Some(start) = last_down {
        intervals.push(DowntimeInterval {
            start,
            end: window_end.max(start),
        });
    }
    intervals
}

/// `(day - downtime) / day * 100`, kept within `[0, 100]`.
pub fn uptime_percent(downtime: TimeDelta) -> f64 {
    ((DAY_SECONDS - seconds(downtime)) / DAY_SECONDS * 100.0).clamp(0.0, 100.0)
}

/// Builds one row per configured endpoint, in configured order, from the
/// events that fall on `date`.
pub fn generate_from_events(
    events: &[Event],
    date: NaiveDate,
    endpoints: &[String],
) -> Vec<ReportRow> {
    let window = ReportWindow::for_day(date);

    let mut by_endpoint: HashMap<&str, Vec<&Event>> = HashMap::new();
    for event in events.iter().filter(|e| window.contains(e.timestamp)) {
        by_endpoint.entry(event.endpoint.as_str()).or_default().push(event);
    }

    endpoints
        .iter()
        .map(|endpoint| {
            let mut site_events = by_endpoint.remove(endpoint.as_str()).unwrap_or_default();
            site_events.sort_by_key(|e| e.timestamp);

            let intervals = replay(site_events, window.end);
            let total_downtime = intervals
                .iter()
                .fold(TimeDelta::zero(), |total, interval| total + interval.duration());
            ReportRow {
                endpoint: endpoint.clone(),
                uptime_percent: uptime_percent(total_downtime),
                total_downtime,
                intervals,
            }
        })
        .collect()
}

/// Reads the log at `log_path` and builds the report for `date`.
pub async fn generate(
    log_path: impl AsRef<Path>,
    date: NaiveDate,
    endpoints: &[String],
) -> Result<Vec<ReportRow>, LogError> {
    let events = read_events(log_path).await?;
    let rows = generate_from_events(&events, date, endpoints);
    info!(%date, events = events.len(), rows = rows.len(), "report generated");
    Ok(rows)
}

pub fn format_uptime(percent: f64) -> String {
    format!("{percent:.2}%")
}

/// `H:MM:SS`, with a six digit fraction when there are sub-second parts.
pub fn format_downtime(delta: TimeDelta) -> String {
    let micros = delta.num_microseconds().unwrap_or(i64::MAX).max(0);
    let total_secs = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    let (hours, minutes, secs) = (total_secs / 3600, total_secs % 3600 / 60, total_secs % 60);
    if fraction == 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{hours}:{minutes:02}:{secs:02}.{fraction:06}")
    }
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("site_availability_report_{}.csv", date.format("%Y-%m-%d"))
}

/// Writes the day-stamped CSV report into `dir` and returns its path.
pub fn write_csv(
    rows: &[ReportRow],
    dir: impl AsRef<Path>,
    date: NaiveDate,
) -> Result<PathBuf, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(report_file_name(date));
    let csv_err = |source| ReportError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
    writer
        .write_record([ORGANIZATION_HEADER, UPTIME_HEADER, DOWNTIME_HEADER])
        .map_err(csv_err)?;
    for row in rows {
        writer
            .write_record([
                row.endpoint.clone(),
                format_uptime(row.uptime_percent),
                format_downtime(row.total_downtime),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Plain-text table for the console.
pub fn render_table(rows: &[ReportRow]) -> String {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|row| {
            [
                row.endpoint.clone(),
                format_uptime(row.uptime_percent),
                format_downtime(row.total_downtime),
            ]
        })
        .collect();
    let headers = [ORGANIZATION_HEADER, UPTIME_HEADER, DOWNTIME_HEADER];
    let widths: Vec<usize> = (0..3)
        .map(|col| {
            cells
                .iter()
                .map(|c| c[col].chars().count())
                .chain(std::iter::once(headers[col].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: [&str; 3]| {
        format!(
            "{:<w0$}  {:>w1$}  {:>w2$}",
            values[0],
            values[1],
            values[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        )
        .trim_end()
        .to_string()
    };

    let mut out = line(headers);
    for row in &cells {
        out.push('\n');
        out.push_str(&line([&row[0], &row[1], &row[2]]));
    }
    out
}
