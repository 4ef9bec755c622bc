use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Order of log rows by start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Sort key for completed-task summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummarySort {
    #[default]
    Duration,
    EndTime,
    Name,
}

/// Granularity of completed-task summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    #[default]
    Task,
    Project,
    Note,
}

/// Inclusive date filter for completed tasks. `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        DateRange::default()
    }

    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        DateRange {
            start_date,
            end_date,
        }
    }

    /// Parse `YYYY-MM-DD` bounds; empty strings mean unbounded.
    /// Returns the offending input on failure.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, String> {
        fn bound(value: Option<&str>) -> Result<Option<NaiveDate>, String> {
            match value.map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|_| s.to_string()),
            }
        }
        Ok(DateRange {
            start_date: bound(start)?,
            end_date: bound(end)?,
        })
    }

    /// The last `days` days ending with `today`, both inclusive
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        let days = days.clamp(1, 365);
        let start = today - chrono::Days::new(u64::from(days - 1));
        DateRange::new(Some(start), Some(today))
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    /// Range start at 00:00:00.000 local, in epoch milliseconds
    pub fn start_ms(&self) -> Option<i64> {
        let date = self.start_date?;
        date.and_time(NaiveTime::MIN)
            .and_local_timezone(Local)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    }

    /// Range end at 23:59:59.999 local, in epoch milliseconds
    pub fn end_ms(&self) -> Option<i64> {
        let date = self.end_date?;
        date.and_hms_milli_opt(23, 59, 59, 999)?
            .and_local_timezone(Local)
            .latest()
            .map(|dt| dt.timestamp_millis())
    }

    /// Whether an interval starting at `start_ms` belongs to the range.
    /// Only the start instant is tested.
    pub fn contains(&self, start_ms: i64) -> bool {
        match (self.start_ms(), self.end_ms()) {
            (None, None) => true,
            (Some(lo), Some(hi)) => lo <= start_ms && start_ms <= hi,
            (Some(lo), None) => start_ms >= lo,
            (None, Some(hi)) => start_ms <= hi,
        }
    }
}

/// User settings, read from `timeslip.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_note_tag")]
    pub log_note_tag: String,
    #[serde(default)]
    pub default_note_id: Option<String>,
    #[serde(default = "default_date_range_days")]
    pub default_date_range_days: u32,
    #[serde(default)]
    pub aggregation_level: AggregationLevel,
    #[serde(default)]
    pub summary_sort_order: SummarySort,
    #[serde(default)]
    pub log_sort_order: LogSortOrder,
    #[serde(default = "default_true")]
    pub enforce_sorting: bool,
    /// Quiet window for coalescing change notifications
    #[serde(default = "default_change_debounce_ms")]
    pub change_debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_note_tag: default_log_note_tag(),
            default_note_id: None,
            default_date_range_days: default_date_range_days(),
            aggregation_level: AggregationLevel::default(),
            summary_sort_order: SummarySort::default(),
            log_sort_order: LogSortOrder::default(),
            enforce_sorting: true,
            change_debounce_ms: default_change_debounce_ms(),
        }
    }
}

fn default_log_note_tag() -> String {
    "time-slip".to_string()
}

fn default_date_range_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

fn default_change_debounce_ms() -> u64 {
    3000
}

/// Configuration for one scan of the active note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub note_id: Option<String>,
    pub date_range: DateRange,
    pub log_sort_order: LogSortOrder,
    pub enforce_sorting: bool,
    pub summary_sort: SummarySort,
    pub aggregation_level: AggregationLevel,
    pub log_note_tag: String,
}

impl ScanConfig {
    pub fn from_settings(settings: &Settings, today: NaiveDate) -> Self {
        ScanConfig {
            note_id: settings.default_note_id.clone().filter(|id| !id.is_empty()),
            date_range: DateRange::last_days(settings.default_date_range_days, today),
            log_sort_order: settings.log_sort_order,
            enforce_sorting: settings.enforce_sorting,
            summary_sort: settings.summary_sort_order,
            aggregation_level: settings.aggregation_level,
            log_note_tag: settings.log_note_tag.clone(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            note_id: None,
            date_range: DateRange::unbounded(),
            log_sort_order: LogSortOrder::Ascending,
            enforce_sorting: true,
            summary_sort: SummarySort::Duration,
            aggregation_level: AggregationLevel::Task,
            log_note_tag: default_log_note_tag(),
        }
    }
}
