use chrono::{DateTime, Local, NaiveDateTime};

/// `YYYY-MM-DD` in local time
pub fn format_date(instant: &DateTime<Local>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// `HH:MM:SS`, 24-hour, no fractional seconds
pub fn format_time(instant: &DateTime<Local>) -> String {
    instant.format("%H:%M:%S").to_string()
}

/// Format a duration in milliseconds as `HH:MM:SS`.
///
/// Floors to whole seconds. The hour field is unbounded, so 100 hours prints
/// as `100:00:00`. Negative input clamps to zero.
pub fn format_duration(duration_ms: i64) -> String {
    let total_secs = duration_ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse a `YYYY-MM-DD` date and `HH:MM:SS` (or `HH:MM`) time as local time.
///
/// Returns `None` when either part is malformed or the wall-clock time does
/// not exist locally. Ambiguous times resolve to the earlier instant.
pub fn parse_date_time(date: &str, time: &str) -> Option<DateTime<Local>> {
    let joined = format!("{} {}", date.trim(), time.trim());
    let naive = NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M"))
        .ok()?;
    naive.and_local_timezone(Local).earliest()
}

/// Epoch milliseconds for a date/time pair, see [`parse_date_time`]
pub fn parse_epoch_ms(date: &str, time: &str) -> Option<i64> {
    parse_date_time(date, time).map(|dt| dt.timestamp_millis())
}
