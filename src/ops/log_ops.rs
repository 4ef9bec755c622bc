use chrono::{DateTime, Local};

use crate::model::config::LogSortOrder;
use crate::model::entry::{EntryKind, LogLine};
use crate::parse::header::{resolve_header, HeaderError};
use crate::parse::log_parser::parse_log;
use crate::parse::log_serializer::serialize_log;
use crate::parse::time_codec::{format_date, format_duration, format_time};

/// Error type for log row operations
#[derive(Debug, thiserror::Error)]
pub enum LogOpError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("could not find the open start entry for task: {task}, project: {project}")]
    NoOpenRow { task: String, project: String },
}

/// The result of closing an open row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedEntry {
    pub body: String,
    pub duration_ms: i64,
}

/// Make a task or project name safe to store in a CSV cell.
/// Commas and line breaks would split the row, so they become spaces.
pub fn clean_name(name: &str) -> String {
    name.replace([',', '\n', '\r'], " ").trim().to_string()
}

/// Add an open row for `task` under `project` starting at `start`.
///
/// Ascending logs get the row appended at the end; descending logs get it
/// right after the header. The body must already have a valid header.
pub fn insert_open_entry(
    body: &str,
    project: &str,
    task: &str,
    start: &DateTime<Local>,
    order: LogSortOrder,
) -> Result<String, LogOpError> {
    let header = body.split('\n').next().unwrap_or_default();
    let indices = resolve_header(header)?;

    let mut fields = vec![String::new(); indices.width];
    fields[indices.project] = project.to_string();
    fields[indices.task] = task.to_string();
    fields[indices.start_date] = format_date(start);
    fields[indices.start_time] = format_time(start);
    let row = fields.join(",");

    let updated = match order {
        LogSortOrder::Ascending => format!("{}\n{}\n", body.trim_end(), row),
        LogSortOrder::Descending => {
            let mut lines: Vec<&str> = body.split('\n').collect();
            lines.insert(1, &row);
            lines.join("\n")
        }
    };
    Ok(updated)
}

/// Close the first open row for (`task`, `project`) that started at
/// `start_ms`, filling in end date, end time and duration.
pub fn close_open_entry(
    body: &str,
    project: &str,
    task: &str,
    start_ms: i64,
    end: &DateTime<Local>,
) -> Result<ClosedEntry, LogOpError> {
    let mut note = parse_log(body)?;
    let indices = note.indices;
    let end_ms = end.timestamp() * 1000;

    let entry = note
        .lines
        .iter_mut()
        .find_map(|line| match line {
            LogLine::Entry(e)
                if e.kind() == EntryKind::Open
                    && e.project == project
                    && e.task == task
                    && e.start_ms == start_ms =>
            {
                Some(e)
            }
            _ => None,
        })
        .ok_or_else(|| LogOpError::NoOpenRow {
            task: task.to_string(),
            project: project.to_string(),
        })?;

    let duration_ms = (end_ms - start_ms).max(0);
    entry.close(
        &indices,
        format_date(end),
        format_time(end),
        end_ms,
        format_duration(duration_ms),
    );

    Ok(ClosedEntry {
        body: serialize_log(&note),
        duration_ms,
    })
}
