use serde::{Deserialize, Serialize};

use crate::parse::header::FieldIndices;

/// Whether a log row is still running or has been closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Open,
    Completed,
}

/// One parseable CSV row of the time log
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub project: String,
    pub task: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    /// Start instant in epoch milliseconds (local time)
    pub start_ms: i64,
    /// End instant in epoch milliseconds, set for completed rows
    pub end_ms: Option<i64>,

    // --- Source tracking ---
    /// Trimmed raw fields, padded to the header width
    pub fields: Vec<String>,
    /// The original line, emitted verbatim while the entry is clean
    pub source: String,
    /// Whether a field was changed since parsing
    pub dirty: bool,
}

impl LogEntry {
    pub fn kind(&self) -> EntryKind {
        if self.end_ms.is_some() {
            EntryKind::Completed
        } else {
            EntryKind::Open
        }
    }

    /// Key used for the running-task map and per-task aggregates
    pub fn key(&self) -> String {
        task_key(&self.task, &self.project)
    }

    /// Replace the duration field, marking the entry dirty
    pub fn set_duration(&mut self, indices: &FieldIndices, value: String) {
        set_field(&mut self.fields, indices.duration, value.clone());
        self.duration = Some(value);
        self.dirty = true;
    }

    /// Fill in the end columns of an open entry
    pub fn close(
        &mut self,
        indices: &FieldIndices,
        end_date: String,
        end_time: String,
        end_ms: i64,
        duration: String,
    ) {
        set_field(&mut self.fields, indices.end_date, end_date.clone());
        set_field(&mut self.fields, indices.end_time, end_time.clone());
        set_field(&mut self.fields, indices.duration, duration.clone());
        self.end_date = Some(end_date);
        self.end_time = Some(end_time);
        self.end_ms = Some(end_ms);
        self.duration = Some(duration);
        self.dirty = true;
    }

    /// Render the row as it should appear in the note.
    /// A rebuilt row keeps the `\r` of a CRLF source line.
    pub fn to_line(&self) -> String {
        if !self.dirty {
            return self.source.clone();
        }
        let mut line = self.fields.join(",");
        if self.source.ends_with('\r') {
            line.push('\r');
        }
        line
    }
}

/// A line of the log body after the header
#[derive(Debug, Clone)]
pub enum LogLine {
    Entry(LogEntry),
    /// A row without a usable start instant, kept byte-for-byte
    Unparseable(String),
}

impl LogLine {
    pub fn as_entry(&self) -> Option<&LogEntry> {
        match self {
            LogLine::Entry(entry) => Some(entry),
            LogLine::Unparseable(_) => None,
        }
    }
}

/// A parsed log note: header line plus every following line in order
#[derive(Debug, Clone)]
pub struct LogNote {
    pub header: String,
    pub indices: FieldIndices,
    pub lines: Vec<LogLine>,
}

impl LogNote {
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.lines.iter().filter_map(LogLine::as_entry)
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut LogEntry> {
        self.lines.iter_mut().filter_map(|line| match line {
            LogLine::Entry(entry) => Some(entry),
            LogLine::Unparseable(_) => None,
        })
    }
}

/// A task currently running, derived from an open row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTask {
    pub key: String,
    pub task_name: String,
    pub project: String,
    pub start_time: i64,
}

/// Completed intervals of one (task, project) pair folded together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    pub task_name: String,
    pub project: String,
    /// Summed duration in milliseconds
    pub duration: i64,
    pub start_time: i64,
    pub end_time: i64,
}

impl CompletedTask {
    /// Fold another interval of the same pair into this aggregate
    pub fn absorb(&mut self, start_ms: i64, end_ms: i64, duration_ms: i64) {
        self.duration += duration_ms;
        self.start_time = self.start_time.min(start_ms);
        self.end_time = self.end_time.max(end_ms);
    }
}

/// `task|project`
pub fn task_key(task: &str, project: &str) -> String {
    format!("{}|{}", task, project)
}

fn set_field(fields: &mut Vec<String>, idx: usize, value: String) {
    if fields.len() <= idx {
        fields.resize(idx + 1, String::new());
    }
    fields[idx] = value;
}
