use crate::model::config::LogSortOrder;
use crate::model::entry::{LogEntry, LogLine, LogNote};
use crate::ops::reconcile::Reconciliation;
use crate::parse::header::DEFAULT_HEADER;
use crate::parse::log_serializer::serialize_log;

/// Why a note body needs to be written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteReason {
    /// Rows were re-sorted (durations may also have changed)
    Resort,
    /// Only duration fields changed
    DurationFix,
}

/// A body to write back, with the reason it differs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub body: String,
    pub reason: RewriteReason,
}

/// Decide whether the reconciled note must be written back.
///
/// Returns `None` when nothing changed or the rebuilt body is byte-identical
/// to `original`, so unchanged notes never trigger a write.
pub fn plan_rewrite(
    original: &str,
    reconciliation: &Reconciliation,
    order: LogSortOrder,
) -> Option<Rewrite> {
    let (body, reason) = if !reconciliation.is_sorted {
        let mut note = reconciliation.note.clone();
        sort_entries(&mut note, order);
        (serialize_log(&note), RewriteReason::Resort)
    } else if reconciliation.durations_changed {
        (serialize_log(&reconciliation.note), RewriteReason::DurationFix)
    } else {
        return None;
    };

    if body == original {
        None
    } else {
        Some(Rewrite { body, reason })
    }
}

/// Stable-sort parseable rows by start time.
///
/// Unparseable lines keep their absolute positions; every other slot is
/// refilled from the sorted entries in order.
pub fn sort_entries(note: &mut LogNote, order: LogSortOrder) {
    let mut entries: Vec<LogEntry> = Vec::new();
    let mut slots: Vec<Option<String>> = Vec::with_capacity(note.lines.len());
    for line in note.lines.drain(..) {
        match line {
            LogLine::Entry(entry) => {
                entries.push(entry);
                slots.push(None);
            }
            LogLine::Unparseable(raw) => slots.push(Some(raw)),
        }
    }

    match order {
        LogSortOrder::Ascending => entries.sort_by_key(|e| e.start_ms),
        LogSortOrder::Descending => entries.sort_by_key(|e| std::cmp::Reverse(e.start_ms)),
    }

    let mut sorted = entries.into_iter();
    note.lines = slots
        .into_iter()
        .filter_map(|slot| match slot {
            Some(raw) => Some(LogLine::Unparseable(raw)),
            None => sorted.next().map(LogLine::Entry),
        })
        .collect();
}

/// If the body is empty or whitespace-only, return the default header body
pub fn ensure_header(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        Some(format!("{}\n", DEFAULT_HEADER))
    } else {
        None
    }
}
