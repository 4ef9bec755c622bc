use indexmap::{IndexMap, IndexSet};
use tracing::warn;

use crate::model::config::{DateRange, LogSortOrder, ScanConfig};
use crate::model::entry::{CompletedTask, EntryKind, LogLine, LogNote, RunningTask};
use crate::parse::header::HeaderError;
use crate::parse::log_parser::parse_log;
use crate::parse::time_codec::format_duration;

/// Everything a scan derives from a note body
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The parsed note, with corrected durations applied
    pub note: LogNote,
    /// Open rows keyed by `task|project`; the last open row for a key wins
    pub running: IndexMap<String, RunningTask>,
    /// Keys that had more than one open row
    pub duplicate_open: Vec<String>,
    /// Completed aggregates within the date range, in first-seen order
    pub completed: Vec<CompletedTask>,
    pub unique_tasks: Vec<String>,
    pub unique_projects: Vec<String>,
    /// Whether any stored duration disagreed with its start/end
    pub durations_changed: bool,
    /// False when sorting is enforced and rows are out of order
    pub is_sorted: bool,
}

/// Run the full reconciliation pass over a note body.
///
/// Duration correction does not depend on the date range, so one pass both
/// fixes every row and aggregates the filtered view.
pub fn reconcile(body: &str, config: &ScanConfig) -> Result<Reconciliation, HeaderError> {
    let mut note = parse_log(body)?;
    let durations_changed = correct_durations(&mut note);
    let (running, duplicate_open) = open_tasks(&note);
    let completed = aggregate(&note, &config.date_range);
    let (unique_tasks, unique_projects) = autocomplete_lists(&note);
    let is_sorted = !config.enforce_sorting || is_sorted(&note, config.log_sort_order);

    Ok(Reconciliation {
        note,
        running,
        duplicate_open,
        completed,
        unique_tasks,
        unique_projects,
        durations_changed,
        is_sorted,
    })
}

/// Recompute the duration of every completed row from its own start and end.
/// Returns true if any row was changed.
pub fn correct_durations(note: &mut LogNote) -> bool {
    let indices = note.indices;
    let mut changed = false;
    for entry in note.entries_mut() {
        let Some(end_ms) = entry.end_ms else {
            continue;
        };
        let elapsed = end_ms - entry.start_ms;
        if elapsed < 0 {
            warn!(
                task = %entry.task,
                project = %entry.project,
                "entry ends before it starts; duration clamped to zero"
            );
        }
        let expected = format_duration(elapsed);
        if entry.duration.as_deref() != Some(expected.as_str()) {
            entry.set_duration(&indices, expected);
            changed = true;
        }
    }
    changed
}

/// Build the running-task map from open rows
pub fn open_tasks(note: &LogNote) -> (IndexMap<String, RunningTask>, Vec<String>) {
    let mut running: IndexMap<String, RunningTask> = IndexMap::new();
    let mut duplicates = Vec::new();
    for entry in note.entries().filter(|e| e.kind() == EntryKind::Open) {
        let key = entry.key();
        let task = RunningTask {
            key: key.clone(),
            task_name: entry.task.clone(),
            project: entry.project.clone(),
            start_time: entry.start_ms,
        };
        if running.insert(key.clone(), task).is_some() && !duplicates.contains(&key) {
            duplicates.push(key);
        }
    }
    (running, duplicates)
}

/// Fold completed rows whose start lies in `range` into per-pair aggregates
pub fn aggregate(note: &LogNote, range: &DateRange) -> Vec<CompletedTask> {
    let mut completed: IndexMap<String, CompletedTask> = IndexMap::new();
    for entry in note.entries() {
        let Some(end_ms) = entry.end_ms else {
            continue;
        };
        if !range.contains(entry.start_ms) {
            continue;
        }
        let duration = (end_ms - entry.start_ms).max(0);
        completed
            .entry(entry.key())
            .and_modify(|agg| agg.absorb(entry.start_ms, end_ms, duration))
            .or_insert_with(|| CompletedTask {
                task_name: entry.task.clone(),
                project: entry.project.clone(),
                duration,
                start_time: entry.start_ms,
                end_time: end_ms,
            });
    }
    completed.into_values().collect()
}

/// Whether parseable rows are monotonic in start time under `order`
pub fn is_sorted(note: &LogNote, order: LogSortOrder) -> bool {
    let mut previous = match order {
        LogSortOrder::Ascending => i64::MIN,
        LogSortOrder::Descending => i64::MAX,
    };
    for entry in note.entries() {
        let out_of_order = match order {
            LogSortOrder::Ascending => entry.start_ms < previous,
            LogSortOrder::Descending => entry.start_ms > previous,
        };
        if out_of_order {
            return false;
        }
        previous = entry.start_ms;
    }
    true
}

/// Distinct task and project names, sorted case-insensitively.
///
/// Names are read from every data line, including rows without a usable
/// start, so a planned task typed without times is still offered.
pub fn autocomplete_lists(note: &LogNote) -> (Vec<String>, Vec<String>) {
    let mut tasks: IndexSet<String> = IndexSet::new();
    let mut projects: IndexSet<String> = IndexSet::new();
    for line in &note.lines {
        let (task, project) = match line {
            LogLine::Entry(entry) => (entry.task.clone(), entry.project.clone()),
            LogLine::Unparseable(raw) => {
                let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
                let column = |idx: usize| fields.get(idx).copied().unwrap_or_default().to_string();
                (column(note.indices.task), column(note.indices.project))
            }
        };
        if !task.is_empty() {
            tasks.insert(task);
        }
        if !project.is_empty() {
            projects.insert(project);
        }
    }
    (sorted_names(tasks), sorted_names(projects))
}

fn sorted_names(names: IndexSet<String>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names
}
