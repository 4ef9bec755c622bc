use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use indexmap::IndexMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::io::host::{NoteHost, NoteSummary};
use crate::model::config::{
    AggregationLevel, DateRange, LogSortOrder, ScanConfig, Settings, SummarySort,
};
use crate::model::entry::{task_key, CompletedTask, RunningTask};
use crate::ops::log_ops::{clean_name, close_open_entry, insert_open_entry, LogOpError};
use crate::ops::reconcile::{open_tasks, reconcile};
use crate::ops::rewrite::{ensure_header, plan_rewrite, RewriteReason};
use crate::ops::summary::{sort_completed, summarize, SummaryRow};
use crate::parse::log_parser::parse_log;
use crate::tracker::clock::{Clock, SystemClock};
use crate::tracker::error::TrackerError;
use crate::tracker::messages::{InitialData, PanelMessage};
use crate::tracker::note_writer::{ContentHash, NoteWriter};

/// Where the last scan of the active note ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
    Reconciled,
    Failed,
}

/// What a scan request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No active note, or the notification was for another note
    Skipped,
    /// The body matches the last reconciled or self-written body
    Unchanged,
    /// State was rebuilt from the note; `rewritten` is set if the body was written back
    Reconciled { rewritten: Option<RewriteReason> },
}

#[derive(Debug, Default)]
struct TrackerState {
    config: ScanConfig,
    running: IndexMap<String, RunningTask>,
    completed: Vec<CompletedTask>,
    unique_tasks: Vec<String>,
    unique_projects: Vec<String>,
    log_notes: Vec<NoteSummary>,
    phase: ScanPhase,
    last_reconciled: Option<(String, ContentHash)>,
}

impl TrackerState {
    fn clear_tasks(&mut self) {
        self.running.clear();
        self.completed.clear();
        self.unique_tasks.clear();
        self.unique_projects.clear();
        self.last_reconciled = None;
    }
}

/// Owns the derived task state of the active log note and sequences every
/// read, write and rescan against the host.
///
/// The note body is the source of truth: each operation that changes the
/// note finishes with a full rescan. Operations on the same note run one
/// at a time. Every public operation posts its error to the panel before
/// returning it.
pub struct TaskManager<H, C = SystemClock> {
    host: Arc<H>,
    clock: C,
    panel: UnboundedSender<PanelMessage>,
    state: Mutex<TrackerState>,
    note_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    writer: NoteWriter<H>,
}

impl<H: NoteHost, C: Clock> TaskManager<H, C> {
    pub fn new(
        host: Arc<H>,
        clock: C,
        settings: &Settings,
        panel: UnboundedSender<PanelMessage>,
    ) -> Self {
        let config = ScanConfig::from_settings(settings, clock.now().date_naive());
        TaskManager {
            writer: NoteWriter::new(host.clone()),
            host,
            clock,
            panel,
            state: Mutex::new(TrackerState {
                config,
                ..TrackerState::default()
            }),
            note_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Load the log-note list and scan the configured note, if any
    pub async fn initialize(&self) -> Result<ScanOutcome, TrackerError> {
        let result = match self.load_log_notes().await {
            Ok(_) => self.scan_active().await,
            Err(e) => Err(e),
        };
        self.report(result)
    }

    pub async fn start_task(&self, task: &str, project: &str) -> Result<(), TrackerError> {
        let result = self.start_task_inner(&clean_name(task), &clean_name(project)).await;
        self.report(result)
    }

    /// Stop a running task. Returns the duration of the closed interval in ms.
    pub async fn stop_task(&self, task: &str, project: &str) -> Result<i64, TrackerError> {
        let result = self.stop_task_inner(&clean_name(task), &clean_name(project)).await;
        self.report(result)
    }

    /// Rebuild all derived state from the active note
    pub async fn scan_note_and_update_tasks(&self) -> Result<ScanOutcome, TrackerError> {
        let result = self.scan_active().await;
        self.report(result)
    }

    /// React to a change notification from the host.
    ///
    /// Bodies identical to the last self-write or the last reconciled body
    /// are ignored, which breaks the write / notify / rescan loop.
    pub async fn handle_note_change(&self, note_id: &str) -> Result<ScanOutcome, TrackerError> {
        let result = self.handle_note_change_inner(note_id).await;
        self.report(result)
    }

    /// Switch the active note. Derived state of the old note is dropped.
    pub async fn set_note_id(&self, note_id: Option<String>) -> Result<ScanOutcome, TrackerError> {
        let note_id = note_id.filter(|id| !id.is_empty());
        {
            let mut state = self.state.lock().await;
            let previous = std::mem::replace(&mut state.config.note_id, note_id);
            if let Some(previous) = previous.filter(|id| state.config.note_id.as_ref() != Some(id)) {
                self.writer.forget(&previous);
            }
            state.clear_tasks();
            state.phase = ScanPhase::Idle;
        }
        self.post_task_lists().await;
        let result = self.scan_active().await;
        self.report(result)
    }

    pub async fn set_date_range(&self, range: DateRange) -> Result<ScanOutcome, TrackerError> {
        self.state.lock().await.config.date_range = range;
        let result = self.scan_active().await;
        self.report(result)
    }

    /// Parse `YYYY-MM-DD` bounds (empty means unbounded) and apply them
    pub async fn apply_date_filter(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<ScanOutcome, TrackerError> {
        match DateRange::parse(start, end) {
            Ok(range) => self.set_date_range(range).await,
            Err(bad) => self.report(Err(TrackerError::InvalidDate(bad))),
        }
    }

    /// Change the tag that marks log notes.
    ///
    /// The active note and all derived state are cleared and the log-note
    /// list is reloaded under the new tag.
    pub async fn set_log_note_tag(&self, tag: &str) -> Result<Vec<NoteSummary>, TrackerError> {
        {
            let mut state = self.state.lock().await;
            state.config.log_note_tag = tag.trim().to_string();
            if let Some(previous) = state.config.note_id.take() {
                self.writer.forget(&previous);
            }
            state.clear_tasks();
            state.phase = ScanPhase::Idle;
        }
        self.post_task_lists().await;
        let result = self.load_log_notes().await;
        self.report(result)
    }

    pub async fn update_sort_order(&self, sort_by: SummarySort) {
        let completed = {
            let mut state = self.state.lock().await;
            state.config.summary_sort = sort_by;
            sort_completed(&mut state.completed, sort_by);
            state.completed.clone()
        };
        self.post(PanelMessage::UpdateSortOrder { sort_by });
        self.post(PanelMessage::UpdateCompletedTasks { tasks: completed });
    }

    pub async fn set_aggregation_level(&self, level: AggregationLevel) {
        self.state.lock().await.config.aggregation_level = level;
    }

    /// Change the log row order and rescan, re-sorting the note if needed
    pub async fn set_log_sort_order(
        &self,
        order: LogSortOrder,
        enforce_sorting: bool,
    ) -> Result<ScanOutcome, TrackerError> {
        {
            let mut state = self.state.lock().await;
            state.config.log_sort_order = order;
            state.config.enforce_sorting = enforce_sorting;
        }
        let result = self.scan_active().await;
        self.report(result)
    }

    /// Drop running and completed tasks from memory. The note is untouched;
    /// the next scan restores them.
    pub async fn clear_tasks(&self) {
        {
            let mut state = self.state.lock().await;
            state.running.clear();
            state.completed.clear();
            state.last_reconciled = None;
        }
        self.post(PanelMessage::UpdateRunningTasks {
            tasks: IndexMap::new(),
        });
        self.post(PanelMessage::UpdateCompletedTasks { tasks: Vec::new() });
    }

    pub async fn get_initial_data(&self) -> Result<InitialData, TrackerError> {
        let result = self.load_log_notes().await;
        let log_notes = self.report(result)?;
        let state = self.state.lock().await;
        Ok(InitialData {
            running_tasks: state.running.clone(),
            completed_tasks: state.completed.clone(),
            unique_tasks: state.unique_tasks.clone(),
            unique_projects: state.unique_projects.clone(),
            log_notes,
            default_note_id: state.config.note_id.clone(),
            sort_by: state.config.summary_sort,
            log_sort_order: state.config.log_sort_order,
            date_range: state.config.date_range,
            aggregation_level: state.config.aggregation_level,
        })
    }

    /// Reload the notes carrying the log-note tag and post them
    pub async fn refresh_log_notes(&self) -> Result<Vec<NoteSummary>, TrackerError> {
        let result = self.load_log_notes().await;
        self.report(result)
    }

    /// Completed tasks rolled up to the current aggregation level and sort,
    /// keeping rows whose task or project contains `filter`
    pub async fn summary(&self, filter: &str) -> Vec<SummaryRow> {
        let state = self.state.lock().await;
        summarize(
            &state.completed,
            state.config.aggregation_level,
            state.config.summary_sort,
            filter,
        )
    }

    pub async fn running_tasks(&self) -> IndexMap<String, RunningTask> {
        self.state.lock().await.running.clone()
    }

    pub async fn completed_tasks(&self) -> Vec<CompletedTask> {
        self.state.lock().await.completed.clone()
    }

    pub async fn autocomplete_lists(&self) -> (Vec<String>, Vec<String>) {
        let state = self.state.lock().await;
        (state.unique_tasks.clone(), state.unique_projects.clone())
    }

    pub async fn log_notes(&self) -> Vec<NoteSummary> {
        self.state.lock().await.log_notes.clone()
    }

    pub async fn note_id(&self) -> Option<String> {
        self.state.lock().await.config.note_id.clone()
    }

    pub async fn config(&self) -> ScanConfig {
        self.state.lock().await.config.clone()
    }

    pub async fn phase(&self) -> ScanPhase {
        self.state.lock().await.phase
    }

    async fn start_task_inner(&self, task: &str, project: &str) -> Result<(), TrackerError> {
        let note_id = self.active_note().await?;
        let _guard = self.lock_note(&note_id).await;

        let key = task_key(task, project);
        let order = {
            let state = self.state.lock().await;
            if state.running.contains_key(&key) {
                return Err(already_running(task, project));
            }
            state.config.log_sort_order
        };

        let body = self.read_body(&note_id).await?;
        let body = ensure_header(&body).unwrap_or(body);
        // The note may hold an open row memory has not caught up with yet
        let (open, _) = open_tasks(&parse_log(&body)?);
        if open.contains_key(&key) {
            return Err(already_running(task, project));
        }

        let start = self.clock.now();
        let updated = insert_open_entry(&body, project, task, &start, order)?;
        self.writer
            .write(&note_id, &updated)
            .await
            .map_err(TrackerError::Write)?;
        info!(note = %note_id, task = %task, project = %project, "task started");

        self.scan_locked(&note_id).await?;
        Ok(())
    }

    async fn stop_task_inner(&self, task: &str, project: &str) -> Result<i64, TrackerError> {
        let note_id = self.active_note().await?;
        let _guard = self.lock_note(&note_id).await;

        let key = task_key(task, project);
        let running = self
            .state
            .lock()
            .await
            .running
            .get(&key)
            .cloned()
            .ok_or_else(|| TrackerError::TaskNotRunning {
                task: task.to_string(),
                project: project.to_string(),
            })?;

        let body = self.read_body(&note_id).await?;
        let end = self.clock.now();
        match close_open_entry(&body, project, task, running.start_time, &end) {
            Ok(closed) => {
                self.writer
                    .write(&note_id, &closed.body)
                    .await
                    .map_err(TrackerError::Write)?;
                info!(
                    note = %note_id,
                    task = %task,
                    project = %project,
                    duration_ms = closed.duration_ms,
                    "task stopped"
                );
                self.scan_locked(&note_id).await?;
                Ok(closed.duration_ms)
            }
            Err(LogOpError::NoOpenRow { task, project }) => {
                warn!(note = %note_id, task = %task, project = %project, "no open row for running task");
                let tasks = {
                    let mut state = self.state.lock().await;
                    state.running.shift_remove(&key);
                    state.running.clone()
                };
                self.post(PanelMessage::UpdateRunningTasks { tasks });
                if let Err(e) = self.scan_locked(&note_id).await {
                    self.post_error(&e);
                }
                Err(TrackerError::OrphanedStop { task, project })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_note_change_inner(&self, note_id: &str) -> Result<ScanOutcome, TrackerError> {
        if self.note_id().await.as_deref() != Some(note_id) {
            debug!(note = %note_id, "change notification for inactive note ignored");
            return Ok(ScanOutcome::Skipped);
        }
        let _guard = self.lock_note(note_id).await;

        let body = self.read_body(note_id).await?;
        let hash = ContentHash::of(&body);
        let mut state = self.state.lock().await;
        let reconciled = state
            .last_reconciled
            .as_ref()
            .is_some_and(|(id, h)| id == note_id && *h == hash);
        if reconciled || self.writer.is_own_write(note_id, &body) {
            debug!(note = %note_id, "note unchanged since last reconciliation");
            if state.phase == ScanPhase::Reconciled {
                state.phase = ScanPhase::Idle;
            }
            return Ok(ScanOutcome::Unchanged);
        }
        drop(state);

        self.scan_locked(note_id).await
    }

    async fn scan_active(&self) -> Result<ScanOutcome, TrackerError> {
        let Some(note_id) = self.note_id().await else {
            debug!("no active note; scan skipped");
            return Ok(ScanOutcome::Skipped);
        };
        let _guard = self.lock_note(&note_id).await;
        self.scan_locked(&note_id).await
    }

    /// One full scan of `note_id`. The caller holds the note lock.
    ///
    /// On failure the derived state is left as it was.
    async fn scan_locked(&self, note_id: &str) -> Result<ScanOutcome, TrackerError> {
        let config = {
            let mut state = self.state.lock().await;
            state.phase = ScanPhase::Scanning;
            state.config.clone()
        };

        match self.reconcile_note(note_id, &config).await {
            Ok(outcome) => {
                if let Err(e) = self.load_log_notes().await {
                    self.post_error(&e);
                }
                Ok(outcome)
            }
            Err(e) => {
                self.state.lock().await.phase = ScanPhase::Failed;
                warn!(note = %note_id, "scan failed: {}", e);
                Err(e)
            }
        }
    }

    async fn reconcile_note(
        &self,
        note_id: &str,
        config: &ScanConfig,
    ) -> Result<ScanOutcome, TrackerError> {
        let mut body = self.read_body(note_id).await?;
        let mut rewritten = None;

        if let Some(seeded) = ensure_header(&body) {
            debug!(note = %note_id, "empty note; writing default header");
            self.writer
                .write(note_id, &seeded)
                .await
                .map_err(TrackerError::Write)?;
            body = seeded;
        }

        let reconciliation = reconcile(&body, config)?;
        for key in &reconciliation.duplicate_open {
            warn!(note = %note_id, key = %key, "several open rows for one task; the last one wins");
        }

        if let Some(rewrite) = plan_rewrite(&body, &reconciliation, config.log_sort_order) {
            debug!(note = %note_id, reason = ?rewrite.reason, "rewriting note body");
            self.writer
                .write(note_id, &rewrite.body)
                .await
                .map_err(TrackerError::Write)?;
            body = rewrite.body;
            rewritten = Some(rewrite.reason);
        }

        let mut completed = reconciliation.completed;
        sort_completed(&mut completed, config.summary_sort);

        let (running, unique_tasks, unique_projects) = {
            let mut state = self.state.lock().await;
            if state.config.note_id.as_deref() != Some(note_id) {
                debug!(note = %note_id, "active note changed during scan; result dropped");
                state.phase = ScanPhase::Idle;
                return Ok(ScanOutcome::Skipped);
            }
            state.running = reconciliation.running;
            state.completed = completed.clone();
            state.unique_tasks = reconciliation.unique_tasks;
            state.unique_projects = reconciliation.unique_projects;
            state.phase = ScanPhase::Reconciled;
            state.last_reconciled = Some((note_id.to_string(), ContentHash::of(&body)));
            (
                state.running.clone(),
                state.unique_tasks.clone(),
                state.unique_projects.clone(),
            )
        };

        debug!(
            note = %note_id,
            running = running.len(),
            completed = completed.len(),
            "note reconciled"
        );
        self.post(PanelMessage::UpdateRunningTasks { tasks: running });
        self.post(PanelMessage::UpdateCompletedTasks { tasks: completed });
        self.post(PanelMessage::UpdateAutocompleteLists {
            tasks: unique_tasks,
            projects: unique_projects,
        });

        Ok(ScanOutcome::Reconciled { rewritten })
    }

    async fn load_log_notes(&self) -> Result<Vec<NoteSummary>, TrackerError> {
        let tag = self.state.lock().await.config.log_note_tag.clone();
        let notes = self
            .host
            .list_notes_by_tag(&tag)
            .await
            .map_err(TrackerError::Host)?;
        if notes.is_empty() {
            debug!(tag = %tag, "no notes carry the log-note tag");
        }
        self.state.lock().await.log_notes = notes.clone();
        self.post(PanelMessage::UpdateLogNotes {
            notes: notes.clone(),
        });
        Ok(notes)
    }

    async fn read_body(&self, note_id: &str) -> Result<String, TrackerError> {
        match self.host.read_note_body(note_id).await {
            Ok(Some(body)) => Ok(body),
            Ok(None) => Err(TrackerError::NoteBodyMissing(note_id.to_string())),
            Err(e) => Err(TrackerError::from_read(note_id, e)),
        }
    }

    async fn active_note(&self) -> Result<String, TrackerError> {
        self.note_id().await.ok_or(TrackerError::NoActiveNote)
    }

    async fn lock_note(&self, note_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.note_locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.entry(note_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn post_task_lists(&self) {
        let (running, completed) = {
            let state = self.state.lock().await;
            (state.running.clone(), state.completed.clone())
        };
        self.post(PanelMessage::UpdateRunningTasks { tasks: running });
        self.post(PanelMessage::UpdateCompletedTasks { tasks: completed });
    }

    fn post(&self, message: PanelMessage) {
        if self.panel.send(message).is_err() {
            debug!("panel channel closed; message dropped");
        }
    }

    fn post_error(&self, err: &TrackerError) {
        self.post(PanelMessage::Error {
            message: err.to_string(),
        });
    }

    fn report<T>(&self, result: Result<T, TrackerError>) -> Result<T, TrackerError> {
        if let Err(e) = &result {
            self.post_error(e);
        }
        result
    }
}

fn already_running(task: &str, project: &str) -> TrackerError {
    TrackerError::TaskAlreadyRunning {
        task: task.to_string(),
        project: project.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory_host::MemoryNoteHost;
    use crate::tracker::clock::ManualClock;
    use chrono::{Local, TimeZone};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    const HEADER: &str = "Project,Task,Start date,Start time,End date,End time,Duration";

    fn manager(
        body: Option<&str>,
    ) -> (
        Arc<MemoryNoteHost>,
        TaskManager<MemoryNoteHost, ManualClock>,
        UnboundedReceiver<PanelMessage>,
    ) {
        let host = Arc::new(MemoryNoteHost::new());
        host.insert_note("log", "Time log", body, &["time-slip"]);
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).earliest().unwrap());
        let settings = Settings {
            default_note_id: Some("log".into()),
            ..Settings::default()
        };
        let (tx, rx) = unbounded_channel();
        let manager = TaskManager::new(host.clone(), clock, &settings, tx);
        (host, manager, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<PanelMessage>) -> Vec<PanelMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn default_range_is_last_week() {
        let (_host, manager, _rx) = manager(Some(""));
        let range = manager.config().await.date_range;
        assert_eq!(range.end_date.map(|d| d.to_string()).as_deref(), Some("2024-01-03"));
        assert_eq!(range.start_date.map(|d| d.to_string()).as_deref(), Some("2023-12-28"));
    }

    #[tokio::test]
    async fn missing_body_fails_scan_and_posts_error() {
        let (_host, manager, mut rx) = manager(None);
        let err = manager.scan_note_and_update_tasks().await.unwrap_err();
        assert!(matches!(err, TrackerError::NoteBodyMissing(_)));
        assert_eq!(manager.phase().await, ScanPhase::Failed);
        assert!(drain(&mut rx).contains(&PanelMessage::Error {
            message: "Note log has no body.".into()
        }));
    }

    #[tokio::test]
    async fn notifications_for_other_notes_are_skipped() {
        let (host, manager, _rx) = manager(Some(&format!("{HEADER}\n")));
        manager.scan_note_and_update_tasks().await.unwrap();
        let writes = host.write_count();
        assert_eq!(
            manager.handle_note_change("other").await.unwrap(),
            ScanOutcome::Skipped
        );
        assert_eq!(host.write_count(), writes);
    }

    #[tokio::test]
    async fn reconciled_phase_returns_to_idle_on_own_notification() {
        let (_host, manager, _rx) = manager(Some(""));
        manager.scan_note_and_update_tasks().await.unwrap();
        assert_eq!(manager.phase().await, ScanPhase::Reconciled);
        assert_eq!(
            manager.handle_note_change("log").await.unwrap(),
            ScanOutcome::Unchanged
        );
        assert_eq!(manager.phase().await, ScanPhase::Idle);
    }

    #[tokio::test]
    async fn leaving_a_note_forgets_its_last_write() {
        let (host, manager, _rx) = manager(Some(&format!("{HEADER}\n")));
        manager.start_task("Write", "Blog").await.unwrap();
        let written = host.body("log").unwrap();
        assert!(manager.writer.is_own_write("log", &written));

        // Re-selecting the same note keeps the record
        manager.set_note_id(Some("log".into())).await.unwrap();
        assert!(manager.writer.is_own_write("log", &written));

        host.insert_note("other", "Other log", Some(""), &["time-slip"]);
        manager.set_note_id(Some("other".into())).await.unwrap();
        assert!(!manager.writer.is_own_write("log", &written));
    }

    #[tokio::test]
    async fn changing_the_tag_forgets_the_active_note_write() {
        let (host, manager, _rx) = manager(Some(&format!("{HEADER}\n")));
        manager.start_task("Write", "Blog").await.unwrap();
        let written = host.body("log").unwrap();

        manager.set_log_note_tag("billing").await.unwrap();
        assert_eq!(manager.note_id().await, None);
        assert!(!manager.writer.is_own_write("log", &written));
    }

    #[tokio::test]
    async fn invalid_date_filter_is_reported() {
        let (_host, manager, mut rx) = manager(Some(""));
        let err = manager
            .apply_date_filter(Some("2024-13-01"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidDate(ref d) if d == "2024-13-01"));
        assert!(matches!(drain(&mut rx).last(), Some(PanelMessage::Error { .. })));
    }
}
