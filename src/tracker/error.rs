use crate::io::host::HostError;
use crate::ops::log_ops::LogOpError;
use crate::parse::header::HeaderError;

/// Errors surfaced by [`TaskManager`](crate::tracker::TaskManager) operations.
///
/// The `Display` text is what the panel shows the user.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Please select a note first.")]
    NoActiveNote,
    #[error(transparent)]
    InvalidHeader(#[from] HeaderError),
    #[error("Note not found: {0}")]
    NoteNotFound(String),
    #[error("Note {0} has no body.")]
    NoteBodyMissing(String),
    #[error("Task \"{task}\" for project \"{project}\" is already running.")]
    TaskAlreadyRunning { task: String, project: String },
    #[error("Task \"{task}\" for project \"{project}\" is not running.")]
    TaskNotRunning { task: String, project: String },
    #[error("Could not find the open start entry for task \"{task}\", project \"{project}\".")]
    OrphanedStop { task: String, project: String },
    #[error("Failed to update note: {0}")]
    Write(HostError),
    #[error("Invalid date: {0}. Use YYYY-MM-DD.")]
    InvalidDate(String),
    #[error(transparent)]
    Host(HostError),
}

impl TrackerError {
    /// Map a failed read of `note_id`
    pub(crate) fn from_read(note_id: &str, err: HostError) -> Self {
        match err {
            HostError::NotFound(_) => TrackerError::NoteNotFound(note_id.to_string()),
            other => TrackerError::Host(other),
        }
    }
}

impl From<LogOpError> for TrackerError {
    fn from(err: LogOpError) -> Self {
        match err {
            LogOpError::Header(e) => TrackerError::InvalidHeader(e),
            LogOpError::NoOpenRow { task, project } => TrackerError::OrphanedStop { task, project },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        let err = TrackerError::TaskAlreadyRunning {
            task: "Write".into(),
            project: "Blog".into(),
        };
        assert_eq!(
            err.to_string(),
            "Task \"Write\" for project \"Blog\" is already running."
        );
        assert_eq!(TrackerError::NoActiveNote.to_string(), "Please select a note first.");
    }

    #[test]
    fn log_op_errors_map_to_tracker_errors() {
        let orphaned: TrackerError = LogOpError::NoOpenRow {
            task: "Write".into(),
            project: "Blog".into(),
        }
        .into();
        assert!(matches!(orphaned, TrackerError::OrphanedStop { .. }));

        let header: TrackerError =
            LogOpError::Header(HeaderError::MissingFields(vec!["duration"])).into();
        assert!(matches!(header, TrackerError::InvalidHeader(_)));
    }

    #[test]
    fn missing_note_on_read_is_not_found() {
        let err = TrackerError::from_read("n1", HostError::NotFound("n1".into()));
        assert!(matches!(err, TrackerError::NoteNotFound(id) if id == "n1"));
    }
}
