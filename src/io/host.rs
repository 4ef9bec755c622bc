use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::io::lock::LockError;

/// A note listed under the log-note tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
}

/// Error type for host note storage
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("note not found: {0}")]
    NotFound(String),
    #[error("could not write note {id}: {reason}")]
    Write { id: String, reason: String },
    #[error("could not read note index: {0}")]
    Index(#[from] toml::de::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Note storage offered by the host application.
///
/// Change notifications flow the other way: the host pushes the ids of
/// edited notes into the channel consumed by
/// [`spawn_change_listener`](crate::tracker::debounce::spawn_change_listener).
#[async_trait]
pub trait NoteHost: Send + Sync {
    /// Read a note body. `Ok(None)` means the note exists but has no body.
    async fn read_note_body(&self, note_id: &str) -> Result<Option<String>, HostError>;

    async fn write_note_body(&self, note_id: &str, body: &str) -> Result<(), HostError>;

    async fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<NoteSummary>, HostError>;
}
