use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::io::host::{HostError, NoteHost, NoteSummary};
use crate::io::lock::NoteLock;
use crate::io::recovery::{atomic_write, log_recovery, RecoveryEntry};

/// Tag index stored as `notes.toml` in the notes directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteIndex {
    #[serde(default)]
    pub notes: Vec<IndexedNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedNote {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Notes stored as `<id>.md` files in one directory
#[derive(Debug, Clone)]
pub struct FsNoteHost {
    notes_dir: PathBuf,
}

impl FsNoteHost {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        FsNoteHost {
            notes_dir: notes_dir.into(),
        }
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// Path of a note body. Ids that could escape the directory are rejected.
    fn note_path(&self, note_id: &str) -> Result<PathBuf, HostError> {
        let valid = !note_id.is_empty()
            && !note_id.starts_with('.')
            && !note_id.contains(['/', '\\']);
        if !valid {
            return Err(HostError::NotFound(note_id.to_string()));
        }
        Ok(self.notes_dir.join(format!("{}.md", note_id)))
    }

    async fn read_index(&self) -> Result<NoteIndex, HostError> {
        let path = self.notes_dir.join("notes.toml");
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NoteIndex::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl NoteHost for FsNoteHost {
    async fn read_note_body(&self, note_id: &str) -> Result<Option<String>, HostError> {
        let path = self.note_path(note_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HostError::NotFound(note_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_note_body(&self, note_id: &str, body: &str) -> Result<(), HostError> {
        let path = self.note_path(note_id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(HostError::NotFound(note_id.to_string()));
        }

        let notes_dir = self.notes_dir.clone();
        let id = note_id.to_string();
        let content = body.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), HostError> {
            let _lock = NoteLock::acquire_default(&notes_dir, &id)?;
            if let Err(e) = atomic_write(&path, content.as_bytes()) {
                error!(note = %id, "note write failed: {}", e);
                log_recovery(
                    &notes_dir,
                    &RecoveryEntry {
                        timestamp: chrono::Utc::now(),
                        note_id: id.clone(),
                        error: e.to_string(),
                        body: content,
                    },
                );
                return Err(HostError::Write {
                    id,
                    reason: e.to_string(),
                });
            }
            info!(note = %id, bytes = content.len(), "note written");
            Ok(())
        })
        .await
        .map_err(|e| HostError::Write {
            id: note_id.to_string(),
            reason: e.to_string(),
        })?
    }

    async fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<NoteSummary>, HostError> {
        let index = self.read_index().await?;
        Ok(index
            .notes
            .into_iter()
            .filter(|n| n.tags.iter().any(|t| t == tag))
            .map(|n| NoteSummary {
                id: n.id,
                title: n.title,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsNoteHost) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("work.md"), "Project,Task\n").unwrap();
        fs::write(
            tmp.path().join("notes.toml"),
            r#"
[[notes]]
id = "work"
title = "Work log"
tags = ["time-slip"]

[[notes]]
id = "todo"
title = "Todo"
"#,
        )
        .unwrap();
        let host = FsNoteHost::new(tmp.path());
        (tmp, host)
    }

    #[tokio::test]
    async fn reads_and_writes_note_files() {
        let (tmp, host) = setup();
        assert_eq!(
            host.read_note_body("work").await.unwrap().as_deref(),
            Some("Project,Task\n")
        );
        host.write_note_body("work", "new body").await.unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("work.md")).unwrap(), "new body");
        assert!(!tmp.path().join(".work.lock").exists());
    }

    #[tokio::test]
    async fn missing_and_invalid_ids_are_not_found() {
        let (_tmp, host) = setup();
        assert!(matches!(host.read_note_body("absent").await, Err(HostError::NotFound(_))));
        assert!(matches!(host.read_note_body("../etc").await, Err(HostError::NotFound(_))));
        assert!(matches!(
            host.write_note_body("absent", "x").await,
            Err(HostError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn lists_notes_by_tag_from_index() {
        let (_tmp, host) = setup();
        let notes = host.list_notes_by_tag("time-slip").await.unwrap();
        assert_eq!(
            notes,
            vec![NoteSummary {
                id: "work".into(),
                title: "Work log".into()
            }]
        );
        assert!(host.list_notes_by_tag("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_index_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let host = FsNoteHost::new(tmp.path());
        assert!(host.list_notes_by_tag("time-slip").await.unwrap().is_empty());
    }
}
