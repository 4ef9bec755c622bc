use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::io::host::{HostError, NoteHost, NoteSummary};

#[derive(Debug, Clone)]
struct MemoryNote {
    title: String,
    body: Option<String>,
    tags: Vec<String>,
}

/// Note storage kept entirely in memory.
///
/// Notes keep insertion order for tag listings. Writes can be made to fail
/// to exercise the error path.
#[derive(Debug, Default)]
pub struct MemoryNoteHost {
    notes: Mutex<Vec<(String, MemoryNote)>>,
    write_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryNoteHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a note
    pub fn insert_note(&self, id: &str, title: &str, body: Option<&str>, tags: &[&str]) {
        let note = MemoryNote {
            title: title.to_string(),
            body: body.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        let mut notes = self.lock();
        match notes.iter_mut().find(|(note_id, _)| note_id == id) {
            Some((_, existing)) => *existing = note,
            None => notes.push((id.to_string(), note)),
        }
    }

    /// Replace a note body without counting it as a write; models an edit
    /// made in the host's own editor.
    pub fn edit_body(&self, id: &str, body: &str) {
        if let Some((_, note)) = self.lock().iter_mut().find(|(note_id, _)| note_id == id) {
            note.body = Some(body.to_string());
        }
    }

    pub fn body(&self, id: &str) -> Option<String> {
        self.lock()
            .iter()
            .find(|(note_id, _)| note_id == id)
            .and_then(|(_, note)| note.body.clone())
    }

    /// Number of `write_note_body` calls, failed ones included
    pub fn write_count(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, MemoryNote)>> {
        self.notes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NoteHost for MemoryNoteHost {
    async fn read_note_body(&self, note_id: &str) -> Result<Option<String>, HostError> {
        self.lock()
            .iter()
            .find(|(id, _)| id == note_id)
            .map(|(_, note)| note.body.clone())
            .ok_or_else(|| HostError::NotFound(note_id.to_string()))
    }

    async fn write_note_body(&self, note_id: &str, body: &str) -> Result<(), HostError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HostError::Write {
                id: note_id.to_string(),
                reason: "writes disabled".to_string(),
            });
        }
        let mut notes = self.lock();
        let (_, note) = notes
            .iter_mut()
            .find(|(id, _)| id == note_id)
            .ok_or_else(|| HostError::NotFound(note_id.to_string()))?;
        note.body = Some(body.to_string());
        Ok(())
    }

    async fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<NoteSummary>, HostError> {
        Ok(self
            .lock()
            .iter()
            .filter(|(_, note)| note.tags.iter().any(|t| t == tag))
            .map(|(id, note)| NoteSummary {
                id: id.clone(),
                title: note.title.clone(),
            })
            .collect())
    }
}
