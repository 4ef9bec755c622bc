use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::error;

/// Header written at the top of a new recovery log
const FILE_HEADER: &str = "\
<!-- timeslip recovery log: note bodies that could not be saved.
     Copy a block back into its note to restore it.
     Safe to delete once reviewed. -->

---
";

/// A note body that failed to persist
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub note_id: String,
    pub error: String,
    pub body: String,
}

impl RecoveryEntry {
    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} write failed: {}\n\nError: {}\n",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.note_id,
            self.error,
        );
        out.push_str("\n```csv\n");
        out.push_str(&self.body);
        if !self.body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n\n---\n");
        out
    }
}

pub fn recovery_log_path(notes_dir: &Path) -> PathBuf {
    notes_dir.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Append an entry to the recovery log. Failures are logged, never raised:
/// the caller is already handling a failed write.
pub fn log_recovery(notes_dir: &Path, entry: &RecoveryEntry) {
    let path = recovery_log_path(notes_dir);
    let result = (|| -> io::Result<()> {
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            file.write_all(FILE_HEADER.as_bytes())?;
        }
        file.write_all(entry.to_markdown().as_bytes())
    })();
    if let Err(e) = result {
        error!(path = %path.display(), "could not append to recovery log: {}", e);
    }
}
