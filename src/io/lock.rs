use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a writer waits for another process to finish with a note
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

const RETRY_EVERY: Duration = Duration::from_millis(10);

/// Held while one note body is being replaced on disk.
///
/// The guard owns an exclusive flock on the note's `.<id>.lock` marker, so
/// two processes saving the same note take turns while saves of different
/// notes proceed side by side.
pub struct NoteLock {
    _marker: File,
    marker_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock marker {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("note is busy: {path} is still held by another writer")]
    Timeout { path: PathBuf },
    #[error("lock error: {0}")]
    IoError(#[from] std::io::Error),
}

impl NoteLock {
    /// Take the lock for `note_id`, retrying until `wait` has passed
    pub fn acquire(notes_dir: &Path, note_id: &str, wait: Duration) -> Result<Self, LockError> {
        let marker_path = marker_path(notes_dir, note_id);
        let marker = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&marker_path)
            .map_err(|source| LockError::CreateError {
                path: marker_path.clone(),
                source,
            })?;

        let deadline = Instant::now() + wait;
        while try_lock(&marker).is_err() {
            if Instant::now() >= deadline {
                return Err(LockError::Timeout { path: marker_path });
            }
            std::thread::sleep(RETRY_EVERY);
        }
        Ok(NoteLock {
            _marker: marker,
            marker_path,
        })
    }

    pub fn acquire_default(notes_dir: &Path, note_id: &str) -> Result<Self, LockError> {
        Self::acquire(notes_dir, note_id, DEFAULT_WAIT)
    }
}

impl Drop for NoteLock {
    fn drop(&mut self) {
        // closing the marker releases the flock; remove it so only notes stay in the dir
        let _ = fs::remove_file(&self.marker_path);
    }
}

/// Marker file guarding `note_id`, hidden next to `<note_id>.md`
pub fn marker_path(notes_dir: &Path, note_id: &str) -> PathBuf {
    notes_dir.join(format!(".{}.lock", note_id))
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
