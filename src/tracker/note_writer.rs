use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::io::host::{HostError, NoteHost};

/// SHA-256 of a note body
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(body: &str) -> Self {
        ContentHash(Sha256::digest(body.as_bytes()).into())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Write path for note bodies.
///
/// Every write records the hash of the body it wrote, so the change
/// notification the host sends back for that write can be recognized.
pub struct NoteWriter<H> {
    host: Arc<H>,
    last_written: Mutex<HashMap<String, ContentHash>>,
}

impl<H: NoteHost> NoteWriter<H> {
    pub fn new(host: Arc<H>) -> Self {
        NoteWriter {
            host,
            last_written: Mutex::new(HashMap::new()),
        }
    }

    pub async fn write(&self, note_id: &str, body: &str) -> Result<(), HostError> {
        let hash = ContentHash::of(body);
        // Recorded first: the host may notify before the write returns
        let previous = self.written().insert(note_id.to_string(), hash);
        match self.host.write_note_body(note_id, body).await {
            Ok(()) => {
                info!(note = %note_id, hash = ?hash, "note body written");
                Ok(())
            }
            Err(e) => {
                error!(note = %note_id, "note write failed: {}", e);
                let mut written = self.written();
                match previous {
                    Some(prev) => written.insert(note_id.to_string(), prev),
                    None => written.remove(note_id),
                };
                Err(e)
            }
        }
    }

    /// Whether `body` is exactly what we last wrote to `note_id`
    pub fn is_own_write(&self, note_id: &str, body: &str) -> bool {
        self.written().get(note_id) == Some(&ContentHash::of(body))
    }

    pub fn forget(&self, note_id: &str) {
        self.written().remove(note_id);
    }

    fn written(&self) -> MutexGuard<'_, HashMap<String, ContentHash>> {
        self.last_written.lock().unwrap_or_else(|p| p.into_inner())
    }
}
