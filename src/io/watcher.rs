use std::path::{Path, PathBuf};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

/// Watches a notes directory and forwards the ids of changed notes.
///
/// Ids are pushed into the same channel the change listener debounces, so
/// a burst of editor saves turns into a single rescan.
pub struct NoteWatcher {
    _watcher: RecommendedWatcher,
}

impl NoteWatcher {
    pub fn start(notes_dir: &Path, tx: UnboundedSender<String>) -> Result<Self, notify::Error> {
        let notes_dir_owned = notes_dir.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {}
                    _ => return,
                }
                for id in event
                    .paths
                    .iter()
                    .filter_map(|p| note_id_for_path(&notes_dir_owned, p))
                {
                    let _ = tx.send(id);
                }
            },
            Config::default(),
        )?;

        watcher.watch(notes_dir, RecursiveMode::NonRecursive)?;
        Ok(NoteWatcher { _watcher: watcher })
    }
}

/// The note id for a changed path, if it is a note body in `notes_dir`.
/// Hidden files (locks, temp files, the recovery log) are skipped.
pub fn note_id_for_path(notes_dir: &Path, path: &Path) -> Option<String> {
    if path.parent() != Some(notes_dir) {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    let path_buf = PathBuf::from(name);
    match path_buf.extension().and_then(|e| e.to_str()) {
        Some("md") => path_buf.file_stem()?.to_str().map(str::to_string),
        _ => None,
    }
}
