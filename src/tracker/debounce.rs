use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::io::host::NoteHost;
use crate::tracker::clock::Clock;
use crate::tracker::task_manager::TaskManager;

/// Wait for a note id, then keep collecting until `quiet` passes with no new
/// ids. Returns the distinct ids in arrival order, or `None` once the
/// channel is closed and drained.
pub async fn collect_batch(
    rx: &mut UnboundedReceiver<String>,
    quiet: Duration,
) -> Option<IndexSet<String>> {
    let first = rx.recv().await?;
    let mut batch = IndexSet::new();
    batch.insert(first);
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(id) => {
                    batch.insert(id);
                }
                None => break,
            },
            _ = tokio::time::sleep(quiet) => break,
        }
    }
    Some(batch)
}

/// Spawn the task that turns host change notifications into rescans.
///
/// Bursts of notifications are coalesced by [`collect_batch`]; each distinct
/// note id in a batch is handed to
/// [`TaskManager::handle_note_change`] once. Errors are already posted to
/// the panel by the manager. The task ends when every sender is dropped.
pub fn spawn_change_listener<H, C>(
    manager: Arc<TaskManager<H, C>>,
    mut rx: UnboundedReceiver<String>,
    quiet: Duration,
) -> JoinHandle<()>
where
    H: NoteHost + 'static,
    C: Clock + 'static,
{
    tokio::spawn(async move {
        while let Some(batch) = collect_batch(&mut rx, quiet).await {
            debug!(notes = batch.len(), "change notifications coalesced");
            for note_id in batch {
                let _ = manager.handle_note_change(&note_id).await;
            }
        }
        debug!("change listener stopped");
    })
}
