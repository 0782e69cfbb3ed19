//! Filesystem watcher: raw `notify` events debounced into the aggregated
//! batches the change handler consumes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::application::FileChangeEvent;
use crate::domain::LienError;

/// Bounded capacity of the batch channel; when the consumer falls behind,
/// the aggregator task blocks on send instead of growing a queue.
const BATCH_CHANNEL_CAPACITY: usize = 16;

/// Watches a workspace and emits debounced [`FileChangeEvent::Batch`]
/// events. Raw events are bucketed into added/modified/deleted sets; after
/// `debounce_ms` of quiet the accumulated batch is flushed downstream.
pub struct FileWatcher {
    // Held for its Drop: unwatches on shutdown.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn spawn(
        workspace_root: PathBuf,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChangeEvent>), LienError> {
        let (raw_tx, raw_rx) = mpsc::channel::<RawChange>(256);
        let (batch_tx, batch_rx) = mpsc::channel::<FileChangeEvent>(BATCH_CHANNEL_CAPACITY);

        let root = workspace_root.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for change in classify_event(&event, &root) {
                        // Drop on overflow: a full raw queue means a storm
                        // the debouncer will re-discover on the next event.
                        let _ = raw_tx.try_send(change);
                    }
                }
                Err(err) => error!("Watch error: {}", err),
            },
            notify::Config::default(),
        )
        .map_err(|e| LienError::internal(format!("watcher init failed: {e}")))?;

        watcher
            .watch(&workspace_root, RecursiveMode::Recursive)
            .map_err(|e| LienError::internal(format!("watch failed: {e}")))?;
        info!("Watching {} for changes", workspace_root.display());

        tokio::spawn(aggregate(raw_rx, batch_tx, Duration::from_millis(debounce_ms.max(1))));

        Ok((Self { _watcher: watcher }, batch_rx))
    }
}

#[derive(Debug)]
enum RawChange {
    Added(String),
    Modified(String),
    Deleted(String),
}

fn classify_event(event: &Event, workspace_root: &Path) -> Vec<RawChange> {
    let mut changes = Vec::new();
    for path in &event.paths {
        let relative = match path.strip_prefix(workspace_root) {
            Ok(p) => p.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if relative.is_empty() {
            continue;
        }
        let change = match event.kind {
            EventKind::Create(_) => RawChange::Added(relative),
            EventKind::Modify(_) => RawChange::Modified(relative),
            EventKind::Remove(_) => RawChange::Deleted(relative),
            _ => continue,
        };
        changes.push(change);
    }
    changes
}

/// Debounce loop: collect raw changes until the stream stays quiet for the
/// debounce window, then flush one aggregated batch.
async fn aggregate(
    mut raw_rx: mpsc::Receiver<RawChange>,
    batch_tx: mpsc::Sender<FileChangeEvent>,
    debounce: Duration,
) {
    let mut added: BTreeSet<String> = BTreeSet::new();
    let mut modified: BTreeSet<String> = BTreeSet::new();
    let mut deleted: BTreeSet<String> = BTreeSet::new();
    let mut deadline: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            raw = raw_rx.recv() => {
                match raw {
                    Some(change) => {
                        apply(&mut added, &mut modified, &mut deleted, change);
                        deadline = Some(tokio::time::Instant::now() + debounce);
                    }
                    None => {
                        // Watcher dropped; flush what we have and stop.
                        flush(&batch_tx, &mut added, &mut modified, &mut deleted).await;
                        return;
                    }
                }
            }
            _ = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                deadline = None;
                flush(&batch_tx, &mut added, &mut modified, &mut deleted).await;
            }
        }
    }
}

fn apply(
    added: &mut BTreeSet<String>,
    modified: &mut BTreeSet<String>,
    deleted: &mut BTreeSet<String>,
    change: RawChange,
) {
    match change {
        RawChange::Added(path) => {
            deleted.remove(&path);
            added.insert(path);
        }
        RawChange::Modified(path) => {
            // Creation followed by writes stays an add.
            if !added.contains(&path) {
                modified.insert(path);
            }
        }
        RawChange::Deleted(path) => {
            added.remove(&path);
            modified.remove(&path);
            deleted.insert(path);
        }
    }
}

async fn flush(
    batch_tx: &mpsc::Sender<FileChangeEvent>,
    added: &mut BTreeSet<String>,
    modified: &mut BTreeSet<String>,
    deleted: &mut BTreeSet<String>,
) {
    if added.is_empty() && modified.is_empty() && deleted.is_empty() {
        return;
    }
    let batch = FileChangeEvent::Batch {
        added: std::mem::take(added).into_iter().collect(),
        modified: std::mem::take(modified).into_iter().collect(),
        deleted: std::mem::take(deleted).into_iter().collect(),
    };
    debug!("Flushing change batch: {:?}", batch);
    // Bounded send: backpressure against a slow indexer.
    if batch_tx.send(batch).await.is_err() {
        debug!("Change consumer gone; dropping batch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_aggregation_buckets_and_debounces() {
        let (raw_tx, raw_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(4);
        tokio::spawn(aggregate(raw_rx, batch_tx, Duration::from_millis(100)));

        raw_tx.send(RawChange::Added("new.ts".to_string())).await.unwrap();
        raw_tx.send(RawChange::Modified("new.ts".to_string())).await.unwrap();
        raw_tx.send(RawChange::Modified("old.ts".to_string())).await.unwrap();
        raw_tx.send(RawChange::Deleted("gone.ts".to_string())).await.unwrap();

        let batch = batch_rx.recv().await.unwrap();
        match batch {
            FileChangeEvent::Batch {
                added,
                modified,
                deleted,
            } => {
                // A create followed by writes is still an add.
                assert_eq!(added, vec!["new.ts"]);
                assert_eq!(modified, vec!["old.ts"]);
                assert_eq!(deleted, vec!["gone.ts"]);
            }
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_then_delete_cancels_out_to_delete_only() {
        let (raw_tx, raw_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(4);
        tokio::spawn(aggregate(raw_rx, batch_tx, Duration::from_millis(50)));

        raw_tx.send(RawChange::Added("temp.ts".to_string())).await.unwrap();
        raw_tx.send(RawChange::Deleted("temp.ts".to_string())).await.unwrap();

        let batch = batch_rx.recv().await.unwrap();
        match batch {
            FileChangeEvent::Batch {
                added,
                modified,
                deleted,
            } => {
                assert!(added.is_empty());
                assert!(modified.is_empty());
                assert_eq!(deleted, vec!["temp.ts"]);
            }
            other => panic!("expected batch, got {other:?}"),
        }
    }
}
