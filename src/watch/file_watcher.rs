use futures::StreamExt;
use futures_channel::mpsc::{self, UnboundedReceiver};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use snafu::ResultExt;
use tracing::{debug, info, warn};

use crate::ext::BestEffortPathExt;
use crate::watch::{Subscriptions, TriggerBatch, WatchError, WatchPathSnafu, WatchTarget, WatcherSnafu};

/// Bridges the watcher's callback thread into the async watch loop.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<notify::Result<Event>>,
}

impl FileWatcher {
    pub fn new(targets: &[WatchTarget]) -> Result<Self, WatchError> {
        let (sender, receiver) = mpsc::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if sender.unbounded_send(res).is_err() {
                debug!("Watch loop is gone, dropping event");
            }
        })
        .context(WatcherSnafu)?;

        for target in existing_targets(targets) {
            watcher
                .watch(&target.path, target.mode)
                .context(WatchPathSnafu {
                    path: target.path.best_effort_path_display(),
                })?;
            info!("Watching {}", target.path.display());
        }

        Ok(Self {
            _watcher: watcher,
            receiver,
        })
    }

    /// Waits for the next relevant change, then folds in everything else
    /// already queued. Returns `None` once the watcher has stopped.
    pub async fn next_batch(&mut self, subscriptions: &Subscriptions) -> Option<TriggerBatch> {
        let mut batch = TriggerBatch::default();

        while batch.is_empty() {
            let event = self.receiver.next().await?;
            absorb(&mut batch, subscriptions, event);
        }
        while let Ok(event) = self.receiver.try_recv() {
            absorb(&mut batch, subscriptions, event);
        }

        Some(batch)
    }
}

/// Replaces each missing directory with its nearest existing ancestor,
/// watched recursively, so directories created later are still covered.
/// Paths watched both ways are watched recursively once.
fn existing_targets(targets: &[WatchTarget]) -> Vec<WatchTarget> {
    let mut resolved: Vec<WatchTarget> = Vec::new();

    for target in targets {
        let target = if target.path.exists() {
            target.clone()
        } else {
            let Some(ancestor) = target.path.ancestors().find(|dir| dir.exists()) else {
                warn!("Not watching missing path {}", target.path.display());
                continue;
            };
            debug!(
                "{} does not exist yet, watching {} instead",
                target.path.display(),
                ancestor.display()
            );
            WatchTarget {
                path: ancestor.to_path_buf(),
                mode: RecursiveMode::Recursive,
            }
        };

        match resolved.iter_mut().find(|seen| seen.path == target.path) {
            Some(seen) if target.mode == RecursiveMode::Recursive => {
                seen.mode = RecursiveMode::Recursive
            }
            Some(_) => {}
            None => resolved.push(target),
        }
    }

    resolved
}

fn absorb(batch: &mut TriggerBatch, subscriptions: &Subscriptions, event: notify::Result<Event>) {
    match event {
        Ok(event) => {
            for signal in subscriptions.classify(&event) {
                batch.absorb(signal);
            }
        }
        Err(err) => warn!("File watcher error: {}", err),
    }
}
