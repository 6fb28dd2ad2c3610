//! Watch mode: re-runs the pipeline when sources change and asks browsers to
//! reload when outputs change.

mod file_watcher;
mod subscriptions;
mod trigger_batch;

pub use file_watcher::FileWatcher;
pub use subscriptions::{Subscriptions, WatchSignal, WatchTarget};
pub use trigger_batch::TriggerBatch;

use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::pipeline::Orchestrator;
use crate::tools::{LiveReload, LiveReloadError, Notifier};

/// Runs until the watcher stops. Failed runs are already reported by the
/// orchestrator and do not end the loop.
pub async fn watch<N: Notifier>(orchestrator: &mut Orchestrator<N>) -> Result<(), WatchError> {
    let live_reload = LiveReload::start(&orchestrator.options().reload, orchestrator.root())
        .context(LiveReloadSnafu)?;
    debug!("Live reload companion running: {}", live_reload.is_running());
    let subscriptions = Subscriptions::resolve(orchestrator).await;
    let mut watcher = FileWatcher::new(&subscriptions.targets())?;
    info!("Waiting for changes");

    while let Some(batch) = watcher.next_batch(&subscriptions).await {
        debug!("Handling {:?}", batch);

        for path in &batch.deleted {
            orchestrator.forget(path);
        }
        if batch.rebuild {
            orchestrator.compile().await;
        }
        if batch.reload {
            if let Err(err) = live_reload.reload().await {
                warn!("Live reload failed: {}", err);
            }
        }
    }

    Ok(())
}

#[derive(Debug, Snafu)]
pub enum WatchError {
    #[snafu(display("Failed to create the file watcher"))]
    WatcherError { source: notify::Error },
    #[snafu(display("Failed to watch {}", path))]
    WatchPathError { path: String, source: notify::Error },
    #[snafu(display("Failed to start live reload"))]
    LiveReloadError { source: LiveReloadError },
}
