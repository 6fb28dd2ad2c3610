use std::path::PathBuf;

use crate::watch::WatchSignal;

/// Signals gathered while the previous run was in flight, answered together
/// by at most one run and one reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerBatch {
    pub deleted: Vec<PathBuf>,
    pub rebuild: bool,
    pub reload: bool,
}

impl TriggerBatch {
    pub fn absorb(&mut self, signal: WatchSignal) {
        match signal {
            WatchSignal::Rebuild => self.rebuild = true,
            WatchSignal::Deleted(path) => {
                if !self.deleted.contains(&path) {
                    self.deleted.push(path);
                }
                self.rebuild = true;
            }
            WatchSignal::Reload => self.reload = true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.rebuild && !self.reload
    }
}
