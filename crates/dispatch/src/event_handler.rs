//! Wires the Dispatcher up as the Watcher's `EventHandler` (spec.md §4.9
//! item 2): the watcher loop hands every `created`/`modified` entry
//! straight to `dispatch`.

use crate::dispatcher::Dispatcher;
use async_trait::async_trait;
use ts_core::FileEvent;
use ts_watcher::EventHandler;

#[async_trait]
impl EventHandler for Dispatcher {
    /// `dispatch` never raises: parse failures are quarantined, delivery
    /// failures fall back to the offline queue, both internally (spec.md
    /// §7 "Parser/RemoteClient errors are consumed by the Dispatcher;
    /// never propagate past it"). The watcher's per-entry error path is
    /// therefore unused here, but kept to satisfy the trait contract.
    async fn handle(&self, event: FileEvent) -> Result<(), String> {
        self.dispatch(event).await;
        Ok(())
    }
}
