use async_trait::async_trait;
use ts_core::FileEvent;

/// Receives `FileEvent`s emitted by a poll tick. Implemented by the
/// Dispatcher in the full agent; errors are logged by the caller and never
/// interrupt the tick (spec.md §4.2).
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: FileEvent) -> Result<(), String>;
}
