// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! In-memory and durable queues sitting between the Dispatcher and the
//! RemoteClient (spec.md §4.4, §4.5).

mod batch;
mod error;
mod offline;

pub use batch::{BatchQueue, BatchStats};
pub use error::QueueError;
pub use offline::{DeadLetterItem, OfflineQueue, OfflineQueueStats, QueuedItem};
