//! Offline worker: caching lifecycle, background sync and push handling.
//!
//! The worker owns three concerns that share one storage backend:
//! - [`CacheManager`] precaches the app shell and answers intercepted requests
//! - [`SyncQueue`] replays requests that failed while offline
//! - [`NotificationDispatcher`] turns push payloads into notifications

mod host;
mod lifecycle;
mod message;
mod notify;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use host::{ConsoleHost, WorkerHost};
pub use lifecycle::{CacheManager, FetchOutcome, WorkerState};
pub use message::{ControlMessage, VersionReply};
pub use notify::{
  ClickOutcome, Notification, NotificationAction, NotificationData, NotificationDispatcher,
  CLOSE_ACTION, EXPLORE_ACTION,
};
pub use sync::{
  MemoryPendingStore, PendingRequest, PendingStore, RequestOptions, SyncQueue, SyncReport,
};
