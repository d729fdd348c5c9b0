//! Background feed operations.
//!
//! Each user- or scroll-initiated operation runs as its own tokio task and
//! reports back to the UI loop over an [`mpsc`] channel, the same way for
//! every operation.  The feed itself is updated by the manager; messages
//! only carry what the status bar needs.
//!
//! ## For contributors
//!
//! Tasks never block on the channel: if the receiver is gone the UI has
//! exited and the message is simply dropped.

use std::sync::mpsc;
use std::sync::Arc;

use crate::feed::{FeedError, FeedManager, LoadNext};
use crate::source::FeedSource;

/// Messages sent from worker tasks to the UI loop.
#[derive(Debug)]
pub enum WorkerMsg {
    /// The first page replaced the feed and shows this many posts.
    FirstPage(usize),
    /// A reset overtook the first-page load; nothing changed.
    Stale,
    /// A `load_next` call finished without error.
    Next(LoadNext),
    /// Post `id` now has `likes` likes.
    Liked { id: String, likes: u64 },
    /// An operation failed with this error.
    Failed(FeedError),
}

/// Reload the feed from page 1.
pub fn spawn_first_page<S: FeedSource>(manager: Arc<FeedManager<S>>, tx: mpsc::Sender<WorkerMsg>) {
    tokio::spawn(async move {
        let msg = match manager.reset_and_load_first_page().await {
            Ok(Some(shown)) => WorkerMsg::FirstPage(shown),
            Ok(None) => WorkerMsg::Stale,
            Err(e) => WorkerMsg::Failed(e),
        };
        let _ = tx.send(msg);
    });
}

/// Load the next page, if the manager lets us.
pub fn spawn_load_next<S: FeedSource>(manager: Arc<FeedManager<S>>, tx: mpsc::Sender<WorkerMsg>) {
    tokio::spawn(async move {
        let msg = match manager.load_next().await {
            Ok(outcome) => WorkerMsg::Next(outcome),
            Err(e) => WorkerMsg::Failed(e),
        };
        let _ = tx.send(msg);
    });
}

/// Like or unlike post `id`.
pub fn spawn_toggle_like<S: FeedSource>(
    manager: Arc<FeedManager<S>>,
    id: String,
    tx: mpsc::Sender<WorkerMsg>,
) {
    tokio::spawn(async move {
        let msg = match manager.toggle_like(&id).await {
            Ok(likes) => WorkerMsg::Liked { id, likes },
            Err(e) => WorkerMsg::Failed(e),
        };
        let _ = tx.send(msg);
    });
}
