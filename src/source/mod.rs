//! Data source abstraction layer.
//!
//! This module defines the [`FeedSource`] trait (the remote collaborator the
//! feed manager pulls pages from), the wire-level [`RemoteRecord`] /
//! [`RemotePage`] types, and the normalised [`Record`].  The only concrete
//! implementation is [`HttpSource`].
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory (e.g. `fixture.rs`).
//! 2. Define a struct and implement [`FeedSource`] for it.
//! 3. Add `mod fixture;` below and re-export your struct.
//! 4. Construct it in `main.rs` and hand it to
//!    [`FeedManager::new`](crate::feed::FeedManager::new).
//!
//! Pagination, de-duplication and the UI are all source-agnostic.

mod http;
mod record;

pub use http::{AuthError, HttpSource};
pub use record::Record;

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;

use crate::session::Credential;

/// Errors a [`FeedSource`] can report.  All of them mean "this request
/// failed"; none of them means "there are no more pages".
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One post as the remote service sends it.
///
/// Shape-sensitive fields are kept as raw JSON so that a single odd record
/// can't fail the whole page; [`Record::from_remote`] applies the fallbacks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(default, rename = "_id", alias = "id")]
    pub id: Option<String>,
    /// Image list (`meme` on the wire).
    #[serde(default, rename = "meme")]
    pub images: Value,
    #[serde(default)]
    pub caption: Option<String>,
    /// Either a populated `{ _id, username }` object or a bare id.
    #[serde(default)]
    pub author: Value,
    #[serde(default)]
    pub likes: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One page of results plus the service's pagination metadata.
#[derive(Debug, Clone, Default)]
pub struct RemotePage {
    pub items: Vec<RemoteRecord>,
    pub total: u64,
    pub total_pages: u32,
}

/// The remote collaborator the feed manager reads from.
///
/// Implementations own transport and authentication details; callers only
/// distinguish success from failure.  Futures must be [`Send`] because the
/// manager's operations run on spawned tokio tasks.
pub trait FeedSource: Send + Sync + 'static {
    /// Human-readable label for logs and the status bar.
    fn name(&self) -> &str;

    /// Fetch page `page` (1-based) of `page_size` posts.
    fn fetch_page(
        &self,
        credential: &Credential,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<RemotePage, FetchError>> + Send;

    /// Like or unlike post `id`; returns the authoritative like count.
    fn toggle_like(
        &self,
        credential: &Credential,
        id: &str,
    ) -> impl Future<Output = Result<u64, FetchError>> + Send;
}
