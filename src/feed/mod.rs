//! Paginated feed state.
//!
//! [`FeedManager`] owns the loaded records and the pagination cursor for the
//! signed-in viewer, and is the only thing that mutates them.  Its
//! [`FeedScope`] picks between the community feed (everyone but the viewer)
//! and the viewer's own posts.  It is shared
//! as `Arc<FeedManager<_>>` between the UI loop (which reads
//! [`snapshots`](FeedManager::snapshot)) and worker tasks (which run the
//! async operations).
//!
//! ## Invariants
//!
//! * The collection never holds two records with the same id; on overlap the
//!   copy loaded first is kept.
//! * At most one page fetch is outstanding.  [`FeedManager::load_next`]
//!   checks the guard and marks the fetch in flight inside one critical
//!   section, before its first `.await`.
//! * `current_page` moves forward by one per successful `load_next` and not
//!   at all on failure, so the next attempt retries the same page.
//! * Once `has_more` is false only a reset makes it true again.
//! * A failed fetch is an `Err`, never an empty "no more pages" result.
//!
//! ## For contributors
//!
//! The state mutex is a `parking_lot` mutex and must never be held across an
//! `.await`; keep every lock inside its own block.

mod collection;

pub use collection::FeedCollection;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::session::{Session, Viewer};
use crate::source::{FeedSource, FetchError, Record};

/// Posts requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Errors surfaced by feed operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Nobody is signed in; the feed is unavailable and nothing was fetched.
    #[error("no viewer is signed in")]
    NoViewer,

    #[error("fetching the feed failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Pagination bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    /// Last page merged into the collection (1-based).
    pub current_page: u32,
    pub has_more: bool,
    pub is_fetching: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            current_page: 1,
            has_more: true,
            is_fetching: false,
        }
    }
}

/// Whose posts the feed shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedScope {
    /// Everyone's posts except the viewer's own.
    #[default]
    Community,
    /// Only the viewer's own posts.
    Own,
}

impl FeedScope {
    pub fn toggled(self) -> Self {
        match self {
            Self::Community => Self::Own,
            Self::Own => Self::Community,
        }
    }

    fn keeps(self, record: &Record, viewer: &Viewer) -> bool {
        match self {
            Self::Community => record.author_id != viewer.id,
            Self::Own => record.author_id == viewer.id,
        }
    }
}

/// A filtered page, returned by [`FeedManager::fetch_page_for_append`].
#[derive(Debug, Clone)]
pub struct PageResult {
    pub records: Vec<Record>,
    pub has_more: bool,
    pub total_pages: u32,
    pub page: u32,
}

/// What a [`FeedManager::load_next`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadNext {
    /// Page `page` was merged; `added` records were new.
    Appended { page: u32, added: usize },
    /// Another fetch is already outstanding.
    Busy,
    /// The last page has already been loaded.
    Exhausted,
    /// The feed was reset while the fetch was outstanding; its result was
    /// dropped.
    Discarded,
}

/// Read-only view of the feed as of the last mutation.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub records: Arc<Vec<Record>>,
    pub cursor: CursorState,
    pub scope: FeedScope,
    /// Number of page fetches that have finished, successfully or not.
    /// Never goes down, not even on reset.
    pub settled: u64,
}

#[derive(Debug, Default)]
struct FeedState {
    collection: FeedCollection,
    cursor: CursorState,
    scope: FeedScope,
    /// Bumped on every reset so fetches started before it can tell their
    /// result is stale.
    generation: u64,
    settled: u64,
}

/// Clears `is_fetching` and counts the fetch as settled when dropped, on
/// every exit path of a fetch.
///
/// A guard from an older generation leaves the flag alone: after a reset it
/// belongs to whoever fetches next.
struct InFlight<'a> {
    state: &'a Mutex<FeedState>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.settled += 1;
        if state.generation == self.generation {
            state.cursor.is_fetching = false;
        }
    }
}

/// Paginated, de-duplicated feed for one viewer.
pub struct FeedManager<S> {
    source: S,
    session: Session,
    page_size: u32,
    state: Mutex<FeedState>,
}

impl<S: FeedSource> FeedManager<S> {
    pub fn new(source: S, session: Session) -> Self {
        Self {
            source,
            session,
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Use `page_size` posts per page (values below 1 are treated as 1).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock();
        FeedSnapshot {
            records: state.collection.shared(),
            cursor: state.cursor,
            scope: state.scope,
            settled: state.settled,
        }
    }

    /// Switch between the community feed and the viewer's own posts.
    ///
    /// Resets the feed like [`reset`](Self::reset) and returns the new scope;
    /// the caller loads the first page.
    pub fn toggle_scope(&self) -> FeedScope {
        let mut state = self.state.lock();
        state.scope = state.scope.toggled();
        Self::reset_locked(&mut state);
        info!(scope = ?state.scope, generation = state.generation, "feed scope switched");
        state.scope
    }

    /// Drop everything loaded and start over at page 1, keeping the scope.
    ///
    /// Call on sign-out or whenever the viewer's identity changes.  Any
    /// fetch still outstanding will find its result discarded.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        Self::reset_locked(&mut state);
        info!(generation = state.generation, "feed reset");
    }

    fn reset_locked(state: &mut FeedState) {
        state.collection = FeedCollection::new();
        state.cursor = CursorState::default();
        state.generation += 1;
    }

    /// Reset the feed and load page 1 into it.
    ///
    /// Returns how many records the feed now shows, or `None` if another
    /// reset overtook the fetch and its result was dropped.  On failure the
    /// feed is left empty and idle, with `has_more` still true, so a retry is
    /// possible.
    pub async fn reset_and_load_first_page(&self) -> Result<Option<usize>, FeedError> {
        let (viewer, scope, in_flight) = {
            let mut state = self.state.lock();
            Self::reset_locked(&mut state);
            let viewer = self.session.viewer().ok_or(FeedError::NoViewer)?;
            state.cursor.is_fetching = true;
            let in_flight = InFlight {
                state: &self.state,
                generation: state.generation,
            };
            (viewer, state.scope, in_flight)
        };

        debug!(generation = in_flight.generation, ?scope, "loading first page");
        let page = match self.fetch_filtered(&viewer, scope, 1).await {
            Ok(page) => page,
            Err(err) => {
                warn!(page = 1, error = %err, "first page fetch failed");
                return Err(err.into());
            }
        };

        let shown = {
            let mut state = self.state.lock();
            if state.generation != in_flight.generation {
                debug!("first page arrived after a reset; discarding");
                return Ok(None);
            }
            state.collection = FeedCollection::from_page(page.records);
            state.cursor.current_page = 1;
            state.cursor.has_more = page.has_more;
            state.collection.len()
        };

        info!(shown, has_more = page.has_more, total_pages = page.total_pages, "first page loaded");
        Ok(Some(shown))
    }

    /// Fetch and filter page `page` without touching the stored feed.
    ///
    /// Merging the result is the caller's job; [`load_next`](Self::load_next)
    /// is the usual caller.
    pub async fn fetch_page_for_append(&self, page: u32) -> Result<PageResult, FeedError> {
        let viewer = self.session.viewer().ok_or(FeedError::NoViewer)?;
        let scope = self.state.lock().scope;
        Ok(self.fetch_filtered(&viewer, scope, page).await?)
    }

    /// Load the page after `current_page` and merge it into the feed.
    ///
    /// A no-op returning [`LoadNext::Busy`] or [`LoadNext::Exhausted`] when a
    /// fetch is outstanding or the last page is already loaded.  On failure
    /// the feed and cursor are unchanged and the error is returned.
    pub async fn load_next(&self) -> Result<LoadNext, FeedError> {
        let (next_page, in_flight) = {
            let mut state = self.state.lock();
            if state.cursor.is_fetching {
                return Ok(LoadNext::Busy);
            }
            if !state.cursor.has_more {
                return Ok(LoadNext::Exhausted);
            }
            if !self.session.is_established() {
                return Err(FeedError::NoViewer);
            }
            state.cursor.is_fetching = true;
            let in_flight = InFlight {
                state: &self.state,
                generation: state.generation,
            };
            (state.cursor.current_page + 1, in_flight)
        };

        debug!(page = next_page, "loading next page");
        let page = match self.fetch_page_for_append(next_page).await {
            Ok(page) => page,
            Err(err) => {
                warn!(page = next_page, error = %err, "next page fetch failed");
                return Err(err);
            }
        };

        let outcome = {
            let mut state = self.state.lock();
            if state.generation != in_flight.generation {
                debug!(page = next_page, "page arrived after a reset; discarding");
                LoadNext::Discarded
            } else {
                let added = state.collection.merge(page.records);
                state.cursor.current_page = next_page;
                state.cursor.has_more = page.has_more;
                LoadNext::Appended {
                    page: next_page,
                    added,
                }
            }
        };

        if let LoadNext::Appended { added, .. } = outcome {
            info!(page = next_page, added, has_more = page.has_more, "page appended");
        }
        Ok(outcome)
    }

    /// Replace the like count of record `id`, leaving everything else as is.
    /// Returns `false` if the record isn't loaded.
    pub fn set_like_count(&self, id: &str, likes: u64) -> bool {
        self.state.lock().collection.set_likes(id, likes)
    }

    /// Like or unlike record `id` remotely and apply the returned count.
    pub async fn toggle_like(&self, id: &str) -> Result<u64, FeedError> {
        let viewer = self.session.viewer().ok_or(FeedError::NoViewer)?;
        let likes = self
            .source
            .toggle_like(viewer.credential(), id)
            .await
            .inspect_err(|err| warn!(id, error = %err, "like toggle failed"))?;

        if !self.set_like_count(id, likes) {
            debug!(id, "liked record is no longer loaded");
        }
        Ok(likes)
    }

    /// Fetch `page` for `viewer`, normalise it and keep what `scope` shows.
    async fn fetch_filtered(
        &self,
        viewer: &Viewer,
        scope: FeedScope,
        page: u32,
    ) -> Result<PageResult, FetchError> {
        let remote = self
            .source
            .fetch_page(viewer.credential(), page, self.page_size)
            .await?;

        let received = remote.items.len();
        let records: Vec<Record> = remote
            .items
            .into_iter()
            .filter_map(Record::from_remote)
            .filter(|record| scope.keeps(record, viewer))
            .collect();

        debug!(
            page,
            received,
            kept = records.len(),
            total = remote.total,
            total_pages = remote.total_pages,
            "page fetched"
        );

        Ok(PageResult {
            records,
            has_more: page < remote.total_pages,
            total_pages: remote.total_pages,
            page,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
