//! Scroll-proximity trigger for infinite scrolling.
//!
//! The trigger watches the *boundary*: the last record of the feed as
//! rendered.  When that row comes within `margin` rows of the visible window
//! it calls its `on_enter` callback (in the app: spawn
//! [`FeedManager::load_next`](crate::feed::FeedManager::load_next)).
//!
//! An observation is only attached while the feed can actually grow (it has
//! records, more pages exist and nothing is in flight), and it is replaced
//! whenever any of those conditions change or another fetch settles.  The
//! last point matters for a page that adds no rows: the boundary stays where
//! it was, so without a fresh observation it would never "enter" again.  The callback fires once per
//! "boundary entered view" transition; the manager's own guard remains the
//! real protection against overlapping fetches.

use crate::feed::FeedSnapshot;

/// The rows currently on screen: `rows` rows starting at index `first`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub first: usize,
    pub rows: usize,
}

impl Viewport {
    pub fn new(first: usize, rows: usize) -> Self {
        Self { first, rows }
    }

    /// Whether row `index` is visible once the window is grown by `margin`
    /// rows on both sides.
    pub fn reaches(&self, index: usize, margin: usize) -> bool {
        index + margin >= self.first && index < self.first + self.rows + margin
    }
}

/// Conditions an observation was attached under.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Conditions {
    last_id: Option<String>,
    has_more: bool,
    is_fetching: bool,
    settled: u64,
}

impl Conditions {
    fn of(snapshot: &FeedSnapshot) -> Self {
        Self {
            last_id: snapshot.records.last().map(|r| r.id.clone()),
            has_more: snapshot.cursor.has_more,
            is_fetching: snapshot.cursor.is_fetching,
            settled: snapshot.settled,
        }
    }

    fn armed(&self) -> bool {
        self.last_id.is_some() && self.has_more && !self.is_fetching
    }
}

/// One active watch on the boundary row.
#[derive(Debug)]
struct Observation {
    index: usize,
    id: String,
    in_view: bool,
}

impl Drop for Observation {
    fn drop(&mut self) {
        tracing::trace!(boundary = %self.id, "observation released");
    }
}

pub struct ProximityTrigger {
    margin: usize,
    conditions: Option<Conditions>,
    observation: Option<Observation>,
    on_enter: Option<Box<dyn FnMut()>>,
}

impl ProximityTrigger {
    pub fn new(margin: usize, on_enter: impl FnMut() + 'static) -> Self {
        Self {
            margin,
            conditions: None,
            observation: None,
            on_enter: Some(Box::new(on_enter)),
        }
    }

    /// Re-attach against the latest feed state.
    ///
    /// Does nothing while the conditions are unchanged.  Otherwise the old
    /// observation is released first and a new one attached only if the feed
    /// can grow.
    pub fn sync(&mut self, snapshot: &FeedSnapshot) {
        let conditions = Conditions::of(snapshot);
        if self.conditions.as_ref() == Some(&conditions) {
            return;
        }

        self.observation = None;
        if conditions.armed() && self.on_enter.is_some() {
            if let Some(last) = snapshot.records.last() {
                tracing::trace!(boundary = %last.id, "observation attached");
                self.observation = Some(Observation {
                    index: snapshot.records.len() - 1,
                    id: last.id.clone(),
                    in_view: false,
                });
            }
        }
        self.conditions = Some(conditions);
    }

    /// Check the boundary against `viewport`.  Returns `true` if the callback
    /// fired.
    pub fn observe(&mut self, viewport: Viewport) -> bool {
        let Some(observation) = self.observation.as_mut() else {
            return false;
        };

        let now_in_view = viewport.reaches(observation.index, self.margin);
        let entered = now_in_view && !observation.in_view;
        observation.in_view = now_in_view;

        if entered {
            if let Some(on_enter) = self.on_enter.as_mut() {
                tracing::debug!(boundary = %observation.id, "boundary entered view");
                on_enter();
                return true;
            }
        }
        false
    }

    pub fn is_attached(&self) -> bool {
        self.observation.is_some()
    }

    /// Tear down: drop the observation and the callback.  Nothing fires
    /// afterwards, even if [`sync`](Self::sync) is called again.
    pub fn release(&mut self) {
        self.observation = None;
        self.conditions = None;
        self.on_enter = None;
    }
}

impl Drop for ProximityTrigger {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
