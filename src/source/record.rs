//! The feed's item type.
//!
//! `Record` is what the rest of the application works with.  It is built
//! from a [`RemoteRecord`] with field-level fallbacks so that a partially
//! populated post still renders instead of breaking the page.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::RemoteRecord;

/// Attribution shown when the post has no populated author.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A single post in the feed.
///
/// Identity (`id`) is the de-duplication key: two records with the same id
/// are the same post whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,

    /// First image of the post, empty when it has none.
    pub image_url: String,

    pub caption: String,

    /// Uploader's username, [`UNKNOWN_AUTHOR`] when missing.
    pub author: String,

    /// Uploader's id, empty when missing.  Used to hide the viewer's own
    /// posts.
    pub author_id: String,

    pub likes: u64,

    /// `None` if the service sent no date or one we couldn't parse.
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Normalise a wire record.
    ///
    /// Returns `None` only when the record has no identity, because such a
    /// record cannot be de-duplicated.
    pub fn from_remote(remote: RemoteRecord) -> Option<Self> {
        let id = remote.id.filter(|id| !id.is_empty())?;

        let image_url = remote
            .images
            .as_array()
            .and_then(|images| images.first())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let (author_id, author) = match &remote.author {
            Value::Object(author) => (
                author
                    .get("_id")
                    .or_else(|| author.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                author.get("username").and_then(Value::as_str).map(String::from),
            ),
            Value::String(id) => (id.clone(), None),
            _ => (String::new(), None),
        };

        let likes = remote.likes.as_array().map_or(0, |likes| likes.len() as u64);

        // RFC 3339 as sent by the service; degrade to None on anything else.
        let created_at = remote
            .created_at
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(Self {
            id,
            image_url,
            caption: remote.caption.unwrap_or_default(),
            author: author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            author_id,
            likes,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
