//! HTTP feed source.
//!
//! Talks to the meme service's JSON API with [`reqwest`].  Response parsing
//! is split into pure functions ([`HttpSource::parse_page`] and friends) so
//! tests can exercise it without a server.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{FeedSource, FetchError, RemotePage, RemoteRecord};
use crate::session::{Credential, TokenError, Viewer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from signing in.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("sign-in response carried no token")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// The remote meme service.
pub struct HttpSource {
    client: Client,
    /// API root, without a trailing slash (e.g. `http://localhost:5000`).
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    #[serde(default)]
    data: Option<Vec<RemoteRecord>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeBody {
    total_likes: u64,
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "message", alias = "Message")]
    error: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Sign in with email and password and return the resulting viewer.
    pub async fn login(&self, email: &str, password: &str) -> Result<Viewer, AuthError> {
        tracing::debug!(%email, "signing in");
        let response = self
            .client
            .post(format!("{}/api/verify/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(FetchError::from)?;

        let body = success_body(response).await?;
        let login: LoginBody = serde_json::from_slice(&body).map_err(FetchError::from)?;
        let token = login.token.ok_or(AuthError::MissingToken)?;
        Ok(Viewer::from_token(&token)?)
    }

    /// Decode a page response.
    ///
    /// Missing metadata is derived the way the service's clients always have:
    /// `total` falls back to the number of items and `totalPages` to
    /// `ceil(total / page_size)`.
    pub fn parse_page(body: &[u8], page_size: u32) -> Result<RemotePage, serde_json::Error> {
        let body: PageBody = serde_json::from_slice(body)?;
        let items = body.data.unwrap_or_default();

        let total = body
            .total
            .filter(|&t| t > 0)
            .unwrap_or(items.len() as u64);
        let total_pages = body
            .total_pages
            .filter(|&p| p > 0)
            .unwrap_or_else(|| {
                u32::try_from(total.div_ceil(u64::from(page_size.max(1)))).unwrap_or(u32::MAX)
            });

        Ok(RemotePage {
            items,
            total,
            total_pages,
        })
    }

    /// Decode a like-toggle response into the new like count.
    pub fn parse_like(body: &[u8]) -> Result<u64, serde_json::Error> {
        serde_json::from_slice::<LikeBody>(body).map(|b| b.total_likes)
    }
}

/// Return the body of a successful response, or turn a non-2xx status into
/// [`FetchError::Remote`] using whatever message the service sent.
async fn success_body(response: Response) -> Result<Vec<u8>, FetchError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(body.to_vec());
    }
    Err(remote_error(status, &body))
}

fn remote_error(status: StatusCode, body: &[u8]) -> FetchError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    FetchError::Remote {
        status: status.as_u16(),
        message,
    }
}

impl FeedSource for HttpSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(
        &self,
        credential: &Credential,
        page: u32,
        page_size: u32,
    ) -> Result<RemotePage, FetchError> {
        tracing::debug!(page, page_size, "requesting feed page");
        let response = self
            .client
            .get(format!("{}/api/meme/getmeme", self.base_url))
            .bearer_auth(credential.bearer())
            .query(&[("page", page), ("limit", page_size)])
            .send()
            .await?;

        let body = success_body(response).await?;
        Ok(Self::parse_page(&body, page_size)?)
    }

    async fn toggle_like(&self, credential: &Credential, id: &str) -> Result<u64, FetchError> {
        tracing::debug!(id, "toggling like");
        let response = self
            .client
            .put(format!("{}/api/meme/likes/{id}", self.base_url))
            .bearer_auth(credential.bearer())
            .send()
            .await?;

        let body = success_body(response).await?;
        Ok(Self::parse_like(&body)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_page_extracts_items_and_metadata() {
        let body = br#"{
            "data": [
                { "_id": "m1", "meme": ["a.png"], "caption": "one",
                  "author": { "_id": "u1", "username": "alice" }, "likes": [] },
                { "_id": "m2", "meme": [], "caption": "two",
                  "author": { "_id": "u2", "username": "bob" }, "likes": ["u1"] }
            ],
            "total": 25,
            "totalPages": 3
        }"#;

        let page = HttpSource::parse_page(body, 12).unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id.as_deref(), Some("m1"));
        assert_eq!(page.items[1].caption.as_deref(), Some("two"));
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn parse_page_derives_missing_metadata() {
        let body = br#"{ "data": [ { "_id": "m1" }, { "_id": "m2" }, { "_id": "m3" } ] }"#;
        let page = HttpSource::parse_page(body, 2).unwrap();

        assert_eq!(page.total, 3, "falls back to item count");
        assert_eq!(page.total_pages, 2, "ceil(3 / 2)");
    }

    #[test]
    fn parse_page_derives_pages_from_total() {
        let body = br#"{ "data": [ { "_id": "m1" } ], "total": 40 }"#;
        let page = HttpSource::parse_page(body, 12).unwrap();
        assert_eq!(page.total_pages, 4);
    }

    #[test]
    fn parse_page_saturates_huge_page_counts() {
        let page = HttpSource::parse_page(br#"{ "data": [], "total": 10000000000 }"#, 1).unwrap();
        assert_eq!(page.total, 10_000_000_000);
        assert_eq!(page.total_pages, u32::MAX);
    }

    #[test]
    fn parse_page_tolerates_missing_data() {
        let page = HttpSource::parse_page(b"{}", 12).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn parse_page_rejects_non_json() {
        assert!(HttpSource::parse_page(b"<html>502</html>", 12).is_err());
    }

    #[test]
    fn parse_like_reads_total() {
        assert_eq!(HttpSource::parse_like(br#"{ "totalLikes": 8 }"#).unwrap(), 8);
        assert!(HttpSource::parse_like(br#"{ "message": "nope" }"#).is_err());
    }

    #[test]
    fn remote_error_prefers_service_message() {
        let err = remote_error(StatusCode::FORBIDDEN, br#"{ "error": "not on the list" }"#);
        match err {
            FetchError::Remote { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "not on the list");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn remote_error_falls_back_to_reason_phrase() {
        let err = remote_error(StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(err.to_string(), "server returned 502: Bad Gateway");
    }

    #[test]
    fn new_trims_trailing_slash() {
        let src = HttpSource::new("http://localhost:5000/").unwrap();
        assert_eq!(src.name(), "http://localhost:5000");
    }
}
