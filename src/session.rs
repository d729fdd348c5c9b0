//! The signed-in viewer.
//!
//! A [`Session`] is a cheap, cloneable handle around the current [`Viewer`].
//! The feed manager receives one at construction and asks it for the viewer
//! (and its [`Credential`]) right before every fetch.  Nothing here is
//! persisted: signing out or restarting the program forgets the viewer.
//!
//! ## For contributors
//!
//! Whoever changes the viewer is also responsible for resetting the feed
//! (see [`crate::feed::FeedManager::reset`]).  [`Session::establish`] reports
//! whether the identity actually changed so callers know when that is needed.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use serde::Deserialize;

/// Bearer token forwarded to the remote service.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Errors from decoding a sign-in token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not a JWT (expected three dot-separated parts)")]
    Malformed,

    #[error("token payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("token payload has unexpected claims: {0}")]
    Claims(#[from] serde_json::Error),
}

/// The authenticated entity consuming the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub username: String,
    pub email: String,
    credential: Credential,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl Viewer {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            credential,
        }
    }

    /// Build a viewer from a JWT issued by the sign-in endpoint.
    ///
    /// Only the payload is decoded; the signature is the server's business.
    pub fn from_token(token: &str) -> Result<Self, TokenError> {
        let mut parts = token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(TokenError::Malformed),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        let claims: Claims = serde_json::from_slice(&bytes)?;

        Ok(Self {
            username: claims.username.unwrap_or_else(|| claims.id.clone()),
            email: claims.email.unwrap_or_default(),
            id: claims.id,
            credential: Credential::new(token),
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Shared handle to the current viewer, if any.
#[derive(Debug, Clone, Default)]
pub struct Session {
    viewer: Arc<RwLock<Option<Viewer>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `viewer`.  Returns `true` when the identity differs from the
    /// previous one (including "nobody was signed in").
    pub fn establish(&self, viewer: Viewer) -> bool {
        let mut current = self.viewer.write();
        let changed = current.as_ref().map(|v| v.id.as_str()) != Some(viewer.id.as_str());
        tracing::info!(viewer = %viewer.username, changed, "session established");
        tracing::debug!(viewer = %viewer.username, email = %viewer.email, "viewer contact");
        *current = Some(viewer);
        changed
    }

    /// Forget the viewer (sign out).
    pub fn terminate(&self) {
        if self.viewer.write().take().is_some() {
            tracing::info!("session terminated");
        }
    }

    pub fn viewer(&self) -> Option<Viewer> {
        self.viewer.read().clone()
    }

    pub fn is_established(&self) -> bool {
        self.viewer.read().is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    /// Log sink shared between the subscriber and the assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn token_for(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload),
        )
    }

    fn viewer(id: &str) -> Viewer {
        Viewer::new(id, id, format!("{id}@example.com"), Credential::new(format!("token-{id}")))
    }

    #[test]
    fn from_token_reads_claims() {
        let token = token_for(r#"{"id":"u1","username":"alice","email":"a@example.com","iat":1}"#);
        let viewer = Viewer::from_token(&token).unwrap();

        assert_eq!(viewer.id, "u1");
        assert_eq!(viewer.username, "alice");
        assert_eq!(viewer.email, "a@example.com");
        assert_eq!(viewer.credential().bearer(), token);
    }

    #[test]
    fn from_token_accepts_underscore_id_and_missing_username() {
        let token = token_for(r#"{"_id":"u2"}"#);
        let viewer = Viewer::from_token(&token).unwrap();

        assert_eq!(viewer.id, "u2");
        assert_eq!(viewer.username, "u2", "falls back to the id");
        assert!(viewer.email.is_empty());
    }

    #[test]
    fn from_token_rejects_non_jwt() {
        assert!(matches!(Viewer::from_token("abc"), Err(TokenError::Malformed)));
        assert!(matches!(Viewer::from_token("a.b.c.d"), Err(TokenError::Malformed)));
    }

    #[test]
    fn from_token_rejects_bad_payload() {
        assert!(matches!(Viewer::from_token("a.!!!.c"), Err(TokenError::Encoding(_))));

        let token = token_for(r#"{"username":"no id"}"#);
        assert!(matches!(Viewer::from_token(&token), Err(TokenError::Claims(_))));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("secret");
        assert_eq!(format!("{c:?}"), "Credential(..)");
    }

    #[test]
    fn establish_reports_identity_change() {
        let session = Session::new();
        assert!(!session.is_established());

        assert!(session.establish(viewer("a")));
        assert!(!session.establish(viewer("a")), "same identity again");
        assert!(session.establish(viewer("b")));
        assert_eq!(session.viewer().map(|v| v.id), Some("b".to_string()));
    }

    #[test]
    fn clones_share_the_viewer() {
        let session = Session::new();
        let other = session.clone();

        session.establish(viewer("a"));
        assert!(other.is_established());

        other.terminate();
        assert!(session.viewer().is_none());
    }

    #[test]
    fn info_logs_leave_out_the_email() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            Session::new().establish(viewer("a"));
        });

        let logs = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert!(logs.contains("session established"));
        assert!(!logs.contains("a@example.com"));
    }
}
