use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CodeflowError;

/// Tokens currently held for the user, with their expirations.
///
/// Expirations are kept as the opaque strings the server sent (e.g. `"300"`)
/// alongside the absolute instants computed when the tokens were saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token_expiration: Option<String>,
    pub refresh_token_expiration: Option<String>,
    #[serde(default)]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session for tokens issued just now.
    pub fn issued(
        access_token: &str,
        refresh_token: Option<&str>,
        access_token_expiration: Option<&str>,
        refresh_token_expiration: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: Some(access_token.to_string()),
            refresh_token: refresh_token.map(str::to_string),
            access_token_expiration: access_token_expiration.map(str::to_string),
            refresh_token_expiration: refresh_token_expiration.map(str::to_string),
            access_token_expires_at: access_token_expiration
                .and_then(|exp| expires_at(now, exp)),
            // Keycloak reports 0 for offline tokens that never expire.
            refresh_token_expires_at: refresh_token_expiration
                .and_then(|exp| expires_at(now, exp))
                .filter(|at| *at > now),
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// An access token is held and has not expired. Tokens without an
    /// expiration never expire.
    pub fn is_access_token_valid(&self) -> bool {
        self.access_token.is_some() && not_expired(self.access_token_expires_at)
    }

    pub fn is_refresh_token_valid(&self) -> bool {
        self.refresh_token.is_some() && not_expired(self.refresh_token_expires_at)
    }
}

fn expires_at(now: DateTime<Utc>, expiration: &str) -> Option<DateTime<Utc>> {
    let secs: f64 = expiration.trim().parse().ok()?;
    if !secs.is_finite() {
        return None;
    }
    Some(now + chrono::Duration::milliseconds((secs * 1000.0) as i64))
}

fn not_expired(at: Option<DateTime<Utc>>) -> bool {
    at.map_or(true, |at| Utc::now() < at)
}

/// Holder of the current session.
///
/// Reads hand out copies; writes replace the whole session at once so a
/// concurrent reader never sees a half-updated token pair.
pub trait SessionStore: Send + Sync {
    fn snapshot(&self) -> Session;

    fn replace(&self, session: Session) -> Result<(), CodeflowError>;

    /// Overwrite the stored tokens. Some providers rotate the refresh token
    /// on every use, so nothing from the previous session is kept.
    fn save_access_token(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        access_token_expiration: Option<&str>,
        refresh_token_expiration: Option<&str>,
    ) -> Result<(), CodeflowError> {
        self.replace(Session::issued(
            access_token,
            refresh_token,
            access_token_expiration,
            refresh_token_expiration,
        ))
    }

    fn clear_tokens(&self) -> Result<(), CodeflowError> {
        self.replace(Session::default())
    }
}

impl std::fmt::Debug for dyn SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

/// Session kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemorySession {
    inner: RwLock<Session>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }
}

impl SessionStore for InMemorySession {
    fn snapshot(&self) -> Session {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, session: Session) -> Result<(), CodeflowError> {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_session_keeps_raw_expirations() {
        let session = Session::issued("AT1", Some("RT1"), Some("300"), None);
        assert_eq!(session.access_token.as_deref(), Some("AT1"));
        assert_eq!(session.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(session.access_token_expiration.as_deref(), Some("300"));
        assert!(session.refresh_token_expiration.is_none());
        assert!(session.access_token_expires_at.is_some());
        assert!(session.is_access_token_valid());
        assert!(session.is_refresh_token_valid());
    }

    #[test]
    fn zero_lifetime_access_token_is_expired() {
        let session = Session::issued("AT1", None, Some("0"), None);
        assert!(session.has_access_token());
        assert!(!session.is_access_token_valid());
    }

    #[test]
    fn zero_refresh_lifetime_never_expires() {
        let session = Session::issued("AT1", Some("RT1"), Some("300"), Some("0"));
        assert_eq!(session.refresh_token_expiration.as_deref(), Some("0"));
        assert!(session.refresh_token_expires_at.is_none());
        assert!(session.is_refresh_token_valid());
    }

    #[test]
    fn unparseable_expiration_is_kept_but_ignored() {
        let session = Session::issued("AT1", None, Some("soon"), None);
        assert_eq!(session.access_token_expiration.as_deref(), Some("soon"));
        assert!(session.access_token_expires_at.is_none());
        assert!(session.is_access_token_valid());
    }

    #[test]
    fn past_expiry_is_invalid() {
        let session = Session {
            access_token: Some("AT1".into()),
            access_token_expires_at: Some(Utc::now() - chrono::Duration::minutes(1)),
            ..Session::default()
        };
        assert!(!session.is_access_token_valid());
    }

    #[test]
    fn empty_session_has_nothing_valid() {
        let session = Session::default();
        assert!(!session.has_access_token());
        assert!(!session.is_access_token_valid());
        assert!(!session.is_refresh_token_valid());
    }

    #[test]
    fn store_save_overwrites_and_clear_empties() {
        let store = InMemorySession::new();
        store
            .save_access_token("AT1", Some("RT1"), Some("300"), Some("1800"))
            .unwrap();
        store.save_access_token("AT2", None, None, None).unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.access_token.as_deref(), Some("AT2"));
        assert!(snap.refresh_token.is_none());
        assert!(snap.refresh_token_expiration.is_none());

        store.clear_tokens().unwrap();
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let store = InMemorySession::with_session(Session::issued("AT1", None, None, None));
        let before = store.snapshot();
        store.clear_tokens().unwrap();
        assert_eq!(before.access_token.as_deref(), Some("AT1"));
        assert!(store.snapshot().access_token.is_none());
    }
}
