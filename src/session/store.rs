use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::context::{AuthContext, TransientUser};

/// Server-side session record, keyed by the opaque id carried in the session
/// cookie.
///
/// The record may be read and written by multiple in-flight requests from the
/// same browser session (parallel asset/API calls). Access is deliberately
/// best-effort rather than atomically consistent: a request that loses a race
/// observes slightly stale state, which the middleware tolerates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// The active authentication context, populated at login.
    pub auth: Option<AuthContext>,
    pub impersonating: bool,
    pub impersonated_username: Option<String>,
    /// The administrator's own context, saved when impersonation starts and
    /// restored when it ends.
    pub saved_security_context: Option<AuthContext>,
    /// Present while a provider-based signup has not completed its profile.
    pub pending_profile_user: Option<TransientUser>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(auth: Option<AuthContext>) -> Self {
        Self {
            id: Uuid::new_v4(),
            auth,
            impersonating: false,
            impersonated_username: None,
            saved_security_context: None,
            pending_profile_user: None,
            created_at: Utc::now(),
        }
    }
}

/// Session storage fault. `Invalidated` covers every case where the record is
/// gone (logout, expiry, concurrent removal); callers apply the fail-open
/// policy instead of surfacing it to the user.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session has been invalidated")]
    Invalidated,
}

/// Storage seam for session records. The production store is external to this
/// service; the in-memory implementation below backs development and tests.
///
/// `view` returns an owned snapshot, never a live reference: readers work on
/// the state they observed, writers replace the whole record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session record.
    async fn create(&self, session: Session);

    /// Snapshot the session, or `Invalidated` if it no longer exists.
    async fn view(&self, id: Uuid) -> Result<Session, SessionError>;

    /// Replace an existing session record. Fails if the session is gone.
    async fn put(&self, session: Session) -> Result<(), SessionError>;

    /// Destroy the session. Fails if it was already gone.
    async fn remove(&self, id: Uuid) -> Result<(), SessionError>;

    /// Number of live sessions, for health reporting.
    async fn count(&self) -> usize;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

pub struct InMemorySessionStore {
    inner: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    /// TTL comes from `security.session_ttl_hours`, mirroring the cookie's
    /// `Max-Age`.
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(
            crate::config::config().security.session_ttl_hours as i64,
        ))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn expired(&self, session: &Session) -> bool {
        Utc::now() - session.created_at > self.ttl
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) {
        self.inner.write().await.insert(session.id, session);
    }

    async fn view(&self, id: Uuid) -> Result<Session, SessionError> {
        {
            let guard = self.inner.read().await;
            match guard.get(&id) {
                Some(session) if !self.expired(session) => return Ok(session.clone()),
                Some(_) => {}
                None => return Err(SessionError::Invalidated),
            }
        }
        // Lazy expiry: the record is reaped on its first access past the TTL
        self.inner.write().await.remove(&id);
        Err(SessionError::Invalidated)
    }

    async fn put(&self, session: Session) -> Result<(), SessionError> {
        let mut guard = self.inner.write().await;
        if !guard.contains_key(&session.id) {
            return Err(SessionError::Invalidated);
        }
        guard.insert(session.id, session);
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.inner
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::Invalidated)
    }

    async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}
