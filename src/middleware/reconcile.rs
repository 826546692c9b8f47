use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::{CurrentSession, GuardDecision};
use crate::app::AppState;
use crate::config::{self, AppConfig};
use crate::session::Session;

/// Keeps the session's authentication context consistent across the two
/// special flows: provider-based signup-in-progress (pre-handler) and
/// impersonation (post-handler).
///
/// Both phases are fail-open: a session invalidated between the pre- and
/// post-phase never blocks or crashes the request.
pub async fn reconcile_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let cfg = config::config();
    let current = request.extensions().get::<CurrentSession>().cloned();
    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(request.uri().path())
        .to_string();

    match pre_check(&uri, current.as_ref().map(|c| &c.view), cfg) {
        GuardDecision::Proceed => {}
        GuardDecision::Redirect(location) => {
            return Redirect::to(&location).into_response();
        }
    }

    let response = next.run(request).await;

    if let Some(current) = current {
        persist_context(&state, &current).await;
    }

    response
}

/// Pre-handler check: public paths always pass; a provider-authenticated
/// session with an incomplete profile is forced to the profile-completion
/// endpoint for any other destination, deep links included.
///
/// `uri` is the request path with its query string: the bypass marker is
/// matched against the whole URL, the allow-list against the path alone.
pub fn pre_check(uri: &str, session: Option<&Session>, cfg: &AppConfig) -> GuardDecision {
    let path = uri.split('?').next().unwrap_or(uri);
    if is_allow_listed(path, cfg) {
        return GuardDecision::Proceed;
    }

    let Some(session) = session else {
        return GuardDecision::Proceed;
    };
    let Some(auth) = &session.auth else {
        return GuardDecision::Proceed;
    };

    let profile_pending = session
        .pending_profile_user
        .as_ref()
        .map(|user| user.is_pending())
        .unwrap_or(false);

    if auth.origin.is_provider() && profile_pending {
        // Defense in depth: deep links crafted through the OAuth2 flow are a
        // security-relevant event, not just a lost navigation
        if uri.contains(cfg.security.oauth2_marker.as_str()) {
            tracing::warn!(
                "Profile-incomplete session {} attempted OAuth2-marked deep link '{}'",
                auth.username,
                uri
            );
        }
        return GuardDecision::Redirect(cfg.routing.profile_completion_path.clone());
    }

    GuardDecision::Proceed
}

/// Paths exempt from all reconciliation checks: static assets, sign-in/up,
/// the OAuth2 endpoints, profile completion, root and health.
fn is_allow_listed(path: &str, cfg: &AppConfig) -> bool {
    if path == "/" || path == "/health" {
        return true;
    }
    if path.starts_with(&cfg.routing.signin_path)
        || path.starts_with(&cfg.routing.profile_completion_path)
    {
        return true;
    }
    const PUBLIC_PREFIXES: &[&str] = &[
        "/signup",
        "/css/",
        "/js/",
        "/images/",
        "/oauth2/",
        "/login/oauth2/",
    ];
    PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Post-handler phase: while impersonating, re-persist the active context so
/// concurrent requests in the same impersonation episode observe a
/// consistent, latest-known context (covers impersonation state set
/// mid-session). The saved administrator context is left untouched; it is
/// only written by the start transition and consumed by the end transition.
async fn persist_context(state: &AppState, current: &CurrentSession) {
    let mut fresh = match state.sessions.view(current.id).await {
        Ok(fresh) => fresh,
        // Invalidated between phases: skip, the pipeline already succeeded
        Err(_) => return,
    };

    if !fresh.impersonating {
        return;
    }
    if fresh.auth.is_some() {
        return;
    }
    let Some(auth) = current.view.auth.clone() else {
        return;
    };

    fresh.auth = Some(auth);
    if let Err(e) = state.sessions.put(fresh).await {
        tracing::warn!(
            "Could not persist security context for session {}: {}",
            current.id,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AuthContext, InMemorySessionStore, Role, TransientUser};
    use std::sync::Arc;
    use uuid::Uuid;

    fn cfg() -> AppConfig {
        AppConfig::from_env()
    }

    fn pending_provider_session() -> Session {
        let mut session = Session::new(Some(AuthContext::provider(
            "newbie",
            vec![Role::Dev],
            "github",
        )));
        session.pending_profile_user = Some(TransientUser::new("newbie", "github"));
        session
    }

    #[test]
    fn allow_listed_paths_always_proceed() {
        let cfg = cfg();
        let session = pending_provider_session();
        for path in [
            "/",
            "/health",
            "/signin",
            "/signup",
            "/css/site.css",
            "/login/oauth2/code/github",
            "/complete-profile",
        ] {
            assert_eq!(
                pre_check(path, Some(&session), &cfg),
                GuardDecision::Proceed,
                "{path} must be allow-listed"
            );
        }
    }

    #[test]
    fn incomplete_provider_signup_is_forced_to_profile_completion() {
        let cfg = cfg();
        let session = pending_provider_session();
        assert_eq!(
            pre_check("/devportal/dev/newbie/dashboard", Some(&session), &cfg),
            GuardDecision::Redirect("/complete-profile".to_string())
        );
        // Deep links through the OAuth2 flow are caught too, marker in the
        // path or in the query string
        assert_eq!(
            pre_check("/devportal/dev/newbie/oauth2-callback-replay", Some(&session), &cfg),
            GuardDecision::Redirect("/complete-profile".to_string())
        );
        assert_eq!(
            pre_check("/devportal/dev/newbie/dashboard?from=oauth2", Some(&session), &cfg),
            GuardDecision::Redirect("/complete-profile".to_string())
        );
    }

    #[test]
    fn completed_profile_proceeds() {
        let cfg = cfg();
        let mut session = pending_provider_session();
        session.pending_profile_user.as_mut().unwrap().id = Some(Uuid::new_v4());
        assert_eq!(
            pre_check("/devportal/dev/newbie/dashboard", Some(&session), &cfg),
            GuardDecision::Proceed
        );

        session.pending_profile_user = None;
        assert_eq!(
            pre_check("/devportal/dev/newbie/dashboard", Some(&session), &cfg),
            GuardDecision::Proceed
        );
    }

    #[test]
    fn password_sessions_are_never_redirected() {
        let cfg = cfg();
        let mut session = Session::new(Some(AuthContext::password("jdoe", vec![Role::Dev])));
        // Even with a stale transient marker, a password origin is not a
        // provider signup in progress
        session.pending_profile_user = Some(TransientUser::new("jdoe", "github"));
        assert_eq!(
            pre_check("/devportal/dev/jdoe/tickets", Some(&session), &cfg),
            GuardDecision::Proceed
        );
    }

    #[test]
    fn anonymous_requests_proceed() {
        let cfg = cfg();
        assert_eq!(
            pre_check("/devportal/dev/jdoe/tickets", None, &cfg),
            GuardDecision::Proceed
        );
    }

    fn impersonating_session() -> Session {
        let mut session = Session::new(Some(AuthContext::password("alice", vec![Role::Dev])));
        session.impersonating = true;
        session.impersonated_username = Some("alice".to_string());
        session.saved_security_context =
            Some(AuthContext::password("admin1", vec![Role::Sa]));
        session
    }

    #[tokio::test]
    async fn restores_active_context_cleared_by_a_concurrent_write() {
        let state = AppState::new(Arc::new(InMemorySessionStore::new())).unwrap();
        let session = impersonating_session();
        let id = session.id;
        let snapshot = session.clone();
        state.sessions.create(session).await;

        // An external writer drops the active context mid-request
        let mut degraded = state.sessions.view(id).await.unwrap();
        degraded.auth = None;
        state.sessions.put(degraded).await.unwrap();

        persist_context(&state, &CurrentSession { id, view: snapshot }).await;

        let restored = state.sessions.view(id).await.unwrap();
        assert_eq!(
            restored.auth.as_ref().map(|a| a.username.as_str()),
            Some("alice")
        );
        assert_eq!(
            restored
                .saved_security_context
                .as_ref()
                .map(|a| a.username.as_str()),
            Some("admin1")
        );
    }

    #[tokio::test]
    async fn saved_context_survives_the_post_phase_untouched() {
        let state = AppState::new(Arc::new(InMemorySessionStore::new())).unwrap();
        let session = impersonating_session();
        let id = session.id;
        let snapshot = session.clone();
        state.sessions.create(session).await;

        persist_context(&state, &CurrentSession { id, view: snapshot }).await;

        // Writing the impersonated context over the saved one would make the
        // end transition restore the wrong identity
        let stored = state.sessions.view(id).await.unwrap();
        assert_eq!(
            stored.auth.as_ref().map(|a| a.username.as_str()),
            Some("alice")
        );
        assert_eq!(
            stored
                .saved_security_context
                .as_ref()
                .map(|a| a.username.as_str()),
            Some("admin1")
        );
    }

    #[tokio::test]
    async fn post_phase_skips_invalidated_sessions() {
        let state = AppState::new(Arc::new(InMemorySessionStore::new())).unwrap();
        let snapshot = impersonating_session();
        let id = snapshot.id;

        // Never stored: the phase must swallow the fault silently
        persist_context(&state, &CurrentSession { id, view: snapshot }).await;
        assert_eq!(state.sessions.count().await, 0);
    }
}
