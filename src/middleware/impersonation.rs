use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::{CurrentSession, GuardDecision};
use crate::app::AppState;
use crate::config::{self, SecurityConfig};
use crate::session::{Role, Session};

/// While an administrator impersonates another user, navigation back into
/// administrator-only URL space is blocked and redirected to the impersonated
/// user's own dashboard. Runs before route validation.
///
/// The impersonation state transitions themselves (save the admin context,
/// set the flags; later clear and restore) live in the portal handlers; this
/// guard only reads the state.
pub async fn impersonation_guard_middleware(
    State(_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let cfg = config::config();

    // An unresolvable session means Normal state: proceed, never error
    let Some(current) = request.extensions().get::<CurrentSession>() else {
        return next.run(request).await;
    };

    match check(
        &current.view,
        request.uri().path(),
        &cfg.routing.namespace,
        &cfg.security,
    ) {
        GuardDecision::Proceed => next.run(request).await,
        GuardDecision::Redirect(location) => {
            tracing::warn!(
                "Impersonation guard blocked '{}' for session {}, redirecting to '{}'",
                request.uri().path(),
                current.id,
                location
            );
            Redirect::to(&location).into_response()
        }
    }
}

/// Decide whether the request may proceed under the session's impersonation
/// state. Pure over the session snapshot and the raw request path.
pub fn check(
    session: &Session,
    request_path: &str,
    namespace: &str,
    security: &SecurityConfig,
) -> GuardDecision {
    if !session.impersonating {
        return GuardDecision::Proceed;
    }
    let Some(target) = session.impersonated_username.as_deref() else {
        // Inconsistent state (flag set, no target): treat as Normal
        return GuardDecision::Proceed;
    };

    let Some(parts) = crate::routes::split_portal_path(request_path, namespace) else {
        return GuardDecision::Proceed;
    };
    if parts.rest == security.end_impersonation_action {
        return GuardDecision::Proceed;
    }
    if !is_admin_section(parts.rest, &security.admin_prefixes) {
        return GuardDecision::Proceed;
    }

    // The active context is the impersonated user's; its first role names the
    // dashboard to land on, defaulting to dev when unresolvable.
    let role = session
        .auth
        .as_ref()
        .and_then(|auth| auth.navigation_role())
        .unwrap_or(Role::Dev);

    GuardDecision::Redirect(format!("/{}/{}/{}/dashboard", namespace, role, target))
}

/// Whole-segment prefix match against the administrator-only section prefixes.
fn is_admin_section(rest: &str, admin_prefixes: &[String]) -> bool {
    admin_prefixes.iter().any(|prefix| {
        rest == prefix
            || (rest.len() > prefix.len()
                && rest.starts_with(prefix.as_str())
                && rest.as_bytes()[prefix.len()] == b'/')
    })
}
