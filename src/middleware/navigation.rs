use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::app::AppState;
use crate::config;
use crate::routes::{self, RouteDecision};
use crate::session::Role;

/// The validated navigation target, injected for the portal handlers once the
/// path has passed role, username and whitelist checks.
#[derive(Clone, Debug)]
pub struct RouteContext {
    pub role: Role,
    pub username: String,
    pub section: String,
}

/// Validates the three variable parts of a portal URL and auto-corrects the
/// section against the route whitelist.
///
/// Role or username failures redirect to sign-in; an invalid section is
/// either corrected (glued garbage dropped) or sent to the fallback section.
/// Runs after the impersonation guard and before the context reconciler.
pub async fn navigation_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cfg = config::config();
    let path = request.uri().path();

    let Some(parts) = routes::split_portal_path(path, &cfg.routing.namespace) else {
        // Not a portal path; nothing for this middleware to decide
        return next.run(request).await;
    };

    let Some(role) = Role::from_segment(parts.role) else {
        tracing::warn!("Invalid role segment '{}' in '{}', redirecting to sign-in", parts.role, path);
        return Redirect::to(&cfg.routing.signin_path).into_response();
    };
    if !routes::is_valid_username(parts.username) {
        tracing::warn!("Invalid username segment in '{}', redirecting to sign-in", path);
        return Redirect::to(&cfg.routing.signin_path).into_response();
    }
    let username = parts.username.to_string();

    if parts.rest.is_empty() {
        let location = portal_url(&cfg.routing.namespace, role, &username, &cfg.routing.default_section);
        return Redirect::to(&location).into_response();
    }

    match state.matcher.validate(parts.rest) {
        RouteDecision::Valid(section) => {
            tracing::debug!("Route '{}' valid for {}/{}", section, role, username);
            request.extensions_mut().insert(RouteContext {
                role,
                username,
                section,
            });
            next.run(request).await
        }
        RouteDecision::Corrected(section) => {
            let location = portal_url(&cfg.routing.namespace, role, &username, &section);
            tracing::info!("Corrected malformed route '{}' to '{}'", path, location);
            Redirect::to(&location).into_response()
        }
        RouteDecision::Unrecognized(fallback) => {
            let location = portal_url(&cfg.routing.namespace, role, &username, &fallback);
            tracing::info!("Unrecognized route '{}', falling back to '{}'", path, location);
            Redirect::to(&location).into_response()
        }
    }
}

fn portal_url(namespace: &str, role: Role, username: &str, section: &str) -> String {
    format!("/{}/{}/{}/{}", namespace, role, username, section)
}
