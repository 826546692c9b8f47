use axum::{
    extract::State,
    response::{IntoResponse, Json, Redirect, Response},
    Extension,
};
use serde_json::json;

use crate::app::AppState;
use crate::config;
use crate::error::ApiError;
use crate::middleware::{CurrentSession, RouteContext};
use crate::session::{AuthContext, Role};

/// Portal section dispatch. By the time this runs the middleware chain has
/// validated the role, username and section; impersonation actions are
/// handled here, everything else renders a page descriptor for the frontend.
pub async fn section(
    State(state): State<AppState>,
    route: Option<Extension<RouteContext>>,
    current: Option<Extension<CurrentSession>>,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    let Some(Extension(route)) = route else {
        // Unreachable behind the navigation middleware; kept as a redirect
        // rather than an error to honor the no-5xx policy
        return Ok(Redirect::to(&cfg.routing.signin_path).into_response());
    };
    let current = current.map(|Extension(c)| c);

    if let Some(target) = route.section.strip_prefix("impersonate/") {
        return start_impersonation(&state, &route, current.as_ref(), target).await;
    }
    if route.section == cfg.security.end_impersonation_action {
        return end_impersonation(&state, current.as_ref()).await;
    }

    let (authenticated, impersonating) = current
        .as_ref()
        .map(|c| (c.view.auth.is_some(), c.view.impersonating))
        .unwrap_or((false, false));

    Ok(Json(json!({
        "success": true,
        "data": {
            "section": route.section,
            "role": route.role,
            "username": route.username,
            "authenticated": authenticated,
            "impersonating": impersonating
        }
    }))
    .into_response())
}

/// The Normal -> Impersonating transition: save the administrator's own
/// context, mark the session, and swap the active context to the target.
async fn start_impersonation(
    state: &AppState,
    route: &RouteContext,
    current: Option<&CurrentSession>,
    target: &str,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    let Some(current) = current else {
        return Err(ApiError::unauthorized("Sign in to impersonate users"));
    };
    if !crate::routes::is_valid_username(target) || target.contains('/') {
        return Err(ApiError::bad_request("Invalid impersonation target"));
    }

    let mut session = state.sessions.view(current.id).await?;
    let Some(admin) = session.auth.clone() else {
        return Err(ApiError::unauthorized("Sign in to impersonate users"));
    };
    if !admin.has_role(Role::Sa) {
        tracing::warn!(
            "User '{}' attempted impersonation of '{}' without the sa role",
            admin.username,
            target
        );
        return Err(ApiError::forbidden("Impersonation requires the sa role"));
    }
    if session.impersonating {
        return Err(ApiError::conflict("Impersonation already in progress"));
    }

    // The upstream role provider would attach the target's real roles when
    // swapping the context; dev is the documented navigation default
    let impersonated = AuthContext::password(target, vec![Role::Dev]);
    let role = impersonated.navigation_role().unwrap_or(Role::Dev);

    session.saved_security_context = Some(admin.clone());
    session.impersonating = true;
    session.impersonated_username = Some(target.to_string());
    session.auth = Some(impersonated);
    state.sessions.put(session).await?;

    tracing::info!(
        "Administrator '{}' now impersonating '{}' (requested at {}/{})",
        admin.username,
        target,
        route.role,
        route.username
    );

    let location = format!(
        "/{}/{}/{}/{}",
        cfg.routing.namespace, role, target, cfg.routing.default_section
    );
    Ok(Redirect::to(&location).into_response())
}

/// The Impersonating -> Normal transition: clear the impersonation fields and
/// restore the administrator's saved context.
async fn end_impersonation(
    state: &AppState,
    current: Option<&CurrentSession>,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    let Some(current) = current else {
        return Ok(Redirect::to(&cfg.routing.signin_path).into_response());
    };

    let mut session = state.sessions.view(current.id).await?;

    if !session.impersonating {
        // Nothing to end; land on the user's own dashboard
        return Ok(Redirect::to(&own_dashboard(session.auth.as_ref())).into_response());
    }

    let target = session.impersonated_username.take();
    session.impersonating = false;
    if let Some(saved) = session.saved_security_context.take() {
        session.auth = Some(saved);
    }
    let location = own_dashboard(session.auth.as_ref());
    state.sessions.put(session).await?;

    tracing::info!(
        "Impersonation of '{}' ended, context restored",
        target.as_deref().unwrap_or("<unknown>")
    );

    Ok(Redirect::to(&location).into_response())
}

fn own_dashboard(auth: Option<&AuthContext>) -> String {
    let cfg = config::config();
    match auth {
        Some(auth) => format!(
            "/{}/{}/{}/{}",
            cfg.routing.namespace,
            auth.navigation_role().unwrap_or(Role::Dev),
            auth.username,
            cfg.routing.default_section
        ),
        None => cfg.routing.signin_path.clone(),
    }
}
