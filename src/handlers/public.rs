use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::config;
use crate::error::ApiError;
use crate::middleware::CurrentSession;
use crate::session::{AuthContext, Role, Session, TransientUser};

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let cfg = config::config();

    Json(json!({
        "success": true,
        "data": {
            "name": "DevPortal Gateway",
            "version": version,
            "description": "Route validation and session integrity layer for the developer portal",
            "endpoints": {
                "home": "/ (public)",
                "signin": "/signin (public)",
                "signup": "/signup (public)",
                "oauth2": "/login/oauth2/code/:provider (public)",
                "profile": format!("{} (provider signup completion)", cfg.routing.profile_completion_path),
                "portal": format!("/{}/:role/:username/:section (protected)", cfg.routing.namespace),
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now();
    let sessions = state.sessions.count().await;

    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": now,
            "sessions": sessions
        }
    }))
}

pub async fn signin_page() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "message": "Sign in required",
            "method": "POST /signin",
            "fields": ["username", "password"]
        }
    }))
}

pub async fn signup_page() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "message": "Sign up",
            "fields": ["username", "password", "email"]
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
    /// Roles asserted by the upstream identity provider. Defaults to `dev`.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Form login. Credential verification belongs to the upstream identity
/// subsystem; this seam accepts the asserted identity and establishes the
/// session the middleware chain operates on.
pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    if !crate::routes::is_valid_username(&body.username) {
        return Err(ApiError::bad_request("Invalid username"));
    }
    if body.password.is_empty() {
        return Err(ApiError::bad_request("Password must not be empty"));
    }

    let mut roles: Vec<Role> = body
        .roles
        .iter()
        .filter_map(|r| Role::from_segment(r))
        .collect();
    if roles.is_empty() {
        roles.push(Role::Dev);
    }

    let auth = AuthContext::password(&body.username, roles);
    let role = auth.navigation_role().unwrap_or(Role::Dev);
    let session = Session::new(Some(auth));
    let session_id = session.id;
    state.sessions.create(session).await;

    tracing::info!("Session {} created for '{}'", session_id, body.username);

    let dashboard = format!(
        "/{}/{}/{}/{}",
        cfg.routing.namespace, role, body.username, cfg.routing.default_section
    );
    Ok((
        CookieJar::new().add(session_cookie(session_id)),
        Json(json!({
            "success": true,
            "data": {
                "username": body.username,
                "role": role,
                "dashboard": dashboard
            }
        })),
    )
        .into_response())
}

pub async fn signout(
    State(state): State<AppState>,
    current: Option<Extension<CurrentSession>>,
) -> Response {
    if let Some(Extension(current)) = current {
        // Already-gone sessions are fine; signout is idempotent
        if let Err(e) = state.sessions.remove(current.id).await {
            tracing::debug!("Signout for session {}: {}", current.id, e);
        }
    }

    (
        CookieJar::new().add(clear_session_cookie()),
        Json(json!({ "success": true, "data": { "message": "Signed out" } })),
    )
        .into_response()
}

/// OAuth2/OIDC callback seam. Provider token exchange and attribute mapping
/// live upstream; by the time this runs the provider has asserted an identity
/// and, on first login, signalled that no local profile exists yet.
pub async fn oauth2_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    let username = params
        .get("login")
        .cloned()
        .ok_or_else(|| ApiError::bad_request("Missing 'login' parameter"))?;
    if !crate::routes::is_valid_username(&username) {
        return Err(ApiError::bad_request("Invalid username"));
    }
    let first_login = params.get("first_login").map(|v| v != "false").unwrap_or(true);

    let auth = AuthContext::provider(&username, vec![Role::Dev], &provider);
    let mut session = Session::new(Some(auth));
    if first_login {
        session.pending_profile_user = Some(TransientUser::new(&username, &provider));
    }
    let session_id = session.id;
    state.sessions.create(session).await;

    tracing::info!(
        "Provider session {} created for '{}' via '{}' (first login: {})",
        session_id,
        username,
        provider,
        first_login
    );

    let location = if first_login {
        cfg.routing.profile_completion_path.clone()
    } else {
        format!(
            "/{}/dev/{}/{}",
            cfg.routing.namespace, username, cfg.routing.default_section
        )
    };

    Ok((
        CookieJar::new().add(session_cookie(session_id)),
        Redirect::to(&location),
    )
        .into_response())
}

pub async fn complete_profile_page(current: Option<Extension<CurrentSession>>) -> Json<Value> {
    let pending = current
        .as_ref()
        .and_then(|Extension(c)| c.view.pending_profile_user.as_ref())
        .map(|user| {
            json!({
                "username": user.username,
                "provider": user.provider,
            })
        });

    Json(json!({
        "success": true,
        "data": {
            "message": "Complete your profile to finish registration",
            "fields": ["email", "display_name"],
            "pending": pending
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteProfileRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Finish a provider-based signup: assign the persistent identity and clear
/// the transient marker so the reconciler stops redirecting.
pub async fn complete_profile(
    State(state): State<AppState>,
    current: Option<Extension<CurrentSession>>,
    Json(body): Json<CompleteProfileRequest>,
) -> Result<Response, ApiError> {
    let Some(Extension(current)) = current else {
        return Err(ApiError::unauthorized("No active session"));
    };

    let mut session = state.sessions.view(current.id).await?;
    let Some(mut user) = session.pending_profile_user.take() else {
        return Err(ApiError::conflict("No provider signup in progress"));
    };

    // Persisting the user record proper belongs to the user subsystem; the
    // session contract only needs the identity to stop being transient
    let user_id = Uuid::new_v4();
    user.id = Some(user_id);
    user.email = body.email;
    user.display_name = body.display_name;

    tracing::info!("Profile completed for '{}' (id {})", user.username, user_id);

    let response = json!({
        "success": true,
        "data": {
            "id": user.id,
            "username": user.username,
        }
    });

    state.sessions.put(session).await?;

    Ok(Json(response).into_response())
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    let cfg = config::config();
    Cookie::build((cfg.security.session_cookie.clone(), id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::hours(cfg.security.session_ttl_hours as i64))
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    let cfg = config::config();
    Cookie::build((cfg.security.session_cookie.clone(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
