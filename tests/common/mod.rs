#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use devportal_gateway::app::{app, AppState};
use devportal_gateway::config;
use devportal_gateway::session::{AuthContext, InMemorySessionStore, Session, SharedSessionStore};

/// In-process app plus a handle on its session store, so tests can seed and
/// inspect session state directly.
pub struct TestApp {
    pub router: Router,
    pub sessions: SharedSessionStore,
}

pub fn test_app() -> TestApp {
    let sessions: SharedSessionStore = Arc::new(InMemorySessionStore::new());
    let state = AppState::new(sessions.clone()).expect("route whitelist must load");
    TestApp {
        router: app(state),
        sessions,
    }
}

impl TestApp {
    /// Seed a session record and return its id for the cookie header.
    pub async fn seed_session(&self, session: Session) -> Uuid {
        let id = session.id;
        self.sessions.create(session).await;
        id
    }

    pub async fn seed_auth(&self, auth: AuthContext) -> Uuid {
        self.seed_session(Session::new(Some(auth))).await
    }

    pub async fn get(&self, path: &str, session: Option<Uuid>) -> Result<Response<Body>> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(id) = session {
            builder = builder.header(COOKIE, session_cookie(id));
        }
        let request = builder.body(Body::empty())?;
        Ok(self.router.clone().oneshot(request).await?)
    }

    pub async fn post_json(
        &self,
        path: &str,
        session: Option<Uuid>,
        body: &Value,
    ) -> Result<Response<Body>> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/json");
        if let Some(id) = session {
            builder = builder.header(COOKIE, session_cookie(id));
        }
        let request = builder.body(Body::from(body.to_string()))?;
        Ok(self.router.clone().oneshot(request).await?)
    }
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}", config::config().security.session_cookie, id)
}

/// The Location header of a redirect response.
pub fn location(response: &Response<Body>) -> Result<String> {
    Ok(response
        .headers()
        .get(LOCATION)
        .context("missing Location header")?
        .to_str()?
        .to_string())
}

/// The session id from a Set-Cookie header.
pub fn set_cookie_session(response: &Response<Body>) -> Result<Uuid> {
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie header")?
        .to_str()?;
    let value = cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split('=').nth(1))
        .context("malformed Set-Cookie header")?;
    Ok(Uuid::parse_str(value)?)
}

pub async fn body_json(response: Response<Body>) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
