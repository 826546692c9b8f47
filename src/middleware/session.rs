use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::app::AppState;
use crate::config;
use crate::session::Session;

/// The resolved session for this request: the opaque id plus an owned
/// snapshot of the record as it looked when the request started.
#[derive(Clone, Debug)]
pub struct CurrentSession {
    pub id: Uuid,
    pub view: Session,
}

/// Resolves the session cookie to a [`CurrentSession`] extension.
///
/// Fail-open: a missing cookie, an unparsable id, or a record that vanished
/// between requests all leave the request anonymous and let it continue.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = &config::config().security.session_cookie;

    if let Some(id) = session_id_from_headers(request.headers(), cookie_name) {
        match state.sessions.view(id).await {
            Ok(view) => {
                request.extensions_mut().insert(CurrentSession { id, view });
            }
            Err(e) => {
                tracing::debug!("Session {} not resolvable, continuing anonymous: {}", id, e);
            }
        }
    }

    next.run(request).await
}

/// Extract the session id from the Cookie header(s). The jar handles the
/// header grammar (multiple headers, quoted values); anything that is not a
/// UUID degrades to anonymous.
fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<Uuid> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(cookie_name)?;
    Uuid::parse_str(cookie.value_trimmed()).ok()
}
