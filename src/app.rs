use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::handlers::{portal, public};
use crate::middleware::{
    impersonation_guard_middleware, navigation_middleware, reconcile_middleware,
    session_middleware,
};
use crate::routes::{table, RoutePatternMatcher};
use crate::session::SharedSessionStore;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SharedSessionStore,
    pub matcher: Arc<RoutePatternMatcher>,
}

impl AppState {
    /// Builds the shared state, loading the route whitelist. A malformed
    /// whitelist entry fails here, at startup, never at request time.
    pub fn new(sessions: SharedSessionStore) -> anyhow::Result<Self> {
        let cfg = config::config();
        let matcher = table::route_matcher(&cfg.routing.default_section)?;
        Ok(Self {
            sessions,
            matcher: Arc::new(matcher),
        })
    }
}

/// Router composition. The protected namespace is layered so each request
/// passes the checks in fixed order: session resolution, impersonation guard,
/// navigation/route validation, security-context reconciliation, handler.
pub fn app(state: AppState) -> Router {
    let cfg = config::config();
    let ns = &cfg.routing.namespace;

    let portal_routes = Router::new()
        .route(
            &format!("/{}/:role/:username", ns),
            get(portal::section).post(portal::section),
        )
        .route(
            &format!("/{}/:role/:username/*section", ns),
            get(portal::section).post(portal::section),
        )
        // Layers run top-down from the last one added
        .layer(from_fn_with_state(state.clone(), reconcile_middleware))
        .layer(from_fn_with_state(state.clone(), navigation_middleware))
        .layer(from_fn_with_state(state.clone(), impersonation_guard_middleware));

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/signin", get(public::signin_page).post(public::signin))
        .route("/signup", get(public::signup_page))
        .route("/signout", post(public::signout))
        .route("/login/oauth2/code/:provider", get(public::oauth2_callback))
        .route(
            &cfg.routing.profile_completion_path,
            get(public::complete_profile_page).post(public::complete_profile),
        )
        .merge(portal_routes)
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
